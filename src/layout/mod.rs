pub mod measure;
pub mod routing;
pub mod types;

use std::collections::BTreeMap;

use log::debug;

use crate::config::LayoutConfig;
use crate::schema::{Connection, Node, Schema, expand_repeats};

pub use measure::measure_node;
pub use routing::route;
pub use types::{
    AnnotationPlacement, LabelPlacement, Layout, NodePosition, NodeSize, Point, Rect,
    RoutedConnection, Routing, TextAnchor,
};

/// Extra vertical spacing between container rows so connection labels and
/// annotations drawn between them never collide with the next row.
fn connection_space(connections: &[Connection], config: &LayoutConfig) -> f32 {
    let mut space = 0.0f32;
    for connection in connections {
        if connection.label.is_some() {
            space = space.max(config.label_space);
        }
        if let Some(annotation) = &connection.annotation {
            let block = annotation.bullets.len() as f32 * config.annotation_line_height
                + config.annotation_block_pad;
            space = space.max(block);
        }
    }
    space
}

/// Assign absolute positions to every node with the column heuristic:
/// plain nodes left, highlighted containers center, pills right. This is a
/// static layout for small hand-authored sketches, not a general graph
/// engine.
pub fn compute_layout(schema: &Schema, config: &LayoutConfig) -> Layout {
    let expanded = expand_repeats(&schema.nodes);

    let mut primary = Vec::new();
    let mut containers = Vec::new();
    let mut pills = Vec::new();
    for node in &expanded {
        if node.is_highlight_container() {
            containers.push(node);
        } else if matches!(node.body, crate::schema::NodeBody::Pill) {
            pills.push(node);
        } else {
            primary.push(node);
        }
    }
    debug!(
        "layout buckets: {} primary, {} containers, {} pills",
        primary.len(),
        containers.len(),
        pills.len()
    );

    let container_gap = config.node_gap + connection_space(&schema.connections, config);

    let mut layout = Layout::default();
    let mut max_x = config.padding;
    let mut max_y = config.padding;

    // Primary column.
    let mut current_y = config.padding;
    for node in &primary {
        let size = measure_node(node, config);
        place(&mut layout, node, config.padding, current_y, &size);
        max_x = max_x.max(config.padding + size.width);
        current_y += size.height + config.node_gap;
        max_y = max_y.max(current_y - config.node_gap);
    }

    // Container column, with the widened gap for connection text.
    let container_x = config.padding + config.container_column_offset;
    current_y = config.padding;
    for node in &containers {
        let size = measure_node(node, config);
        place(&mut layout, node, container_x, current_y, &size);
        max_x = max_x.max(container_x + size.width);
        current_y += size.height + container_gap;
        max_y = max_y.max(current_y - container_gap);
    }

    // Pill column, right of whichever column reaches furthest.
    let pill_x = max_x + config.node_gap + config.pill_column_gap;
    current_y = config.padding + config.pill_column_drop;
    for node in &pills {
        let size = measure_node(node, config);
        place(&mut layout, node, pill_x, current_y, &size);
        max_x = max_x.max(pill_x + size.width);
        current_y += size.height + config.pill_gap;
        max_y = max_y.max(current_y - config.pill_gap);
    }

    layout.width = max_x + config.padding;
    layout.height = max_y + config.padding;
    debug!(
        "layout complete: {} positions, canvas {}x{}",
        layout.positions.len(),
        layout.width,
        layout.height
    );
    layout
}

fn place(layout: &mut Layout, node: &Node, x: f32, y: f32, size: &NodeSize) {
    layout.positions.insert(
        node.id.clone(),
        NodePosition {
            id: node.id.clone(),
            x,
            y,
            width: size.width,
            height: size.height,
            parent_id: None,
        },
    );

    if size.child_bounds.is_empty() {
        return;
    }
    // Children get absolute positions in the shared map, flagged so the
    // renderer skips them as top-level roots.
    let mut absolute = BTreeMap::new();
    for (child_id, bounds) in &size.child_bounds {
        let rect = Rect {
            x: x + bounds.x,
            y: y + bounds.y,
            width: bounds.width,
            height: bounds.height,
        };
        absolute.insert(child_id.clone(), rect);
        layout.positions.insert(
            child_id.clone(),
            NodePosition {
                id: child_id.clone(),
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                parent_id: Some(node.id.clone()),
            },
        );
    }
    layout.child_positions.insert(node.id.clone(), absolute);
}

/// Position lookup that tolerates dotted `parent.child` ids by retrying the
/// segment after the last dot.
pub fn find_position<'a>(
    id: &str,
    positions: &'a BTreeMap<String, NodePosition>,
) -> Option<&'a NodePosition> {
    if let Some(position) = positions.get(id) {
        return Some(position);
    }
    if let Some((_, tail)) = id.rsplit_once('.') {
        return positions.get(tail);
    }
    None
}
