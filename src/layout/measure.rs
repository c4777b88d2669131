use crate::config::LayoutConfig;
use crate::schema::{Node, NodeBody};

use super::types::{NodeSize, Rect};

/// Pills draw a fixed 16px icon regardless of the configured node icon size.
const PILL_ICON_SIZE: f32 = 16.0;
/// Total horizontal padding inside a pill.
const PILL_PAD_X: f32 = 32.0;
/// Bullet glyph indent inside boxes.
const BULLET_INDENT: f32 = 20.0;

/// Estimated text width from character count. The engine never measures
/// real glyphs; layout must be identical on every machine.
pub(super) fn estimate_width(text: &str, char_width: f32) -> f32 {
    text.chars().count() as f32 * char_width
}

/// Compute the required size of a node from its content. Containers also
/// lay out their children relative to their own origin.
pub fn measure_node(node: &Node, config: &LayoutConfig) -> NodeSize {
    match &node.body {
        NodeBody::Box { subtitle, bullets } => measure_box(node, subtitle.as_deref(), bullets, config),
        NodeBody::Container { bullets, children } => {
            measure_container(node, bullets, children, config)
        }
        NodeBody::Pill => measure_pill(node, config),
    }
}

fn icon_allowance(node: &Node, config: &LayoutConfig) -> f32 {
    if node.icon.is_some() {
        config.icon_size + config.icon_gap
    } else {
        0.0
    }
}

fn measure_box(
    node: &Node,
    subtitle: Option<&str>,
    bullets: &[String],
    config: &LayoutConfig,
) -> NodeSize {
    let label_width = estimate_width(&node.label, config.char_width) + icon_allowance(node, config);
    let subtitle_width = subtitle
        .map(|s| estimate_width(s, config.char_width_small))
        .unwrap_or(0.0);
    let bullet_width = bullets
        .iter()
        .map(|b| estimate_width(b, config.char_width_small))
        .fold(0.0, f32::max);
    let bullet_width = if bullets.is_empty() {
        0.0
    } else {
        bullet_width + BULLET_INDENT
    };

    let content_width = label_width.max(subtitle_width).max(bullet_width);
    let width = content_width + config.node_padding * 2.0;

    let mut height = config.node_padding;
    height += config.line_height + 4.0;
    if subtitle.is_some() {
        height += config.line_height;
    }
    if !bullets.is_empty() {
        height += 4.0 + bullets.len() as f32 * config.line_height;
    }
    height += config.node_padding;

    NodeSize {
        width: width.max(config.box_min_width),
        height: height.max(config.box_min_height),
        child_bounds: Vec::new(),
    }
}

fn measure_container(
    node: &Node,
    bullets: &[String],
    children: &[Node],
    config: &LayoutConfig,
) -> NodeSize {
    let header = config.container_header_height;
    let title_width = estimate_width(&node.label, config.char_width_title)
        + icon_allowance(node, config)
        + config.node_padding * 2.0;

    let (bullets_height, bullets_width) = if bullets.is_empty() {
        (0.0, 0.0)
    } else {
        let widest = bullets
            .iter()
            .map(|b| estimate_width(b, config.char_width_small))
            .fold(0.0, f32::max);
        (
            4.0 + bullets.len() as f32 * config.line_height + 8.0,
            widest + config.node_padding * 2.0 + 16.0,
        )
    };

    // Children stack vertically below the header and bullets; each child is
    // measured with the box rules whatever its declared kind.
    let mut child_bounds = Vec::with_capacity(children.len());
    let mut max_child_width = 0.0f32;
    let child_x = config.node_padding + config.child_indent;
    let mut child_y = header + 4.0 + bullets_height;
    let children_top = child_y;
    for child in children {
        let (subtitle, child_bullets) = match &child.body {
            NodeBody::Box { subtitle, bullets } => (subtitle.as_deref(), bullets.as_slice()),
            _ => (None, &[] as &[String]),
        };
        let size = measure_box(child, subtitle, child_bullets, config);
        max_child_width = max_child_width.max(size.width);
        child_bounds.push((
            child.id.clone(),
            Rect {
                x: child_x,
                y: child_y,
                width: size.width,
                height: size.height,
            },
        ));
        child_y += size.height + config.child_gap;
    }
    let children_height = child_y - children_top;

    let child_column = if children.is_empty() {
        0.0
    } else {
        max_child_width + config.child_indent + config.node_padding
    };

    let width = title_width
        .max(bullets_width)
        .max(child_column + config.node_padding)
        .max(config.container_min_width);
    let height = header + 4.0 + bullets_height + children_height + config.node_padding;

    NodeSize {
        width,
        height: height.max(config.container_min_height),
        child_bounds,
    }
}

fn measure_pill(node: &Node, config: &LayoutConfig) -> NodeSize {
    let icon_width = if node.icon.is_some() {
        PILL_ICON_SIZE + config.icon_gap
    } else {
        0.0
    };
    NodeSize {
        width: estimate_width(&node.label, config.char_width) + icon_width + PILL_PAD_X,
        height: config.pill_height,
        child_bounds: Vec::new(),
    }
}
