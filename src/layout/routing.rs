use log::{debug, warn};

use crate::config::LayoutConfig;
use crate::parser::{collect_node_ids, resolve_connection_targets};
use crate::schema::{Annotation, AnnotationSide, ConnectionStyle, Schema, Side};

use super::find_position;
use super::types::{
    AnnotationPlacement, LabelPlacement, Layout, Point, Rect, RoutedConnection, Routing,
    TextAnchor,
};

/// Hysteresis factor: one axis must dominate the other by this ratio before
/// the relationship counts as clearly horizontal or vertical.
const SIDE_PREF_RATIO: f32 = 1.2;
/// Segments shorter than this collapse to a hard corner instead of a
/// degenerate arc.
const MIN_ARC_SEGMENT: f32 = 2.0;

/// Pick exit and enter sides from the relative position of two boxes.
/// Explicit overrides win per end; diagonal ties break toward the axis with
/// strictly greater distance.
pub fn determine_sides(
    from: Rect,
    to: Rect,
    exit_override: Option<Side>,
    enter_override: Option<Side>,
) -> (Side, Side) {
    if let (Some(exit), Some(enter)) = (exit_override, enter_override) {
        return (exit, enter);
    }

    let from_center = from.center();
    let to_center = to.center();
    let dx = to_center.x - from_center.x;
    let dy = to_center.y - from_center.y;

    let horizontal = |dx: f32| -> (Side, Side) {
        if dx > 0.0 {
            (Side::Right, Side::Left)
        } else {
            (Side::Left, Side::Right)
        }
    };
    let vertical = |dy: f32| -> (Side, Side) {
        if dy > 0.0 {
            (Side::Bottom, Side::Top)
        } else {
            (Side::Top, Side::Bottom)
        }
    };

    let (exit, enter) = if dx.abs() > dy.abs() * SIDE_PREF_RATIO {
        horizontal(dx)
    } else if dy.abs() > dx.abs() * SIDE_PREF_RATIO {
        vertical(dy)
    } else if dx.abs() >= dy.abs() {
        horizontal(dx)
    } else {
        vertical(dy)
    };

    (exit_override.unwrap_or(exit), enter_override.unwrap_or(enter))
}

fn point(x: f32, y: f32) -> Point {
    Point { x, y }
}

/// Rounded corner between two segments. The radius is clamped to half the
/// shorter adjoining segment; below [`MIN_ARC_SEGMENT`] the corner goes
/// sharp rather than emitting a degenerate arc.
fn rounded_corner(current: Point, corner: Point, next: Point, radius: f32) -> String {
    let v1 = point(current.x - corner.x, current.y - corner.y);
    let v2 = point(next.x - corner.x, next.y - corner.y);
    let len1 = (v1.x * v1.x + v1.y * v1.y).sqrt();
    let len2 = (v2.x * v2.x + v2.y * v2.y).sqrt();

    let effective = radius.min(len1 / 2.0).min(len2 / 2.0);
    if effective < MIN_ARC_SEGMENT || len1 == 0.0 || len2 == 0.0 {
        return format!("L {:.2} {:.2}", corner.x, corner.y);
    }

    let start_x = corner.x + v1.x / len1 * effective;
    let start_y = corner.y + v1.y / len1 * effective;
    let end_x = corner.x + v2.x / len2 * effective;
    let end_y = corner.y + v2.y / len2 * effective;
    format!(
        "L {start_x:.2} {start_y:.2} Q {:.2} {:.2} {end_x:.2} {end_y:.2}",
        corner.x, corner.y
    )
}

/// Build the SVG path for one connection between two anchor points, keyed
/// on the (exit, enter) side pair.
pub fn curved_path(
    from: Point,
    to: Point,
    exit_side: Side,
    enter_side: Side,
    config: &LayoutConfig,
) -> String {
    let radius = config.corner_radius;
    let min_offset = config.min_offset();
    let mut segments = vec![format!("M {:.2} {:.2}", from.x, from.y)];
    let line_to_end = format!("L {:.2} {:.2}", to.x, to.y);

    // Same side on both ends: loop around via three rounded corners.
    if exit_side == enter_side {
        let waypoints = if exit_side.is_horizontal() {
            let sign = if exit_side == Side::Right { 1.0 } else { -1.0 };
            let mid_x = from.x.max(to.x) + min_offset * sign;
            [
                point(from.x + min_offset * sign, from.y),
                point(mid_x, from.y),
                point(mid_x, to.y),
                point(to.x + min_offset * sign, to.y),
            ]
        } else {
            let sign = if exit_side == Side::Bottom { 1.0 } else { -1.0 };
            let mid_y = from.y.max(to.y) + min_offset * sign;
            [
                point(from.x, from.y + min_offset * sign),
                point(from.x, mid_y),
                point(to.x, mid_y),
                point(to.x, to.y + min_offset * sign),
            ]
        };
        segments.push(rounded_corner(from, waypoints[0], waypoints[1], radius));
        segments.push(rounded_corner(waypoints[0], waypoints[1], waypoints[2], radius));
        segments.push(rounded_corner(waypoints[1], waypoints[2], waypoints[3], radius));
        segments.push(line_to_end);
        return segments.join(" ");
    }

    let dx = to.x - from.x;
    let dy = to.y - from.y;

    match (exit_side, enter_side) {
        // Opposite horizontal sides: straight when nearly aligned, else a
        // two-corner bend through a midline clear of both endpoints.
        (Side::Right, Side::Left) | (Side::Left, Side::Right) => {
            if dy.abs() < config.straight_threshold {
                segments.push(line_to_end);
            } else {
                let mid_x = if exit_side == Side::Right {
                    (from.x + min_offset)
                        .max(to.x - min_offset)
                        .max((from.x + to.x) / 2.0)
                } else {
                    (from.x - min_offset)
                        .min(to.x + min_offset)
                        .min((from.x + to.x) / 2.0)
                };
                let corner1 = point(mid_x, from.y);
                let corner2 = point(mid_x, to.y);
                segments.push(rounded_corner(from, corner1, corner2, radius));
                segments.push(rounded_corner(corner1, corner2, to, radius));
                segments.push(line_to_end);
            }
        }
        // Opposite vertical sides.
        (Side::Bottom, Side::Top) | (Side::Top, Side::Bottom) => {
            if dx.abs() < config.straight_threshold {
                segments.push(line_to_end);
            } else {
                let mid_y = if exit_side == Side::Bottom {
                    (from.y + min_offset)
                        .max(to.y - min_offset)
                        .max((from.y + to.y) / 2.0)
                } else {
                    (from.y - min_offset)
                        .min(to.y + min_offset)
                        .min((from.y + to.y) / 2.0)
                };
                let corner1 = point(from.x, mid_y);
                let corner2 = point(to.x, mid_y);
                segments.push(rounded_corner(from, corner1, corner2, radius));
                segments.push(rounded_corner(corner1, corner2, to, radius));
                segments.push(line_to_end);
            }
        }
        // Perpendicular pairs: one rounded corner, with a three-corner
        // dogleg when the direct corner would sit too close to an endpoint.
        (Side::Right, Side::Top) => {
            if dx < min_offset {
                let mid_x = from.x + min_offset;
                push_dogleg(
                    &mut segments,
                    from,
                    to,
                    point(mid_x, from.y),
                    point(mid_x, to.y - min_offset),
                    point(to.x, to.y - min_offset),
                    radius,
                );
            } else {
                segments.push(rounded_corner(from, point(to.x, from.y), to, radius));
            }
            segments.push(line_to_end);
        }
        (Side::Right, Side::Bottom) => {
            if dx < min_offset || -dy < min_offset {
                let mid_x = from.x + min_offset;
                push_dogleg(
                    &mut segments,
                    from,
                    to,
                    point(mid_x, from.y),
                    point(mid_x, to.y + min_offset),
                    point(to.x, to.y + min_offset),
                    radius,
                );
            } else {
                segments.push(rounded_corner(from, point(to.x, from.y), to, radius));
            }
            segments.push(line_to_end);
        }
        (Side::Left, Side::Top) => {
            if -dx < min_offset {
                let mid_x = from.x - min_offset;
                push_dogleg(
                    &mut segments,
                    from,
                    to,
                    point(mid_x, from.y),
                    point(mid_x, to.y - min_offset),
                    point(to.x, to.y - min_offset),
                    radius,
                );
            } else {
                segments.push(rounded_corner(from, point(to.x, from.y), to, radius));
            }
            segments.push(line_to_end);
        }
        (Side::Left, Side::Bottom) => {
            segments.push(rounded_corner(from, point(to.x, from.y), to, radius));
            segments.push(line_to_end);
        }
        (Side::Bottom, Side::Left) => {
            if dy < min_offset {
                let mid_y = from.y + min_offset;
                push_dogleg(
                    &mut segments,
                    from,
                    to,
                    point(from.x, mid_y),
                    point(to.x - min_offset, mid_y),
                    point(to.x - min_offset, to.y),
                    radius,
                );
            } else {
                segments.push(rounded_corner(from, point(from.x, to.y), to, radius));
            }
            segments.push(line_to_end);
        }
        (Side::Bottom, Side::Right) | (Side::Top, Side::Left) | (Side::Top, Side::Right) => {
            segments.push(rounded_corner(from, point(from.x, to.y), to, radius));
            segments.push(line_to_end);
        }
        // Unreachable with the side pairs above all handled, kept as the
        // documented S-curve fallback for any future side pair.
        _ => {
            let (cp1, cp2) = if exit_side.is_horizontal() {
                let offset_x = if exit_side == Side::Right {
                    min_offset
                } else {
                    -min_offset
                };
                let enter_offset = if enter_side == Side::Left {
                    min_offset
                } else {
                    -min_offset
                };
                (
                    point(from.x + offset_x, from.y),
                    point(to.x - enter_offset, to.y),
                )
            } else {
                let offset_y = if exit_side == Side::Bottom {
                    min_offset
                } else {
                    -min_offset
                };
                let enter_offset = if enter_side == Side::Top {
                    min_offset
                } else {
                    -min_offset
                };
                (
                    point(from.x, from.y + offset_y),
                    point(to.x, to.y - enter_offset),
                )
            };
            segments.push(format!(
                "C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                cp1.x, cp1.y, cp2.x, cp2.y, to.x, to.y
            ));
        }
    }

    segments.join(" ")
}

fn push_dogleg(
    segments: &mut Vec<String>,
    from: Point,
    to: Point,
    corner1: Point,
    corner2: Point,
    corner3: Point,
    radius: f32,
) {
    segments.push(rounded_corner(from, corner1, corner2, radius));
    segments.push(rounded_corner(corner1, corner2, corner3, radius));
    segments.push(rounded_corner(corner2, corner3, to, radius));
}

struct PendingConnection {
    from_id: String,
    to_id: String,
    from: Point,
    to: Point,
    exit_side: Side,
    enter_side: Side,
    style: ConnectionStyle,
    label: Option<String>,
    annotation: Option<Annotation>,
}

impl PendingConnection {
    fn is_vertical_corridor(&self) -> bool {
        matches!(
            (self.exit_side, self.enter_side),
            (Side::Bottom, Side::Top) | (Side::Top, Side::Bottom)
        )
    }
}

/// Route every schema connection against computed positions. Fan-out
/// expands to one entry per resolved (from, target) pair; pairs whose
/// endpoints never resolve are counted, not drawn.
pub fn route(schema: &Schema, layout: &Layout, config: &LayoutConfig) -> Routing {
    let known = collect_node_ids(&schema.nodes);
    let mut pending = Vec::new();
    let mut unresolved = 0usize;

    for connection in &schema.connections {
        let Some(from_position) = find_position(&connection.from, &layout.positions) else {
            warn!(
                "connection source {} has no position; dropping {} target(s)",
                connection.from,
                connection.to.len()
            );
            unresolved += connection.to.len();
            continue;
        };
        let from_rect = from_position.rect();

        let targets = resolve_connection_targets(&connection.to, &known);
        let resolved: Vec<(String, Rect)> = targets
            .into_iter()
            .filter_map(|target| {
                match find_position(&target, &layout.positions) {
                    Some(position) => Some((target, position.rect())),
                    None => {
                        warn!(
                            "connection target {target} from {} has no position; skipped",
                            connection.from
                        );
                        unresolved += 1;
                        None
                    }
                }
            })
            .collect();

        let last = resolved.len().saturating_sub(1);
        for (index, (target, to_rect)) in resolved.into_iter().enumerate() {
            let (exit_side, enter_side) = determine_sides(
                from_rect,
                to_rect,
                connection.exit_side,
                connection.enter_side,
            );
            pending.push(PendingConnection {
                from_id: connection.from.clone(),
                to_id: target,
                from: from_rect.anchor(exit_side),
                to: to_rect.anchor(enter_side),
                exit_side,
                enter_side,
                style: connection.style,
                // Label rides the first resolved target, annotation the
                // last; fan-out siblings share only the stroke style.
                label: if index == 0 { connection.label.clone() } else { None },
                annotation: if index == last {
                    connection.annotation.clone()
                } else {
                    None
                },
            });
        }
    }

    offset_overlapping(&mut pending, config);

    let connections = pending
        .into_iter()
        .map(|conn| finish(conn, config))
        .collect::<Vec<_>>();
    debug!(
        "routed {} connections, {} unresolved endpoint(s)",
        connections.len(),
        unresolved
    );

    Routing {
        connections,
        unresolved,
    }
}

/// Spread strictly-vertical connections sharing an x corridor so parallel
/// lines never coincide. Corridors are x buckets rounded to the nearest
/// `overlap_bucket`; members spread symmetrically around the original x.
fn offset_overlapping(pending: &mut [PendingConnection], config: &LayoutConfig) {
    use std::collections::BTreeMap;

    let mut corridors: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (index, conn) in pending.iter().enumerate() {
        if conn.is_vertical_corridor() {
            let bucket = (conn.from.x / config.overlap_bucket).round() as i64;
            corridors.entry(bucket).or_default().push(index);
        }
    }

    for members in corridors.values() {
        if members.len() < 2 {
            continue;
        }
        let total = (members.len() - 1) as f32 * config.overlap_step;
        let start = -total / 2.0;
        for (slot, index) in members.iter().enumerate() {
            let offset = start + slot as f32 * config.overlap_step;
            let conn = &mut pending[*index];
            conn.from.x += offset;
            conn.to.x += offset;
        }
    }
}

fn finish(conn: PendingConnection, config: &LayoutConfig) -> RoutedConnection {
    let path = curved_path(conn.from, conn.to, conn.exit_side, conn.enter_side, config);
    let label = conn
        .label
        .as_ref()
        .map(|text| label_placement(text, conn.from, conn.to, conn.exit_side, config));
    let annotation = conn
        .annotation
        .as_ref()
        .map(|annotation| annotation_placement(annotation, conn.from, conn.to, conn.enter_side, config));

    RoutedConnection {
        from_id: conn.from_id,
        to_id: conn.to_id,
        from: conn.from,
        to: conn.to,
        exit_side: conn.exit_side,
        enter_side: conn.enter_side,
        style: conn.style,
        path,
        label,
        annotation,
    }
}

/// Labels center along the path: above the line for horizontal runs, left
/// of the line (right-aligned) for vertical runs so text never crosses the
/// stroke.
fn label_placement(
    text: &str,
    from: Point,
    to: Point,
    exit_side: Side,
    config: &LayoutConfig,
) -> LabelPlacement {
    if exit_side.is_horizontal() {
        LabelPlacement {
            text: text.to_string(),
            x: (from.x + to.x) / 2.0,
            y: from.y - config.connection_label_offset,
            anchor: TextAnchor::Middle,
        }
    } else {
        LabelPlacement {
            text: text.to_string(),
            x: from.x - config.connection_label_offset,
            y: (from.y + to.y) / 2.0,
            anchor: TextAnchor::End,
        }
    }
}

/// Annotation blocks center along the dominant axis and sit on the caller's
/// side, vertically centered against the bullet block height.
fn annotation_placement(
    annotation: &Annotation,
    from: Point,
    to: Point,
    enter_side: Side,
    config: &LayoutConfig,
) -> AnnotationPlacement {
    let mid_x = (from.x + to.x) / 2.0;
    let mid_y = (from.y + to.y) / 2.0;
    let block_height = annotation.bullets.len() as f32 * config.annotation_bullet_height;

    let (x, y) = if !enter_side.is_horizontal() {
        let x = match annotation.position {
            AnnotationSide::Right => mid_x + config.annotation_offset,
            AnnotationSide::Left => mid_x - config.annotation_offset,
        };
        (x, mid_y - block_height / 2.0 + 8.0)
    } else {
        match annotation.position {
            AnnotationSide::Right => (mid_x, mid_y + config.annotation_offset),
            AnnotationSide::Left => (mid_x, mid_y - config.annotation_offset - block_height),
        }
    };

    AnnotationPlacement {
        bullets: annotation.bullets.clone(),
        x,
        y,
        anchor: match annotation.position {
            AnnotationSide::Right => TextAnchor::Start,
            AnnotationSide::Left => TextAnchor::End,
        },
        position: annotation.position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_layout;
    use crate::parser::normalize;
    use serde_json::json;

    fn rect(x: f32, y: f32) -> Rect {
        Rect {
            x,
            y,
            width: 100.0,
            height: 50.0,
        }
    }

    #[test]
    fn side_inference_is_symmetric() {
        let a = rect(0.0, 0.0);
        let b = rect(300.0, 0.0);
        assert_eq!(determine_sides(a, b, None, None), (Side::Right, Side::Left));
        assert_eq!(determine_sides(b, a, None, None), (Side::Left, Side::Right));

        let below = rect(0.0, 300.0);
        assert_eq!(determine_sides(a, below, None, None), (Side::Bottom, Side::Top));
        assert_eq!(determine_sides(below, a, None, None), (Side::Top, Side::Bottom));
    }

    #[test]
    fn diagonal_breaks_toward_longer_axis() {
        let a = rect(0.0, 0.0);
        let b = rect(120.0, 100.0);
        // dx 120, dy 100: neither clears the 1.2 ratio, x wins on distance.
        assert_eq!(determine_sides(a, b, None, None), (Side::Right, Side::Left));
        let c = rect(100.0, 120.0);
        assert_eq!(determine_sides(a, c, None, None), (Side::Bottom, Side::Top));
    }

    #[test]
    fn explicit_overrides_win() {
        let a = rect(0.0, 0.0);
        let b = rect(300.0, 0.0);
        assert_eq!(
            determine_sides(a, b, Some(Side::Top), Some(Side::Bottom)),
            (Side::Top, Side::Bottom)
        );
        // A single override replaces only its own end.
        assert_eq!(
            determine_sides(a, b, Some(Side::Bottom), None),
            (Side::Bottom, Side::Left)
        );
    }

    #[test]
    fn aligned_opposite_sides_go_straight() {
        let config = LayoutConfig::default();
        let path = curved_path(
            point(10.0, 100.0),
            point(200.0, 102.0),
            Side::Right,
            Side::Left,
            &config,
        );
        assert_eq!(path, "M 10.00 100.00 L 200.00 102.00");
        assert!(!path.contains('Q'));
    }

    #[test]
    fn misaligned_opposite_sides_bend_twice() {
        let config = LayoutConfig::default();
        let path = curved_path(
            point(10.0, 100.0),
            point(300.0, 220.0),
            Side::Right,
            Side::Left,
            &config,
        );
        assert_eq!(path.matches('Q').count(), 2);
    }

    #[test]
    fn same_side_loops_around_the_nodes() {
        let config = LayoutConfig::default();
        let path = curved_path(
            point(100.0, 50.0),
            point(200.0, 200.0),
            Side::Right,
            Side::Right,
            &config,
        );
        // Detour runs out to max(x) + min_offset; one of the three corners
        // always degenerates to a hard bend because its segment is empty.
        assert!(path.contains("230.00"));
        assert_eq!(path.matches('Q').count(), 2);
        assert!(path.ends_with("L 200.00 200.00"));
    }

    #[test]
    fn tight_perpendicular_pair_inserts_dogleg() {
        let config = LayoutConfig::default();
        // Target barely to the right: direct corner would hug the source.
        let tight = curved_path(
            point(100.0, 100.0),
            point(110.0, 200.0),
            Side::Right,
            Side::Top,
            &config,
        );
        assert_eq!(tight.matches('Q').count(), 3);

        let roomy = curved_path(
            point(100.0, 100.0),
            point(300.0, 200.0),
            Side::Right,
            Side::Top,
            &config,
        );
        assert_eq!(roomy.matches('Q').count(), 1);
    }

    #[test]
    fn degenerate_corner_collapses_to_line() {
        let config = LayoutConfig::default();
        // Left→Bottom takes the plain-corner branch; endpoints one pixel
        // apart leave both adjoining segments under the arc threshold.
        let path = curved_path(
            point(0.0, 0.0),
            point(1.0, 1.0),
            Side::Left,
            Side::Bottom,
            &config,
        );
        assert!(!path.contains('Q'));
        assert_eq!(path, "M 0.00 0.00 L 1.00 0.00 L 1.00 1.00");
    }

    fn routed_fixture(connections: serde_json::Value) -> (Routing, Layout) {
        let schema = normalize(&json!({
            "nodes": [
                { "id": "top", "label": "Top" },
                { "id": "mid", "label": "Mid" },
                { "id": "bottom", "label": "Bottom" },
                { "id": "side", "label": "Side" },
            ],
            "connections": connections,
        }))
        .unwrap();
        let config = LayoutConfig::default();
        let layout = compute_layout(&schema, &config);
        let routing = route(&schema, &layout, &config);
        (routing, layout)
    }

    #[test]
    fn overlapping_vertical_corridor_spreads_symmetrically() {
        let (routing, _) = routed_fixture(json!([
            { "from": "top", "to": "mid" },
            { "from": "mid", "to": "bottom" },
            { "from": "top", "to": "bottom" },
        ]));
        // All three run down the same primary column.
        let xs: Vec<f32> = routing.connections.iter().map(|c| c.from.x).collect();
        assert_eq!(xs.len(), 3);
        let mut sorted = xs.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!(sorted.windows(2).all(|w| w[1] - w[0] == 20.0));
        let center = sorted[1];
        assert_eq!(sorted[0], center - 20.0);
        assert_eq!(sorted[2], center + 20.0);
    }

    #[test]
    fn unresolved_targets_are_counted_and_excluded() {
        let (routing, _) = routed_fixture(json!([
            { "from": "top", "to": ["mid", "ghost"] },
            { "from": "phantom", "to": "bottom" },
        ]));
        assert_eq!(routing.connections.len(), 1);
        assert_eq!(routing.unresolved, 2);
    }

    #[test]
    fn fan_out_label_first_annotation_last() {
        let (routing, _) = routed_fixture(json!([
            { "from": "top", "to": ["ghost", "mid", "bottom"], "label": "fan",
              "annotation": { "position": "right", "bullets": ["note"] } },
        ]));
        assert_eq!(routing.connections.len(), 2);
        assert_eq!(routing.unresolved, 1);
        // Label lands on the first pair that actually resolved.
        assert!(routing.connections[0].label.is_some());
        assert!(routing.connections[0].annotation.is_none());
        assert!(routing.connections[1].label.is_none());
        assert!(routing.connections[1].annotation.is_some());
    }

    #[test]
    fn vertical_label_sits_left_of_the_stroke() {
        let (routing, _) = routed_fixture(json!([
            { "from": "top", "to": "mid", "label": "down" },
        ]));
        let conn = &routing.connections[0];
        let label = conn.label.as_ref().unwrap();
        assert_eq!(label.anchor, TextAnchor::End);
        assert!(label.x < conn.from.x);
        assert_eq!(label.y, (conn.from.y + conn.to.y) / 2.0);
    }

    #[test]
    fn routing_is_deterministic() {
        let (first, _) = routed_fixture(json!([
            { "from": "top", "to": ["mid", "bottom"] },
            { "from": "mid", "to": "bottom", "style": "primary" },
        ]));
        let (second, _) = routed_fixture(json!([
            { "from": "top", "to": ["mid", "bottom"] },
            { "from": "mid", "to": "bottom", "style": "primary" },
        ]));
        let paths = |routing: &Routing| {
            routing
                .connections
                .iter()
                .map(|c| c.path.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(paths(&first), paths(&second));
    }
}
