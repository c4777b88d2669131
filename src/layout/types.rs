use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{AnnotationSide, ConnectionStyle, Side};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// The edge-midpoint where a connection attaches for a given side.
    pub fn anchor(&self, side: Side) -> Point {
        match side {
            Side::Top => Point {
                x: self.x + self.width / 2.0,
                y: self.y,
            },
            Side::Right => Point {
                x: self.x + self.width,
                y: self.y + self.height / 2.0,
            },
            Side::Bottom => Point {
                x: self.x + self.width / 2.0,
                y: self.y + self.height,
            },
            Side::Left => Point {
                x: self.x,
                y: self.y + self.height / 2.0,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePosition {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Set on container children; such positions are never walked as
    /// top-level render roots.
    pub parent_id: Option<String>,
}

impl NodePosition {
    pub fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Measured size of a single node before placement. Container children come
/// back positioned relative to the container origin.
#[derive(Debug, Clone)]
pub struct NodeSize {
    pub width: f32,
    pub height: f32,
    pub child_bounds: Vec<(String, Rect)>,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub positions: BTreeMap<String, NodePosition>,
    /// Absolute child bounds per container id, for the renderer's
    /// container-draws-its-children pass.
    pub child_positions: BTreeMap<String, BTreeMap<String, Rect>>,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelPlacement {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub anchor: TextAnchor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationPlacement {
    pub bullets: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub anchor: TextAnchor,
    pub position: AnnotationSide,
}

/// One routed (from, target) pair, path already offset and rendered to an
/// SVG path string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedConnection {
    pub from_id: String,
    pub to_id: String,
    pub from: Point,
    pub to: Point,
    pub exit_side: Side,
    pub enter_side: Side,
    pub style: ConnectionStyle,
    pub path: String,
    pub label: Option<LabelPlacement>,
    pub annotation: Option<AnnotationPlacement>,
}

#[derive(Debug, Clone, Default)]
pub struct Routing {
    pub connections: Vec<RoutedConnection>,
    /// (from, target) pairs dropped because an endpoint never resolved to a
    /// position. Missing edges, not errors.
    pub unresolved: usize,
}
