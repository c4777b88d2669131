use serde::{Deserialize, Serialize};

/// Cardinal attachment point on a node's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "top" => Some(Self::Top),
            "right" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStyle {
    Primary,
    Secondary,
    Solid,
}

impl ConnectionStyle {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            "solid" => Some(Self::Solid),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Solid => "solid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Variant {
    #[default]
    Default,
    Highlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelStyle {
    #[default]
    Normal,
    Code,
}

/// Kind-specific payload. Measurement and rendering dispatch exhaustively
/// over this, so a new node kind cannot be half-supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeBody {
    Box {
        subtitle: Option<String>,
        bullets: Vec<String>,
    },
    Container {
        bullets: Vec<String>,
        children: Vec<Node>,
    },
    Pill,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub icon: Option<String>,
    pub variant: Variant,
    pub label_style: LabelStyle,
    /// Expanded away before layout; `Some(n)` only holds n > 1.
    pub repeat: Option<u32>,
    pub body: NodeBody,
}

impl Node {
    pub fn children(&self) -> &[Node] {
        match &self.body {
            NodeBody::Container { children, .. } => children,
            _ => &[],
        }
    }

    pub fn is_highlight_container(&self) -> bool {
        matches!(self.body, NodeBody::Container { .. }) && self.variant == Variant::Highlight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub position: AnnotationSide,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    /// Always at least one entry; a bare string target normalizes to a
    /// single-element list.
    pub to: Vec<String>,
    pub label: Option<String>,
    pub style: ConnectionStyle,
    pub exit_side: Option<Side>,
    pub enter_side: Option<Side>,
    pub annotation: Option<Annotation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub title: Option<String>,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

/// Clone a node list, replacing every node carrying `repeat = n` with n
/// siblings suffixed `_1..=_n`. The original id ceases to exist. Children
/// of non-repeated containers are expanded recursively.
pub fn expand_repeats(nodes: &[Node]) -> Vec<Node> {
    let mut expanded = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node.repeat {
            Some(count) if count > 1 => {
                for i in 1..=count {
                    let mut clone = node.clone();
                    clone.id = format!("{}_{i}", node.id);
                    clone.repeat = None;
                    expanded.push(clone);
                }
            }
            _ => {
                let mut clone = node.clone();
                clone.repeat = None;
                if let NodeBody::Container { children, .. } = &mut clone.body {
                    *children = expand_repeats(node.children());
                }
                expanded.push(clone);
            }
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(id: &str) -> Node {
        Node {
            id: id.to_string(),
            label: id.to_string(),
            icon: None,
            variant: Variant::Default,
            label_style: LabelStyle::Normal,
            repeat: None,
            body: NodeBody::Box {
                subtitle: None,
                bullets: Vec::new(),
            },
        }
    }

    #[test]
    fn repeat_expands_to_suffixed_siblings() {
        let mut node = plain("worker");
        node.repeat = Some(3);
        let expanded = expand_repeats(&[node]);
        let ids: Vec<&str> = expanded.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["worker_1", "worker_2", "worker_3"]);
        assert!(expanded.iter().all(|n| n.repeat.is_none()));
    }

    #[test]
    fn repeat_of_one_is_a_plain_node() {
        let mut node = plain("solo");
        node.repeat = Some(1);
        let expanded = expand_repeats(&[node]);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].id, "solo");
    }

    #[test]
    fn container_children_expand_recursively() {
        let mut child = plain("svc");
        child.repeat = Some(2);
        let container = Node {
            id: "group".to_string(),
            label: "Group".to_string(),
            icon: None,
            variant: Variant::Highlight,
            label_style: LabelStyle::Normal,
            repeat: None,
            body: NodeBody::Container {
                bullets: Vec::new(),
                children: vec![child],
            },
        };
        let expanded = expand_repeats(&[container]);
        let child_ids: Vec<&str> =
            expanded[0].children().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(child_ids, ["svc_1", "svc_2"]);
    }
}
