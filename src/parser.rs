use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;

use crate::schema::{
    Annotation, AnnotationSide, Connection, ConnectionStyle, LabelStyle, Node, NodeBody, Schema,
    Side, Variant,
};

/// Structural problems that abort the render. Anything not listed here is
/// normalized to a default instead of rejected, so hand-authored schemas
/// degrade gracefully over a typo.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("diagram must have a nodes array")]
    MissingNodes,
    #[error("diagram must have a connections array")]
    MissingConnections,
    #[error("node must have a string id")]
    NodeMissingId,
    #[error("node {0} must have a string label")]
    NodeMissingLabel(String),
    #[error("connection must have a from string")]
    ConnectionMissingFrom,
    #[error("connection from {0} must have a to target")]
    ConnectionMissingTo(String),
    #[error("input is not valid JSON or JSON5")]
    InvalidDocument,
}

/// Parse a schema document. Strict JSON is tried first, then JSON5 for
/// hand-authored inputs with comments or trailing commas.
pub fn parse_schema(input: &str) -> Result<Schema, SchemaError> {
    let value = serde_json::from_str::<Value>(input)
        .or_else(|_| json5::from_str::<Value>(input))
        .map_err(|_| SchemaError::InvalidDocument)?;
    normalize(&value)
}

/// Validate and normalize an untyped value into a [`Schema`]. Accepts both
/// `{ "diagram": {...} }` and a bare schema object at the root.
pub fn normalize(raw: &Value) -> Result<Schema, SchemaError> {
    let root = raw.get("diagram").unwrap_or(raw);

    let nodes = root
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or(SchemaError::MissingNodes)?;
    let connections = root
        .get("connections")
        .and_then(Value::as_array)
        .ok_or(SchemaError::MissingConnections)?;

    let nodes = nodes
        .iter()
        .map(normalize_node)
        .collect::<Result<Vec<_>, _>>()?;
    let connections = connections
        .iter()
        .map(normalize_connection)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Schema {
        title: root
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string),
        nodes,
        connections,
    })
}

fn normalize_node(value: &Value) -> Result<Node, SchemaError> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or(SchemaError::NodeMissingId)?
        .to_string();
    let label = value
        .get("label")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::NodeMissingLabel(id.clone()))?
        .to_string();

    let bullets = string_list(value.get("bullets"));

    // Unknown kind tokens fall back to a plain box; children only carry
    // meaning on containers and are dropped everywhere else.
    let body = match value.get("type").and_then(Value::as_str) {
        Some("container") => {
            let children = value
                .get("children")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .map(normalize_node)
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?
                .unwrap_or_default();
            NodeBody::Container { bullets, children }
        }
        Some("pill") => NodeBody::Pill,
        _ => NodeBody::Box {
            subtitle: value
                .get("subtitle")
                .and_then(Value::as_str)
                .map(str::to_string),
            bullets,
        },
    };

    let variant = match value.get("variant").and_then(Value::as_str) {
        Some("highlight") => Variant::Highlight,
        _ => Variant::Default,
    };
    let label_style = match value.get("labelStyle").and_then(Value::as_str) {
        Some("code") => LabelStyle::Code,
        _ => LabelStyle::Normal,
    };
    let repeat = value
        .get("repeat")
        .and_then(Value::as_u64)
        .filter(|count| *count > 1)
        .map(|count| count as u32);

    Ok(Node {
        id,
        label,
        icon: value.get("icon").and_then(Value::as_str).map(str::to_string),
        variant,
        label_style,
        repeat,
        body,
    })
}

fn normalize_connection(value: &Value) -> Result<Connection, SchemaError> {
    let from = value
        .get("from")
        .and_then(Value::as_str)
        .ok_or(SchemaError::ConnectionMissingFrom)?
        .to_string();

    let to = match value.get("to") {
        Some(Value::String(target)) => vec![target.clone()],
        Some(Value::Array(targets)) => {
            let ids: Vec<String> = targets
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            if ids.is_empty() {
                return Err(SchemaError::ConnectionMissingTo(from));
            }
            ids
        }
        _ => return Err(SchemaError::ConnectionMissingTo(from)),
    };

    let style = value
        .get("style")
        .and_then(Value::as_str)
        .and_then(ConnectionStyle::from_token)
        .unwrap_or(ConnectionStyle::Secondary);

    Ok(Connection {
        from,
        to,
        label: value
            .get("label")
            .and_then(Value::as_str)
            .map(str::to_string),
        style,
        exit_side: value
            .get("exitSide")
            .and_then(Value::as_str)
            .and_then(Side::from_token),
        enter_side: value
            .get("enterSide")
            .and_then(Value::as_str)
            .and_then(Side::from_token),
        annotation: value.get("annotation").and_then(normalize_annotation),
    })
}

fn normalize_annotation(value: &Value) -> Option<Annotation> {
    let bullets = string_list(value.get("bullets"));
    if bullets.is_empty() {
        return None;
    }
    let position = match value.get("position").and_then(Value::as_str) {
        Some("left") => AnnotationSide::Left,
        _ => AnnotationSide::Right,
    };
    Some(Annotation { position, bullets })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Every id a connection may legally target: top-level nodes with the
/// repeat suffix rule applied, plus container children at any depth.
pub fn collect_node_ids(nodes: &[Node]) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    collect_into(nodes, &mut ids);
    ids
}

fn collect_into(nodes: &[Node], ids: &mut BTreeSet<String>) {
    for node in nodes {
        match node.repeat {
            Some(count) if count > 1 => {
                for i in 1..=count {
                    ids.insert(format!("{}_{i}", node.id));
                }
            }
            _ => {
                ids.insert(node.id.clone());
            }
        }
        collect_into(node.children(), ids);
    }
}

/// Map raw connection targets onto known ids. A dotted target retries the
/// segment after the last `.` once; this is a flat lookup on purpose and
/// does not walk nested containers. Unknown targets pass through unchanged
/// so the router can skip (and count) them.
pub fn resolve_connection_targets(to: &[String], known: &BTreeSet<String>) -> Vec<String> {
    to.iter()
        .map(|target| {
            if known.contains(target) {
                return target.clone();
            }
            if let Some((_, tail)) = target.rsplit_once('.') {
                if known.contains(tail) {
                    return tail.to_string();
                }
            }
            target.clone()
        })
        .collect()
}
