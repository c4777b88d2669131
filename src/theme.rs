use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{ConnectionStyle, NodeBody, Variant};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTheme {
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f32,
    pub radius: f32,
    pub text: String,
    pub text_muted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTheme {
    pub stroke: String,
    pub stroke_width: f32,
    /// SVG dash pattern, or "none" for a solid stroke.
    pub dash_array: String,
    pub arrow_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyle {
    pub size: f32,
    pub weight: u32,
    pub family: String,
}

/// The complete set of named tokens the renderer reads. Passed explicitly
/// to every render call; the engine never inspects its environment and
/// never mutates a theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub background: String,
    pub primary: String,
    pub secondary: String,
    pub surface: String,
    pub surface_elevated: String,
    pub border: String,
    pub text: String,
    pub text_muted: String,

    pub node_default: NodeTheme,
    pub node_highlight: NodeTheme,
    pub node_pill: NodeTheme,

    pub connection_primary: ConnectionTheme,
    pub connection_secondary: ConnectionTheme,
    pub connection_solid: ConnectionTheme,

    pub title: TextStyle,
    pub label: TextStyle,
    pub subtitle: TextStyle,
    pub code: TextStyle,
    pub bullet: TextStyle,
    pub connection_label: TextStyle,
    pub annotation: TextStyle,
}

const FONT_TITLE: &str = "'Tiempos', Georgia, serif";
const FONT_CONTENT: &str = "'Geist', system-ui, sans-serif";
const FONT_MONO: &str = "'Montserrat', 'Fira Code', monospace";

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Dark palette matching the engine's documented hardcoded fallbacks.
    pub fn dark() -> Self {
        Self::from_palette(
            "#254bf1", "#FF3C5B", "#0a0a0a", "#141414", "#1a1a1a", "#2a2a2a", "#fefdfa", "#a0a0a0",
        )
    }

    /// Build every derived node/connection/text token from eight palette
    /// entries. Custom palettes go through here so the derived tokens stay
    /// consistent with each other.
    #[allow(clippy::too_many_arguments)]
    pub fn from_palette(
        primary: &str,
        secondary: &str,
        background: &str,
        surface: &str,
        surface_elevated: &str,
        border: &str,
        text: &str,
        text_muted: &str,
    ) -> Self {
        Self {
            background: background.to_string(),
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            surface: surface.to_string(),
            surface_elevated: surface_elevated.to_string(),
            border: border.to_string(),
            text: text.to_string(),
            text_muted: text_muted.to_string(),
            node_default: NodeTheme {
                fill: surface.to_string(),
                stroke: border.to_string(),
                stroke_width: 0.5,
                radius: 6.0,
                text: text.to_string(),
                text_muted: text_muted.to_string(),
            },
            node_highlight: NodeTheme {
                fill: surface.to_string(),
                stroke: primary.to_string(),
                stroke_width: 1.0,
                radius: 6.0,
                text: text.to_string(),
                text_muted: text_muted.to_string(),
            },
            node_pill: NodeTheme {
                fill: surface_elevated.to_string(),
                stroke: border.to_string(),
                stroke_width: 0.5,
                radius: 16.0,
                text: text.to_string(),
                text_muted: text_muted.to_string(),
            },
            connection_primary: ConnectionTheme {
                stroke: primary.to_string(),
                stroke_width: 1.0,
                dash_array: "5 3".to_string(),
                arrow_color: primary.to_string(),
            },
            connection_secondary: ConnectionTheme {
                stroke: text_muted.to_string(),
                stroke_width: 1.0,
                dash_array: "4 3".to_string(),
                arrow_color: text_muted.to_string(),
            },
            connection_solid: ConnectionTheme {
                stroke: text_muted.to_string(),
                stroke_width: 1.0,
                dash_array: "none".to_string(),
                arrow_color: text_muted.to_string(),
            },
            title: TextStyle {
                size: 12.0,
                weight: 600,
                family: FONT_TITLE.to_string(),
            },
            label: TextStyle {
                size: 11.0,
                weight: 500,
                family: FONT_CONTENT.to_string(),
            },
            subtitle: TextStyle {
                size: 9.0,
                weight: 400,
                family: FONT_CONTENT.to_string(),
            },
            code: TextStyle {
                size: 10.0,
                weight: 500,
                family: FONT_MONO.to_string(),
            },
            bullet: TextStyle {
                size: 9.0,
                weight: 400,
                family: FONT_CONTENT.to_string(),
            },
            connection_label: TextStyle {
                size: 9.0,
                weight: 500,
                family: FONT_CONTENT.to_string(),
            },
            annotation: TextStyle {
                size: 8.0,
                weight: 400,
                family: FONT_CONTENT.to_string(),
            },
        }
    }

    /// Merge named tokens from an untyped JSON object onto the defaults.
    /// Missing or non-string tokens keep their defaults; this never fails.
    pub fn from_value(value: &Value) -> Self {
        let token = |name: &str, fallback: &str| -> String {
            value
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };

        let mut theme = Self::from_palette(
            &token("primary", "#254bf1"),
            &token("secondary", "#FF3C5B"),
            &token("background", "#0a0a0a"),
            &token("surface", "#141414"),
            &token("surfaceElevated", "#1a1a1a"),
            &token("border", "#2a2a2a"),
            &token("text", "#fefdfa"),
            &token("textMuted", "#a0a0a0"),
        );

        if let Some(family) = value.get("fontTitle").and_then(Value::as_str) {
            theme.title.family = family.to_string();
        }
        if let Some(family) = value.get("fontContent").and_then(Value::as_str) {
            for style in [
                &mut theme.label,
                &mut theme.subtitle,
                &mut theme.bullet,
                &mut theme.connection_label,
                &mut theme.annotation,
            ] {
                style.family = family.to_string();
            }
        }
        if let Some(family) = value.get("fontMono").and_then(Value::as_str) {
            theme.code.family = family.to_string();
        }
        theme
    }

    /// The variant only carries visual weight on containers; boxes render
    /// with the default style regardless.
    pub fn node(&self, body: &NodeBody, variant: Variant) -> &NodeTheme {
        match body {
            NodeBody::Pill => &self.node_pill,
            NodeBody::Container { .. } if variant == Variant::Highlight => &self.node_highlight,
            _ => &self.node_default,
        }
    }

    pub fn connection(&self, style: ConnectionStyle) -> &ConnectionTheme {
        match style {
            ConnectionStyle::Primary => &self.connection_primary,
            ConnectionStyle::Secondary => &self.connection_secondary,
            ConnectionStyle::Solid => &self.connection_solid,
        }
    }
}
