use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::theme::Theme;

/// Geometry constants for measurement, layout, and routing. Everything the
/// engine treats as a tunable lives here so a render is a pure function of
/// (schema, theme, config).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Canvas margin on all four sides.
    pub padding: f32,
    /// Vertical gap between stacked nodes in the primary column.
    pub node_gap: f32,
    /// Vertical gap between stacked pills.
    pub pill_gap: f32,
    /// Extra horizontal gap before the pill column.
    pub pill_column_gap: f32,
    /// The pill column starts this far below the canvas padding.
    pub pill_column_drop: f32,
    /// Horizontal offset of the container column from the left margin.
    pub container_column_offset: f32,
    /// Vertical space reserved per labelled connection between containers.
    pub label_space: f32,
    /// Per-bullet line height inside a connection annotation block.
    pub annotation_line_height: f32,
    /// Fixed padding added to an annotation block's reserved space.
    pub annotation_block_pad: f32,

    /// Interior padding of box and container nodes.
    pub node_padding: f32,
    /// Line height for labels, subtitles, and node bullets.
    pub line_height: f32,
    pub icon_size: f32,
    pub icon_gap: f32,
    /// Left inset of container children relative to the container edge.
    pub child_indent: f32,
    pub child_gap: f32,
    /// Estimated glyph advance for box and pill labels.
    pub char_width: f32,
    /// Estimated glyph advance for subtitles and bullets.
    pub char_width_small: f32,
    /// Estimated glyph advance for container titles.
    pub char_width_title: f32,
    pub container_header_height: f32,
    pub box_min_width: f32,
    pub box_min_height: f32,
    pub container_min_width: f32,
    pub container_min_height: f32,
    pub pill_height: f32,

    /// Shortest allowed straight run in a routed path.
    pub min_segment_length: f32,
    pub corner_radius: f32,
    /// Cross-axis misalignment below which an opposite-side path is a
    /// straight line.
    pub straight_threshold: f32,
    /// Vertical corridors are grouped by x rounded to this bucket size.
    pub overlap_bucket: f32,
    /// Horizontal step between parallel connections in a shared corridor.
    pub overlap_step: f32,
    /// Distance of a connection label from the stroke.
    pub connection_label_offset: f32,
    /// Distance of an annotation block from the path midline.
    pub annotation_offset: f32,
    /// Line height of rendered annotation bullets.
    pub annotation_bullet_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: 60.0,
            node_gap: 40.0,
            pill_gap: 16.0,
            pill_column_gap: 40.0,
            pill_column_drop: 20.0,
            container_column_offset: 200.0,
            label_space: 30.0,
            annotation_line_height: 18.0,
            annotation_block_pad: 20.0,
            node_padding: 10.0,
            line_height: 18.0,
            icon_size: 14.0,
            icon_gap: 6.0,
            child_indent: 10.0,
            child_gap: 8.0,
            char_width: 8.0,
            char_width_small: 7.0,
            char_width_title: 9.0,
            container_header_height: 44.0,
            box_min_width: 140.0,
            box_min_height: 56.0,
            container_min_width: 200.0,
            container_min_height: 80.0,
            pill_height: 36.0,
            min_segment_length: 30.0,
            corner_radius: 12.0,
            straight_threshold: 5.0,
            overlap_bucket: 50.0,
            overlap_step: 20.0,
            connection_label_offset: 14.0,
            annotation_offset: 20.0,
            annotation_bullet_height: 16.0,
        }
    }
}

impl LayoutConfig {
    /// Minimum clearance a routed path keeps from either endpoint before
    /// bending.
    pub fn min_offset(&self) -> f32 {
        self.min_segment_length.max(self.corner_radius * 2.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// When set, canvas size comes from the layout bounds; the configured
    /// width/height apply otherwise.
    pub auto_size: bool,
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            auto_size: true,
            width: 800.0,
            height: 600.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

/// Partial override file. Absent sections and fields keep their defaults.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    theme: Option<Value>,
    layout: Option<LayoutOverrides>,
    render: Option<RenderOverrides>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOverrides {
    padding: Option<f32>,
    node_gap: Option<f32>,
    pill_gap: Option<f32>,
    container_column_offset: Option<f32>,
    node_padding: Option<f32>,
    corner_radius: Option<f32>,
    min_segment_length: Option<f32>,
    overlap_step: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderOverrides {
    auto_size: Option<bool>,
    width: Option<f32>,
    height: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)
        .or_else(|_| json5::from_str(&contents))
        .map_err(|err| anyhow::anyhow!("config file {}: {err}", path.display()))?;
    Ok(merge(parsed))
}

fn merge(parsed: ConfigFile) -> Config {
    let mut config = Config::default();

    if let Some(theme) = parsed.theme {
        config.theme = Theme::from_value(&theme);
    }
    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.padding {
            config.layout.padding = v;
        }
        if let Some(v) = layout.node_gap {
            config.layout.node_gap = v;
        }
        if let Some(v) = layout.pill_gap {
            config.layout.pill_gap = v;
        }
        if let Some(v) = layout.container_column_offset {
            config.layout.container_column_offset = v;
        }
        if let Some(v) = layout.node_padding {
            config.layout.node_padding = v;
        }
        if let Some(v) = layout.corner_radius {
            config.layout.corner_radius = v;
        }
        if let Some(v) = layout.min_segment_length {
            config.layout.min_segment_length = v;
        }
        if let Some(v) = layout.overlap_step {
            config.layout.overlap_step = v;
        }
    }
    if let Some(render) = parsed.render {
        if let Some(v) = render.auto_size {
            config.render.auto_size = v;
        }
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.layout.padding, 60.0);
        assert!(config.render.auto_size);
    }

    #[test]
    fn partial_override_merges() {
        let parsed: ConfigFile = serde_json::from_str(
            r##"{ "layout": { "nodeGap": 64 }, "theme": { "primary": "#123456" } }"##,
        )
        .unwrap();
        let config = merge(parsed);
        assert_eq!(config.layout.node_gap, 64.0);
        assert_eq!(config.layout.padding, 60.0);
        assert_eq!(config.theme.primary, "#123456");
    }

    #[test]
    fn min_offset_tracks_corner_radius() {
        let mut layout = LayoutConfig::default();
        assert_eq!(layout.min_offset(), 30.0);
        layout.corner_radius = 20.0;
        assert_eq!(layout.min_offset(), 40.0);
    }
}
