use std::path::Path;

use anyhow::Result;

use crate::config::{LayoutConfig, RenderConfig};
use crate::icons;
use crate::layout::types::{Layout, Rect, Routing};
use crate::schema::{LabelStyle, Node, NodeBody, Schema, Variant, expand_repeats};
use crate::theme::{TextStyle, Theme};

/// Emit the complete SVG document for a laid-out diagram. Connections are
/// drawn before nodes so strokes and arrowheads sit behind the boxes; text
/// is never wrapped or truncated.
pub fn render_svg(
    schema: &Schema,
    layout: &Layout,
    routing: &Routing,
    theme: &Theme,
    config: &LayoutConfig,
    render_cfg: &RenderConfig,
) -> String {
    let (width, height) = if render_cfg.auto_size {
        (layout.width, layout.height)
    } else {
        (render_cfg.width, render_cfg.height)
    };

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.0} {height:.0}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    // One marker definition per style actually routed, never per instance.
    let mut used_styles = Vec::new();
    for conn in &routing.connections {
        if !used_styles.contains(&conn.style) {
            used_styles.push(conn.style);
        }
    }
    svg.push_str("<defs>");
    for style in &used_styles {
        let conn_theme = theme.connection(*style);
        svg.push_str(&format!(
            "<marker id=\"arrow-{}\" viewBox=\"0 0 10 10\" refX=\"9\" refY=\"5\" markerWidth=\"10\" markerHeight=\"10\" orient=\"auto\" markerUnits=\"userSpaceOnUse\"><path d=\"M 0 1 L 8 5 L 0 9 Z\" fill=\"{}\"/></marker>",
            style.as_str(),
            conn_theme.arrow_color
        ));
    }
    svg.push_str("</defs>");

    if let Some(title) = &schema.title {
        svg.push_str(&format!(
            "<text x=\"30\" y=\"30\" fill=\"{}\" font-size=\"18\" font-family=\"{}\" font-weight=\"600\">{}</text>",
            theme.node_default.text,
            theme.title.family,
            escape_xml(title)
        ));
    }

    svg.push_str("<g class=\"connections\">");
    for conn in &routing.connections {
        let conn_theme = theme.connection(conn.style);
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-dasharray=\"{}\" marker-end=\"url(#arrow-{})\"/>",
            conn.path,
            conn_theme.stroke,
            conn_theme.stroke_width,
            conn_theme.dash_array,
            conn.style.as_str()
        ));

        if let Some(label) = &conn.label {
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" fill=\"{}\" {} text-anchor=\"{}\" dominant-baseline=\"middle\">{}</text>",
                label.x,
                label.y,
                theme.text_muted,
                font_attrs(&theme.connection_label),
                label.anchor.as_str(),
                escape_xml(&label.text)
            ));
        }

        if let Some(annotation) = &conn.annotation {
            for (idx, bullet) in annotation.bullets.iter().enumerate() {
                svg.push_str(&format!(
                    "<text x=\"{:.2}\" y=\"{:.2}\" fill=\"{}\" {} text-anchor=\"{}\" dominant-baseline=\"middle\">\u{2022} {}</text>",
                    annotation.x,
                    annotation.y + idx as f32 * config.annotation_bullet_height,
                    theme.text_muted,
                    font_attrs(&theme.annotation),
                    annotation.anchor.as_str(),
                    escape_xml(bullet)
                ));
            }
        }
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"nodes\">");
    for node in &expand_repeats(&schema.nodes) {
        let Some(position) = layout.positions.get(&node.id) else {
            continue;
        };
        if position.parent_id.is_some() {
            continue;
        }
        let rect = position.rect();
        match &node.body {
            NodeBody::Box { subtitle, bullets } => {
                draw_box(&mut svg, node, subtitle.as_deref(), bullets, rect, theme, config);
            }
            NodeBody::Container { bullets, children } => {
                draw_container(&mut svg, node, bullets, children, rect, layout, theme, config);
            }
            NodeBody::Pill => draw_pill(&mut svg, node, rect, theme, config),
        }
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

fn font_attrs(style: &TextStyle) -> String {
    format!(
        "font-size=\"{}\" font-family=\"{}\" font-weight=\"{}\"",
        style.size, style.family, style.weight
    )
}

fn draw_icon(svg: &mut String, name: &str, x: f32, y: f32, size: f32) {
    let icon = icons::resolve(name);
    svg.push_str(&format!(
        "<g transform=\"translate({x:.2} {y:.2}) scale({:.4})\">{}</g>",
        size / icon.view_box,
        icon.body
    ));
}

fn draw_box(
    svg: &mut String,
    node: &Node,
    subtitle: Option<&str>,
    bullets: &[String],
    rect: Rect,
    theme: &Theme,
    config: &LayoutConfig,
) {
    let node_theme = theme.node(&node.body, node.variant);
    let padding = config.node_padding;
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{}\" ry=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
        rect.x,
        rect.y,
        rect.width,
        rect.height,
        node_theme.radius,
        node_theme.radius,
        node_theme.fill,
        node_theme.stroke,
        node_theme.stroke_width
    ));

    let icon_x = rect.x + padding;
    let text_x = if node.icon.is_some() {
        icon_x + config.icon_size + config.icon_gap
    } else {
        rect.x + padding
    };
    if let Some(icon) = &node.icon {
        draw_icon(svg, icon, icon_x, rect.y + padding, config.icon_size);
    }

    let label_font = match node.label_style {
        LabelStyle::Code => &theme.code,
        LabelStyle::Normal => &theme.label,
    };
    let mut current_y = rect.y + padding;
    svg.push_str(&format!(
        "<text x=\"{text_x:.2}\" y=\"{:.2}\" fill=\"{}\" {}>{}</text>",
        current_y + 14.0,
        node_theme.text,
        font_attrs(label_font),
        escape_xml(&node.label)
    ));
    current_y += config.line_height + 4.0;

    if let Some(subtitle) = subtitle {
        svg.push_str(&format!(
            "<text x=\"{text_x:.2}\" y=\"{:.2}\" fill=\"{}\" {}>{}</text>",
            current_y + 10.0,
            node_theme.text_muted,
            font_attrs(&theme.subtitle),
            escape_xml(subtitle)
        ));
        current_y += config.line_height;
    }

    let bullets_start = current_y + 4.0;
    for (idx, bullet) in bullets.iter().enumerate() {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" fill=\"{}\" {}>\u{2022} {}</text>",
            rect.x + padding,
            bullets_start + idx as f32 * config.line_height,
            node_theme.text_muted,
            font_attrs(&theme.bullet),
            escape_xml(bullet)
        ));
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_container(
    svg: &mut String,
    node: &Node,
    bullets: &[String],
    children: &[Node],
    rect: Rect,
    layout: &Layout,
    theme: &Theme,
    config: &LayoutConfig,
) {
    let node_theme = theme.node(&node.body, node.variant);
    let padding = config.node_padding;
    let header = config.container_header_height;

    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{}\" ry=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
        rect.x,
        rect.y,
        rect.width,
        rect.height,
        node_theme.radius,
        node_theme.radius,
        node_theme.fill,
        node_theme.stroke,
        node_theme.stroke_width
    ));

    // Highlighted containers get a tinted header band clipped to the
    // rounded corners.
    if node.variant == Variant::Highlight {
        let clip_id = format!("header-clip-{}", node.id);
        svg.push_str(&format!(
            "<defs><clipPath id=\"{clip_id}\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{header}\" rx=\"{}\" ry=\"{}\"/></clipPath></defs>",
            rect.x, rect.y, rect.width, node_theme.radius, node_theme.radius
        ));
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{header}\" fill=\"{}\" fill-opacity=\"0.15\" clip-path=\"url(#{clip_id})\"/>",
            rect.x, rect.y, rect.width, node_theme.stroke
        ));
    }

    let icon_x = rect.x + padding;
    let label_x = if node.icon.is_some() {
        icon_x + config.icon_size + config.icon_gap
    } else {
        rect.x + padding
    };
    if let Some(icon) = &node.icon {
        draw_icon(
            svg,
            icon,
            icon_x,
            rect.y + (header - config.icon_size) / 2.0,
            config.icon_size,
        );
    }
    svg.push_str(&format!(
        "<text x=\"{label_x:.2}\" y=\"{:.2}\" fill=\"{}\" {}>{}</text>",
        rect.y + header / 2.0 + 5.0,
        node_theme.text,
        font_attrs(&theme.title),
        escape_xml(&node.label)
    ));

    let content_y = rect.y + header + 4.0;
    for (idx, bullet) in bullets.iter().enumerate() {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" fill=\"{}\" {}>\u{2022} {}</text>",
            rect.x + padding,
            content_y + 14.0 + idx as f32 * config.line_height,
            node_theme.text_muted,
            font_attrs(&theme.bullet),
            escape_xml(bullet)
        ));
    }

    // Children draw at their registered absolute bounds, box rules.
    let child_bounds = layout.child_positions.get(&node.id);
    for child in children {
        let Some(bounds) = child_bounds.and_then(|map| map.get(&child.id)) else {
            continue;
        };
        let (subtitle, child_bullets) = match &child.body {
            NodeBody::Box { subtitle, bullets } => (subtitle.as_deref(), bullets.as_slice()),
            _ => (None, &[] as &[String]),
        };
        draw_box(svg, child, subtitle, child_bullets, *bounds, theme, config);
    }
}

fn draw_pill(svg: &mut String, node: &Node, rect: Rect, theme: &Theme, config: &LayoutConfig) {
    let node_theme = theme.node(&node.body, node.variant);
    let radius = rect.height / 2.0;
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{radius}\" ry=\"{radius}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
        rect.x, rect.y, rect.width, rect.height, node_theme.fill, node_theme.stroke, node_theme.stroke_width
    ));

    let center_y = rect.y + rect.height / 2.0;
    let icon_x = rect.x + 12.0;
    let label_x = if node.icon.is_some() {
        icon_x + 16.0 + config.icon_gap
    } else {
        rect.x + 16.0
    };
    if let Some(icon) = &node.icon {
        draw_icon(svg, icon, icon_x, center_y - 8.0, 16.0);
    }
    svg.push_str(&format!(
        "<text x=\"{label_x:.2}\" y=\"{:.2}\" fill=\"{}\" {}>{}</text>",
        center_y + 4.0,
        node_theme.text,
        font_attrs(&theme.label),
        escape_xml(&node.label)
    ));
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Geist".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .unwrap_or(usvg::Size::from_wh(800.0, 600.0).unwrap());

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::layout::{compute_layout, route};
    use crate::parser::normalize;
    use serde_json::json;

    fn render(value: serde_json::Value) -> String {
        let schema = normalize(&value).unwrap();
        let config = Config::default();
        let layout = compute_layout(&schema, &config.layout);
        let routing = route(&schema, &layout, &config.layout);
        render_svg(
            &schema,
            &layout,
            &routing,
            &config.theme,
            &config.layout,
            &config.render,
        )
    }

    #[test]
    fn renders_basic_diagram() {
        let svg = render(json!({
            "title": "Flow",
            "nodes": [
                { "id": "a", "label": "Alpha" },
                { "id": "b", "label": "Beta" },
            ],
            "connections": [{ "from": "a", "to": "b", "label": "go" }],
        }));
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Flow"));
        assert!(svg.contains("Alpha"));
        assert!(svg.contains(">go</text>"));
    }

    #[test]
    fn one_marker_per_used_style() {
        let svg = render(json!({
            "nodes": [
                { "id": "a", "label": "A" },
                { "id": "b", "label": "B" },
                { "id": "c", "label": "C" },
            ],
            "connections": [
                { "from": "a", "to": "b", "style": "primary" },
                { "from": "b", "to": "c", "style": "primary" },
                { "from": "a", "to": "c", "style": "solid" },
            ],
        }));
        assert_eq!(svg.matches("<marker id=\"arrow-primary\"").count(), 1);
        assert_eq!(svg.matches("<marker id=\"arrow-solid\"").count(), 1);
        assert!(!svg.contains("<marker id=\"arrow-secondary\""));
    }

    #[test]
    fn children_render_inside_their_container_only() {
        let svg = render(json!({
            "nodes": [
                { "id": "core", "label": "Core", "type": "container",
                  "variant": "highlight",
                  "children": [{ "id": "api", "label": "ApiChild" }] },
            ],
            "connections": [],
        }));
        assert_eq!(svg.matches("ApiChild").count(), 1);
        assert!(svg.contains("header-clip-core"));
    }

    #[test]
    fn unknown_icon_renders_fallback_glyph() {
        let svg = render(json!({
            "nodes": [
                { "id": "a", "label": "A", "icon": "totally-unknown-tool" },
            ],
            "connections": [],
        }));
        assert!(svg.contains("ellipse"));
    }

    #[test]
    fn escapes_markup_in_labels() {
        let svg = render(json!({
            "nodes": [{ "id": "a", "label": "<svc> & \"co\"" }],
            "connections": [],
        }));
        assert!(svg.contains("&lt;svc&gt; &amp; &quot;co&quot;"));
        assert!(!svg.contains("<svc>"));
    }

    #[test]
    fn fixed_size_overrides_canvas() {
        let schema = normalize(&json!({
            "nodes": [{ "id": "a", "label": "A" }],
            "connections": [],
        }))
        .unwrap();
        let mut config = Config::default();
        config.render.auto_size = false;
        config.render.width = 640.0;
        config.render.height = 480.0;
        let layout = compute_layout(&schema, &config.layout);
        let routing = route(&schema, &layout, &config.layout);
        let svg = render_svg(
            &schema,
            &layout,
            &routing,
            &config.theme,
            &config.layout,
            &config.render,
        );
        assert!(svg.contains("width=\"640\" height=\"480\""));
    }
}
