#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod icons;
pub mod layout;
pub mod parser;
pub mod render;
pub mod schema;
pub mod theme;

pub use config::{Config, LayoutConfig, RenderConfig, load_config};
pub use layout::{Layout, Routing, compute_layout, route};
pub use parser::{SchemaError, normalize, parse_schema};
pub use render::render_svg;
pub use schema::Schema;
pub use theme::Theme;

#[cfg(feature = "cli")]
pub use cli::run;
