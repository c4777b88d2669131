use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::config::load_config;
use crate::layout::{compute_layout, route};
use crate::parser::parse_schema;
use crate::render::{render_svg, write_output_svg};

#[derive(Parser, Debug)]
#[command(name = "archwire", version, about = "Architecture diagram layout and SVG renderer")]
pub struct Args {
    /// Input schema file (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme tokens and layout overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Fixed canvas width; disables auto-sizing
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Fixed canvas height; disables auto-sizing
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if args.width.is_some() || args.height.is_some() {
        config.render.auto_size = false;
        if let Some(width) = args.width {
            config.render.width = width;
        }
        if let Some(height) = args.height {
            config.render.height = height;
        }
    }

    let input = read_input(args.input.as_deref())?;
    let schema = parse_schema(&input)?;
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

    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        #[cfg(feature = "png")]
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            crate::render::write_output_png(&svg, &output, &config.render)?;
        }
        #[cfg(not(feature = "png"))]
        OutputFormat::Png => {
            return Err(anyhow::anyhow!(
                "PNG output requires the 'png' feature"
            ));
        }
    }

    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return Ok(std::fs::read_to_string(path)?);
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(feature = "png")]
fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
