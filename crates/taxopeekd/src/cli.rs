use std::ffi::OsStr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use taxopeek_config::SourceProviderKind;
use taxopeek_core::{AnchorRect, PopupSize, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid log format '{other}', expected one of: text, json"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid output format '{other}', expected one of: table, json"
            )),
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Hover previews for scientific names")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Workspace root holding .taxopeek/config.toml"
    )]
    pub workspace: PathBuf,

    #[arg(
        long,
        global = true,
        default_value = "text",
        value_parser = parse_log_format,
        help = "Log format on stderr: text or json"
    )]
    pub log_format: LogFormat,

    #[arg(
        long,
        global = true,
        value_parser = parse_provider,
        help = "Source provider override: http or mock"
    )]
    pub provider: Option<SourceProviderKind>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the fallback chain once and print the popup content.
    Resolve(ResolveArgs),
    /// Extract the preview snippet from an article markup file.
    Extract(ExtractArgs),
    /// Compute a popup position.
    Place(PlaceArgs),
    /// Drive a hover session over JSON lines on stdin/stdout.
    Serve,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ResolveArgs {
    #[arg(help = "Scientific name to resolve")]
    pub subject: String,

    #[arg(
        long,
        default_value = "table",
        value_parser = parse_output_format,
        help = "Output format: table or json"
    )]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ExtractArgs {
    #[arg(help = "File containing rendered article markup")]
    pub file: PathBuf,

    #[arg(long, help = "Origin that relative article links resolve against")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct PlaceArgs {
    #[arg(
        long,
        value_parser = parse_anchor,
        value_name = "LEFT,TOP,RIGHT,BOTTOM",
        help = "Anchor bounds relative to the viewport"
    )]
    pub anchor: AnchorRect,

    #[arg(
        long,
        value_parser = parse_viewport,
        value_name = "WIDTH[,SCROLL_X,SCROLL_Y]",
        help = "Viewport width and optional scroll offsets"
    )]
    pub viewport: Viewport,

    #[arg(
        long,
        value_parser = parse_popup_size,
        value_name = "WIDTH,HEIGHT",
        help = "Measured popup size; configured estimates are used when absent"
    )]
    pub popup: Option<PopupSize>,
}

pub fn parse_cli() -> Cli {
    let mut args: Vec<_> = std::env::args_os().collect();
    if args.get(1).is_some_and(|arg| arg == OsStr::new("--")) {
        args.remove(1);
    }

    Cli::parse_from(args)
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

fn parse_output_format(value: &str) -> Result<OutputFormat, String> {
    value.parse()
}

fn parse_provider(value: &str) -> Result<SourceProviderKind, String> {
    value.parse()
}

fn parse_anchor(value: &str) -> Result<AnchorRect, String> {
    match parse_numbers(value)?.as_slice() {
        &[left, top, right, bottom] => Ok(AnchorRect {
            left,
            top,
            right,
            bottom,
        }),
        other => Err(format!(
            "expected 4 comma-separated numbers for the anchor, got {}",
            other.len()
        )),
    }
}

fn parse_viewport(value: &str) -> Result<Viewport, String> {
    match parse_numbers(value)?.as_slice() {
        &[width] => Ok(Viewport {
            width,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }),
        &[width, scroll_x, scroll_y] => Ok(Viewport {
            width,
            scroll_x,
            scroll_y,
        }),
        other => Err(format!(
            "expected 1 or 3 comma-separated numbers for the viewport, got {}",
            other.len()
        )),
    }
}

fn parse_popup_size(value: &str) -> Result<PopupSize, String> {
    match parse_numbers(value)?.as_slice() {
        &[width, height] => Ok(PopupSize { width, height }),
        other => Err(format!(
            "expected 2 comma-separated numbers for the popup size, got {}",
            other.len()
        )),
    }
}

fn parse_numbers(value: &str) -> Result<Vec<f64>, String> {
    value
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .ok_or_else(|| format!("invalid number '{part}'"))
        })
        .collect()
}
