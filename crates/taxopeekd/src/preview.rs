use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use taxopeek_config::{ExtractConfig, PlacementConfig, SourceProviderKind};
use taxopeek_core::{
    AnchorRect, PlacementSide, PopupContent, PopupPosition, PopupSize, PreviewSubject,
    ResolutionResult, Viewport, absolutize_links, extract_snippet, place_popup,
};
use taxopeek_sources::{Resolution, SourceOverrides, load_resolver_from_config};

use crate::cli::OutputFormat;

#[derive(Debug, Serialize)]
struct ResolvedPreview<'a> {
    subject: &'a PreviewSubject,
    provider: &'a str,
    result: &'a ResolutionResult,
    content: &'a PopupContent,
}

pub async fn run_resolve_once(
    workspace: &Path,
    subject: &str,
    provider: Option<SourceProviderKind>,
    output: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let loaded = load_resolver_from_config(
        workspace,
        SourceOverrides {
            provider,
            ..SourceOverrides::default()
        },
    )
    .context("failed to load reference sources")?;

    let subject = PreviewSubject::new(subject.trim());
    let Resolution::Resolved(result) = loaded.resolver.resolve_once(&subject).await else {
        bail!("resolution for {subject} was cancelled");
    };
    let content = PopupContent::from_result(&result);

    match output {
        OutputFormat::Table => write_popup_table(&subject, &content, out),
        OutputFormat::Json => {
            let preview = ResolvedPreview {
                subject: &subject,
                provider: &loaded.provider_name,
                result: &result,
                content: &content,
            };
            serde_json::to_writer_pretty(&mut *out, &preview)
                .context("failed to serialize resolution")?;
            writeln!(out).map_err(Into::into)
        }
    }
    .context("failed to write resolution")
}

pub fn write_popup_table(
    subject: &PreviewSubject,
    content: &PopupContent,
    out: &mut dyn Write,
) -> Result<()> {
    let kind = serde_json::to_value(content.kind)?;
    writeln!(out, "field\tvalue")?;
    writeln!(out, "subject\t{}", normalize_field(subject.as_str()))?;
    writeln!(out, "kind\t{}", kind.as_str().unwrap_or_default())?;
    writeln!(out, "body\t{}", normalize_field(&content.body_html))?;
    writeln!(
        out,
        "image\t{}",
        content
            .image
            .as_ref()
            .map(|image| normalize_field(&image.src))
            .unwrap_or_else(|| "-".to_owned())
    )?;
    match &content.footer {
        Some(footer) => writeln!(
            out,
            "footer\t{}\t{}",
            normalize_field(&footer.label),
            normalize_field(&footer.href)
        )?,
        None => writeln!(out, "footer\t-")?,
    }

    Ok(())
}

pub fn run_extract_once(
    file: &Path,
    base_url: Option<&str>,
    limits: &ExtractConfig,
    out: &mut dyn Write,
) -> Result<()> {
    let markup = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read article markup from {}", file.display()))?;

    let markup = match base_url.map(str::trim).filter(|base| !base.is_empty()) {
        Some(base) => absolutize_links(&markup, base),
        None => markup.as_str().into(),
    };
    let snippet = extract_snippet(&markup, limits);

    writeln!(out, "{}", snippet.as_html()).context("failed to write snippet")?;
    Ok(())
}

pub fn run_place_once(
    anchor: AnchorRect,
    viewport: Viewport,
    popup: Option<PopupSize>,
    rules: &PlacementConfig,
    out: &mut dyn Write,
) -> Result<()> {
    let position = place_popup(anchor, popup, viewport, rules);
    write_position(&position, out).context("failed to write placement")
}

fn write_position(position: &PopupPosition, out: &mut dyn Write) -> std::io::Result<()> {
    let side = match position.side {
        PlacementSide::Right => "right",
        PlacementSide::Left => "left",
    };
    writeln!(out, "left\ttop\tside")?;
    writeln!(out, "{}\t{}\t{side}", position.left, position.top)
}

fn normalize_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}
