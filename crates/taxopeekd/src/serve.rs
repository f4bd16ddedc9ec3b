//! JSON-lines bridge between a page and one hover session.
//!
//! Each inbound line is one notification; each outbound line is one surface
//! call. Both carry a `type` tag.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use taxopeek_config::TaxopeekConfig;
use taxopeek_core::{AnchorRect, PopupContent, PopupPosition, PopupSize, Viewport};
use taxopeek_session::{HoverController, HoverHandle, PreviewSurface, SessionError};
use taxopeek_sources::SourceResolver;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    AnchorEnter {
        subject: String,
        anchor: AnchorRect,
        viewport: Viewport,
    },
    AnchorLeave,
    PopupEnter,
    PopupLeave,
    /// Rendered popup size, reported by the page after a render.
    Measured { width: f64, height: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound<'a> {
    Show,
    Render { content: &'a PopupContent },
    Place { position: PopupPosition },
    Conceal,
    Detach,
}

/// Popup size shared between the inbound reader and the surface.
pub type MeasuredSize = Arc<Mutex<Option<PopupSize>>>;

/// Surface that queues one serialized line per call for the output writer.
pub struct JsonLinesSurface {
    lines: mpsc::UnboundedSender<String>,
    measured: MeasuredSize,
}

impl JsonLinesSurface {
    pub fn new(lines: mpsc::UnboundedSender<String>, measured: MeasuredSize) -> Self {
        Self { lines, measured }
    }

    fn emit(&mut self, message: &Outbound<'_>) -> Result<(), SessionError> {
        let line =
            serde_json::to_string(message).map_err(|err| SessionError::Surface(err.to_string()))?;
        self.lines
            .send(line)
            .map_err(|_| SessionError::Surface("output writer stopped".to_owned()))
    }

    fn forget_measured(&self) {
        if let Ok(mut size) = self.measured.lock() {
            *size = None;
        }
    }
}

impl PreviewSurface for JsonLinesSurface {
    fn show(&mut self) -> Result<(), SessionError> {
        self.emit(&Outbound::Show)
    }

    /// The page reports a size for the new content later; until then the
    /// previous content's size no longer applies.
    fn render(&mut self, content: &PopupContent) -> Result<(), SessionError> {
        self.forget_measured();
        self.emit(&Outbound::Render { content })
    }

    fn measure(&self) -> Option<PopupSize> {
        self.measured.lock().ok().and_then(|size| *size)
    }

    fn place(&mut self, position: PopupPosition) -> Result<(), SessionError> {
        self.emit(&Outbound::Place { position })
    }

    fn conceal(&mut self) -> Result<(), SessionError> {
        self.emit(&Outbound::Conceal)
    }

    fn detach(&mut self) -> Result<(), SessionError> {
        self.forget_measured();
        self.emit(&Outbound::Detach)
    }
}

async fn write_lines<W>(
    mut lines: mpsc::UnboundedReceiver<String>,
    mut output: W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}

/// Runs until `input` reaches end of file, then disposes the session.
pub async fn run_serve<R, W>(
    resolver: Arc<SourceResolver>,
    config: &TaxopeekConfig,
    input: R,
    output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (lines_tx, lines_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_lines(lines_rx, output));

    let measured = MeasuredSize::default();
    let surface = JsonLinesSurface::new(lines_tx, Arc::clone(&measured));
    let handle = HoverController::spawn(resolver, surface, config.timing, config.placement);
    info!("hover session ready");

    let mut lines = input.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read inbound notification")?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Inbound>(line) {
            Ok(message) => dispatch(&handle, &measured, message)?,
            Err(err) => warn!(error = %err, "ignoring malformed inbound line"),
        }
    }

    debug!("inbound stream closed");
    handle
        .dispose()
        .await
        .context("failed to stop hover session")?;

    // The surface, and with it the last sender, is dropped once the
    // controller stops.
    writer
        .await
        .context("output writer task failed")?
        .context("failed to write outbound message")
}

fn dispatch(handle: &HoverHandle, measured: &MeasuredSize, message: Inbound) -> Result<()> {
    match message {
        Inbound::AnchorEnter {
            subject,
            anchor,
            viewport,
        } => handle.anchor_enter(subject.trim(), anchor, viewport)?,
        Inbound::AnchorLeave => handle.anchor_leave()?,
        Inbound::PopupEnter => handle.popup_enter()?,
        Inbound::PopupLeave => handle.popup_leave()?,
        Inbound::Measured { width, height } => {
            if let Ok(mut size) = measured.lock() {
                *size = Some(PopupSize { width, height });
            }
        }
    }
    Ok(())
}
