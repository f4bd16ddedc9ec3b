use thiserror::Error;

mod controller;
mod session;
mod surface;

pub use controller::{HoverController, HoverHandle};
pub use session::{PopupPhase, PreviewSession};
pub use surface::PreviewSurface;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("surface io failed: {0}")]
    SurfaceIo(#[from] std::io::Error),
    #[error("surface call failed: {0}")]
    Surface(String),
    #[error("hover controller is no longer running")]
    ControllerClosed,
}
