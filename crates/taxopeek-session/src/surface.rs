use taxopeek_core::{PopupContent, PopupPosition, PopupSize};

use crate::SessionError;

/// The single popup surface a controller drives.
///
/// Calls arrive in order from one task. `show` attaches the popup without
/// revealing it; `place` positions and reveals it; `conceal` starts the exit
/// transition and `detach` removes it once the transition has played.
pub trait PreviewSurface: Send + 'static {
    fn show(&mut self) -> Result<(), SessionError>;

    fn render(&mut self, content: &PopupContent) -> Result<(), SessionError>;

    /// Rendered popup size, or `None` when it cannot be measured yet.
    fn measure(&self) -> Option<PopupSize>;

    fn place(&mut self, position: PopupPosition) -> Result<(), SessionError>;

    fn conceal(&mut self) -> Result<(), SessionError>;

    fn detach(&mut self) -> Result<(), SessionError>;
}
