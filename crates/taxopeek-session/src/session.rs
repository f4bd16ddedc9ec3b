use taxopeek_core::{AnchorRect, PreviewSubject, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopupPhase {
    #[default]
    Hidden,
    /// Attached but not yet placed.
    Showing,
    Visible,
    /// Neither the anchor nor the popup is hovered; a hide check is pending.
    HideGrace,
    /// Concealed, waiting out the exit transition before detaching.
    Collapsing,
}

/// Hover state for one popup surface.
///
/// Transitions are plain methods; timers and I/O live in the controller.
#[derive(Debug, Clone, Default)]
pub struct PreviewSession {
    phase: PopupPhase,
    subject: Option<PreviewSubject>,
    loaded: bool,
    link_hover: bool,
    popup_hover: bool,
    anchor: Option<(AnchorRect, Viewport)>,
}

impl PreviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PopupPhase {
        self.phase
    }

    pub fn subject(&self) -> Option<&PreviewSubject> {
        self.subject.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn link_hover(&self) -> bool {
        self.link_hover
    }

    pub fn popup_hover(&self) -> bool {
        self.popup_hover
    }

    pub fn anchor(&self) -> Option<(AnchorRect, Viewport)> {
        self.anchor
    }

    /// True while the popup is attached and not on its way out.
    pub fn is_displayed(&self) -> bool {
        matches!(
            self.phase,
            PopupPhase::Showing | PopupPhase::Visible | PopupPhase::HideGrace
        )
    }

    /// Returns whether `subject` has to be resolved. Re-entering a subject
    /// that already rendered reuses the displayed content.
    pub fn anchor_enter(
        &mut self,
        subject: PreviewSubject,
        anchor: AnchorRect,
        viewport: Viewport,
    ) -> bool {
        self.link_hover = true;
        self.anchor = Some((anchor, viewport));

        let needs_resolution = self.subject.as_ref() != Some(&subject) || !self.loaded;
        if needs_resolution {
            self.subject = Some(subject);
            self.loaded = false;
        }

        self.phase = PopupPhase::Showing;
        needs_resolution
    }

    pub fn mark_shown(&mut self) {
        if self.phase == PopupPhase::Showing {
            self.phase = PopupPhase::Visible;
        }
    }

    /// Returns whether a hide check should be scheduled.
    pub fn anchor_leave(&mut self) -> bool {
        self.link_hover = false;
        self.enter_grace()
    }

    /// Returns whether the enter counted; a popup on its way out ignores it.
    pub fn popup_enter(&mut self) -> bool {
        if !self.is_displayed() {
            return false;
        }

        self.popup_hover = true;
        if self.phase == PopupPhase::HideGrace {
            self.phase = PopupPhase::Visible;
        }
        true
    }

    /// Returns whether a hide check should be scheduled.
    pub fn popup_leave(&mut self) -> bool {
        self.popup_hover = false;
        self.enter_grace()
    }

    pub fn should_hide(&self) -> bool {
        self.is_displayed() && !self.link_hover && !self.popup_hover
    }

    /// Records a completed render. Ignored unless `subject` is still the one
    /// being displayed.
    pub fn mark_loaded(&mut self, subject: &PreviewSubject) -> bool {
        if !self.is_displayed() || self.subject.as_ref() != Some(subject) {
            return false;
        }

        self.loaded = true;
        true
    }

    pub fn begin_collapse(&mut self) {
        self.phase = PopupPhase::Collapsing;
    }

    /// Detached: subject and loaded state are forgotten.
    pub fn finish_collapse(&mut self) {
        *self = Self::default();
    }

    fn enter_grace(&mut self) -> bool {
        if !self.is_displayed() || self.link_hover || self.popup_hover {
            return false;
        }

        self.phase = PopupPhase::HideGrace;
        true
    }
}
