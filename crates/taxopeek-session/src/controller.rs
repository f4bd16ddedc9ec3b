use std::sync::Arc;
use std::time::Duration;

use taxopeek_config::{PlacementConfig, TimingConfig};
use taxopeek_core::{AnchorRect, PopupContent, PreviewSubject, Viewport, place_popup};
use taxopeek_sources::{FetchGeneration, RequestCoordinator, Resolution, SourceResolver};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::SessionError;
use crate::session::{PopupPhase, PreviewSession};
use crate::surface::PreviewSurface;

/// Inbound notifications from the page wiring.
#[derive(Debug)]
enum Command {
    AnchorEnter {
        subject: PreviewSubject,
        anchor: AnchorRect,
        viewport: Viewport,
    },
    AnchorLeave,
    PopupEnter,
    PopupLeave,
    Dispose,
}

/// Work the controller scheduled for itself.
#[derive(Debug)]
enum Event {
    HideDue { ticket: u64 },
    CollapseDue { ticket: u64 },
    Place { ticket: u64 },
    Resolved {
        token: FetchGeneration,
        subject: PreviewSubject,
        resolution: Resolution,
    },
}

/// Task that is aborted when its owner lets go of it.
struct ScopedTask(JoinHandle<()>);

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// One pending timer. Dropping it cancels the timer; the ticket catches a
/// firing that was already queued when it was replaced.
struct ScopedTimer {
    ticket: u64,
    _task: ScopedTask,
}

pub struct HoverController;

/// Cloneable sender side of a running controller.
#[derive(Debug, Clone)]
pub struct HoverHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl HoverController {
    /// Starts the controller on the current tokio runtime. It owns `surface`
    /// until disposed or until every handle is dropped.
    pub fn spawn<S: PreviewSurface>(
        resolver: Arc<SourceResolver>,
        surface: S,
        timing: TimingConfig,
        placement: PlacementConfig,
    ) -> HoverHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let actor = ControllerActor {
            session: PreviewSession::new(),
            surface,
            resolver,
            coordinator: RequestCoordinator::new(),
            timing,
            placement,
            events: events_tx,
            next_ticket: 0,
            hide_timer: None,
            collapse_timer: None,
            pending_place: None,
            resolution: None,
        };
        let task = tokio::spawn(actor.run(commands_rx, events_rx));

        HoverHandle {
            commands: commands_tx,
            task: Arc::new(tokio::sync::Mutex::new(Some(task))),
        }
    }
}

impl HoverHandle {
    pub fn anchor_enter(
        &self,
        subject: impl Into<PreviewSubject>,
        anchor: AnchorRect,
        viewport: Viewport,
    ) -> Result<(), SessionError> {
        self.send(Command::AnchorEnter {
            subject: subject.into(),
            anchor,
            viewport,
        })
    }

    pub fn anchor_leave(&self) -> Result<(), SessionError> {
        self.send(Command::AnchorLeave)
    }

    pub fn popup_enter(&self) -> Result<(), SessionError> {
        self.send(Command::PopupEnter)
    }

    pub fn popup_leave(&self) -> Result<(), SessionError> {
        self.send(Command::PopupLeave)
    }

    /// Detaches the popup, cancels pending work and waits for the controller
    /// to stop. Later calls on any clone fail with `ControllerClosed`.
    pub async fn dispose(&self) -> Result<(), SessionError> {
        // A second dispose finds the channel closed or the task already taken.
        let _ = self.commands.send(Command::Dispose);

        let task = self.task.lock().await.take();
        if let Some(task) = task {
            task.await.map_err(|_| SessionError::ControllerClosed)?;
        }
        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::ControllerClosed)
    }
}

struct ControllerActor<S> {
    session: PreviewSession,
    surface: S,
    resolver: Arc<SourceResolver>,
    coordinator: RequestCoordinator,
    timing: TimingConfig,
    placement: PlacementConfig,
    events: mpsc::UnboundedSender<Event>,
    next_ticket: u64,
    hide_timer: Option<ScopedTimer>,
    collapse_timer: Option<ScopedTimer>,
    pending_place: Option<u64>,
    resolution: Option<ScopedTask>,
}

impl<S: PreviewSurface> ControllerActor<S> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Dispose) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
        }

        self.shutdown();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::AnchorEnter {
                subject,
                anchor,
                viewport,
            } => self.on_anchor_enter(subject, anchor, viewport),
            Command::AnchorLeave => {
                if self.session.anchor_leave() {
                    self.schedule_hide(self.timing.anchor_hide_grace_ms);
                }
            }
            Command::PopupEnter => {
                if self.session.popup_enter() {
                    self.hide_timer = None;
                }
            }
            Command::PopupLeave => {
                if self.session.popup_leave() {
                    self.schedule_hide(self.timing.popup_hide_grace_ms);
                }
            }
            Command::Dispose => {}
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::HideDue { ticket } => {
                if take_if_current(&mut self.hide_timer, ticket) {
                    self.attempt_hide();
                }
            }
            Event::CollapseDue { ticket } => {
                if take_if_current(&mut self.collapse_timer, ticket) {
                    report("detach", self.surface.detach());
                    self.session.finish_collapse();
                }
            }
            Event::Place { ticket } => {
                if self.pending_place == Some(ticket) {
                    self.pending_place = None;
                    self.place();
                }
            }
            Event::Resolved {
                token,
                subject,
                resolution,
            } => self.on_resolved(token, subject, resolution),
        }
    }

    fn on_anchor_enter(&mut self, subject: PreviewSubject, anchor: AnchorRect, viewport: Viewport) {
        self.hide_timer = None;
        self.collapse_timer = None;

        if self.session.anchor_enter(subject.clone(), anchor, viewport) {
            report("render", self.surface.render(&PopupContent::loading()));
            self.start_resolution(subject);
        } else {
            trace!(subject = %subject, "reusing loaded preview");
        }

        report("show", self.surface.show());
        self.session.mark_shown();
        self.request_placement();
    }

    fn start_resolution(&mut self, subject: PreviewSubject) {
        let token = self.coordinator.begin();
        debug!(subject = %subject, generation = token.generation(), "resolving preview");

        let resolver = Arc::clone(&self.resolver);
        let events = self.events.clone();
        self.resolution = Some(ScopedTask(tokio::spawn(async move {
            let resolution = resolver.resolve(&subject, &token).await;
            let _ = events.send(Event::Resolved {
                token,
                subject,
                resolution,
            });
        })));
    }

    fn on_resolved(&mut self, token: FetchGeneration, subject: PreviewSubject, resolution: Resolution) {
        let Resolution::Resolved(result) = resolution else {
            trace!(subject = %subject, "resolution cancelled");
            return;
        };

        if !self.coordinator.is_live(&token) {
            debug!(subject = %subject, generation = token.generation(), "dropping superseded resolution");
            return;
        }
        if !self.session.mark_loaded(&subject) {
            debug!(subject = %subject, "dropping resolution for a subject no longer shown");
            return;
        }

        self.resolution = None;
        report("render", self.surface.render(&PopupContent::from_result(&result)));
    }

    fn attempt_hide(&mut self) {
        if !self.session.should_hide() {
            return;
        }

        report("conceal", self.surface.conceal());
        self.coordinator.cancel_current();
        self.resolution = None;
        self.pending_place = None;
        self.session.begin_collapse();

        let ticket = self.ticket();
        self.collapse_timer = Some(self.timer(
            ticket,
            self.timing.collapse_ms,
            Event::CollapseDue { ticket },
        ));
    }

    fn schedule_hide(&mut self, delay_ms: u64) {
        let ticket = self.ticket();
        self.hide_timer = Some(self.timer(ticket, delay_ms, Event::HideDue { ticket }));
    }

    /// Placement waits for the next turn of the loop so the surface has seen
    /// every call issued in this one before it is measured.
    fn request_placement(&mut self) {
        let ticket = self.ticket();
        self.pending_place = Some(ticket);
        let _ = self.events.send(Event::Place { ticket });
    }

    fn place(&mut self) {
        if !self.session.is_displayed() {
            return;
        }
        let Some((anchor, viewport)) = self.session.anchor() else {
            return;
        };

        let position = place_popup(anchor, self.surface.measure(), viewport, &self.placement);
        report("place", self.surface.place(position));
    }

    fn shutdown(&mut self) {
        self.hide_timer = None;
        self.collapse_timer = None;
        self.pending_place = None;
        self.coordinator.cancel_current();
        self.resolution = None;

        if self.session.phase() != PopupPhase::Hidden {
            report("detach", self.surface.detach());
        }
        self.session.finish_collapse();
    }

    fn ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn timer(&self, ticket: u64, delay_ms: u64, event: Event) -> ScopedTimer {
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            let _ = events.send(event);
        });

        ScopedTimer {
            ticket,
            _task: ScopedTask(task),
        }
    }
}

fn take_if_current(slot: &mut Option<ScopedTimer>, ticket: u64) -> bool {
    if slot.as_ref().is_some_and(|timer| timer.ticket == ticket) {
        *slot = None;
        return true;
    }
    false
}

fn report(call: &'static str, result: Result<(), SessionError>) {
    if let Err(err) = result {
        warn!(call, error = %err, "surface call failed");
    }
}
