use std::sync::{Arc, Mutex};
use std::time::Duration;

use taxopeek_config::{ExtractConfig, PlacementConfig, TimingConfig};
use taxopeek_core::{
    AnchorRect, ContentKind, PlacementSide, PopupContent, PopupPosition, PopupSize,
    ReferenceUrls, Viewport,
};
use taxopeek_session::{HoverController, HoverHandle, PreviewSurface, SessionError};
use taxopeek_sources::{MockEncyclopedia, MockKnowledgeBase, SourceResolver};

const LION_BODY: &str = "<p>The lion is a large cat of the genus Panthera. It has a muscular, \
    broad-chested body. It has a short, rounded head.</p>";
const WOLF_BODY: &str = "<p>The wolf is a large canine native to Eurasia and North America. \
    It is the largest wild member of the family.</p>";

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Show,
    Render(PopupContent),
    Place(PopupPosition),
    Conceal,
    Detach,
}

#[derive(Debug, Clone, Default)]
struct RecordingSurface {
    calls: Arc<Mutex<Vec<Call>>>,
    size: Option<PopupSize>,
}

impl RecordingSurface {
    fn with_size(width: f64, height: f64) -> Self {
        Self {
            size: Some(PopupSize { width, height }),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn renders(&self) -> Vec<PopupContent> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Render(content) => Some(content),
                _ => None,
            })
            .collect()
    }

    fn count(&self, wanted: &Call) -> usize {
        self.calls()
            .iter()
            .filter(|call| std::mem::discriminant(*call) == std::mem::discriminant(wanted))
            .count()
    }

    fn record(&self, call: Call) -> Result<(), SessionError> {
        self.calls.lock().expect("calls lock").push(call);
        Ok(())
    }
}

impl PreviewSurface for RecordingSurface {
    fn show(&mut self) -> Result<(), SessionError> {
        self.record(Call::Show)
    }

    fn render(&mut self, content: &PopupContent) -> Result<(), SessionError> {
        self.record(Call::Render(content.clone()))
    }

    fn measure(&self) -> Option<PopupSize> {
        self.size
    }

    fn place(&mut self, position: PopupPosition) -> Result<(), SessionError> {
        self.record(Call::Place(position))
    }

    fn conceal(&mut self) -> Result<(), SessionError> {
        self.record(Call::Conceal)
    }

    fn detach(&mut self) -> Result<(), SessionError> {
        self.record(Call::Detach)
    }
}

fn anchor() -> AnchorRect {
    AnchorRect {
        left: 100.0,
        top: 100.0,
        right: 180.0,
        bottom: 120.0,
    }
}

fn viewport() -> Viewport {
    Viewport {
        width: 1280.0,
        scroll_x: 0.0,
        scroll_y: 0.0,
    }
}

fn encyclopedia() -> MockEncyclopedia {
    MockEncyclopedia::new()
        .with_article("Panthera leo", LION_BODY)
        .with_article("Canis lupus", WOLF_BODY)
}

fn spawn(encyclopedia: MockEncyclopedia, surface: RecordingSurface) -> HoverHandle {
    let resolver = SourceResolver::new(
        Arc::new(encyclopedia),
        Arc::new(MockKnowledgeBase::new()),
        ReferenceUrls::default(),
        ExtractConfig::default(),
    );

    HoverController::spawn(
        Arc::new(resolver),
        surface,
        TimingConfig::default(),
        PlacementConfig::default(),
    )
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn enter_shows_loading_then_article() {
    let surface = RecordingSurface::default();
    let handle = spawn(encyclopedia(), surface.clone());

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(10).await;

    let renders = surface.renders();
    assert_eq!(renders.len(), 2);
    assert_eq!(renders[0], PopupContent::loading());
    assert_eq!(renders[1].kind, ContentKind::Article);
    assert!(renders[1].body_html.contains("The lion is a large cat"));
    assert_eq!(surface.count(&Call::Show), 1);
    assert_eq!(surface.count(&Call::Conceal), 0);
}

#[tokio::test(start_paused = true)]
async fn pointer_in_transit_to_popup_keeps_it_visible() {
    let surface = RecordingSurface::default();
    let handle = spawn(encyclopedia(), surface.clone());

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(40).await;
    handle.anchor_leave().expect("anchor leave");
    advance(150).await;
    handle.popup_enter().expect("popup enter");
    advance(1_000).await;

    assert_eq!(surface.count(&Call::Conceal), 0);
    assert_eq!(surface.count(&Call::Detach), 0);
}

#[tokio::test(start_paused = true)]
async fn leaving_hides_after_grace_then_detaches_after_collapse() {
    let surface = RecordingSurface::default();
    let handle = spawn(encyclopedia(), surface.clone());

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(10).await;
    handle.anchor_leave().expect("anchor leave");

    advance(299).await;
    assert_eq!(surface.count(&Call::Conceal), 0);

    advance(2).await;
    assert_eq!(surface.count(&Call::Conceal), 1);
    assert_eq!(surface.count(&Call::Detach), 0);

    advance(148).await;
    assert_eq!(surface.count(&Call::Detach), 0);

    advance(2).await;
    assert_eq!(surface.count(&Call::Detach), 1);
}

#[tokio::test(start_paused = true)]
async fn leaving_popup_uses_shorter_grace() {
    let surface = RecordingSurface::default();
    let handle = spawn(encyclopedia(), surface.clone());

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(10).await;
    handle.anchor_leave().expect("anchor leave");
    advance(50).await;
    handle.popup_enter().expect("popup enter");
    advance(500).await;
    handle.popup_leave().expect("popup leave");

    advance(99).await;
    assert_eq!(surface.count(&Call::Conceal), 0);

    advance(2).await;
    assert_eq!(surface.count(&Call::Conceal), 1);
}

#[tokio::test(start_paused = true)]
async fn repeated_enter_for_loaded_subject_issues_no_request() {
    let encyclopedia = encyclopedia();
    let surface = RecordingSurface::default();
    let handle = spawn(encyclopedia.clone(), surface.clone());

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(10).await;
    for _ in 0..3 {
        handle.anchor_leave().expect("anchor leave");
        advance(50).await;
        handle
            .anchor_enter("Panthera leo", anchor(), viewport())
            .expect("anchor enter");
        advance(50).await;
    }

    assert_eq!(encyclopedia.article_requests(), 1);
    assert_eq!(surface.renders().len(), 2);
    assert_eq!(surface.count(&Call::Show), 4);
}

#[tokio::test(start_paused = true)]
async fn reenter_during_collapse_reuses_content() {
    let encyclopedia = encyclopedia();
    let surface = RecordingSurface::default();
    let handle = spawn(encyclopedia.clone(), surface.clone());

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(10).await;
    handle.anchor_leave().expect("anchor leave");
    advance(350).await;
    assert_eq!(surface.count(&Call::Conceal), 1);

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(500).await;

    assert_eq!(surface.count(&Call::Detach), 0);
    assert_eq!(encyclopedia.article_requests(), 1);
    assert_eq!(surface.count(&Call::Show), 2);
}

#[tokio::test(start_paused = true)]
async fn subject_is_forgotten_after_detach() {
    let encyclopedia = encyclopedia();
    let surface = RecordingSurface::default();
    let handle = spawn(encyclopedia.clone(), surface.clone());

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(10).await;
    handle.anchor_leave().expect("anchor leave");
    advance(1_000).await;
    assert_eq!(surface.count(&Call::Detach), 1);

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(10).await;

    assert_eq!(encyclopedia.article_requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn superseded_request_never_renders() {
    let encyclopedia = encyclopedia().with_delay("Panthera leo", Duration::from_millis(500));
    let surface = RecordingSurface::default();
    let handle = spawn(encyclopedia.clone(), surface.clone());

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(50).await;
    handle
        .anchor_enter("Canis lupus", anchor(), viewport())
        .expect("anchor enter");
    advance(2_000).await;

    let settled = surface
        .renders()
        .into_iter()
        .filter(|content| !content.is_loading())
        .collect::<Vec<_>>();
    assert_eq!(settled.len(), 1);
    assert!(settled[0].body_html.contains("The wolf"));
}

#[tokio::test(start_paused = true)]
async fn same_subject_twice_in_flight_renders_once() {
    let encyclopedia = encyclopedia().with_delay("Panthera leo", Duration::from_millis(500));
    let surface = RecordingSurface::default();
    let handle = spawn(encyclopedia.clone(), surface.clone());

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(50).await;
    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(2_000).await;

    let settled = surface
        .renders()
        .into_iter()
        .filter(|content| !content.is_loading())
        .count();
    assert_eq!(settled, 1);
    assert_eq!(encyclopedia.article_requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn hiding_cancels_in_flight_resolution() {
    let encyclopedia = encyclopedia().with_delay("Panthera leo", Duration::from_millis(800));
    let surface = RecordingSurface::default();
    let handle = spawn(encyclopedia.clone(), surface.clone());

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(10).await;
    handle.anchor_leave().expect("anchor leave");
    advance(2_000).await;

    assert_eq!(surface.count(&Call::Detach), 1);
    assert!(surface.renders().iter().all(PopupContent::is_loading));
}

#[tokio::test(start_paused = true)]
async fn placement_flips_left_near_viewport_edge() {
    let surface = RecordingSurface::with_size(550.0, 150.0);
    let handle = spawn(encyclopedia(), surface.clone());

    handle
        .anchor_enter(
            "Panthera leo",
            AnchorRect {
                left: 700.0,
                top: 100.0,
                right: 790.0,
                bottom: 120.0,
            },
            Viewport {
                width: 800.0,
                scroll_x: 0.0,
                scroll_y: 0.0,
            },
        )
        .expect("anchor enter");
    advance(10).await;

    let placements = surface
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Place(position) => Some(position),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        placements,
        vec![PopupPosition {
            left: 135.0,
            top: 35.0,
            side: PlacementSide::Left,
        }]
    );

    let calls = surface.calls();
    let show_at = calls
        .iter()
        .position(|call| *call == Call::Show)
        .expect("show call");
    let place_at = calls
        .iter()
        .position(|call| matches!(call, Call::Place(_)))
        .expect("place call");
    assert!(show_at < place_at);
}

#[tokio::test(start_paused = true)]
async fn unknown_subject_settles_on_no_entry() {
    let surface = RecordingSurface::default();
    let handle = spawn(MockEncyclopedia::new(), surface.clone());

    handle
        .anchor_enter("Xyzzyplasia nonexistus", anchor(), viewport())
        .expect("anchor enter");
    advance(10).await;

    let renders = surface.renders();
    let last = renders.last().expect("render");
    assert_eq!(last.kind, ContentKind::NoEntry);
    assert!(last.footer.is_none());
    assert!(
        last.body_html
            .contains("https://species.wikimedia.org/wiki/Xyzzyplasia%20nonexistus")
    );
}

#[tokio::test(start_paused = true)]
async fn dispose_detaches_and_closes_handle() {
    let surface = RecordingSurface::default();
    let handle = spawn(encyclopedia(), surface.clone());

    handle
        .anchor_enter("Panthera leo", anchor(), viewport())
        .expect("anchor enter");
    advance(10).await;
    handle.dispose().await.expect("dispose");

    assert_eq!(surface.count(&Call::Detach), 1);
    assert!(matches!(
        handle.anchor_leave(),
        Err(SessionError::ControllerClosed)
    ));
    handle.dispose().await.expect("second dispose");
}
