use serde::{Deserialize, Serialize};
use taxopeek_config::PlacementConfig;

/// Anchor bounds relative to the viewport, as reported by the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl AnchorRect {
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopupSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementSide {
    Right,
    Left,
}

/// Absolute page coordinates for the popup's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopupPosition {
    pub left: f64,
    pub top: f64,
    pub side: PlacementSide,
}

/// Places the popup beside the anchor, vertically centered on it.
///
/// The popup goes to the right of the anchor unless its right edge would pass
/// `viewport.width - edge_margin`, in which case it flips to the left. The
/// vertical axis is never clamped. Unmeasured (missing or zero) popup
/// dimensions fall back to the configured estimates.
pub fn place_popup(
    anchor: AnchorRect,
    popup: Option<PopupSize>,
    viewport: Viewport,
    rules: &PlacementConfig,
) -> PopupPosition {
    let (width, height) = measured_or_fallback(popup, rules);

    let page_left = anchor.left + viewport.scroll_x;
    let page_right = anchor.right + viewport.scroll_x;
    let page_top = anchor.top + viewport.scroll_y;

    let (left, side) = if anchor.right + rules.gap + width > viewport.width - rules.edge_margin {
        (page_left - rules.gap - width, PlacementSide::Left)
    } else {
        (page_right + rules.gap, PlacementSide::Right)
    };
    let top = page_top + anchor.height() / 2.0 - height / 2.0;

    PopupPosition {
        left: left.round(),
        top: top.round(),
        side,
    }
}

fn measured_or_fallback(popup: Option<PopupSize>, rules: &PlacementConfig) -> (f64, f64) {
    let width = popup
        .map(|size| size.width)
        .filter(|width| *width > 0.0)
        .unwrap_or(rules.fallback_width);
    let height = popup
        .map(|size| size.height)
        .filter(|height| *height > 0.0)
        .unwrap_or(rules.fallback_height);
    (width, height)
}
