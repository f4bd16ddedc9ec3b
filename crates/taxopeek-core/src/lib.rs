use std::fmt;

use serde::{Deserialize, Serialize};

pub mod extract;
pub mod placement;
pub mod render;
pub mod urls;

pub use extract::{NO_SUMMARY_MARKER, Snippet, absolutize_links, extract_snippet};
pub use placement::{AnchorRect, PlacementSide, PopupPosition, PopupSize, Viewport, place_popup};
pub use render::{ContentKind, FooterLink, PopupContent, PopupImage};
pub use urls::ReferenceUrls;

/// The scientific name a popup is resolving or displaying.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewSubject(String);

impl PreviewSubject {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PreviewSubject {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PreviewSubject {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionResult {
    ArticleSummary {
        title: String,
        snippet: Snippet,
        image_url: Option<String>,
        canonical_url: String,
    },
    EntitySummary {
        label: String,
        description: String,
        image_url: Option<String>,
        canonical_url: String,
    },
    NoEntry {
        subject: PreviewSubject,
        wikispecies_url: String,
    },
}

impl ResolutionResult {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::ArticleSummary { .. } => ContentKind::Article,
            Self::EntitySummary { .. } => ContentKind::Entity,
            Self::NoEntry { .. } => ContentKind::NoEntry,
        }
    }

    pub fn canonical_url(&self) -> &str {
        match self {
            Self::ArticleSummary { canonical_url, .. }
            | Self::EntitySummary { canonical_url, .. } => canonical_url,
            Self::NoEntry {
                wikispecies_url, ..
            } => wikispecies_url,
        }
    }
}
