use maud::{PreEscaped, html};
use serde::{Deserialize, Serialize};

use crate::ResolutionResult;
use crate::extract::{NO_SUMMARY_MARKER, Snippet};

pub const LOADING_TEXT: &str = "Loading preview...";
pub const ARTICLE_LINK_LABEL: &str = "Read full article on Wikipedia ↗";
pub const ENTITY_LINK_LABEL: &str = "See more on Wikidata ↗";
pub const WIKISPECIES_LINK_LABEL: &str = "Check for an entry on Wikispecies ↗";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Loading,
    Article,
    Entity,
    NoEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupImage {
    pub src: String,
    /// Opened in a new tab when the image is clicked.
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterLink {
    pub label: String,
    pub href: String,
}

/// Everything a surface needs to paint one state of the popup.
///
/// `image: None` is the "no image" placeholder state and `footer: None`
/// hides the footer link entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupContent {
    pub kind: ContentKind,
    pub body_html: String,
    pub image: Option<PopupImage>,
    pub footer: Option<FooterLink>,
}

impl PopupContent {
    pub fn loading() -> Self {
        Self {
            kind: ContentKind::Loading,
            body_html: html! {
                p class="wikipediapreview-body-loading-text" { (LOADING_TEXT) }
            }
            .into_string(),
            image: None,
            footer: Some(default_footer()),
        }
    }

    pub fn from_result(result: &ResolutionResult) -> Self {
        match result {
            ResolutionResult::ArticleSummary {
                snippet,
                image_url,
                canonical_url,
                ..
            } => Self {
                kind: ContentKind::Article,
                body_html: article_body(snippet),
                image: image_url.as_ref().map(|src| PopupImage {
                    src: src.clone(),
                    href: canonical_url.clone(),
                }),
                footer: Some(FooterLink {
                    label: ARTICLE_LINK_LABEL.to_owned(),
                    href: canonical_url.clone(),
                }),
            },
            ResolutionResult::EntitySummary {
                label,
                description,
                image_url,
                canonical_url,
            } => Self {
                kind: ContentKind::Entity,
                body_html: html! {
                    p { b { (label) } " – " (description) }
                }
                .into_string(),
                image: image_url.as_ref().map(|src| PopupImage {
                    src: src.clone(),
                    href: canonical_url.clone(),
                }),
                footer: Some(FooterLink {
                    label: ENTITY_LINK_LABEL.to_owned(),
                    href: canonical_url.clone(),
                }),
            },
            ResolutionResult::NoEntry {
                subject,
                wikispecies_url,
            } => Self {
                kind: ContentKind::NoEntry,
                body_html: html! {
                    p {
                        "No entry for " i { (subject.as_str()) }
                        " exists on English Wikipedia or Wikidata. "
                        a href=(wikispecies_url) target="_blank" { (WIKISPECIES_LINK_LABEL) }
                    }
                }
                .into_string(),
                image: None,
                footer: None,
            },
        }
    }

    pub fn is_loading(&self) -> bool {
        self.kind == ContentKind::Loading
    }
}

pub fn default_footer() -> FooterLink {
    FooterLink {
        label: ARTICLE_LINK_LABEL.to_owned(),
        href: "#".to_owned(),
    }
}

fn article_body(snippet: &Snippet) -> String {
    match snippet {
        Snippet::Extracted(markup) => html! { p { (PreEscaped(markup)) } }.into_string(),
        Snippet::NoSummary => html! {
            p style="font-style: italic;" { (NO_SUMMARY_MARKER) }
        }
        .into_string(),
    }
}
