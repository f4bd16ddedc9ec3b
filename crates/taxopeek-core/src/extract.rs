//! Turns a rendered article body into the short snippet shown in a popup.
//!
//! The two-sentence/350-character bound is a space budget for a small hover
//! surface. Sentence splitting is naive on purpose: any `.`, `!` or `?`
//! followed by whitespace ends a sentence, abbreviations included.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use taxopeek_config::ExtractConfig;

pub const NO_SUMMARY_MARKER: &str = "No summary text available.";

const NOISE_SELECTORS: &str = ".mw-editsection, .reference, sup, .noprint, .infobox, .navbox, \
.vertical-navbox, .sidebar, .metadata, table";

static NOISE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(NOISE_SELECTORS).expect("noise selector is valid"));
static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("paragraph selector is valid"));
static TEMPLATE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{.*?\}\}").expect("template marker pattern is valid"));
static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("markup tag pattern is valid"));
static NON_PROSE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Listen|File:|Image:)").expect("prefix pattern is valid"));
static RELATIVE_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(href=["'])(/(?:wiki|\w)/)"#).expect("relative href pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "html", rename_all = "snake_case")]
pub enum Snippet {
    /// Accepted sentences joined by single spaces, still carrying inline markup.
    Extracted(String),
    NoSummary,
}

impl Snippet {
    pub fn as_html(&self) -> &str {
        match self {
            Self::Extracted(html) => html,
            Self::NoSummary => NO_SUMMARY_MARKER,
        }
    }
}

/// Rewrites site-relative links (`/wiki/...`, `/w/...`) so they keep working
/// once the snippet is shown outside the article's own page.
pub fn absolutize_links<'a>(markup: &'a str, origin: &str) -> Cow<'a, str> {
    let origin = origin.trim_end_matches('/');
    RELATIVE_HREF.replace_all(markup, |captures: &regex::Captures<'_>| {
        format!("{}{origin}{}", &captures[1], &captures[2])
    })
}

pub fn extract_snippet(markup: &str, limits: &ExtractConfig) -> Snippet {
    let mut document = Html::parse_fragment(markup);
    strip_structural_noise(&mut document);

    let mut snippet = String::new();
    let mut accepted = 0usize;

    'paragraphs: for paragraph in document.root_element().select(&PARAGRAPH) {
        if accepted >= limits.max_sentences {
            break;
        }

        let inner = paragraph.inner_html();
        if inner.trim().chars().count() < limits.min_paragraph_chars {
            continue;
        }

        for sentence in split_sentences(&inner) {
            if accepted >= limits.max_sentences {
                break 'paragraphs;
            }

            let cleaned = TEMPLATE_MARKER.replace_all(sentence, "");
            let cleaned = cleaned.trim();
            if cleaned.chars().count() <= limits.min_sentence_chars
                || NON_PROSE_PREFIX.is_match(cleaned)
            {
                continue;
            }

            let candidate = if snippet.is_empty() {
                cleaned.to_owned()
            } else {
                format!("{snippet} {cleaned}")
            };

            // The first sentence is kept whatever its length.
            if accepted >= 1 && plain_text_len(&candidate) > limits.max_chars {
                break 'paragraphs;
            }

            snippet = candidate;
            accepted += 1;
        }
    }

    if accepted == 0 {
        Snippet::NoSummary
    } else {
        Snippet::Extracted(snippet)
    }
}

pub fn plain_text_len(markup: &str) -> usize {
    MARKUP_TAG.replace_all(markup, "").chars().count()
}

fn strip_structural_noise(document: &mut Html) {
    let noise = document
        .root_element()
        .select(&NOISE)
        .map(|element| element.id())
        .collect::<Vec<_>>();

    for id in noise {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut previous: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if ch.is_whitespace() && matches!(previous, Some('.' | '!' | '?')) {
            sentences.push(&text[start..index]);

            let mut end = index + ch.len_utf8();
            while let Some(&(next_index, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                end = next_index + next.len_utf8();
                chars.next();
            }

            start = end;
            previous = None;
            continue;
        }

        previous = Some(ch);
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}
