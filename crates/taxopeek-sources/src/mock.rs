use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use maud::html;

use crate::{
    ArticleMarkup, EncyclopediaSource, EntityRecord, KnowledgeBaseSource, PageSummary, SourceError,
};

const MOCK_ORIGIN: &str = "https://en.wikipedia.org";

/// In-memory encyclopedia keyed by literal title.
///
/// With `generated_articles` set, unknown titles get a short canned article so
/// the offline provider always has something to preview.
#[derive(Debug, Clone, Default)]
pub struct MockEncyclopedia {
    articles: HashMap<String, ArticleMarkup>,
    summaries: HashMap<String, PageSummary>,
    failing_articles: Vec<String>,
    failing_summaries: Vec<String>,
    delays: HashMap<String, Duration>,
    generated_articles: bool,
    article_requests: Arc<AtomicUsize>,
    summary_requests: Arc<AtomicUsize>,
}

impl MockEncyclopedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generated_articles(mut self) -> Self {
        self.generated_articles = true;
        self
    }

    pub fn with_article(mut self, title: &str, html: &str) -> Self {
        self.articles.insert(
            title.to_owned(),
            ArticleMarkup {
                title: title.to_owned(),
                html: html.to_owned(),
            },
        );
        self
    }

    /// Serves `requested` with the article stored under `canonical`, as a
    /// server-side redirect would.
    pub fn with_redirect(mut self, requested: &str, canonical: &str, html: &str) -> Self {
        self.articles.insert(
            requested.to_owned(),
            ArticleMarkup {
                title: canonical.to_owned(),
                html: html.to_owned(),
            },
        );
        self
    }

    pub fn with_thumbnail(mut self, title: &str, url: &str) -> Self {
        self.summaries.insert(
            title.to_owned(),
            PageSummary {
                thumbnail_url: Some(url.to_owned()),
            },
        );
        self
    }

    pub fn with_failing_article(mut self, title: &str) -> Self {
        self.failing_articles.push(title.to_owned());
        self
    }

    pub fn with_failing_summary(mut self, title: &str) -> Self {
        self.failing_summaries.push(title.to_owned());
        self
    }

    /// Delays both article-stage responses for `title`.
    pub fn with_delay(mut self, title: &str, delay: Duration) -> Self {
        self.delays.insert(title.to_owned(), delay);
        self
    }

    pub fn article_requests(&self) -> usize {
        self.article_requests.load(Ordering::SeqCst)
    }

    pub fn summary_requests(&self) -> usize {
        self.summary_requests.load(Ordering::SeqCst)
    }

    async fn wait_for(&self, title: &str) {
        if let Some(delay) = self.delays.get(title) {
            tokio::time::sleep(*delay).await;
        }
    }
}

#[async_trait]
impl EncyclopediaSource for MockEncyclopedia {
    async fn article_markup(&self, title: &str) -> Result<Option<ArticleMarkup>, SourceError> {
        self.article_requests.fetch_add(1, Ordering::SeqCst);
        self.wait_for(title).await;

        if self.failing_articles.iter().any(|failing| failing == title) {
            return Err(SourceError::InvalidResponse(format!(
                "mock article failure for {title}"
            )));
        }

        if let Some(article) = self.articles.get(title) {
            return Ok(Some(article.clone()));
        }

        Ok(self.generated_articles.then(|| ArticleMarkup {
            title: title.to_owned(),
            html: html! {
                p {
                    b { (title) }
                    " is served by the offline mock provider. \
                     No network request was made for this preview."
                }
            }
            .into_string(),
        }))
    }

    async fn page_summary(&self, title: &str) -> Result<Option<PageSummary>, SourceError> {
        self.summary_requests.fetch_add(1, Ordering::SeqCst);
        self.wait_for(title).await;

        if self.failing_summaries.iter().any(|failing| failing == title) {
            return Err(SourceError::InvalidResponse(format!(
                "mock summary failure for {title}"
            )));
        }

        Ok(self.summaries.get(title).cloned())
    }

    fn source_name(&self) -> &str {
        "mock"
    }

    fn origin(&self) -> &str {
        MOCK_ORIGIN
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockKnowledgeBase {
    search_hits: HashMap<String, Vec<String>>,
    entities: HashMap<String, EntityRecord>,
    failing_searches: Vec<String>,
    failing_entities: Vec<String>,
    search_requests: Arc<AtomicUsize>,
    entity_requests: Arc<AtomicUsize>,
}

impl MockKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_hits(mut self, text: &str, ids: &[&str]) -> Self {
        self.search_hits.insert(
            text.to_owned(),
            ids.iter().map(|id| (*id).to_owned()).collect(),
        );
        self
    }

    pub fn with_entity(mut self, entity: EntityRecord) -> Self {
        self.entities.insert(entity.id.clone(), entity);
        self
    }

    pub fn with_failing_search(mut self, text: &str) -> Self {
        self.failing_searches.push(text.to_owned());
        self
    }

    pub fn with_failing_entity(mut self, entity_id: &str) -> Self {
        self.failing_entities.push(entity_id.to_owned());
        self
    }

    pub fn search_requests(&self) -> usize {
        self.search_requests.load(Ordering::SeqCst)
    }

    pub fn entity_requests(&self) -> usize {
        self.entity_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeBaseSource for MockKnowledgeBase {
    async fn search_entities(&self, text: &str) -> Result<Vec<String>, SourceError> {
        self.search_requests.fetch_add(1, Ordering::SeqCst);

        if self.failing_searches.iter().any(|failing| failing == text) {
            return Err(SourceError::InvalidResponse(format!(
                "mock search failure for {text}"
            )));
        }

        Ok(self.search_hits.get(text).cloned().unwrap_or_default())
    }

    async fn entity(&self, entity_id: &str) -> Result<Option<EntityRecord>, SourceError> {
        self.entity_requests.fetch_add(1, Ordering::SeqCst);

        if self.failing_entities.iter().any(|failing| failing == entity_id) {
            return Err(SourceError::InvalidResponse(format!(
                "mock entity failure for {entity_id}"
            )));
        }

        Ok(self.entities.get(entity_id).cloned())
    }

    fn source_name(&self) -> &str {
        "mock"
    }
}
