use std::future::Future;
use std::sync::Arc;

use taxopeek_config::ExtractConfig;
use taxopeek_core::{
    PreviewSubject, ReferenceUrls, ResolutionResult, absolutize_links, extract_snippet,
};
use tracing::{debug, trace, warn};

use crate::{EncyclopediaSource, FetchGeneration, KnowledgeBaseSource, RequestCoordinator};

const UNKNOWN_LABEL: &str = "Unknown";
const MISSING_DESCRIPTION: &str = "No description available.";

/// Outcome of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolutionResult),
    /// The attempt was superseded; the caller has already moved on.
    Cancelled,
}

impl Resolution {
    pub fn into_result(self) -> Option<ResolutionResult> {
        match self {
            Self::Resolved(result) => Some(result),
            Self::Cancelled => None,
        }
    }
}

/// Why a stage handed over to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    TransportFailure,
    EmptyResult,
}

enum StageOutcome<T> {
    Hit(T),
    Fallthrough(FailureKind),
    Cancelled,
}

/// Article stage, entity search, entity detail, then the terminal no-entry
/// fallback. Every stage runs under the caller's [`FetchGeneration`].
pub struct SourceResolver {
    encyclopedia: Arc<dyn EncyclopediaSource>,
    knowledge_base: Arc<dyn KnowledgeBaseSource>,
    urls: ReferenceUrls,
    extract: ExtractConfig,
}

impl SourceResolver {
    pub fn new(
        encyclopedia: Arc<dyn EncyclopediaSource>,
        knowledge_base: Arc<dyn KnowledgeBaseSource>,
        urls: ReferenceUrls,
        extract: ExtractConfig,
    ) -> Self {
        Self {
            encyclopedia,
            knowledge_base,
            urls,
            extract,
        }
    }

    pub async fn resolve(&self, subject: &PreviewSubject, token: &FetchGeneration) -> Resolution {
        match self.article_stage(subject, token).await {
            StageOutcome::Hit(result) => return Resolution::Resolved(result),
            StageOutcome::Cancelled => return cancelled(subject, "article"),
            StageOutcome::Fallthrough(kind) => {
                debug!(subject = %subject, ?kind, "article stage fell through");
            }
        }

        match self.entity_search_stage(subject, token).await {
            StageOutcome::Hit(entity_id) => match self.entity_stage(&entity_id, token).await {
                StageOutcome::Hit(result) => return Resolution::Resolved(result),
                StageOutcome::Cancelled => return cancelled(subject, "entity_detail"),
                StageOutcome::Fallthrough(kind) => {
                    debug!(subject = %subject, entity_id = %entity_id, ?kind, "entity stage fell through");
                }
            },
            StageOutcome::Cancelled => return cancelled(subject, "entity_search"),
            StageOutcome::Fallthrough(kind) => {
                debug!(subject = %subject, ?kind, "entity search fell through");
            }
        }

        if !token.is_live() {
            return cancelled(subject, "no_entry");
        }

        Resolution::Resolved(ResolutionResult::NoEntry {
            subject: subject.clone(),
            wikispecies_url: self.urls.wikispecies_url(subject.as_str()),
        })
    }

    /// Resolves outside any hover session, with a private coordinator.
    pub async fn resolve_once(&self, subject: &PreviewSubject) -> Resolution {
        let mut coordinator = RequestCoordinator::new();
        let token = coordinator.begin();
        self.resolve(subject, &token).await
    }

    async fn article_stage(
        &self,
        subject: &PreviewSubject,
        token: &FetchGeneration,
    ) -> StageOutcome<ResolutionResult> {
        let title = subject.as_str();
        let fetched = guarded(token, async {
            tokio::join!(
                self.encyclopedia.article_markup(title),
                self.encyclopedia.page_summary(title)
            )
        })
        .await;
        let Some((article, summary)) = fetched else {
            return StageOutcome::Cancelled;
        };

        let image_url = match summary {
            Ok(summary) => summary.and_then(|summary| summary.thumbnail_url),
            Err(err) => {
                warn!(
                    source = self.encyclopedia.source_name(),
                    subject = %subject,
                    error = %err,
                    "page summary fetch failed"
                );
                None
            }
        };

        let article = match article {
            Ok(Some(article)) => article,
            Ok(None) => return StageOutcome::Fallthrough(FailureKind::EmptyResult),
            Err(err) => {
                warn!(
                    source = self.encyclopedia.source_name(),
                    subject = %subject,
                    error = %err,
                    "article fetch failed"
                );
                return StageOutcome::Fallthrough(FailureKind::TransportFailure);
            }
        };

        let markup = absolutize_links(&article.html, self.encyclopedia.origin());
        let snippet = extract_snippet(&markup, &self.extract);

        StageOutcome::Hit(ResolutionResult::ArticleSummary {
            canonical_url: self.urls.article_url(&article.title),
            title: article.title,
            snippet,
            image_url,
        })
    }

    async fn entity_search_stage(
        &self,
        subject: &PreviewSubject,
        token: &FetchGeneration,
    ) -> StageOutcome<String> {
        let Some(searched) = guarded(
            token,
            self.knowledge_base.search_entities(subject.as_str()),
        )
        .await
        else {
            return StageOutcome::Cancelled;
        };

        match searched {
            Ok(ids) => match ids.into_iter().next() {
                Some(first) => StageOutcome::Hit(first),
                None => StageOutcome::Fallthrough(FailureKind::EmptyResult),
            },
            Err(err) => {
                warn!(
                    source = self.knowledge_base.source_name(),
                    subject = %subject,
                    error = %err,
                    "entity search failed"
                );
                StageOutcome::Fallthrough(FailureKind::TransportFailure)
            }
        }
    }

    async fn entity_stage(
        &self,
        entity_id: &str,
        token: &FetchGeneration,
    ) -> StageOutcome<ResolutionResult> {
        let Some(fetched) = guarded(token, self.knowledge_base.entity(entity_id)).await else {
            return StageOutcome::Cancelled;
        };

        let entity = match fetched {
            Ok(Some(entity)) => entity,
            Ok(None) => return StageOutcome::Fallthrough(FailureKind::EmptyResult),
            Err(err) => {
                warn!(
                    source = self.knowledge_base.source_name(),
                    entity_id,
                    error = %err,
                    "entity fetch failed"
                );
                return StageOutcome::Fallthrough(FailureKind::TransportFailure);
            }
        };

        StageOutcome::Hit(ResolutionResult::EntitySummary {
            label: entity.label.unwrap_or_else(|| UNKNOWN_LABEL.to_owned()),
            description: entity
                .description
                .unwrap_or_else(|| MISSING_DESCRIPTION.to_owned()),
            image_url: entity
                .image_file
                .map(|file| self.urls.commons_image_url(&file)),
            canonical_url: self.urls.entity_url(&entity.id),
        })
    }
}

/// Drives `fut` unless the generation is cancelled first. A result that lands
/// after the generation was superseded is dropped as well.
async fn guarded<F>(token: &FetchGeneration, fut: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = fut => token.is_live().then_some(output),
    }
}

fn cancelled(subject: &PreviewSubject, stage: &'static str) -> Resolution {
    trace!(subject = %subject, stage, "resolution superseded");
    Resolution::Cancelled
}
