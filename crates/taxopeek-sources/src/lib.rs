use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taxopeek_config::{SourceProviderKind, SourcesConfig, TaxopeekConfig, load_workspace_config};
use taxopeek_core::ReferenceUrls;
use thiserror::Error;

mod coordinator;
mod mock;
mod resolver;
mod wikidata;
mod wikipedia;

pub use coordinator::{FetchGeneration, RequestCoordinator};
pub use mock::{MockEncyclopedia, MockKnowledgeBase};
pub use resolver::{FailureKind, Resolution, SourceResolver};
pub use wikidata::WikidataSource;
pub use wikipedia::WikipediaSource;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceOverrides {
    pub provider: Option<SourceProviderKind>,
    pub wikipedia_base: Option<String>,
    pub wikidata_base: Option<String>,
}

pub struct LoadedResolver {
    pub resolver: SourceResolver,
    pub provider_name: String,
    pub config: TaxopeekConfig,
}

/// Rendered article body as returned by the encyclopedia, after redirects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleMarkup {
    pub title: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageSummary {
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    /// File name of the first image statement, if any.
    pub image_file: Option<String>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("config load failed: {0}")]
    Config(#[from] taxopeek_config::ConfigError),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("response decoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    #[error("invalid source response: {0}")]
    InvalidResponse(String),
}

/// Article-shaped reference source. `Ok(None)` means the source answered but
/// has nothing usable for the title.
#[async_trait]
pub trait EncyclopediaSource: Send + Sync {
    async fn article_markup(&self, title: &str) -> Result<Option<ArticleMarkup>, SourceError>;

    async fn page_summary(&self, title: &str) -> Result<Option<PageSummary>, SourceError>;

    fn source_name(&self) -> &str;

    /// Origin that relative links inside article markup resolve against.
    fn origin(&self) -> &str;
}

#[async_trait]
pub trait KnowledgeBaseSource: Send + Sync {
    /// Candidate entity ids for a free-text title match, best match first.
    async fn search_entities(&self, text: &str) -> Result<Vec<String>, SourceError>;

    async fn entity(&self, entity_id: &str) -> Result<Option<EntityRecord>, SourceError>;

    fn source_name(&self) -> &str;
}

pub fn build_http_client(config: &SourcesConfig) -> Result<reqwest::Client, SourceError> {
    let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
    if let Some(timeout_ms) = config.timeout_ms {
        builder = builder.timeout(Duration::from_millis(timeout_ms));
    }
    Ok(builder.build()?)
}

pub fn load_resolver_from_config(
    workspace_root: impl AsRef<Path>,
    overrides: SourceOverrides,
) -> Result<LoadedResolver, SourceError> {
    let mut config = load_workspace_config(workspace_root)?;
    if let Some(base) = normalize_optional(overrides.wikipedia_base) {
        config.sources.wikipedia_base = base.trim_end_matches('/').to_owned();
    }
    if let Some(base) = normalize_optional(overrides.wikidata_base) {
        config.sources.wikidata_base = base.trim_end_matches('/').to_owned();
    }

    let selected_provider = overrides.provider.unwrap_or(config.sources.provider);
    let urls = ReferenceUrls::from_config(&config.sources);

    let resolver = match selected_provider {
        SourceProviderKind::Http => {
            let client = build_http_client(&config.sources)?;
            SourceResolver::new(
                Arc::new(WikipediaSource::new(
                    client.clone(),
                    &config.sources.wikipedia_base,
                )),
                Arc::new(WikidataSource::new(
                    client,
                    &config.sources.wikidata_base,
                    &config.sources.language,
                )),
                urls,
                config.extract,
            )
        }
        SourceProviderKind::Mock => SourceResolver::new(
            Arc::new(MockEncyclopedia::new().with_generated_articles()),
            Arc::new(MockKnowledgeBase::default()),
            urls,
            config.extract,
        ),
    };

    Ok(LoadedResolver {
        resolver,
        provider_name: selected_provider.as_str().to_owned(),
        config,
    })
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
