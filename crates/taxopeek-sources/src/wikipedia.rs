use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use taxopeek_core::urls::encode_component;

use crate::{ArticleMarkup, EncyclopediaSource, PageSummary, SourceError};

pub const WIKIPEDIA_SOURCE_NAME: &str = "wikipedia";

#[derive(Debug, Clone)]
pub struct WikipediaSource {
    client: reqwest::Client,
    api_base: String,
}

impl WikipediaSource {
    pub fn new(client: reqwest::Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
        }
    }

    fn parse_url(&self, title: &str) -> Result<Url, SourceError> {
        Url::parse_with_params(
            &format!("{}/w/api.php", self.api_base),
            &[
                ("action", "parse"),
                ("page", title),
                ("prop", "text"),
                ("redirects", "1"),
                ("formatversion", "2"),
                ("format", "json"),
            ],
        )
        .map_err(|err| SourceError::InvalidUrl(err.to_string()))
    }

    fn summary_url(&self, title: &str) -> String {
        format!(
            "{}/api/rest_v1/page/summary/{}",
            self.api_base,
            encode_component(title)
        )
    }
}

#[async_trait]
impl EncyclopediaSource for WikipediaSource {
    async fn article_markup(&self, title: &str) -> Result<Option<ArticleMarkup>, SourceError> {
        let response = self
            .client
            .get(self.parse_url(title)?)
            .send()
            .await?
            .error_for_status()?
            .json::<ParseResponse>()
            .await?;

        Ok(response.parse.map(|parse| ArticleMarkup {
            title: parse.title,
            html: parse.text,
        }))
    }

    async fn page_summary(&self, title: &str) -> Result<Option<PageSummary>, SourceError> {
        let response = self.client.get(self.summary_url(title)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let summary = response
            .error_for_status()?
            .json::<SummaryResponse>()
            .await?;

        Ok(Some(PageSummary {
            thumbnail_url: summary
                .thumbnail
                .map(|thumbnail| thumbnail.source)
                .filter(|source| !source.trim().is_empty()),
        }))
    }

    fn source_name(&self) -> &str {
        WIKIPEDIA_SOURCE_NAME
    }

    fn origin(&self) -> &str {
        &self.api_base
    }
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    #[serde(default)]
    parse: Option<ParsePayload>,
}

#[derive(Debug, Deserialize)]
struct ParsePayload {
    title: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    thumbnail: Option<SummaryThumbnail>,
}

#[derive(Debug, Deserialize)]
struct SummaryThumbnail {
    source: String,
}
