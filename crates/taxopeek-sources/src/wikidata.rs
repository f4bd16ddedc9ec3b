use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::{EntityRecord, KnowledgeBaseSource, SourceError};

pub const WIKIDATA_SOURCE_NAME: &str = "wikidata";
const IMAGE_PROPERTY: &str = "P18";

#[derive(Debug, Clone)]
pub struct WikidataSource {
    client: reqwest::Client,
    api_base: String,
    language: String,
}

impl WikidataSource {
    pub fn new(client: reqwest::Client, api_base: &str, language: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            language: language.to_owned(),
        }
    }

    fn api_url(&self, params: &[(&str, &str)]) -> Result<Url, SourceError> {
        Url::parse_with_params(&format!("{}/w/api.php", self.api_base), params)
            .map_err(|err| SourceError::InvalidUrl(err.to_string()))
    }

    async fn get_json(&self, url: Url) -> Result<Value, SourceError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?)
    }
}

#[async_trait]
impl KnowledgeBaseSource for WikidataSource {
    async fn search_entities(&self, text: &str) -> Result<Vec<String>, SourceError> {
        let url = self.api_url(&[
            ("action", "wbsearchentities"),
            ("search", text),
            ("language", &self.language),
            ("format", "json"),
        ])?;

        let response = self.get_json(url).await?;
        Ok(extract_search_ids(&response))
    }

    async fn entity(&self, entity_id: &str) -> Result<Option<EntityRecord>, SourceError> {
        let url = self.api_url(&[
            ("action", "wbgetentities"),
            ("ids", entity_id),
            ("props", "labels|descriptions|claims"),
            ("languages", &self.language),
            ("format", "json"),
        ])?;

        let response = self.get_json(url).await?;
        Ok(extract_entity(&response, entity_id, &self.language))
    }

    fn source_name(&self) -> &str {
        WIKIDATA_SOURCE_NAME
    }
}

fn extract_search_ids(response: &Value) -> Vec<String> {
    response
        .get("search")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit.get("id").and_then(Value::as_str))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn extract_entity(response: &Value, entity_id: &str, language: &str) -> Option<EntityRecord> {
    let entity = response.get("entities")?.get(entity_id)?;
    if !entity.is_object() || entity.get("missing").is_some() {
        return None;
    }

    let localized = |field: &str| {
        entity
            .get(field)
            .and_then(|values| values.get(language))
            .and_then(|value| value.get("value"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .filter(|value| !value.trim().is_empty())
    };

    let image_file = entity
        .pointer(&format!("/claims/{IMAGE_PROPERTY}/0/mainsnak/datavalue/value"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    Some(EntityRecord {
        id: entity_id.to_owned(),
        label: localized("labels"),
        description: localized("descriptions"),
        image_file,
    })
}
