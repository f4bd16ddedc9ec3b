use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use taxopeek_config::SourcesConfig;

/// Characters left unescaped when a value is used as a single URL component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Builds the user-facing links shown in a popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceUrls {
    wikipedia_base: String,
    wikidata_base: String,
    wikispecies_base: String,
    commons_base: String,
}

impl ReferenceUrls {
    pub fn from_config(config: &SourcesConfig) -> Self {
        Self {
            wikipedia_base: config.wikipedia_base.clone(),
            wikidata_base: config.wikidata_base.clone(),
            wikispecies_base: config.wikispecies_base.clone(),
            commons_base: config.commons_base.clone(),
        }
    }

    pub fn article_url(&self, title: &str) -> String {
        format!("{}/wiki/{}", self.wikipedia_base, encode_component(title))
    }

    pub fn entity_url(&self, entity_id: &str) -> String {
        format!("{}/wiki/{}", self.wikidata_base, entity_id)
    }

    pub fn wikispecies_url(&self, subject: &str) -> String {
        format!("{}/wiki/{}", self.wikispecies_base, encode_component(subject))
    }

    pub fn commons_image_url(&self, file_name: &str) -> String {
        format!(
            "{}/wiki/Special:FilePath/{}?width=300",
            self.commons_base,
            encode_component(file_name)
        )
    }
}

impl Default for ReferenceUrls {
    fn default() -> Self {
        Self::from_config(&SourcesConfig::default())
    }
}
