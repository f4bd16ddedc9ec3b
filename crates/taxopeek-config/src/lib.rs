use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TAXOPEEK_DIR_NAME: &str = ".taxopeek";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_WIKIPEDIA_BASE: &str = "https://en.wikipedia.org";
pub const DEFAULT_WIKIDATA_BASE: &str = "https://www.wikidata.org";
pub const DEFAULT_WIKISPECIES_BASE: &str = "https://species.wikimedia.org";
pub const DEFAULT_COMMONS_BASE: &str = "https://commons.wikimedia.org";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_USER_AGENT: &str = concat!("taxopeek/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceProviderKind {
    #[default]
    Http,
    Mock,
}

impl SourceProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Mock => "mock",
        }
    }
}

impl std::str::FromStr for SourceProviderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "http" => Ok(Self::Http),
            "mock" => Ok(Self::Mock),
            other => Err(format!(
                "invalid source provider '{other}', expected one of: http, mock"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaxopeekConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub provider: SourceProviderKind,
    #[serde(default = "default_wikipedia_base")]
    pub wikipedia_base: String,
    #[serde(default = "default_wikidata_base")]
    pub wikidata_base: String,
    #[serde(default = "default_wikispecies_base")]
    pub wikispecies_base: String,
    #[serde(default = "default_commons_base")]
    pub commons_base: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            provider: SourceProviderKind::Http,
            wikipedia_base: default_wikipedia_base(),
            wikidata_base: default_wikidata_base(),
            wikispecies_base: default_wikispecies_base(),
            commons_base: default_commons_base(),
            language: default_language(),
            user_agent: default_user_agent(),
            timeout_ms: None,
        }
    }
}

/// Delays driving the popup's hide behavior, in milliseconds.
///
/// Leaving the anchor waits longer than leaving the popup so the pointer can
/// travel from one to the other without the popup flickering away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_anchor_hide_grace_ms")]
    pub anchor_hide_grace_ms: u64,
    #[serde(default = "default_popup_hide_grace_ms")]
    pub popup_hide_grace_ms: u64,
    #[serde(default = "default_collapse_ms")]
    pub collapse_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            anchor_hide_grace_ms: default_anchor_hide_grace_ms(),
            popup_hide_grace_ms: default_popup_hide_grace_ms(),
            collapse_ms: default_collapse_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfig {
    #[serde(default = "default_gap")]
    pub gap: f64,
    #[serde(default = "default_edge_margin")]
    pub edge_margin: f64,
    #[serde(default = "default_fallback_width")]
    pub fallback_width: f64,
    #[serde(default = "default_fallback_height")]
    pub fallback_height: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            gap: default_gap(),
            edge_margin: default_edge_margin(),
            fallback_width: default_fallback_width(),
            fallback_height: default_fallback_height(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_max_sentences")]
    pub max_sentences: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,
    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_sentences: default_max_sentences(),
            max_chars: default_max_chars(),
            min_paragraph_chars: default_min_paragraph_chars(),
            min_sentence_chars: default_min_sentence_chars(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn taxopeek_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(TAXOPEEK_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    taxopeek_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn load_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<TaxopeekConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(TaxopeekConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: TaxopeekConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<TaxopeekConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(taxopeek_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = TaxopeekConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

pub fn validate_config(config: &TaxopeekConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    for (name, base) in [
        ("wikipedia_base", &config.sources.wikipedia_base),
        ("wikidata_base", &config.sources.wikidata_base),
        ("wikispecies_base", &config.sources.wikispecies_base),
        ("commons_base", &config.sources.commons_base),
    ] {
        if !base.starts_with("https://") {
            warnings.push(ConfigWarning {
                code: "insecure_base_url",
                message: format!("sources.{name} = {base:?} does not use https"),
            });
        }
    }

    if config.extract.max_sentences == 0 {
        warnings.push(ConfigWarning {
            code: "empty_snippet",
            message: "extract.max_sentences = 0 makes every article render without a summary"
                .to_owned(),
        });
    }

    if config.timing.popup_hide_grace_ms > config.timing.anchor_hide_grace_ms {
        warnings.push(ConfigWarning {
            code: "grace_inverted",
            message: format!(
                "timing.popup_hide_grace_ms ({}) exceeds timing.anchor_hide_grace_ms ({}); \
the pointer may not reach the popup before it hides",
                config.timing.popup_hide_grace_ms, config.timing.anchor_hide_grace_ms
            ),
        });
    }

    if config.sources.timeout_ms == Some(0) {
        warnings.push(ConfigWarning {
            code: "zero_timeout",
            message: "sources.timeout_ms = 0 fails every request immediately".to_owned(),
        });
    }

    warnings
}

fn default_wikipedia_base() -> String {
    DEFAULT_WIKIPEDIA_BASE.to_owned()
}

fn default_wikidata_base() -> String {
    DEFAULT_WIKIDATA_BASE.to_owned()
}

fn default_wikispecies_base() -> String {
    DEFAULT_WIKISPECIES_BASE.to_owned()
}

fn default_commons_base() -> String {
    DEFAULT_COMMONS_BASE.to_owned()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_owned()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_owned()
}

fn default_anchor_hide_grace_ms() -> u64 {
    300
}

fn default_popup_hide_grace_ms() -> u64 {
    100
}

fn default_collapse_ms() -> u64 {
    150
}

fn default_gap() -> f64 {
    15.0
}

fn default_edge_margin() -> f64 {
    10.0
}

fn default_fallback_width() -> f64 {
    550.0
}

fn default_fallback_height() -> f64 {
    150.0
}

fn default_max_sentences() -> usize {
    2
}

fn default_max_chars() -> usize {
    350
}

fn default_min_paragraph_chars() -> usize {
    20
}

fn default_min_sentence_chars() -> usize {
    10
}

fn normalize_base_url(input: &str, fallback: fn() -> String) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_owned()
    }
}

fn normalize_non_empty(input: &str, fallback: fn() -> String) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_owned()
    }
}

fn normalize_dimension(value: f64, fallback: fn() -> f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback()
    }
}

fn normalize_config(mut config: TaxopeekConfig) -> TaxopeekConfig {
    let sources = &mut config.sources;
    sources.wikipedia_base = normalize_base_url(&sources.wikipedia_base, default_wikipedia_base);
    sources.wikidata_base = normalize_base_url(&sources.wikidata_base, default_wikidata_base);
    sources.wikispecies_base =
        normalize_base_url(&sources.wikispecies_base, default_wikispecies_base);
    sources.commons_base = normalize_base_url(&sources.commons_base, default_commons_base);
    sources.language = normalize_non_empty(&sources.language, default_language);
    sources.user_agent = normalize_non_empty(&sources.user_agent, default_user_agent);

    let placement = &mut config.placement;
    placement.gap = normalize_dimension(placement.gap, default_gap);
    placement.edge_margin = normalize_dimension(placement.edge_margin, default_edge_margin);
    placement.fallback_width = normalize_dimension(placement.fallback_width, default_fallback_width);
    placement.fallback_height =
        normalize_dimension(placement.fallback_height, default_fallback_height);

    config
}
