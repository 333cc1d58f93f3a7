//! Aggregator configuration with sensible defaults.
//!
//! [`MultinerConfig`] controls which engines are consulted, where they
//! live, how long each may take, the trust policy, and the tunables of the
//! alignment and context stages. It is passed explicitly to every request;
//! there is no process-wide configuration state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{MultinerError, Result};
use crate::pipeline::aggregate::TrustPolicy;
use crate::types::EngineId;

/// Top-level configuration for one MultiNER deployment.
///
/// Use [`Default::default()`] for the standard five-engine setup, or load
/// overrides from TOML with [`MultinerConfig::from_file`]. Missing fields
/// fall back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultinerConfig {
    /// Engines to consult. Queried concurrently for every text.
    pub engines: Vec<EngineId>,
    pub stanford: StanfordConfig,
    pub spotlight: SpotlightConfig,
    pub spacy: TaggerConfig,
    pub polyglot: TaggerConfig,
    pub flair: TaggerConfig,
    /// Per-engine call timeout in milliseconds for non-anchor engines.
    pub timeout_ms: u64,
    /// Per-engine call timeout in milliseconds for anchor engines.
    pub anchor_timeout_ms: u64,
    /// How many times a failed connection or request is retried.
    pub max_retries: u32,
    /// Random delay range in milliseconds `(min, max)` between retries.
    pub retry_delay_ms: (u64, u64),
    /// User-Agent sent to HTTP engines. Defaults to `multiner/<version>`.
    pub user_agent: Option<String>,
    pub policy: TrustPolicy,
    pub alignment: AlignmentConfig,
    pub context: ContextConfig,
}

/// Stanford NER socket server location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StanfordConfig {
    pub host: String,
    pub port: u16,
}

impl Default for StanfordConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 9092,
        }
    }
}

/// DBpedia Spotlight REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotlightConfig {
    /// Full annotate endpoint, e.g. `http://localhost:9091/rest/annotate/`.
    pub url: String,
    /// Annotation confidence threshold passed to Spotlight.
    pub confidence: f64,
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9091/rest/annotate/".into(),
            confidence: 0.9,
        }
    }
}

/// JSON tagger sidecar fronting an in-process NLP library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerConfig {
    pub url: String,
}

impl TaggerConfig {
    fn local(port: u16) -> Self {
        Self {
            url: format!("http://localhost:{port}/ner"),
        }
    }
}

/// Tunables for offset normalisation and span alignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Characters two spans may be apart and still be aligned.
    pub position_tolerance: usize,
    /// Characters around an engine's offset searched for its surface text.
    pub offset_search_window: usize,
    /// Ignore diacritics when comparing surface text (`René` == `Rene`).
    pub fold_diacritics: bool,
    /// Minimum normalised Levenshtein similarity for a fuzzy offset match.
    pub min_similarity: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            position_tolerance: 2,
            offset_search_window: 32,
            fold_diacritics: true,
            min_similarity: 0.85,
        }
    }
}

/// Unit in which the context window is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextUnit {
    #[default]
    Chars,
    Words,
}

/// Left/right context extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub window: usize,
    pub unit: ContextUnit,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window: 40,
            unit: ContextUnit::Chars,
        }
    }
}

impl Default for MultinerConfig {
    fn default() -> Self {
        Self {
            engines: EngineId::all().to_vec(),
            stanford: StanfordConfig::default(),
            spotlight: SpotlightConfig::default(),
            spacy: TaggerConfig::local(9093),
            polyglot: TaggerConfig::local(9094),
            flair: TaggerConfig::local(9095),
            timeout_ms: 10_000,
            anchor_timeout_ms: 20_000,
            max_retries: 3,
            retry_delay_ms: (100, 500),
            user_agent: None,
            policy: TrustPolicy::default(),
            alignment: AlignmentConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

impl MultinerConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `engines` must not be empty or list an engine twice
    /// - both timeouts must be greater than 0
    /// - `retry_delay_ms.0` must be <= `retry_delay_ms.1`
    /// - endpoint URLs of enabled HTTP engines must parse
    /// - Spotlight confidence and `min_similarity` must lie in `[0, 1]`
    /// - the trust policy must be usable
    pub fn validate(&self) -> Result<()> {
        if self.engines.is_empty() {
            return Err(MultinerError::Config(
                "at least one engine must be enabled".into(),
            ));
        }
        for (i, engine) in self.engines.iter().enumerate() {
            if self.engines[..i].contains(engine) {
                return Err(MultinerError::Config(format!(
                    "engine {engine} is listed more than once"
                )));
            }
        }
        if self.timeout_ms == 0 || self.anchor_timeout_ms == 0 {
            return Err(MultinerError::Config(
                "timeout_ms and anchor_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.retry_delay_ms.0 > self.retry_delay_ms.1 {
            return Err(MultinerError::Config(
                "retry_delay_ms min must be <= max".into(),
            ));
        }
        if self.engines.contains(&EngineId::Stanford) && self.stanford.host.trim().is_empty() {
            return Err(MultinerError::Config("stanford host must not be empty".into()));
        }
        for engine in &self.engines {
            if let Some(url) = self.endpoint_url(*engine) {
                Url::parse(url).map_err(|e| {
                    MultinerError::Config(format!("invalid {engine} url '{url}': {e}"))
                })?;
            }
        }
        if !(0.0..=1.0).contains(&self.spotlight.confidence) {
            return Err(MultinerError::Config(
                "spotlight confidence must be within [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.alignment.min_similarity) {
            return Err(MultinerError::Config(
                "alignment min_similarity must be within [0, 1]".into(),
            ));
        }
        self.policy.validate()
    }

    /// HTTP endpoint for `engine`, or `None` for the socket-based Stanford engine.
    pub fn endpoint_url(&self, engine: EngineId) -> Option<&str> {
        match engine {
            EngineId::Stanford => None,
            EngineId::Spotlight => Some(&self.spotlight.url),
            EngineId::Spacy => Some(&self.spacy.url),
            EngineId::Polyglot => Some(&self.polyglot.url),
            EngineId::Flair => Some(&self.flair.url),
        }
    }

    /// Call timeout for `engine`; anchors get the longer anchor timeout.
    pub fn timeout_for(&self, engine: EngineId) -> Duration {
        if self.policy.is_anchor(engine) {
            Duration::from_millis(self.anchor_timeout_ms)
        } else {
            Duration::from_millis(self.timeout_ms)
        }
    }

    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| MultinerError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MultinerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/multiner/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("multiner").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("multiner")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/multiner-config/config.toml")
        }
    }
}
