//! # multiner
//!
//! Consolidated named-entity recognition over several independent engines.
//!
//! A text is sent to every configured NER engine concurrently (Stanford,
//! DBpedia Spotlight, and spaCy / Polyglot / Flair sidecars). Their
//! mentions are re-anchored on the original text, grouped per occurrence,
//! voted on, filtered by a trust policy and returned as one ordered list
//! with left and right context.
//!
//! ## Design
//!
//! - Engines are black boxes behind [`NerEngine`]; each reports offsets and
//!   labels in its own space
//! - Offsets are recovered against the original text, so tokenisation and
//!   encoding differences between engines do not split an occurrence
//! - Stanford and Spotlight are anchors: their word alone admits an entity,
//!   anything else needs corroboration from a second engine
//! - Graceful degradation: failed or slow engines contribute nothing and
//!   never fail the request
//! - No state is shared between requests

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod http;
pub mod ocr;
pub mod orchestrator;
pub mod pipeline;
pub mod types;

pub use config::MultinerConfig;
pub use engine::NerEngine;
pub use error::{MultinerError, Result};
pub use ocr::TextPart;
pub use pipeline::aggregate::TrustPolicy;
pub use types::{ConsolidatedEntity, EngineId, EntityType, ManualMatch, PartAnswer};

/// Recognise entities in `text` using every engine enabled in `config`.
///
/// # Errors
///
/// Returns [`MultinerError::Config`] if `config` is invalid. Engine failures
/// are logged and degrade the answer; they never surface as errors.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> multiner::Result<()> {
/// let config = multiner::MultinerConfig::default();
/// let entities = multiner::recognize("Albert Einstein woonde in Leiden.", &config).await?;
/// for entity in &entities {
///     println!("{} ({}) x{}", entity.ne, entity.entity_type, entity.count);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn recognize(text: &str, config: &MultinerConfig) -> Result<Vec<ConsolidatedEntity>> {
    let engines = engines::build_engines(config)?;
    Ok(orchestrator::recognize_with(&engines, text, config).await)
}

/// Recognise entities in every part of a document.
///
/// # Errors
///
/// Same as [`recognize`].
pub async fn recognize_document(
    parts: &[TextPart],
    config: &MultinerConfig,
) -> Result<Vec<PartAnswer>> {
    let engines = engines::build_engines(config)?;
    Ok(orchestrator::recognize_document_with(&engines, parts, config).await)
}

/// Fetch a KB / Delpher OCR record and recognise entities in each part.
///
/// # Errors
///
/// Returns [`MultinerError::Config`] for an invalid configuration and
/// [`MultinerError::Http`] if the record cannot be downloaded.
pub async fn recognize_ocr(url: &str, config: &MultinerConfig) -> Result<Vec<PartAnswer>> {
    config.validate()?;
    let parts = ocr::fetch_ocr(url, config).await?;
    recognize_document(&parts, config).await
}

/// Locate a user-supplied entity string in `text` without consulting any
/// engine.
pub fn manual_find(text: &str, needle: &str, source: &str, config: &MultinerConfig) -> ManualMatch {
    pipeline::context::manual_find(text, needle, source, &config.context)
}
