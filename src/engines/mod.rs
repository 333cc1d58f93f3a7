//! NER engine adapters.
//!
//! Each module provides a struct implementing [`crate::engine::NerEngine`]
//! for one external engine. [`Engine`] wraps them so a mixed set can be
//! held in one slice and queried concurrently.

pub mod spotlight;
pub mod stanford;
pub mod tagger;

pub use spotlight::SpotlightEngine;
pub use stanford::StanfordEngine;
pub use tagger::TaggerEngine;

use crate::config::MultinerConfig;
use crate::engine::NerEngine;
use crate::error::MultinerError;
use crate::http;
use crate::pipeline::normalize::sequential_offsets;
use crate::types::{EngineId, OffsetUnit, RawMention};

/// Any of the built-in engine adapters.
pub enum Engine {
    Stanford(StanfordEngine),
    Spotlight(SpotlightEngine),
    Tagger(TaggerEngine),
}

impl NerEngine for Engine {
    async fn extract(
        &self,
        text: &str,
        config: &MultinerConfig,
    ) -> Result<Vec<RawMention>, MultinerError> {
        match self {
            Self::Stanford(engine) => engine.extract(text, config).await,
            Self::Spotlight(engine) => engine.extract(text, config).await,
            Self::Tagger(engine) => engine.extract(text, config).await,
        }
    }

    fn engine_id(&self) -> EngineId {
        match self {
            Self::Stanford(engine) => engine.engine_id(),
            Self::Spotlight(engine) => engine.engine_id(),
            Self::Tagger(engine) => engine.engine_id(),
        }
    }

    fn offset_unit(&self) -> OffsetUnit {
        match self {
            Self::Stanford(engine) => engine.offset_unit(),
            Self::Spotlight(engine) => engine.offset_unit(),
            Self::Tagger(engine) => engine.offset_unit(),
        }
    }
}

/// Build adapters for every engine enabled in `config`.
///
/// HTTP engines share one client. Nothing here is global: the returned
/// engines are passed explicitly to each request.
///
/// # Errors
///
/// Returns [`MultinerError::Config`] for an invalid configuration or
/// [`MultinerError::Http`] if the HTTP client cannot be built.
pub fn build_engines(config: &MultinerConfig) -> Result<Vec<Engine>, MultinerError> {
    config.validate()?;
    let client = http::build_client(config)?;

    Ok(config
        .engines
        .iter()
        .map(|id| match id {
            EngineId::Stanford => Engine::Stanford(StanfordEngine::new(&config.stanford)),
            EngineId::Spotlight => {
                Engine::Spotlight(SpotlightEngine::new(client.clone(), &config.spotlight))
            }
            EngineId::Spacy => {
                Engine::Tagger(TaggerEngine::new(*id, client.clone(), &config.spacy))
            }
            EngineId::Polyglot => {
                Engine::Tagger(TaggerEngine::new(*id, client.clone(), &config.polyglot))
            }
            EngineId::Flair => {
                Engine::Tagger(TaggerEngine::new(*id, client.clone(), &config.flair))
            }
        })
        .collect())
}

/// Build raw mentions from `(surface, label)` pairs, recovering char
/// offsets by searching `text` in order.
pub(crate) fn mentions_in_order(
    source: EngineId,
    text: &str,
    items: Vec<(String, String)>,
) -> Vec<RawMention> {
    let surfaces: Vec<&str> = items.iter().map(|(surface, _)| surface.as_str()).collect();
    let offsets = sequential_offsets(text, &surfaces);
    items
        .into_iter()
        .zip(offsets)
        .map(|((surface, label), start)| RawMention::new(source, surface.trim(), start, label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_engines_follows_config_order() {
        let config = MultinerConfig {
            engines: vec![EngineId::Flair, EngineId::Stanford, EngineId::Spotlight],
            ..Default::default()
        };
        let engines = build_engines(&config).expect("build");
        let ids: Vec<EngineId> = engines.iter().map(|e| e.engine_id()).collect();
        assert_eq!(
            ids,
            vec![EngineId::Flair, EngineId::Stanford, EngineId::Spotlight]
        );
    }

    #[test]
    fn build_engines_rejects_invalid_config() {
        let config = MultinerConfig {
            engines: vec![],
            ..Default::default()
        };
        assert!(build_engines(&config).is_err());
    }

    #[test]
    fn engine_offset_units() {
        let engines = build_engines(&MultinerConfig::default()).expect("build");
        for engine in &engines {
            let expected = match engine.engine_id() {
                EngineId::Spotlight => OffsetUnit::Utf16,
                _ => OffsetUnit::Char,
            };
            assert_eq!(engine.offset_unit(), expected);
        }
    }

    #[test]
    fn mentions_in_order_assigns_offsets() {
        let mentions = mentions_in_order(
            EngineId::Polyglot,
            "Piet en Piet Jansen",
            vec![
                ("Piet".into(), "I-PER".into()),
                ("Piet Jansen".into(), "I-PER".into()),
            ],
        );
        assert_eq!(mentions[0].start, 0);
        assert_eq!(mentions[1].start, 8);
        assert_eq!(mentions[1].end, 19);
    }
}
