//! Trait definition for pluggable NER engine backends.
//!
//! Each external engine (Stanford, Spotlight, and the spaCy/Polyglot/Flair
//! sidecars) implements [`NerEngine`] so the orchestrator can query them
//! uniformly and concurrently.

use crate::config::MultinerConfig;
use crate::error::MultinerError;
use crate::types::{EngineId, OffsetUnit, RawMention};

/// A black-box entity extraction provider.
///
/// Implementors handle their own transport, retries and response parsing,
/// and return mentions in their native offset and label space; the
/// pipeline takes care of reconciling them.
///
/// All implementations must be `Send + Sync` for concurrent engine queries.
pub trait NerEngine: Send + Sync {
    /// Extract entity mentions from `text`.
    ///
    /// # Errors
    ///
    /// Returns [`MultinerError`] if the engine cannot be reached or its
    /// response cannot be parsed. The orchestrator treats any error as an
    /// empty contribution.
    fn extract(
        &self,
        text: &str,
        config: &MultinerConfig,
    ) -> impl std::future::Future<Output = Result<Vec<RawMention>, MultinerError>> + Send;

    /// Returns which engine this implementation represents.
    fn engine_id(&self) -> EngineId;

    /// Unit of the offsets in returned mentions.
    fn offset_unit(&self) -> OffsetUnit {
        OffsetUnit::Char
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A mock engine for testing trait bounds and async execution.
    struct MockEngine {
        engine: EngineId,
        mentions: Vec<RawMention>,
    }

    impl NerEngine for MockEngine {
        async fn extract(
            &self,
            _text: &str,
            _config: &MultinerConfig,
        ) -> Result<Vec<RawMention>, MultinerError> {
            if self.mentions.is_empty() {
                return Err(MultinerError::EngineUnavailable("mock engine down".into()));
            }
            Ok(self.mentions.clone())
        }

        fn engine_id(&self) -> EngineId {
            self.engine
        }
    }

    #[test]
    fn mock_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockEngine>();
    }

    #[tokio::test]
    async fn mock_engine_returns_mentions() {
        let engine = MockEngine {
            engine: EngineId::Flair,
            mentions: vec![RawMention::new(EngineId::Flair, "Jansen", 0, "PER")],
        };
        let mentions = engine
            .extract("Jansen", &MultinerConfig::default())
            .await
            .expect("should succeed");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].text, "Jansen");
    }

    #[tokio::test]
    async fn mock_engine_propagates_errors() {
        let engine = MockEngine {
            engine: EngineId::Spacy,
            mentions: vec![],
        };
        let result = engine.extract("x", &MultinerConfig::default()).await;
        assert!(result.unwrap_err().to_string().contains("mock engine down"));
    }

    #[test]
    fn default_offset_unit_is_char() {
        let engine = MockEngine {
            engine: EngineId::Polyglot,
            mentions: vec![],
        };
        assert_eq!(engine.offset_unit(), OffsetUnit::Char);
        assert_eq!(engine.engine_id(), EngineId::Polyglot);
    }
}
