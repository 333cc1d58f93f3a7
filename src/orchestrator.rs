//! Request orchestration: concurrent engine fan-out, then consolidation.
//!
//! Queries every engine concurrently, bounds each call by its own timeout,
//! treats failures as empty contributions and hands the surviving
//! mentions to [`crate::pipeline::consolidate`].

use crate::config::MultinerConfig;
use crate::engine::NerEngine;
use crate::error::MultinerError;
use crate::ocr::TextPart;
use crate::pipeline::{consolidate, EngineOutput};
use crate::types::{ConsolidatedEntity, PartAnswer};

/// Run `engines` over `text` and consolidate their answers.
///
/// # Pipeline
///
/// 1. Fan out to all engines concurrently with [`futures::future::join_all`]
/// 2. Bound each call with [`MultinerConfig::timeout_for`]
/// 3. Log per-engine errors and timeouts at warn level; keep the rest
/// 4. Consolidate into the ordered answer list
///
/// Never fails: an engine that errors or times out simply contributes
/// nothing, and empty text short-circuits to an empty answer without
/// contacting any engine.
pub async fn recognize_with<E: NerEngine>(
    engines: &[E],
    text: &str,
    config: &MultinerConfig,
) -> Vec<ConsolidatedEntity> {
    if text.trim().is_empty() {
        tracing::debug!("empty input, skipping engines");
        return Vec::new();
    }

    let futures: Vec<_> = engines
        .iter()
        .map(|engine| async move {
            let id = engine.engine_id();
            let limit = config.timeout_for(id);
            let result = match tokio::time::timeout(limit, engine.extract(text, config)).await {
                Ok(result) => result,
                Err(_) => Err(MultinerError::Timeout(format!(
                    "{id} gave no answer within {}ms",
                    limit.as_millis()
                ))),
            };
            (engine, result)
        })
        .collect();

    let outcomes = futures::future::join_all(futures).await;

    let mut outputs: Vec<EngineOutput> = Vec::with_capacity(outcomes.len());
    for (engine, outcome) in outcomes {
        let id = engine.engine_id();
        match outcome {
            Ok(mentions) => {
                tracing::debug!(engine = %id, count = mentions.len(), "engine returned mentions");
                outputs.push(EngineOutput {
                    engine: id,
                    unit: engine.offset_unit(),
                    mentions,
                });
            }
            Err(err) => {
                tracing::warn!(engine = %id, reason = %err, "engine contributed nothing");
            }
        }
    }

    consolidate(&outputs, text, config)
}

/// Run [`recognize_with`] over each part of a document, in order.
///
/// Parts are processed one after another; engines within a part still run
/// concurrently.
pub async fn recognize_document_with<E: NerEngine>(
    engines: &[E],
    parts: &[TextPart],
    config: &MultinerConfig,
) -> Vec<PartAnswer> {
    let mut answers = Vec::with_capacity(parts.len());
    for part in parts {
        let entities = recognize_with(engines, &part.text, config).await;
        tracing::debug!(part = %part.name, entities = entities.len(), "part recognised");
        answers.push(PartAnswer {
            source: part.name.clone(),
            entities,
        });
    }
    answers
}
