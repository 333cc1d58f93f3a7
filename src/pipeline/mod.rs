//! Consolidation pipeline: normalise, align, aggregate, contextualise, assemble.
//!
//! Purely synchronous and request-local. The orchestrator collects every
//! engine's raw mentions first and hands them over as [`EngineOutput`]s.

pub mod aggregate;
pub mod align;
pub mod assemble;
pub mod context;
pub mod normalize;

use crate::config::MultinerConfig;
use crate::types::{ConsolidatedEntity, EngineId, OffsetUnit, RawMention};

use self::align::align;
use self::assemble::assemble;
use self::context::extract_context;
use self::normalize::{normalize, CanonicalText};

/// Everything one engine reported for one text.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub engine: EngineId,
    pub unit: OffsetUnit,
    pub mentions: Vec<RawMention>,
}

/// Merge per-engine mentions for `text` into the ordered answer list.
///
/// # Pipeline
///
/// 1. Re-anchor each engine's mentions on canonical char offsets
/// 2. Align mentions of the same occurrence into groups
/// 3. Tally each group and apply the trust policy
/// 4. Extract left/right context for admitted groups
/// 5. Order by position
///
/// Empty or whitespace-only text yields an empty answer.
pub fn consolidate(
    outputs: &[EngineOutput],
    text: &str,
    config: &MultinerConfig,
) -> Vec<ConsolidatedEntity> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let canonical = CanonicalText::new(text);

    let mentions: Vec<_> = outputs
        .iter()
        .flat_map(|output| normalize(&output.mentions, output.unit, &canonical, &config.alignment))
        .collect();
    tracing::debug!(mentions = mentions.len(), "mentions normalised");

    let groups = align(mentions, &config.alignment);

    let entities: Vec<ConsolidatedEntity> = groups
        .iter()
        .filter_map(|group| aggregate::aggregate(group, &config.policy))
        .map(|agreement| {
            let (left, right) =
                extract_context(&canonical, agreement.start, agreement.end, &config.context);
            agreement.into_entity(left, right)
        })
        .collect();
    tracing::debug!(
        groups = groups.len(),
        admitted = entities.len(),
        "groups aggregated"
    );

    assemble(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityType;

    fn output(engine: EngineId, mentions: Vec<(&str, usize, &str)>) -> EngineOutput {
        EngineOutput {
            engine,
            unit: OffsetUnit::Char,
            mentions: mentions
                .into_iter()
                .map(|(text, start, label)| RawMention::new(engine, text, start, label))
                .collect(),
        }
    }

    #[test]
    fn empty_text_yields_empty_answer() {
        let outputs = vec![output(EngineId::Stanford, vec![("Jansen", 0, "PER")])];
        assert!(consolidate(&outputs, "", &MultinerConfig::default()).is_empty());
        assert!(consolidate(&outputs, "  \n ", &MultinerConfig::default()).is_empty());
    }

    #[test]
    fn pipeline_merges_and_orders() {
        let text = "Jansen reisde van Rotterdam naar Delft.";
        let outputs = vec![
            output(EngineId::Stanford, vec![("Rotterdam", 18, "I-LOC")]),
            output(
                EngineId::Spacy,
                vec![("Jansen", 0, "PER"), ("Delft", 33, "GPE")],
            ),
            output(EngineId::Flair, vec![("Jansen", 0, "PER")]),
        ];
        let answer = consolidate(&outputs, text, &MultinerConfig::default());

        assert_eq!(answer.len(), 2);
        assert_eq!(answer[0].ne, "Jansen");
        assert_eq!(answer[0].count, 2);
        assert_eq!(answer[0].entity_type, EntityType::Person);
        assert_eq!(answer[1].ne, "Rotterdam");
        assert_eq!(answer[1].pos, 18);
        assert_eq!(answer[1].ner_src, vec![EngineId::Stanford]);
    }

    #[test]
    fn unlocatable_mentions_do_not_fail_the_request() {
        let text = "Een korte zin over Leiden.";
        let outputs = vec![output(
            EngineId::Stanford,
            vec![("Groningen", 3, "LOC"), ("Leiden", 19, "LOC")],
        )];
        let answer = consolidate(&outputs, text, &MultinerConfig::default());
        assert_eq!(answer.len(), 1);
        assert_eq!(answer[0].ne, "Leiden");
    }
}
