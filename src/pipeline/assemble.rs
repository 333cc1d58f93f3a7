//! Final ordering of consolidated entities.

use crate::types::ConsolidatedEntity;

/// Order entities by ascending `pos` and return the answer list.
///
/// The sort is stable, so entities keep their discovery order relative to
/// each other. Entities sharing a `pos` (different surfaces starting at
/// the same character, e.g. `Albert` and `Albert Einstein`) collapse to
/// the one found by most engines, the earlier one winning ties, which
/// keeps positions in the answer strictly ascending.
pub fn assemble(mut entities: Vec<ConsolidatedEntity>) -> Vec<ConsolidatedEntity> {
    entities.sort_by_key(|e| e.pos);

    let mut answer: Vec<ConsolidatedEntity> = Vec::with_capacity(entities.len());
    for entity in entities {
        match answer.last_mut() {
            Some(last) if last.pos == entity.pos => {
                let (kept, dropped) = if entity.count > last.count {
                    (entity, last.clone())
                } else {
                    (last.clone(), entity)
                };
                tracing::debug!(
                    pos = kept.pos,
                    kept = %kept.ne,
                    dropped = %dropped.ne,
                    "collapsing entities at the same position"
                );
                *last = kept;
            }
            _ => answer.push(entity),
        }
    }
    answer
}
