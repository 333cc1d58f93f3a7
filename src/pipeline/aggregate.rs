//! Agreement tallying and the trust policy.
//!
//! Each alignment group is reduced to one vote per engine (the engine's
//! first member in sweep order). From those votes:
//!
//! - `count` is the number of distinct engines
//! - the winning type has the most votes; ties go to the type voted by the
//!   highest-ranked anchor in the group, then to the alphabetically first
//! - `type_certainty` is the winner's vote count
//!
//! Whether the group is reported at all is decided by [`TrustPolicy`]:
//! anchors are trusted on their own, everything else needs corroboration.

use serde::{Deserialize, Serialize};

use crate::error::MultinerError;
use crate::types::{ConsolidatedEntity, EngineId, EntityType, NormalizedMention};

use super::align::AlignmentGroup;

/// Which engines are trusted unilaterally, and how much agreement the
/// others need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustPolicy {
    /// Engines whose mentions are reported without corroboration, highest
    /// priority first. Priority breaks type-vote ties.
    pub anchors: Vec<EngineId>,
    /// Distinct non-anchor engines that must agree when no anchor did.
    pub corroboration_threshold: usize,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            anchors: vec![EngineId::Stanford, EngineId::Spotlight],
            corroboration_threshold: 2,
        }
    }
}

impl TrustPolicy {
    pub fn is_anchor(&self, engine: EngineId) -> bool {
        self.anchors.contains(&engine)
    }

    fn anchor_rank(&self, engine: EngineId) -> Option<usize> {
        self.anchors.iter().position(|a| *a == engine)
    }

    /// Whether a mention found by `sources` should be reported.
    pub fn admits(&self, sources: &[EngineId]) -> bool {
        if sources.iter().any(|s| self.is_anchor(*s)) {
            return true;
        }
        let corroborating = sources.iter().filter(|s| !self.is_anchor(**s)).count();
        corroborating >= self.corroboration_threshold
    }

    /// Rejects a threshold of zero, which would admit every mention.
    pub fn validate(&self) -> Result<(), MultinerError> {
        if self.corroboration_threshold == 0 {
            return Err(MultinerError::Config(
                "corroboration_threshold must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of tallying one admitted alignment group.
///
/// Everything a [`ConsolidatedEntity`] needs except its context strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agreement {
    pub count: usize,
    pub ner_src: Vec<EngineId>,
    pub entity_type: EntityType,
    pub type_certainty: usize,
    pub types: Vec<EntityType>,
    /// Canonical span reported for the group.
    pub start: usize,
    pub end: usize,
    /// Canonical surface text of that span.
    pub ne: String,
}

impl Agreement {
    /// Attach context strings, producing the final answer entity.
    pub fn into_entity(self, left_context: String, right_context: String) -> ConsolidatedEntity {
        ConsolidatedEntity {
            count: self.count,
            type_certainty: self.type_certainty,
            entity_type: self.entity_type,
            right_context,
            pos: self.start,
            ne_context: self.ne.clone(),
            ne: self.ne,
            ner_src: self.ner_src,
            left_context,
            types: self.types,
        }
    }
}

/// Tally one group, returning `None` when the policy rejects it.
pub fn aggregate(group: &AlignmentGroup, policy: &TrustPolicy) -> Option<Agreement> {
    let votes = first_vote_per_source(&group.members);
    let ner_src = group.sources();

    if !policy.admits(&ner_src) {
        tracing::trace!(surface = %group.key, sources = ner_src.len(), "group not corroborated");
        return None;
    }

    // (type, votes) in first-seen order.
    let mut tally: Vec<(EntityType, usize)> = Vec::new();
    for vote in &votes {
        match tally.iter_mut().find(|(t, _)| *t == vote.entity_type) {
            Some((_, n)) => *n += 1,
            None => tally.push((vote.entity_type, 1)),
        }
    }

    let top = tally.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let tied: Vec<EntityType> = tally
        .iter()
        .filter(|(_, n)| *n == top)
        .map(|(t, _)| *t)
        .collect();

    let anchor_choice = votes
        .iter()
        .filter(|v| tied.contains(&v.entity_type))
        .filter_map(|v| policy.anchor_rank(v.source).map(|rank| (rank, v.entity_type)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, t)| t);

    let entity_type = anchor_choice
        .or_else(|| tied.iter().copied().min_by_key(|t| t.as_str()))
        .unwrap_or(EntityType::Other);

    tally.sort_by(|(ta, na), (tb, nb)| {
        (*tb == entity_type)
            .cmp(&(*ta == entity_type))
            .then(nb.cmp(na))
            .then(ta.as_str().cmp(tb.as_str()))
    });

    let shown = representative(&votes, policy)?;

    Some(Agreement {
        count: ner_src.len(),
        ner_src,
        entity_type,
        type_certainty: top,
        types: tally.into_iter().map(|(t, _)| t).collect(),
        start: shown.start,
        end: shown.end,
        ne: shown.text.clone(),
    })
}

fn first_vote_per_source(members: &[NormalizedMention]) -> Vec<&NormalizedMention> {
    let mut votes: Vec<&NormalizedMention> = Vec::with_capacity(members.len());
    for member in members {
        if !votes.iter().any(|v| v.source == member.source) {
            votes.push(member);
        }
    }
    votes
}

/// The span the group is reported under.
///
/// The highest-priority anchor's span if any anchor voted; otherwise the
/// span most engines agree on, then the earliest, then the shortest.
fn representative<'a>(
    votes: &[&'a NormalizedMention],
    policy: &TrustPolicy,
) -> Option<&'a NormalizedMention> {
    let anchor = votes
        .iter()
        .filter_map(|v| policy.anchor_rank(v.source).map(|rank| (rank, *v)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, v)| v);
    if anchor.is_some() {
        return anchor;
    }

    let agreeing = |m: &NormalizedMention| {
        votes
            .iter()
            .filter(|v| v.start == m.start && v.end == m.end)
            .count()
    };
    votes
        .iter()
        .copied()
        .min_by(|a, b| {
            agreeing(*b)
                .cmp(&agreeing(*a))
                .then(a.start.cmp(&b.start))
                .then(a.end.cmp(&b.end))
        })
}
