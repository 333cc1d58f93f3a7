//! Span alignment: one group per real mention occurrence.
//!
//! All normalised mentions from all engines are sorted by canonical start
//! and swept once from left to right. A mention joins an open group when
//! its span overlaps the group (within `position_tolerance` characters)
//! and its surface key equals the group's key; otherwise it opens a new
//! group. An engine never places two disjoint spans in one group. When
//! several open groups qualify, the one whose start is closest wins, then
//! the one opened first.
//!
//! The sort key includes the engine id and surface text, so the grouping
//! does not depend on the order engines were enumerated in.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::AlignmentConfig;
use crate::types::{EngineId, NormalizedMention};

/// Mentions judged to denote the same occurrence in the text.
#[derive(Debug, Clone)]
pub struct AlignmentGroup {
    /// Members in sweep order.
    pub members: Vec<NormalizedMention>,
    /// Smallest member start.
    pub start: usize,
    /// Largest member end.
    pub end: usize,
    /// Surface key shared by every member.
    pub key: String,
}

impl AlignmentGroup {
    fn open(mention: NormalizedMention, key: String) -> Self {
        Self {
            start: mention.start,
            end: mention.end,
            members: vec![mention],
            key,
        }
    }

    fn admit(&mut self, mention: NormalizedMention) {
        self.start = self.start.min(mention.start);
        self.end = self.end.max(mention.end);
        self.members.push(mention);
    }

    /// Whether `mention` lies on or within `tolerance` characters of this group.
    ///
    /// An engine that already contributed to the group and reports a
    /// non-overlapping span is describing a second occurrence, so only
    /// overlap counts for it.
    fn accepts(&self, mention: &NormalizedMention, tolerance: usize) -> bool {
        let overlaps = mention.start < self.end && mention.end > self.start;
        if self.members.iter().any(|m| m.source == mention.source) {
            return overlaps;
        }
        overlaps || (mention.start < self.end + tolerance && mention.end + tolerance > self.start)
    }

    /// Distinct contributing engines, sorted by name.
    pub fn sources(&self) -> Vec<EngineId> {
        let mut sources: Vec<EngineId> = Vec::with_capacity(self.members.len());
        for member in &self.members {
            if !sources.contains(&member.source) {
                sources.push(member.source);
            }
        }
        sources.sort_by_key(|s| s.name());
        sources
    }
}

/// Comparison key for a surface string.
///
/// Lowercases, replaces punctuation with spaces and collapses whitespace,
/// so `"Albert Einstein."` and `"albert  einstein"` compare equal. With
/// `fold_diacritics`, combining marks are removed after canonical
/// decomposition (`René` → `rene`). Surfaces consisting only of
/// punctuation keep their lowercased form so they do not all collide on
/// the empty key.
pub fn surface_key(text: &str, fold_diacritics: bool) -> String {
    let folded: String = if fold_diacritics {
        text.nfd().filter(|c| !is_combining_mark(*c)).collect()
    } else {
        text.nfc().collect()
    };

    let stripped: String = folded
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let key = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if key.is_empty() {
        text.trim().to_lowercase()
    } else {
        key
    }
}

/// Cluster mentions from all engines into alignment groups.
///
/// Groups are returned in discovery order, i.e. ascending start.
pub fn align(
    mut mentions: Vec<NormalizedMention>,
    config: &AlignmentConfig,
) -> Vec<AlignmentGroup> {
    mentions.sort_by(|a, b| {
        (a.start, a.end, a.source.name(), &a.text)
            .cmp(&(b.start, b.end, b.source.name(), &b.text))
    });

    let tolerance = config.position_tolerance;
    let mut groups: Vec<AlignmentGroup> = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    for mention in mentions {
        // Starts only grow, so a group left behind can never be reached again.
        open.retain(|&i| groups[i].end + tolerance > mention.start);

        let key = surface_key(&mention.text, config.fold_diacritics);
        let target = open
            .iter()
            .copied()
            .filter(|&i| groups[i].key == key && groups[i].accepts(&mention, tolerance))
            .min_by_key(|&i| (groups[i].start.abs_diff(mention.start), i));

        match target {
            Some(i) => groups[i].admit(mention),
            None => {
                open.push(groups.len());
                groups.push(AlignmentGroup::open(mention, key));
            }
        }
    }

    tracing::debug!(groups = groups.len(), "mentions aligned");
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityType;

    fn mention(source: EngineId, text: &str, start: usize) -> NormalizedMention {
        NormalizedMention {
            source,
            text: text.to_string(),
            start,
            end: start + text.chars().count(),
            entity_type: EntityType::Person,
        }
    }

    #[test]
    fn surface_key_ignores_case_and_punctuation() {
        assert_eq!(surface_key("Albert Einstein.", true), "albert einstein");
        assert_eq!(surface_key("ALBERT   einstein", true), "albert einstein");
    }

    #[test]
    fn surface_key_folds_diacritics_when_enabled() {
        assert_eq!(surface_key("René", true), "rene");
        assert_eq!(surface_key("René", false), "rené");
    }

    #[test]
    fn surface_key_keeps_punctuation_only_surfaces() {
        assert_eq!(surface_key("&", true), "&");
    }

    #[test]
    fn same_span_from_three_engines_forms_one_group() {
        let mentions = vec![
            mention(EngineId::Stanford, "Manchon", 10),
            mention(EngineId::Spacy, "Manchon", 10),
            mention(EngineId::Flair, "Manchon", 10),
        ];
        let groups = align(mentions, &AlignmentConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 3);
        assert_eq!(
            groups[0].sources(),
            vec![EngineId::Flair, EngineId::Spacy, EngineId::Stanford]
        );
    }

    #[test]
    fn trailing_punctuation_span_still_aligns() {
        let mentions = vec![
            mention(EngineId::Stanford, "Albert Einstein", 37),
            mention(EngineId::Flair, "Albert Einstein.", 37),
        ];
        let groups = align(mentions, &AlignmentConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].end, 53);
    }

    #[test]
    fn different_surface_at_same_position_splits() {
        let mentions = vec![
            mention(EngineId::Stanford, "Albert Einstein", 37),
            mention(EngineId::Spacy, "Albert", 37),
        ];
        let groups = align(mentions, &AlignmentConfig::default());
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn repeated_name_far_apart_forms_separate_groups() {
        let mentions = vec![
            mention(EngineId::Stanford, "Jansen", 0),
            mention(EngineId::Spacy, "Jansen", 0),
            mention(EngineId::Stanford, "Jansen", 40),
            mention(EngineId::Spacy, "Jansen", 40),
        ];
        let groups = align(mentions, &AlignmentConfig::default());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].start, 0);
        assert_eq!(groups[1].start, 40);
    }

    #[test]
    fn small_offset_drift_within_tolerance_aligns() {
        let mentions = vec![
            mention(EngineId::Stanford, "Utrecht", 20),
            mention(EngineId::Polyglot, "Utrecht", 21),
        ];
        let groups = align(mentions, &AlignmentConfig::default());
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn adjacent_occurrences_stay_apart() {
        // "Jan Jan": the second occurrence is within tolerance of the first,
        // but each engine already placed a mention in the first group.
        let mentions = vec![
            mention(EngineId::Stanford, "Jan", 0),
            mention(EngineId::Stanford, "Jan", 4),
            mention(EngineId::Spacy, "Jan", 0),
            mention(EngineId::Spacy, "Jan", 4),
        ];
        let groups = align(mentions, &AlignmentConfig::default());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].start, 0);
        assert_eq!(groups[1].start, 4);
        assert_eq!(groups[0].sources().len(), 2);
        assert_eq!(groups[1].sources().len(), 2);
    }

    #[test]
    fn grouping_is_independent_of_input_order() {
        let forward = vec![
            mention(EngineId::Stanford, "Rotterdam", 5),
            mention(EngineId::Flair, "Rotterdam", 5),
            mention(EngineId::Spacy, "Delft", 20),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let a = align(forward, &AlignmentConfig::default());
        let b = align(backward, &AlignmentConfig::default());
        assert_eq!(a.len(), b.len());
        for (ga, gb) in a.iter().zip(&b) {
            assert_eq!(ga.start, gb.start);
            assert_eq!(ga.members, gb.members);
        }
    }

    #[test]
    fn empty_input_returns_no_groups() {
        assert!(align(vec![], &AlignmentConfig::default()).is_empty());
    }
}
