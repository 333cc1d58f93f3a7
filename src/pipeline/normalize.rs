//! Offset normalisation onto the canonical character space of the input.
//!
//! Engines disagree on tokenisation and encoding: Spotlight counts UTF-16
//! code units, sidecars may count bytes, and engines that only return
//! surface strings get their offsets from a sequential search. Every
//! reported offset is therefore treated as a hint and re-anchored against
//! the original text:
//!
//! 1. Convert the hint from the engine's [`OffsetUnit`] to a char index
//! 2. Exact match at the hint
//! 3. Closest exact occurrence within `offset_search_window`
//! 4. Closest case-insensitive occurrence within the window
//! 5. Best bounded-Levenshtein match scoring at least `min_similarity`
//!
//! A mention that survives none of these is dropped and logged.

use crate::config::AlignmentConfig;
use crate::error::MultinerError;
use crate::types::{EntityType, NormalizedMention, OffsetUnit, RawMention};

/// The original input text, indexed by character.
#[derive(Debug, Clone)]
pub struct CanonicalText {
    chars: Vec<char>,
}

impl CanonicalText {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
        }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Characters `start..end`, clamped to the text bounds.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Convert an offset in `unit` to a character index.
    ///
    /// Offsets that fall inside a multi-unit character map to that
    /// character; offsets past the end clamp to the text length.
    pub fn char_index(&self, offset: usize, unit: OffsetUnit) -> usize {
        let width: fn(&char) -> usize = match unit {
            OffsetUnit::Char => return offset.min(self.chars.len()),
            OffsetUnit::Utf8Byte => |c| c.len_utf8(),
            OffsetUnit::Utf16 => |c| c.len_utf16(),
        };
        let mut consumed = 0;
        for (index, c) in self.chars.iter().enumerate() {
            if consumed >= offset {
                return index;
            }
            consumed += width(c);
            if consumed > offset {
                return index;
            }
        }
        self.chars.len()
    }

    /// Start of the occurrence of `needle` nearest to `hint`, at most `window` away.
    fn nearest_occurrence(
        &self,
        needle: &[char],
        hint: usize,
        window: usize,
        case_insensitive: bool,
    ) -> Option<usize> {
        let n = needle.len();
        if n == 0 || n > self.chars.len() {
            return None;
        }
        let lo = hint.saturating_sub(window);
        let hi = (hint + window).min(self.chars.len() - n);
        if lo > hi {
            return None;
        }
        (lo..=hi)
            .filter(|&s| {
                let hay = &self.chars[s..s + n];
                if case_insensitive {
                    hay.iter()
                        .zip(needle)
                        .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
                } else {
                    hay == needle
                }
            })
            .min_by_key(|&s| (s.abs_diff(hint), s))
    }

    /// Best fuzzy match of `needle` around `hint`, as `(start, end)`.
    fn fuzzy_near(
        &self,
        needle: &str,
        hint: usize,
        window: usize,
        min_similarity: f64,
    ) -> Option<(usize, usize)> {
        let target = needle.to_lowercase();
        let n = needle.chars().count();
        let lo = hint.saturating_sub(window);
        let hi = (hint + window).min(self.chars.len());
        let mut best: Option<(f64, usize, usize)> = None;

        for len in n.saturating_sub(2).max(1)..=n + 2 {
            for start in lo..=hi {
                let end = start + len;
                if end > self.chars.len() {
                    break;
                }
                let candidate = self.slice(start, end).to_lowercase();
                let score = strsim::normalized_levenshtein(&target, &candidate);
                if score < min_similarity {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((best_score, best_start, _)) => {
                        score > best_score
                            || (score == best_score
                                && start.abs_diff(hint) < best_start.abs_diff(hint))
                    }
                };
                if better {
                    best = Some((score, start, end));
                }
            }
        }
        best.map(|(_, start, end)| (start, end))
    }
}

/// Re-anchor one engine's mentions onto `text`.
///
/// Mentions that cannot be located are dropped with a `warn!` naming the
/// engine and reason; the remainder keep their input order.
pub fn normalize(
    raw_mentions: &[RawMention],
    unit: OffsetUnit,
    text: &CanonicalText,
    config: &AlignmentConfig,
) -> Vec<NormalizedMention> {
    let mut normalized = Vec::with_capacity(raw_mentions.len());
    for raw in raw_mentions {
        match locate(raw, unit, text, config) {
            Ok(mention) => normalized.push(mention),
            Err(err) => {
                tracing::warn!(engine = %raw.source, reason = %err, "dropping mention");
            }
        }
    }
    normalized
}

/// Locate a single raw mention in the canonical text.
///
/// # Errors
///
/// Returns [`MultinerError::OffsetMismatch`] when the surface text is
/// empty or cannot be found within the search window.
pub fn locate(
    raw: &RawMention,
    unit: OffsetUnit,
    text: &CanonicalText,
    config: &AlignmentConfig,
) -> Result<NormalizedMention, MultinerError> {
    let surface = raw.text.trim();
    if surface.is_empty() {
        return Err(MultinerError::OffsetMismatch(format!(
            "empty surface text at offset {}",
            raw.start
        )));
    }

    let needle: Vec<char> = surface.chars().collect();
    let n = needle.len();
    let leading = &raw.text[..raw.text.len() - raw.text.trim_start().len()];
    let leading_units = match unit {
        OffsetUnit::Char => leading.chars().count(),
        OffsetUnit::Utf8Byte => leading.len(),
        OffsetUnit::Utf16 => leading.encode_utf16().count(),
    };
    let hint = text.char_index(raw.start.saturating_add(leading_units), unit);
    let window = config.offset_search_window;

    let span = if hint + n <= text.len() && text.chars()[hint..hint + n] == needle[..] {
        Some((hint, hint + n))
    } else {
        text.nearest_occurrence(&needle, hint, window, false)
            .or_else(|| text.nearest_occurrence(&needle, hint, window, true))
            .map(|start| (start, start + n))
            .or_else(|| text.fuzzy_near(surface, hint, window, config.min_similarity))
    };

    let (start, end) = span.ok_or_else(|| {
        MultinerError::OffsetMismatch(format!("'{surface}' not found near offset {hint}"))
    })?;

    Ok(NormalizedMention {
        source: raw.source,
        text: text.slice(start, end),
        start,
        end,
        entity_type: EntityType::from_label(&raw.label),
    })
}

/// Assign char offsets to surface strings by searching the text in order.
///
/// Each search starts where the previous hit ended, which keeps repeated
/// names attached to successive occurrences. A surface that cannot be
/// found yields the current cursor as its hint and is left for
/// [`normalize`] to accept or drop.
pub fn sequential_offsets(text: &str, surfaces: &[&str]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(surfaces.len());
    let mut byte_cursor = 0;
    let mut char_cursor = 0;

    for surface in surfaces {
        let surface = surface.trim();
        match text[byte_cursor..].find(surface).filter(|_| !surface.is_empty()) {
            Some(rel) => {
                let start = char_cursor + text[byte_cursor..byte_cursor + rel].chars().count();
                offsets.push(start);
                byte_cursor += rel + surface.len();
                char_cursor = start + surface.chars().count();
            }
            None => offsets.push(char_cursor),
        }
    }
    offsets
}
