//! Left/right context around a canonical span.

use crate::config::{ContextConfig, ContextUnit};
use crate::types::ManualMatch;

use super::normalize::CanonicalText;

/// Text immediately before and after `start..end`.
///
/// In [`ContextUnit::Chars`] mode this is up to `window` characters on
/// each side, taken verbatim. In [`ContextUnit::Words`] mode it is up to
/// `window` whitespace-separated words on each side, joined by single
/// spaces. Both modes clip at the text boundaries without padding and
/// never include the span itself.
pub fn extract_context(
    text: &CanonicalText,
    start: usize,
    end: usize,
    config: &ContextConfig,
) -> (String, String) {
    let len = text.len();
    let start = start.min(len);
    let end = end.clamp(start, len);

    match config.unit {
        ContextUnit::Chars => (
            text.slice(start.saturating_sub(config.window), start),
            text.slice(end, end.saturating_add(config.window)),
        ),
        ContextUnit::Words => {
            let left = text.slice(0, start);
            let right = text.slice(end, len);
            let left_words: Vec<&str> = left.split_whitespace().collect();
            let skip = left_words.len().saturating_sub(config.window);
            (
                left_words[skip..].join(" "),
                right
                    .split_whitespace()
                    .take(config.window)
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
    }
}

/// Find the first occurrence of a user-supplied entity and its context.
///
/// A needle that does not occur yields `pos == -1` and empty contexts.
pub fn manual_find(text: &str, needle: &str, source: &str, config: &ContextConfig) -> ManualMatch {
    let canonical = CanonicalText::new(text);
    let position = if needle.is_empty() {
        None
    } else {
        text.find(needle).map(|byte| text[..byte].chars().count())
    };

    let (pos, left_context, right_context) = match position {
        Some(start) => {
            let end = start + needle.chars().count();
            let (left, right) = extract_context(&canonical, start, end, config);
            (start as i64, left, right)
        }
        None => (-1, String::new(), String::new()),
    };

    ManualMatch {
        pos,
        ne: needle.to_string(),
        source: source.to_string(),
        kind: "manual".to_string(),
        left_context,
        right_context,
        ne_context: needle.to_string(),
    }
}
