//! Core types: engine identification, mentions at each pipeline stage,
//! and the externally visible answer structure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// External NER engines that MultiNER can consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineId {
    /// Stanford NER: statistical CRF tagger behind a socket server.
    Stanford,
    /// DBpedia Spotlight: semantic annotation REST service.
    Spotlight,
    /// spaCy: neural NLP pipeline.
    Spacy,
    /// Polyglot: word-embedding based tagger.
    Polyglot,
    /// Flair: sequence-tagging model.
    Flair,
}

impl EngineId {
    /// Returns the stable lowercase identifier used in `ner_src`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stanford => "stanford",
            Self::Spotlight => "spotlight",
            Self::Spacy => "spacy",
            Self::Polyglot => "polyglot",
            Self::Flair => "flair",
        }
    }

    /// Returns all available engine variants.
    pub fn all() -> &'static [EngineId] {
        &[
            Self::Stanford,
            Self::Spotlight,
            Self::Spacy,
            Self::Polyglot,
            Self::Flair,
        ]
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared entity type vocabulary every engine label is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Location,
    Organization,
    Other,
}

impl EntityType {
    /// Returns the lowercase name used in the answer JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Location => "location",
            Self::Organization => "organization",
            Self::Other => "other",
        }
    }

    /// Translate an engine-native label into the shared vocabulary.
    ///
    /// BIO/BIOES prefixes (`B-`, `I-`, `E-`, `S-`) are stripped first, so
    /// `I-PER`, `PER` and `person` all map to [`EntityType::Person`].
    /// Unknown labels such as `MISC`, `NORP` or `DATE` become
    /// [`EntityType::Other`].
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        let bare = match label.split_once('-') {
            Some((prefix, rest))
                if matches!(prefix, "B" | "I" | "E" | "S" | "b" | "i" | "e" | "s") =>
            {
                rest
            }
            _ => label,
        };
        match bare.to_lowercase().as_str() {
            "per" | "person" | "pers" => Self::Person,
            "loc" | "gpe" | "location" | "place" => Self::Location,
            "org" | "organisation" | "organization" => Self::Organization,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit an engine reports its offsets in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetUnit {
    /// Unicode scalar values (Python `str` indices).
    #[default]
    Char,
    /// Bytes of the UTF-8 encoding.
    Utf8Byte,
    /// UTF-16 code units (Java `String` indices).
    Utf16,
}

/// One entity hit from one engine, in that engine's offset and label space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMention {
    pub source: EngineId,
    /// Surface text as the engine reported it.
    pub text: String,
    /// Engine-local start offset.
    pub start: usize,
    /// Engine-local end offset (exclusive).
    pub end: usize,
    /// Engine-native label, e.g. `I-PER` or `GPE`.
    pub label: String,
}

impl RawMention {
    /// Mention whose end lies `text.chars().count()` past `start`,
    /// saturating at `usize::MAX`.
    pub fn new(
        source: EngineId,
        text: impl Into<String>,
        start: usize,
        label: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let end = start.saturating_add(text.chars().count());
        Self {
            source,
            text,
            start,
            end,
            label: label.into(),
        }
    }
}

/// A mention remapped onto canonical character offsets of the input text.
///
/// `text` is the exact slice `input[start..end]` (in characters), not the
/// engine's rendering of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMention {
    pub source: EngineId,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub entity_type: EntityType,
}

/// One consolidated entity in the answer list.
///
/// Field names and order match the JSON answer contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedEntity {
    /// Number of distinct engines that found this mention.
    pub count: usize,
    /// Number of engines agreeing on `entity_type`.
    pub type_certainty: usize,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub right_context: String,
    /// Canonical start offset, in characters.
    pub pos: usize,
    pub ne_context: String,
    pub ne: String,
    /// Contributing engines, sorted by name.
    pub ner_src: Vec<EngineId>,
    pub left_context: String,
    /// Every type suggested for this mention, winner first.
    pub types: Vec<EntityType>,
}

/// Result of looking up a user-supplied entity string in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualMatch {
    /// Character offset of the first occurrence, or `-1` when absent.
    pub pos: i64,
    pub ne: String,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub left_context: String,
    pub right_context: String,
    pub ne_context: String,
}

/// Answer for one named part of a document (e.g. `title` or `p`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartAnswer {
    pub source: String,
    pub entities: Vec<ConsolidatedEntity>,
}
