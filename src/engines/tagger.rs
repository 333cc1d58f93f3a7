//! JSON tagger sidecars for spaCy, Polyglot and Flair.
//!
//! Each sidecar wraps an in-process NLP library behind the same small
//! contract: `POST {"text": ".."}` answers with a JSON array of
//! `{"text", "start"?, "end"?, "label"}` objects in character offsets.
//! Some sidecars name the label field `type` or `tag`, and Polyglot's
//! chunker omits offsets entirely.

use serde::{Deserialize, Serialize};

use crate::config::{MultinerConfig, TaggerConfig};
use crate::engine::NerEngine;
use crate::error::MultinerError;
use crate::http::with_retries;
use crate::types::{EngineId, RawMention};

use super::mentions_in_order;

/// Client for one JSON tagger sidecar.
pub struct TaggerEngine {
    id: EngineId,
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct TagRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TaggedEntity {
    text: String,
    #[serde(default)]
    start: Option<usize>,
    #[serde(default)]
    end: Option<usize>,
    #[serde(alias = "type", alias = "tag")]
    label: String,
}

impl TaggerEngine {
    pub fn new(id: EngineId, client: reqwest::Client, config: &TaggerConfig) -> Self {
        Self {
            id,
            client,
            url: config.url.clone(),
        }
    }

    async fn tag(&self, text: &str) -> Result<String, MultinerError> {
        let response = self
            .client
            .post(&self.url)
            .json(&TagRequest { text })
            .send()
            .await
            .map_err(|e| {
                MultinerError::EngineUnavailable(format!("{} request failed: {e}", self.id))
            })?
            .error_for_status()
            .map_err(|e| MultinerError::Http(format!("{} HTTP error: {e}", self.id)))?;

        response
            .text()
            .await
            .map_err(|e| MultinerError::Http(format!("{} response read failed: {e}", self.id)))
    }
}

impl NerEngine for TaggerEngine {
    async fn extract(
        &self,
        text: &str,
        config: &MultinerConfig,
    ) -> Result<Vec<RawMention>, MultinerError> {
        tracing::trace!(engine = %self.id, url = %self.url, "tagger request");
        let body = with_retries(self.id.name(), config, || self.tag(text)).await?;
        tracing::trace!(engine = %self.id, bytes = body.len(), "tagger response received");
        parse_tagger_json(self.id, text, &body)
    }

    fn engine_id(&self) -> EngineId {
        self.id
    }
}

/// Parse a sidecar reply into raw mentions.
///
/// Runs of entries sharing a start offset keep only the last one, since
/// some taggers emit every partial chunk before the full entity. Entries
/// without offsets are located by searching `text` in order.
pub(crate) fn parse_tagger_json(
    source: EngineId,
    text: &str,
    body: &str,
) -> Result<Vec<RawMention>, MultinerError> {
    let tagged: Vec<TaggedEntity> = serde_json::from_str(body)
        .map_err(|e| MultinerError::Parse(format!("invalid {source} JSON: {e}")))?;

    let mut kept: Vec<TaggedEntity> = Vec::with_capacity(tagged.len());
    for entity in tagged {
        if entity.text.trim().is_empty() {
            continue;
        }
        match kept.last_mut() {
            Some(prev) if prev.start.is_some() && prev.start == entity.start => *prev = entity,
            _ => kept.push(entity),
        }
    }

    if kept.iter().all(|e| e.start.is_some()) {
        return Ok(kept
            .into_iter()
            .filter_map(|e| {
                let start = e.start?;
                let mut mention = RawMention::new(source, e.text, start, e.label);
                if let Some(end) = e.end.filter(|&end| end > start) {
                    mention.end = end;
                }
                Some(mention)
            })
            .collect());
    }

    let pairs = kept.into_iter().map(|e| (e.text, e.label)).collect();
    Ok(mentions_in_order(source, text, pairs))
}
