//! DBpedia Spotlight: knowledge-base entity linker.
//!
//! Queried via `GET /rest/annotate?text=..&confidence=..` with
//! `Accept: application/json`. Each linked resource carries its surface
//! form, a UTF-16 offset and a comma separated list of ontology types.

use serde::Deserialize;

use crate::config::{MultinerConfig, SpotlightConfig};
use crate::engine::NerEngine;
use crate::error::MultinerError;
use crate::http::with_retries;
use crate::types::{EngineId, OffsetUnit, RawMention};

/// DBpedia Spotlight REST client.
pub struct SpotlightEngine {
    client: reqwest::Client,
    url: String,
    confidence: f64,
}

impl SpotlightEngine {
    pub fn new(client: reqwest::Client, config: &SpotlightConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            confidence: config.confidence,
        }
    }

    async fn annotate(&self, text: &str) -> Result<String, MultinerError> {
        let confidence = self.confidence.to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[("text", text), ("confidence", confidence.as_str())])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                MultinerError::EngineUnavailable(format!("Spotlight request failed: {e}"))
            })?
            .error_for_status()
            .map_err(|e| MultinerError::Http(format!("Spotlight HTTP error: {e}")))?;

        response
            .text()
            .await
            .map_err(|e| MultinerError::Http(format!("Spotlight response read failed: {e}")))
    }
}

impl NerEngine for SpotlightEngine {
    async fn extract(
        &self,
        text: &str,
        config: &MultinerConfig,
    ) -> Result<Vec<RawMention>, MultinerError> {
        tracing::trace!(url = %self.url, "Spotlight annotate");
        let body = with_retries("spotlight annotate", config, || self.annotate(text)).await?;
        tracing::trace!(bytes = body.len(), "Spotlight response received");
        parse_spotlight_json(&body)
    }

    fn engine_id(&self) -> EngineId {
        EngineId::Spotlight
    }

    fn offset_unit(&self) -> OffsetUnit {
        OffsetUnit::Utf16
    }
}

#[derive(Debug, Deserialize)]
struct Annotation {
    #[serde(rename = "Resources", default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(rename = "@surfaceForm")]
    surface_form: String,
    #[serde(rename = "@offset")]
    offset: String,
    #[serde(rename = "@types", default)]
    types: String,
}

/// Map Spotlight's ontology type list onto a coarse label.
///
/// `DBpedia:Person,Schema:Person` becomes `person`; places and
/// organisations likewise. Anything else, including an empty list,
/// becomes `other`.
pub(crate) fn spotlight_label(types: &str) -> &'static str {
    let mut label = "other";
    for t in types.split(',') {
        let name = t.rsplit(':').next().unwrap_or(t).trim();
        match name {
            "Person" => return "person",
            "Place" | "Location" | "PopulatedPlace" => label = "location",
            "Organisation" | "Organization" | "Company" if label == "other" => {
                label = "organization"
            }
            _ => {}
        }
    }
    label
}

/// Parse a Spotlight JSON annotation into raw mentions.
///
/// A response without `Resources` means nothing was linked.
pub(crate) fn parse_spotlight_json(body: &str) -> Result<Vec<RawMention>, MultinerError> {
    let annotation: Annotation = serde_json::from_str(body)
        .map_err(|e| MultinerError::Parse(format!("invalid Spotlight JSON: {e}")))?;

    annotation
        .resources
        .into_iter()
        .map(|resource| {
            let offset: usize = resource.offset.trim().parse().map_err(|e| {
                MultinerError::Parse(format!(
                    "invalid Spotlight offset '{}': {e}",
                    resource.offset
                ))
            })?;
            let surface_units: usize = resource.surface_form.encode_utf16().count();
            let mut mention = RawMention::new(
                EngineId::Spotlight,
                resource.surface_form,
                offset,
                spotlight_label(&resource.types),
            );
            mention.end = offset.saturating_add(surface_units);
            Ok(mention)
        })
        .collect()
}
