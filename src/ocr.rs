//! OCR document input from the KB / Delpher newspaper collection.
//!
//! A Delpher OCR record is a small XML document: `<text>` holding one or
//! more `<title>` elements and a run of `<p>` paragraphs. It is split into
//! named parts so each can be recognised separately.

use scraper::{ElementRef, Html, Node};

use crate::config::MultinerConfig;
use crate::error::MultinerError;
use crate::http::{self, with_retries};

/// One named stretch of document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPart {
    /// `title` or `p`.
    pub name: String,
    pub text: String,
}

/// Split OCR XML into a `title` part and a `p` part.
///
/// Text of every `<title>` element goes to `title`, text of every other
/// text-bearing element to `p`; within a part, element texts are joined
/// with single spaces. Parts appear in the order they are first seen and
/// parts without text are omitted. The parser is lenient, so broken
/// markup still yields whatever text can be recovered.
pub fn parse_ocr_xml(xml: &str) -> Vec<TextPart> {
    let document = Html::parse_document(xml);
    let mut parts: Vec<(String, Vec<String>)> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let name = element.value().name();
        if matches!(name, "html" | "head" | "body") {
            continue;
        }

        let own_text: String = element
            .children()
            .filter_map(|child| match child.value() {
                Node::Text(t) => Some(&**t),
                _ => None,
            })
            .collect();
        let own_text = own_text.trim();
        if own_text.is_empty() {
            continue;
        }

        let part = if name == "title" { "title" } else { "p" };
        match parts.iter_mut().find(|(n, _)| n == part) {
            Some((_, texts)) => texts.push(own_text.to_string()),
            None => parts.push((part.to_string(), vec![own_text.to_string()])),
        }
    }

    parts
        .into_iter()
        .map(|(name, texts)| TextPart {
            name,
            text: texts.join(" "),
        })
        .collect()
}

/// Download an OCR record and split it into parts.
///
/// # Errors
///
/// Returns [`MultinerError::Http`] if the document cannot be fetched after
/// `config.max_retries` retries.
pub async fn fetch_ocr(url: &str, config: &MultinerConfig) -> Result<Vec<TextPart>, MultinerError> {
    let client = http::build_client(config)?;
    tracing::trace!(url, "fetching OCR document");

    let client = &client;
    let body = with_retries("ocr fetch", config, move || async move {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| MultinerError::Http(format!("OCR request failed: {e}")))?
            .error_for_status()
            .map_err(|e| MultinerError::Http(format!("OCR HTTP error: {e}")))?;
        response
            .text()
            .await
            .map_err(|e| MultinerError::Http(format!("OCR response read failed: {e}")))
    })
    .await?;

    tracing::trace!(bytes = body.len(), "OCR document received");
    let parts = parse_ocr_xml(&body);
    tracing::debug!(parts = parts.len(), "OCR document parsed");
    Ok(parts)
}
