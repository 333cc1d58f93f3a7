//! Stanford NER: statistical CRF tagger behind a plain socket server.
//!
//! The server (`edu.stanford.nlp.ie.NERServer -outputFormat inlineXML`)
//! reads one line of text per connection and answers with the same text
//! where entities are wrapped in tags, e.g.
//! `de naam <I-PER>Albert</I-PER> <I-PER>Einstein</I-PER>.` Newer models
//! emit unprefixed tags such as `<PERSON>Albert Einstein</PERSON>`.

use scraper::{ElementRef, Html, Node};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::{MultinerConfig, StanfordConfig};
use crate::engine::NerEngine;
use crate::error::MultinerError;
use crate::http::with_retries;
use crate::types::{EngineId, RawMention};

use super::mentions_in_order;

/// Stanford NER socket client.
pub struct StanfordEngine {
    host: String,
    port: u16,
}

impl StanfordEngine {
    pub fn new(config: &StanfordConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }

    async fn connect(&self) -> Result<TcpStream, MultinerError> {
        TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                MultinerError::EngineUnavailable(format!(
                    "stanford connect to {}:{} failed: {e}",
                    self.host, self.port
                ))
            })
    }

    /// Send one line of text and read the tagged reply to EOF.
    async fn exchange(
        &self,
        stream: &mut TcpStream,
        payload: &[u8],
    ) -> Result<String, MultinerError> {
        stream
            .write_all(payload)
            .await
            .map_err(|e| MultinerError::EngineUnavailable(format!("stanford write failed: {e}")))?;
        stream
            .shutdown()
            .await
            .map_err(|e| {
                MultinerError::EngineUnavailable(format!("stanford shutdown failed: {e}"))
            })?;

        let mut reply = Vec::new();
        stream
            .read_to_end(&mut reply)
            .await
            .map_err(|e| MultinerError::EngineUnavailable(format!("stanford read failed: {e}")))?;
        String::from_utf8(reply)
            .map_err(|e| MultinerError::Parse(format!("stanford reply is not UTF-8: {e}")))
    }
}

impl NerEngine for StanfordEngine {
    async fn extract(
        &self,
        text: &str,
        config: &MultinerConfig,
    ) -> Result<Vec<RawMention>, MultinerError> {
        let payload = encode_request(text);
        tracing::trace!(bytes = payload.len(), "Stanford request");

        let mut stream = with_retries("stanford connect", config, || self.connect()).await?;
        let reply = self.exchange(&mut stream, &payload).await?;
        tracing::trace!(bytes = reply.len(), "Stanford response received");

        let tagged = parse_inline_xml(&reply);
        tracing::debug!(count = tagged.len(), "Stanford entities parsed");
        // The tagger saw the single-line text, so surfaces are searched there.
        // Offsets stay valid for `text` because the mapping is char for char.
        Ok(mentions_in_order(EngineId::Stanford, &single_line(text), tagged))
    }

    fn engine_id(&self) -> EngineId {
        EngineId::Stanford
    }
}

/// Replace line breaks with spaces, one char for one char.
fn single_line(text: &str) -> String {
    text.chars()
        .map(|c| if matches!(c, '\n' | '\r') { ' ' } else { c })
        .collect()
}

/// Encode `text` as a single request line.
///
/// Newlines become spaces (one request is one line) and XML
/// metacharacters are escaped so that the tagged reply stays well formed.
/// Neither changes the visible characters the tagger sees.
fn encode_request(text: &str) -> Vec<u8> {
    let mut line = String::with_capacity(text.len() + 16);
    for c in single_line(text).chars() {
        match c {
            '&' => line.push_str("&amp;"),
            '<' => line.push_str("&lt;"),
            '>' => line.push_str("&gt;"),
            other => line.push(other),
        }
    }
    line.push('\n');
    line.into_bytes()
}

/// Parse an inline-XML reply into `(surface, label)` pairs in text order.
///
/// Consecutive `I-` tags of the same type separated only by whitespace are
/// joined with a single space, so `<I-PER>Albert</I-PER> <I-PER>Einstein</I-PER>`
/// yields one `("Albert Einstein", "PER")`. A `B-` tag or any intervening
/// word starts a new entity.
pub(crate) fn parse_inline_xml(reply: &str) -> Vec<(String, String)> {
    let fragment = Html::parse_fragment(reply);
    let mut entities: Vec<(String, String)> = Vec::new();
    // Whether the previous entity may still be extended by an `I-` tag.
    let mut open = false;

    for node in fragment.root_element().children() {
        match node.value() {
            Node::Text(t) => {
                if !t.trim().is_empty() {
                    open = false;
                }
            }
            Node::Element(_) => {
                let Some(element) = ElementRef::wrap(node) else {
                    continue;
                };
                let surface: String = element.text().collect::<String>().trim().to_string();
                if surface.is_empty() {
                    continue;
                }
                let tag = element.value().name().to_uppercase();
                let (prefix, label) = match tag.split_once('-') {
                    Some((p, l)) if p.len() == 1 => (Some(p.to_string()), l.to_string()),
                    _ => (None, tag.clone()),
                };

                match entities.last_mut() {
                    Some((prev_surface, prev_label))
                        if open && prefix.as_deref() == Some("I") && *prev_label == label =>
                    {
                        prev_surface.push(' ');
                        prev_surface.push_str(&surface);
                    }
                    _ => entities.push((surface, label)),
                }
                open = true;
            }
            _ => {}
        }
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_one_escaped_line() {
        let payload = encode_request("Jansen & Zn.\nRotterdam <b>");
        assert_eq!(
            String::from_utf8(payload).expect("utf8"),
            "Jansen &amp; Zn. Rotterdam &lt;b&gt;\n"
        );
    }

    #[test]
    fn consecutive_inside_tags_merge() {
        let reply =
            "Deze iets langere test bevat de naam <I-PER>Albert</I-PER> <I-PER>Einstein</I-PER>.";
        let entities = parse_inline_xml(reply);
        assert_eq!(
            entities,
            vec![("Albert Einstein".to_string(), "PER".to_string())]
        );
    }

    #[test]
    fn intervening_word_splits_entities() {
        let reply = "<I-PER>Jansen</I-PER> en <I-PER>Pietersen</I-PER>";
        let entities = parse_inline_xml(reply);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].0, "Jansen");
        assert_eq!(entities[1].0, "Pietersen");
    }

    #[test]
    fn begin_tag_starts_new_entity() {
        let reply = "<B-LOC>Den</B-LOC> <I-LOC>Haag</I-LOC> <B-LOC>Delft</B-LOC>";
        let entities = parse_inline_xml(reply);
        assert_eq!(
            entities,
            vec![
                ("Den Haag".to_string(), "LOC".to_string()),
                ("Delft".to_string(), "LOC".to_string()),
            ]
        );
    }

    #[test]
    fn different_types_do_not_merge() {
        let reply = "<I-ORG>Philips</I-ORG> <I-LOC>Eindhoven</I-LOC>";
        let entities = parse_inline_xml(reply);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[1].1, "LOC");
    }

    #[test]
    fn unprefixed_tags_are_whole_entities() {
        let reply = "<PERSON>Albert Einstein</PERSON> woonde in <LOCATION>Princeton</LOCATION>";
        let entities = parse_inline_xml(reply);
        assert_eq!(
            entities,
            vec![
                ("Albert Einstein".to_string(), "PERSON".to_string()),
                ("Princeton".to_string(), "LOCATION".to_string()),
            ]
        );
    }

    #[test]
    fn escaped_text_is_decoded() {
        let reply = "<I-ORG>Jansen &amp; Zn.</I-ORG>";
        let entities = parse_inline_xml(reply);
        assert_eq!(entities[0].0, "Jansen & Zn.");
    }

    #[test]
    fn untagged_reply_yields_nothing() {
        assert!(parse_inline_xml("Geen namen hier.\n").is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_is_engine_unavailable() {
        let engine = StanfordEngine::new(&StanfordConfig {
            host: "127.0.0.1".into(),
            port: 1,
        });
        let config = MultinerConfig {
            max_retries: 0,
            ..Default::default()
        };
        let err = engine.extract("Jansen", &config).await.unwrap_err();
        assert!(matches!(err, MultinerError::EngineUnavailable(_)));
    }

    /// Serve one request on a local port, answering with `reply`.
    async fn local_server(reply: &'static str) -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            socket.read_to_end(&mut request).await.expect("read");
            assert!(request.ends_with(b"\n"));
            assert_eq!(request.iter().filter(|&&b| b == b'\n').count(), 1);
            socket.write_all(reply.as_bytes()).await.expect("write");
        });
        port
    }

    #[tokio::test]
    async fn round_trip_against_local_server() {
        let port = local_server(concat!(
            "Gisteren sprak <I-PER>Willem</I-PER> <I-PER>Drees</I-PER> ",
            "in <I-LOC>Den</I-LOC> <I-LOC>Haag</I-LOC>.\n",
        ))
        .await;

        let engine = StanfordEngine::new(&StanfordConfig {
            host: "127.0.0.1".into(),
            port,
        });
        let text = "Gisteren sprak Willem Drees in Den Haag.";
        let mentions = engine
            .extract(text, &MultinerConfig::default())
            .await
            .expect("extract");

        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].text, "Willem Drees");
        assert_eq!(mentions[0].start, 15);
        assert_eq!(mentions[0].label, "PER");
        assert_eq!(mentions[1].text, "Den Haag");
        assert_eq!(mentions[1].start, 31);
    }

    #[tokio::test]
    async fn line_break_inside_entity_is_found() {
        let port =
            local_server("De burgemeester van <I-LOC>Den</I-LOC> <I-LOC>Haag</I-LOC>.\n").await;

        let engine = StanfordEngine::new(&StanfordConfig {
            host: "127.0.0.1".into(),
            port,
        });
        let text = "De burgemeester van Den\nHaag.";
        let mentions = engine
            .extract(text, &MultinerConfig::default())
            .await
            .expect("extract");

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].text, "Den Haag");
        assert_eq!(mentions[0].start, 20);
        assert_eq!(mentions[0].end, 28);
    }
}
