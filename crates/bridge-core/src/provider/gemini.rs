//! Gemini generation provider
//!
//! Uses reqwest for streaming generation via SSE against the
//! `streamGenerateContent` endpoint.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::GenerationProvider;
use crate::config::Config;
use crate::error::GenerateError;
use crate::types::PromptBundle;

/// Low temperature favors consistent, focused summaries over creative
/// variance.
const GENERATION_TEMPERATURE: f32 = 0.3;

/// Streaming generation provider backed by the Google generative language
/// API.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    /// Build a provider from configuration. A missing credential is not an
    /// error here; each generation attempt fails independently with
    /// `MissingCredential` so sibling streams are unaffected.
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.google_api_key.clone(),
            model: config.generation_model.clone(),
            base_url: config.api_base_url.clone(),
        }
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    async fn stream_generate(
        &self,
        bundle: &PromptBundle,
        fragment_tx: mpsc::Sender<String>,
        cancel_token: CancellationToken,
    ) -> Result<(), GenerateError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerateError::MissingCredential)?;

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent",
            self.base_url, self.model
        );
        let request = GenerateRequest {
            system_instruction: ContentParts {
                parts: vec![Part {
                    text: &bundle.system_instruction,
                }],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: &bundle.user_prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: GENERATION_TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerateError::Failed(format!("transport: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GenerateError::Failed(format!("HTTP {status}: {message}")));
        }

        // Process the SSE stream: events are separated by blank lines, each
        // carrying one JSON response chunk on a `data:` line.
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk_result) = stream.next().await {
            if cancel_token.is_cancelled() {
                debug!(model = %self.model, "generation cancelled");
                return Ok(());
            }

            let chunk = chunk_result
                .map_err(|e| GenerateError::Failed(format!("stream interrupted: {e}")))?;
            for payload in decoder.feed(&chunk) {
                if !emit_fragments(&payload, &fragment_tx).await? {
                    return Ok(());
                }
            }
        }

        // A final event is not required to carry a trailing blank line
        // before the body ends; flush it rather than dropping it.
        for payload in decoder.finish() {
            if !emit_fragments(&payload, &fragment_tx).await? {
                return Ok(());
            }
        }

        Ok(())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Parse one `data:` payload and forward its text parts. Returns `Ok(false)`
/// when the receiver is closed: the consumer went away, so decoding stops
/// rather than erroring.
async fn emit_fragments(
    payload: &str,
    fragment_tx: &mpsc::Sender<String>,
) -> Result<bool, GenerateError> {
    let event: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| GenerateError::Failed(format!("malformed stream event: {e}")))?;
    for text in event.text_parts() {
        if fragment_tx.send(text).await.is_err() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Incremental SSE decoder: feed byte chunks, get back complete `data:`
/// payloads.
///
/// CR is stripped up front so CRLF-framed and LF-framed responses collapse
/// to one case; the payload is single-line JSON, which cannot contain a raw
/// CR, so nothing meaningful is lost.
struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Append a byte chunk and return the payloads of every event completed
    /// by it, in order.
    fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer
            .push_str(&String::from_utf8_lossy(chunk).replace('\r', ""));
        let mut payloads = Vec::new();
        while let Some(event_end) = self.buffer.find("\n\n") {
            let event_data = self.buffer[..event_end].to_string();
            self.buffer.drain(..event_end + 2);
            payloads.extend(data_lines(&event_data));
        }
        payloads
    }

    /// Drain whatever complete `data:` lines remain once the byte stream
    /// has ended without a final blank line.
    fn finish(self) -> Vec<String> {
        data_lines(&self.buffer)
    }
}

fn data_lines(event_data: &str) -> Vec<String> {
    event_data
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter(|data| *data != "[DONE]")
        .map(str::to_string)
        .collect()
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: ContentParts<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct ContentParts<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl StreamChunk {
    fn text_parts(self) -> impl Iterator<Item = String> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_credential_fails_before_any_network_call() {
        let provider = GeminiProvider::from_config(&Config::default());
        let bundle = PromptBundle {
            system_instruction: "instruction".to_string(),
            user_prompt: "text".to_string(),
        };
        let (tx, _rx) = mpsc::channel(4);

        let result = provider
            .stream_generate(&bundle, tx, CancellationToken::new())
            .await;
        assert!(matches!(result, Err(GenerateError::MissingCredential)));
    }

    #[test]
    fn request_body_carries_instruction_prompt_and_temperature() {
        let request = GenerateRequest {
            system_instruction: ContentParts {
                parts: vec![Part { text: "be brief" }],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "the diff" }],
            }],
            generation_config: GenerationConfig {
                temperature: GENERATION_TEMPERATURE,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "the diff");
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn stream_chunk_extracts_candidate_text() {
        let chunk: StreamChunk = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Added "},{"text":"caching."}]}}]}"#,
        )
        .unwrap();
        let parts: Vec<String> = chunk.text_parts().collect();
        assert_eq!(parts, vec!["Added ", "caching."]);
    }

    #[test]
    fn chunk_without_candidates_yields_no_fragments() {
        let chunk: StreamChunk = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert_eq!(chunk.text_parts().count(), 0);
    }

    const EVENT: &str = r#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#;

    #[test]
    fn decoder_splits_lf_framed_events() {
        let mut decoder = SseDecoder::new();
        let body = format!("data: {EVENT}\n\ndata: {EVENT}\n\n");
        let payloads = decoder.feed(body.as_bytes());
        assert_eq!(payloads, vec![EVENT, EVENT]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn decoder_handles_crlf_framed_events() {
        let mut decoder = SseDecoder::new();
        let body = format!("data: {EVENT}\r\n\r\ndata: {EVENT}\r\n\r\n");
        let payloads = decoder.feed(body.as_bytes());
        assert_eq!(payloads, vec![EVENT, EVENT]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn decoder_reassembles_events_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let body = format!("data: {EVENT}\r\n\r\n");
        let (head, tail) = body.as_bytes().split_at(10);
        assert!(decoder.feed(head).is_empty());
        assert_eq!(decoder.feed(tail), vec![EVENT]);
    }

    #[test]
    fn decoder_flushes_final_event_without_trailing_blank_line() {
        let mut decoder = SseDecoder::new();
        let body = format!("data: {EVENT}");
        assert!(decoder.feed(body.as_bytes()).is_empty());
        assert_eq!(decoder.finish(), vec![EVENT]);
    }

    #[test]
    fn decoder_skips_done_markers_and_comment_lines() {
        let mut decoder = SseDecoder::new();
        let body = format!(": keep-alive\n\ndata: {EVENT}\n\ndata: [DONE]\n\n");
        assert_eq!(decoder.feed(body.as_bytes()), vec![EVENT]);
    }

    #[tokio::test]
    async fn crlf_framed_fragments_reach_the_consumer() {
        let mut decoder = SseDecoder::new();
        let body = format!("data: {EVENT}\r\n\r\n");
        let (tx, mut rx) = mpsc::channel(4);

        for payload in decoder.feed(body.as_bytes()) {
            assert!(emit_fragments(&payload, &tx).await.unwrap());
        }
        drop(tx);

        assert_eq!(rx.recv().await, Some("hello".to_string()));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn malformed_event_payload_is_a_generation_failure() {
        let (tx, _rx) = mpsc::channel(4);
        let result = emit_fragments("{not json", &tx).await;
        assert!(matches!(result, Err(GenerateError::Failed(_))));
    }
}
