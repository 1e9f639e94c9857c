//! Gemini streaming client (`:streamGenerateContent?alt=sse`).
//!
//! All Gemini wire types are private to this module — callers only see
//! [`GenerateRequest`] going in and [`ResponseChunk`] items coming out.
//! There is no retry: a failed stream is terminal for that turn.

use futures::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::config::GeminiConfig;
use crate::error::LlmError;

use super::{ChunkStream, Content, GenerateRequest, Part, ResponseChunk, StreamingModel};
use crate::chat::model::Citation;

/// Streaming client for the Gemini generate-content API.
///
/// Constructed once, then cheaply cloned: `reqwest::Client` is an `Arc`
/// internally.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl GeminiClient {
    /// Build a client from configuration.
    pub fn new(config: &GeminiConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        )
    }
}

impl StreamingModel for GeminiClient {
    fn stream_generate(&self, request: GenerateRequest) -> ChunkStream {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let url = self.endpoint(&request.model);

        Box::pin(async_stream::stream! {
            let body = WireRequest::from(&request);
            debug!(
                model = %request.model,
                contents = request.contents.len(),
                search = request.search,
                thinking_budget = ?request.thinking_budget,
                "sending generate request"
            );
            if tracing::enabled!(tracing::Level::TRACE) {
                let json = serde_json::to_string_pretty(&body)
                    .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
                trace!(payload = %json, "full generate request payload");
            }

            let response = match client
                .post(&url)
                .header("x-goog-api-key", api_key.expose_secret())
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    error!(error = %e, "generate request failed (transport)");
                    yield Err(LlmError::RequestFailed { reason: e.to_string() });
                    return;
                }
            };

            let response = match check_status(response).await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut byte_stream = response.bytes_stream();
            let mut buffer = SseBuffer::new();

            while let Some(next) = byte_stream.next().await {
                let bytes = match next {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        error!(error = %e, "stream interrupted mid-response");
                        yield Err(LlmError::RequestFailed {
                            reason: format!("stream error: {e}"),
                        });
                        return;
                    }
                };
                for chunk in buffer.push(&bytes) {
                    yield Ok(chunk);
                }
            }

            for chunk in buffer.finish() {
                yield Ok(chunk);
            }
        })
    }
}

/// Accumulates raw transport bytes and releases response chunks as complete
/// SSE events arrive.
///
/// Buffering bytes rather than decoded text keeps a multibyte character
/// split across two transport chunks intact; decoding happens only on a
/// complete event.
struct SseBuffer {
    bytes: Vec<u8>,
}

impl SseBuffer {
    fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    fn push(&mut self, incoming: &[u8]) -> Vec<ResponseChunk> {
        self.bytes.extend_from_slice(incoming);
        let mut chunks = Vec::new();
        while let Some(pos) = self.bytes.windows(2).position(|w| w == b"\n\n") {
            let event = String::from_utf8_lossy(&self.bytes[..pos]).into_owned();
            self.bytes.drain(..pos + 2);
            chunks.extend(parse_event(&event));
        }
        chunks
    }

    /// Servers are allowed to omit the blank line after the final event.
    fn finish(&mut self) -> Vec<ResponseChunk> {
        if self.bytes.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.bytes);
        parse_event(&String::from_utf8_lossy(&rest))
    }
}

/// Extract response chunks from one SSE event's lines.
///
/// Lines without a `data: ` prefix, keep-alive payloads, and chunks with
/// neither text nor citations are all skipped.
fn parse_event(event: &str) -> Vec<ResponseChunk> {
    let mut chunks = Vec::new();
    for line in event.lines() {
        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };
        if data.trim().is_empty() {
            continue;
        }
        let Ok(wire) = serde_json::from_str::<WireChunk>(data) else {
            continue;
        };
        let chunk = ResponseChunk::from(wire);
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
    }
    chunks
}

/// Return the response if successful, or a structured error built from the
/// Gemini error envelope.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body,
    };

    error!(%status, %message, "generate request returned HTTP error");
    Err(LlmError::Http {
        status: status.as_u16(),
        message,
    })
}

// ── Private wire types ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WirePartList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct WireContent {
    role: &'static str,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
struct WirePartList {
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireInlineData>,
}

impl WirePart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    google_search: WireEmpty,
}

#[derive(Debug, Serialize)]
struct WireEmpty {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    thinking_config: WireThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireThinkingConfig {
    thinking_budget: u32,
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => WirePart::text(text.clone()),
            Part::Data(attachment) => WirePart {
                text: None,
                inline_data: Some(WireInlineData {
                    mime_type: attachment.mime_type.clone(),
                    data: attachment.data.clone(),
                }),
            },
        }
    }
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        Self {
            role: content.role.as_str(),
            parts: content.parts.iter().map(WirePart::from).collect(),
        }
    }
}

impl From<&GenerateRequest> for WireRequest {
    fn from(request: &GenerateRequest) -> Self {
        Self {
            contents: request.contents.iter().map(WireContent::from).collect(),
            system_instruction: Some(WirePartList {
                parts: vec![WirePart::text(request.system_instruction.clone())],
            }),
            tools: request.search.then(|| {
                vec![WireTool {
                    google_search: WireEmpty {},
                }]
            }),
            generation_config: request.thinking_budget.map(|thinking_budget| {
                WireGenerationConfig {
                    thinking_config: WireThinkingConfig { thinking_budget },
                }
            }),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct WireChunk {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireCandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<WireGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireCandidateContent {
    #[serde(default)]
    parts: Vec<WireChunkPart>,
}

#[derive(Debug, Deserialize)]
struct WireChunkPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct WireGroundingChunk {
    #[serde(default)]
    web: Option<WireWebSource>,
}

#[derive(Debug, Deserialize)]
struct WireWebSource {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}

impl From<WireChunk> for ResponseChunk {
    fn from(wire: WireChunk) -> Self {
        let Some(candidate) = wire.candidates.into_iter().next() else {
            return ResponseChunk::default();
        };

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        let citations = candidate
            .grounding_metadata
            .map(|metadata| {
                metadata
                    .grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .map(|web| Citation::new(web.uri, web.title))
                    .collect()
            })
            .unwrap_or_default();

        ResponseChunk { text, citations }
    }
}

// ── Error envelope ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
