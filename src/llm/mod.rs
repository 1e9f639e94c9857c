//! LLM provider seam.
//!
//! The chat engine talks to a [`StreamingModel`]; the only production
//! implementation is the Gemini SSE client in [`gemini`]. Requests are
//! composed provider-agnostically in [`composer`] and folded back into a
//! turn by [`merge`].

pub mod composer;
pub mod gemini;
pub mod merge;

use std::pin::Pin;

use futures::Stream;

use crate::chat::model::{Attachment, Citation, Role};
use crate::error::LlmError;

/// High-capability reasoning/multimodal model; also the default.
pub const GEMINI_PRO: &str = "gemini-3-pro-preview";
/// Faster, cheaper model; selectable via a Space.
pub const GEMINI_FLASH: &str = "gemini-2.5-flash";
/// Fixed deliberation budget applied when thinking is requested.
pub const THINKING_BUDGET: u32 = 32_768;

/// One incremental response chunk: a text delta plus any citation records
/// that arrived with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseChunk {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl ResponseChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.citations.is_empty()
    }
}

/// A lazy, finite, non-restartable sequence of response chunks.
///
/// Transport and HTTP failures terminate the stream with a distinguished
/// `Err` item; converting that into user-visible text is the merger's
/// business, not the provider's.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ResponseChunk, LlmError>> + Send>>;

/// One content part of a request: either text or inline binary data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Data(Attachment),
}

/// A role-tagged block of content parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    /// A block holding a single text part.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// A fully composed, provider-agnostic generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    /// Prior turns plus the current user block, in conversation order.
    pub contents: Vec<Content>,
    pub system_instruction: String,
    /// Attach the provider's web-search tool.
    pub search: bool,
    /// Deliberation token budget, when thinking is requested.
    pub thinking_budget: Option<u32>,
}

/// A model endpoint that can stream a response for a composed request.
pub trait StreamingModel: Send + Sync {
    fn stream_generate(&self, request: GenerateRequest) -> ChunkStream;
}
