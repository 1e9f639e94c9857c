//! Chat data model — turns, conversations, Spaces, and attachments.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum characters of the first prompt used as a conversation title.
const TITLE_MAX_CHARS: usize = 40;

/// Who produced a turn. Doubles as the provider wire role tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Binary content carried by a turn or a Space, base64-encoded.
///
/// This triple is the sole attachment representation crossing the provider
/// boundary in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type of the payload (e.g. `image/png`).
    pub mime_type: String,
    /// Base64-encoded content.
    pub data: String,
    /// Original filename, for display.
    pub name: String,
}

impl Attachment {
    pub fn new(
        mime_type: impl Into<String>,
        data: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
            name: name.into(),
        }
    }

    /// Encode raw bytes into an attachment.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8], name: impl Into<String>) -> Self {
        Self::new(mime_type, BASE64.encode(bytes), name)
    }

    /// Decode the payload back to raw bytes for re-display.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.data)
    }
}

/// A provider-supplied grounding reference (URL + title).
///
/// Accumulated per model turn in arrival order; duplicates across chunks are
/// preserved, never deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

impl Citation {
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
        }
    }
}

/// Feature toggles for a single send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Toggles {
    /// Reserve a deliberation budget on the model.
    pub thinking: bool,
    /// Attach the web-search tool.
    pub search: bool,
}

/// One message in a conversation.
///
/// Immutable once appended, except the in-progress model turn: its text and
/// citations grow as chunks arrive, and `generating` is cleared when the
/// stream ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub thinking_requested: bool,
    #[serde(default)]
    pub search_requested: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    /// True while chunks are still being folded into this turn.
    #[serde(default)]
    pub generating: bool,
}

impl Turn {
    /// Create a completed user turn.
    pub fn user(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            text: text.into(),
            attachments,
            timestamp: Utc::now(),
            thinking_requested: false,
            search_requested: false,
            citations: Vec::new(),
            generating: false,
        }
    }

    /// Create the empty model placeholder that chunks are merged into.
    pub fn model_placeholder(toggles: Toggles) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Model,
            text: String::new(),
            attachments: Vec::new(),
            timestamp: Utc::now(),
            thinking_requested: toggles.thinking,
            search_requested: toggles.search,
            citations: Vec::new(),
            generating: true,
        }
    }
}

/// An append-only ordered sequence of turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// Derived from the first user prompt; not user-editable.
    pub title: String,
    pub turns: Vec<Turn>,
    pub updated_at: DateTime<Utc>,
    /// The Space this conversation was created under, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<Uuid>,
}

impl Conversation {
    /// Create an empty conversation titled after the first prompt.
    pub fn new(first_prompt: &str, space_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: derive_title(first_prompt),
            turns: Vec::new(),
            updated_at: Utc::now(),
            space_id,
        }
    }

    pub fn turn(&self, id: Uuid) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    pub fn turn_mut(&mut self, id: Uuid) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }
}

/// A saved context profile: system prompt, preferred model, knowledge files.
///
/// Read-only input to request composition; lifecycle independent from
/// conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: Uuid,
    pub name: String,
    pub system_prompt: String,
    /// Preferred model for conversations created under this Space.
    pub model: String,
    /// Knowledge files prepended to every request in this Space.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<Attachment>,
}

impl Space {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            system_prompt: system_prompt.into(),
            model: model.into(),
            files: Vec::new(),
        }
    }

    /// Attach knowledge files.
    pub fn with_files(mut self, files: Vec<Attachment>) -> Self {
        self.files = files;
        self
    }
}

/// First `TITLE_MAX_CHARS` characters of the prompt, char-boundary safe.
fn derive_title(prompt: &str) -> String {
    prompt.chars().take(TITLE_MAX_CHARS).collect()
}
