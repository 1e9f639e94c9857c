//! Conversation state and send orchestration.

pub mod engine;
pub mod model;
pub mod state;

pub use engine::ChatEngine;
pub use model::{Attachment, Citation, Conversation, Role, Space, Toggles, Turn};
pub use state::AppState;
