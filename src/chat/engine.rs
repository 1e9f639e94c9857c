//! Orchestrates one send: compose the request, record both turns, then
//! merge the response stream back into state.

use tracing::{debug, info};
use uuid::Uuid;

use crate::chat::model::{Attachment, Toggles, Turn};
use crate::chat::state::AppState;
use crate::llm::merge::merge;
use crate::llm::{StreamingModel, composer};

/// Drives conversations against a streaming model.
///
/// Generic over [`StreamingModel`] so tests can script responses without a
/// network.
pub struct ChatEngine<M: StreamingModel> {
    model: M,
}

impl<M: StreamingModel> ChatEngine<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Send a user message in the active conversation, creating one if
    /// needed, and stream the model's reply into a placeholder turn.
    ///
    /// The request is composed from history as it stood before this
    /// message. `publish` receives the model turn after every applied
    /// delta. Returns the conversation id, or `None` when there was
    /// nothing to send.
    pub async fn send<F>(
        &self,
        state: &mut AppState,
        prompt: &str,
        toggles: Toggles,
        attachments: Vec<Attachment>,
        publish: F,
    ) -> Option<Uuid>
    where
        F: FnMut(&Turn),
    {
        if prompt.trim().is_empty() && attachments.is_empty() {
            debug!("ignoring empty send");
            return None;
        }

        let space = state.active_space().cloned();

        let conversation_id = match state.active_conversation() {
            Some(conversation) => conversation.id,
            None => state.create_conversation(prompt, state.active_space_id),
        };

        // History is captured before this message lands in state.
        let history: Vec<Turn> = state
            .conversation(conversation_id)
            .map(|conversation| conversation.turns.clone())
            .unwrap_or_default();

        let request = composer::compose(
            prompt,
            &history,
            toggles,
            &attachments,
            space.as_ref(),
        );

        state.append_turn(conversation_id, Turn::user(prompt, attachments));
        let turn_id =
            state.append_turn(conversation_id, Turn::model_placeholder(toggles))?;

        info!(
            %conversation_id,
            model = %request.model,
            history = history.len(),
            space = space.as_ref().map(|s| s.name.as_str()).unwrap_or("none"),
            "dispatching user message"
        );

        let stream = self.model.stream_generate(request);
        merge(stream, state, conversation_id, turn_id, publish).await;

        Some(conversation_id)
    }
}
