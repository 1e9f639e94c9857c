//! Folds a chunk stream into the placeholder model turn.
//!
//! Text deltas are appended in arrival order and citations accumulate
//! without dedup. A stream error becomes a visible text delta on the same
//! turn and ends the merge; whatever text arrived before it stays.

use futures::StreamExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chat::model::Turn;
use crate::chat::state::AppState;

use super::ChunkStream;

/// Prefix prepended to an error surfaced inside the response text.
pub const STREAM_ERROR_PREFIX: &str = "\n\n**Error:** Failed to generate response. ";

/// Drain `stream` into the turn identified by `conversation_id`/`turn_id`.
///
/// `publish` is called with the turn after every applied delta so a UI can
/// repaint incrementally. The turn's `generating` flag is cleared exactly
/// once, after the stream is exhausted or has errored.
pub async fn merge<F>(
    mut stream: ChunkStream,
    state: &mut AppState,
    conversation_id: Uuid,
    turn_id: Uuid,
    mut publish: F,
) where
    F: FnMut(&Turn),
{
    let mut chunks = 0usize;

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                chunks += 1;
                state.apply_chunk(conversation_id, turn_id, &chunk.text, &chunk.citations);
                publish_turn(state, conversation_id, turn_id, &mut publish);
            }
            Err(e) => {
                warn!(error = %e, %conversation_id, "stream failed, surfacing error in turn");
                let notice = format!("{STREAM_ERROR_PREFIX}{e}");
                state.apply_chunk(conversation_id, turn_id, &notice, &[]);
                publish_turn(state, conversation_id, turn_id, &mut publish);
                break;
            }
        }
    }

    debug!(%conversation_id, chunks, "response stream finished");
    state.finish_turn(conversation_id, turn_id);
    publish_turn(state, conversation_id, turn_id, &mut publish);
}

fn publish_turn<F>(state: &AppState, conversation_id: Uuid, turn_id: Uuid, publish: &mut F)
where
    F: FnMut(&Turn),
{
    if let Some(turn) = state
        .conversation(conversation_id)
        .and_then(|conv| conv.turn(turn_id))
    {
        publish(turn);
    }
}
