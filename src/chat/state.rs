//! In-memory application state with reducer-style operations.
//!
//! All mutation flows through explicit methods on [`AppState`]; there is no
//! ambient shared state and no persistence. Everything happens on the single
//! control thread that owns the state.

use chrono::Utc;
use uuid::Uuid;

use super::model::{Citation, Conversation, Space, Turn};

/// The whole application state: conversations, Spaces, and the active
/// selection of each.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Most recently created first.
    pub conversations: Vec<Conversation>,
    pub spaces: Vec<Space>,
    pub active_conversation_id: Option<Uuid>,
    pub active_space_id: Option<Uuid>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Conversations ───────────────────────────────────────────────

    /// Start a fresh chat: clears the active conversation, keeps the Space.
    pub fn new_chat(&mut self) {
        self.active_conversation_id = None;
    }

    /// Create, activate, and return the id of a new conversation. The title
    /// derives from the first prompt; the Space link is fixed at creation.
    pub fn create_conversation(&mut self, first_prompt: &str, space_id: Option<Uuid>) -> Uuid {
        let conversation = Conversation::new(first_prompt, space_id);
        let id = conversation.id;
        self.conversations.insert(0, conversation);
        self.active_conversation_id = Some(id);
        id
    }

    /// Activate an existing conversation. Returns false if unknown.
    pub fn select_conversation(&mut self, id: Uuid) -> bool {
        if self.conversation(id).is_some() {
            self.active_conversation_id = Some(id);
            true
        } else {
            false
        }
    }

    /// Remove a conversation; deleting the active one clears the selection.
    pub fn delete_conversation(&mut self, id: Uuid) {
        self.conversations.retain(|c| c.id != id);
        if self.active_conversation_id == Some(id) {
            self.active_conversation_id = None;
        }
    }

    pub fn conversation(&self, id: Uuid) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn conversation_mut(&mut self, id: Uuid) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_conversation_id.and_then(|id| self.conversation(id))
    }

    // ── Turns ───────────────────────────────────────────────────────

    /// Append a turn and bump the conversation's last-modified timestamp.
    /// Returns the turn id, or None if the conversation is unknown.
    pub fn append_turn(&mut self, conversation_id: Uuid, turn: Turn) -> Option<Uuid> {
        let conversation = self.conversation_mut(conversation_id)?;
        let turn_id = turn.id;
        conversation.turns.push(turn);
        conversation.updated_at = Utc::now();
        Some(turn_id)
    }

    /// The merge step: append a text delta and citation records to an
    /// in-progress turn. Order-preserving concatenation, duplicates kept.
    pub fn apply_chunk(
        &mut self,
        conversation_id: Uuid,
        turn_id: Uuid,
        text_delta: &str,
        citations: &[Citation],
    ) -> bool {
        let Some(turn) = self
            .conversation_mut(conversation_id)
            .and_then(|c| c.turn_mut(turn_id))
        else {
            return false;
        };
        turn.text.push_str(text_delta);
        turn.citations.extend_from_slice(citations);
        true
    }

    /// Clear the generating flag once the stream is exhausted.
    pub fn finish_turn(&mut self, conversation_id: Uuid, turn_id: Uuid) -> bool {
        let Some(turn) = self
            .conversation_mut(conversation_id)
            .and_then(|c| c.turn_mut(turn_id))
        else {
            return false;
        };
        turn.generating = false;
        true
    }

    // ── Spaces ──────────────────────────────────────────────────────

    /// Register a Space and return its id. Does not activate it.
    pub fn create_space(&mut self, space: Space) -> Uuid {
        let id = space.id;
        self.spaces.push(space);
        id
    }

    /// Activate a Space for subsequent conversations. Clears the active
    /// conversation so the next send starts a chat under the Space.
    /// Returns false if unknown.
    pub fn select_space(&mut self, id: Uuid) -> bool {
        if self.space(id).is_some() {
            self.active_space_id = Some(id);
            self.active_conversation_id = None;
            true
        } else {
            false
        }
    }

    /// Deactivate the current Space, if any.
    pub fn clear_space(&mut self) {
        self.active_space_id = None;
    }

    /// Remove a Space. Existing conversations keep their (now dangling)
    /// Space link; it only affects request composition for new sends.
    pub fn delete_space(&mut self, id: Uuid) {
        self.spaces.retain(|s| s.id != id);
        if self.active_space_id == Some(id) {
            self.active_space_id = None;
        }
    }

    pub fn space(&self, id: Uuid) -> Option<&Space> {
        self.spaces.iter().find(|s| s.id == id)
    }

    pub fn active_space(&self) -> Option<&Space> {
        self.active_space_id.and_then(|id| self.space(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::model::{Attachment, Role, Toggles};

    #[test]
    fn create_conversation_activates_and_prepends() {
        let mut state = AppState::new();
        let first = state.create_conversation("first", None);
        let second = state.create_conversation("second", None);

        assert_eq!(state.active_conversation_id, Some(second));
        assert_eq!(state.conversations[0].id, second);
        assert_eq!(state.conversations[1].id, first);
    }

    #[test]
    fn delete_active_conversation_clears_selection() {
        let mut state = AppState::new();
        let keep = state.create_conversation("keep", None);
        let drop = state.create_conversation("drop", None);

        state.delete_conversation(drop);
        assert!(state.active_conversation_id.is_none());
        assert!(state.conversation(keep).is_some());

        // Deleting a non-active conversation leaves the selection alone.
        state.select_conversation(keep);
        state.delete_conversation(Uuid::new_v4());
        assert_eq!(state.active_conversation_id, Some(keep));
    }

    #[test]
    fn select_unknown_conversation_is_rejected() {
        let mut state = AppState::new();
        assert!(!state.select_conversation(Uuid::new_v4()));
        assert!(state.active_conversation_id.is_none());
    }

    #[test]
    fn append_turn_bumps_updated_at() {
        let mut state = AppState::new();
        let id = state.create_conversation("hi", None);
        let before = state.conversation(id).unwrap().updated_at;

        std::thread::sleep(std::time::Duration::from_millis(2));
        state.append_turn(id, Turn::user("hi", vec![])).unwrap();

        let conversation = state.conversation(id).unwrap();
        assert_eq!(conversation.turns.len(), 1);
        assert!(conversation.updated_at > before);
    }

    #[test]
    fn append_turn_to_unknown_conversation_is_none() {
        let mut state = AppState::new();
        assert!(state.append_turn(Uuid::new_v4(), Turn::user("x", vec![])).is_none());
    }

    #[test]
    fn apply_chunk_appends_in_order() {
        let mut state = AppState::new();
        let conv = state.create_conversation("hi", None);
        let turn = state
            .append_turn(conv, Turn::model_placeholder(Toggles::default()))
            .unwrap();

        assert!(state.apply_chunk(conv, turn, "Hel", &[]));
        assert!(state.apply_chunk(conv, turn, "lo", &[]));
        assert!(state.apply_chunk(conv, turn, " world", &[]));

        let text = &state.conversation(conv).unwrap().turn(turn).unwrap().text;
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn apply_chunk_preserves_duplicate_citations() {
        let mut state = AppState::new();
        let conv = state.create_conversation("hi", None);
        let turn = state
            .append_turn(conv, Turn::model_placeholder(Toggles::default()))
            .unwrap();

        let citation = Citation::new("a.com", "A");
        state.apply_chunk(conv, turn, "x", std::slice::from_ref(&citation));
        state.apply_chunk(conv, turn, "y", &[]);
        state.apply_chunk(conv, turn, "z", std::slice::from_ref(&citation));

        let citations = &state.conversation(conv).unwrap().turn(turn).unwrap().citations;
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0], citations[1]);
    }

    #[test]
    fn finish_turn_clears_generating() {
        let mut state = AppState::new();
        let conv = state.create_conversation("hi", None);
        let turn = state
            .append_turn(conv, Turn::model_placeholder(Toggles::default()))
            .unwrap();

        assert!(state.conversation(conv).unwrap().turn(turn).unwrap().generating);
        assert!(state.finish_turn(conv, turn));
        assert!(!state.conversation(conv).unwrap().turn(turn).unwrap().generating);
        assert!(!state.finish_turn(conv, Uuid::new_v4()));
    }

    #[test]
    fn select_space_clears_active_conversation() {
        let mut state = AppState::new();
        state.create_conversation("chat", None);
        let space = state.create_space(Space::new("Work", "prompt", "gemini-2.5-flash"));

        assert!(state.select_space(space));
        assert_eq!(state.active_space_id, Some(space));
        assert!(state.active_conversation_id.is_none());
        assert_eq!(state.active_space().unwrap().name, "Work");
    }

    #[test]
    fn select_unknown_space_is_rejected() {
        let mut state = AppState::new();
        let conv = state.create_conversation("chat", None);
        assert!(!state.select_space(Uuid::new_v4()));
        // Selection must stay untouched on a rejected op.
        assert_eq!(state.active_conversation_id, Some(conv));
    }

    #[test]
    fn delete_space_keeps_conversation_links() {
        let mut state = AppState::new();
        let space = state.create_space(Space::new("Work", "p", "m"));
        state.select_space(space);
        let conv = state.create_conversation("chat", Some(space));

        state.delete_space(space);
        assert!(state.active_space_id.is_none());
        assert!(state.space(space).is_none());
        assert_eq!(state.conversation(conv).unwrap().space_id, Some(space));
    }

    #[test]
    fn clear_space_keeps_conversations() {
        let mut state = AppState::new();
        let space = state.create_space(
            Space::new("Docs", "p", "m").with_files(vec![Attachment::new("text/plain", "", "f")]),
        );
        state.select_space(space);
        state.clear_space();
        assert!(state.active_space().is_none());
        assert!(state.space(space).is_some());
    }

    #[test]
    fn new_chat_keeps_active_space() {
        let mut state = AppState::new();
        let space = state.create_space(Space::new("Work", "p", "m"));
        state.select_space(space);
        state.create_conversation("chat", Some(space));

        state.new_chat();
        assert!(state.active_conversation_id.is_none());
        assert_eq!(state.active_space_id, Some(space));
    }

    #[test]
    fn turns_alternate_user_model() {
        let mut state = AppState::new();
        let conv = state.create_conversation("q", None);
        state.append_turn(conv, Turn::user("q", vec![]));
        state.append_turn(conv, Turn::model_placeholder(Toggles::default()));

        let roles: Vec<Role> = state
            .conversation(conv)
            .unwrap()
            .turns
            .iter()
            .map(|t| t.role)
            .collect();
        assert_eq!(roles, vec![Role::User, Role::Model]);
    }
}
