//! Request composition — model/tool selection and content assembly.
//!
//! Everything here is a pure function of the send inputs; nothing is stored.

use crate::chat::model::{Attachment, Role, Space, Toggles, Turn};
use crate::config::DEFAULT_SYSTEM_PROMPT;

use super::{Content, GEMINI_PRO, GenerateRequest, Part, THINKING_BUDGET};

/// Instructional marker prepended before Space knowledge files.
pub const CONTEXT_MARKER: &str =
    "Reference the following attached context files for this query:\n";

/// Per-request configuration derived from toggles and the active Space.
///
/// Computed fresh for every send; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPolicy {
    pub model: String,
    pub search_enabled: bool,
    pub thinking_budget: Option<u32>,
    pub system_instruction: String,
}

impl RequestPolicy {
    /// Resolve the policy. Priority order, first match wins per field:
    ///
    /// - model: Space's preferred model; else thinking or multimodal input
    ///   forces the pro model, which is also the default.
    /// - search tool: attached iff toggled, coexists with thinking.
    /// - thinking budget: fixed large budget iff toggled.
    /// - system instruction: Space prompt if active, else the built-in
    ///   persona; never both.
    pub fn resolve(toggles: Toggles, has_attachments: bool, space: Option<&Space>) -> Self {
        // Each rule spelled out even though they currently agree on the pro
        // model, so a future default change cannot silently break the forced
        // thinking/multimodal cases.
        #[allow(clippy::if_same_then_else)]
        let model = if let Some(space) = space {
            space.model.clone()
        } else if toggles.thinking {
            GEMINI_PRO.to_string()
        } else if has_attachments {
            GEMINI_PRO.to_string()
        } else {
            GEMINI_PRO.to_string()
        };

        let system_instruction = match space {
            Some(space) => space.system_prompt.clone(),
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
        };

        Self {
            model,
            search_enabled: toggles.search,
            thinking_budget: toggles.thinking.then_some(THINKING_BUDGET),
            system_instruction,
        }
    }
}

/// Assemble the full provider request for one send.
///
/// History turns are converted in original order to role-tagged text blocks;
/// their attachments are not resent. The current turn's parts are, in order:
/// context marker and Space files (when the Space has files), the prompt
/// text, then turn attachments in upload order.
pub fn compose(
    prompt: &str,
    history: &[Turn],
    toggles: Toggles,
    attachments: &[Attachment],
    space: Option<&Space>,
) -> GenerateRequest {
    let space_files: &[Attachment] = space.map(|s| s.files.as_slice()).unwrap_or(&[]);
    let has_attachments = !attachments.is_empty() || !space_files.is_empty();
    let policy = RequestPolicy::resolve(toggles, has_attachments, space);

    let mut contents: Vec<Content> = history
        .iter()
        .map(|turn| Content::text(turn.role, turn.text.clone()))
        .collect();

    let mut parts = Vec::new();
    if !space_files.is_empty() {
        parts.push(Part::Text(CONTEXT_MARKER.to_string()));
        parts.extend(space_files.iter().cloned().map(Part::Data));
    }
    parts.push(Part::Text(prompt.to_string()));
    parts.extend(attachments.iter().cloned().map(Part::Data));
    contents.push(Content {
        role: Role::User,
        parts,
    });

    GenerateRequest {
        model: policy.model,
        contents,
        system_instruction: policy.system_instruction,
        search: policy.search_enabled,
        thinking_budget: policy.thinking_budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GEMINI_FLASH;

    fn att(name: &str) -> Attachment {
        Attachment::new("image/png", "ZGF0YQ==", name)
    }

    #[test]
    fn default_policy_uses_pro_and_persona() {
        let policy = RequestPolicy::resolve(Toggles::default(), false, None);
        assert_eq!(policy.model, GEMINI_PRO);
        assert!(!policy.search_enabled);
        assert!(policy.thinking_budget.is_none());
        assert_eq!(policy.system_instruction, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn thinking_and_search_coexist() {
        let policy = RequestPolicy::resolve(
            Toggles {
                thinking: true,
                search: true,
            },
            false,
            None,
        );
        assert_eq!(policy.model, GEMINI_PRO);
        assert!(policy.search_enabled);
        assert_eq!(policy.thinking_budget, Some(THINKING_BUDGET));
    }

    #[test]
    fn attachments_force_pro() {
        let policy = RequestPolicy::resolve(Toggles::default(), true, None);
        assert_eq!(policy.model, GEMINI_PRO);
    }

    #[test]
    fn space_model_wins_over_toggles() {
        let space = Space::new("Fast", "Be quick.", GEMINI_FLASH);
        let policy = RequestPolicy::resolve(
            Toggles {
                thinking: true,
                search: false,
            },
            true,
            Some(&space),
        );
        assert_eq!(policy.model, GEMINI_FLASH);
        // The budget still applies even when the Space picked the model.
        assert_eq!(policy.thinking_budget, Some(THINKING_BUDGET));
        assert_eq!(policy.system_instruction, "Be quick.");
    }

    #[test]
    fn selection_is_pure_over_the_toggle_grid() {
        for thinking in [false, true] {
            for search in [false, true] {
                for has_attachments in [false, true] {
                    let toggles = Toggles { thinking, search };
                    let a = RequestPolicy::resolve(toggles, has_attachments, None);
                    let b = RequestPolicy::resolve(toggles, has_attachments, None);
                    assert_eq!(a, b);
                    assert_eq!(a.model, GEMINI_PRO);
                    assert_eq!(a.search_enabled, search);
                    assert_eq!(a.thinking_budget.is_some(), thinking);
                }
            }
        }
    }

    #[test]
    fn parts_order_with_space_files_and_attachment() {
        let space =
            Space::new("Docs", "p", GEMINI_PRO).with_files(vec![att("f1.png"), att("f2.png")]);
        let request = compose("prompt-text", &[], Toggles::default(), &[att("a1.png")], Some(&space));

        let parts = &request.contents.last().unwrap().parts;
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], Part::Text(CONTEXT_MARKER.to_string()));
        assert!(matches!(&parts[1], Part::Data(a) if a.name == "f1.png"));
        assert!(matches!(&parts[2], Part::Data(a) if a.name == "f2.png"));
        assert_eq!(parts[3], Part::Text("prompt-text".to_string()));
        assert!(matches!(&parts[4], Part::Data(a) if a.name == "a1.png"));
    }

    #[test]
    fn no_marker_without_space_files() {
        let space = Space::new("Empty", "p", GEMINI_PRO);
        let request = compose("hi", &[], Toggles::default(), &[], Some(&space));
        let parts = &request.contents.last().unwrap().parts;
        assert_eq!(parts, &vec![Part::Text("hi".to_string())]);
    }

    #[test]
    fn history_is_text_only_in_order() {
        let mut first = Turn::user("question", vec![att("ignored.png")]);
        first.text = "question".to_string();
        let mut reply = Turn::model_placeholder(Toggles::default());
        reply.text = "answer".to_string();

        let request = compose("follow-up", &[first, reply], Toggles::default(), &[], None);
        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[0], Content::text(Role::User, "question"));
        assert_eq!(request.contents[1], Content::text(Role::Model, "answer"));
        assert_eq!(
            request.contents[2].parts,
            vec![Part::Text("follow-up".to_string())]
        );
    }
}
