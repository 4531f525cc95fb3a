//! Prompt assembly.
//!
//! Message order is fixed: instructions, auto-detected memory, requested
//! memory, history, then the live user turn. Memory therefore reads as
//! background context and never as the latest thing said.

use crate::memory::types::Turn;

/// Header of the system turn holding memory found by trigger detection.
pub const MEMORY_HEADER: &str = "MEMORY:\n";
/// Header of the system turn holding memory asked for by directive.
pub const REQUESTED_MEMORY_HEADER: &str = "REQUESTED_MEMORY:\n";

/// Build the system instruction turn text for a profile.
pub fn system_instructions<'a>(persona: &str, triggers: impl IntoIterator<Item = &'a str>) -> String {
    let listed: Vec<String> = triggers.into_iter().map(|t| format!("- {t}")).collect();
    let listed = if listed.is_empty() {
        "- (none)".to_string()
    } else {
        listed.join("\n")
    };

    format!(
        "{persona}\n\n\
         Available memory triggers:\n\
         {listed}\n\n\
         If the user references one of these triggers, the backend automatically provides memory.\n\n\
         You can also explicitly request memory by emitting:\n\
         <<memory_request: trigger_name>>\n\n\
         If this exchange should be kept in long-term memory, include the marker [[remember]] in your reply.\n\n\
         Use memory only for grounding, never for invention."
    )
}

/// Everything that goes into one prompt besides the user turn.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub instructions: &'a str,
    pub auto_memory: Option<&'a str>,
    pub requested_memory: Option<&'a str>,
    pub history: &'a [Turn],
}

impl<'a> PromptInputs<'a> {
    pub fn new(instructions: &'a str, history: &'a [Turn]) -> Self {
        Self {
            instructions,
            auto_memory: None,
            requested_memory: None,
            history,
        }
    }

    /// Produce the message list for the chat-completion call.
    pub fn assemble(&self, user_message: &str) -> Vec<Turn> {
        let mut messages = Vec::with_capacity(self.history.len() + 4);
        messages.push(Turn::system(self.instructions));

        let auto = self.auto_memory.map(str::trim).filter(|m| !m.is_empty());
        if let Some(block) = auto {
            messages.push(Turn::system(format!("{MEMORY_HEADER}{block}")));
        }

        let requested = self
            .requested_memory
            .map(str::trim)
            .filter(|m| !m.is_empty() && Some(*m) != auto);
        if let Some(block) = requested {
            messages.push(Turn::system(format!("{REQUESTED_MEMORY_HEADER}{block}")));
        }

        messages.extend_from_slice(self.history);
        messages.push(Turn::user(user_message));
        messages
    }
}
