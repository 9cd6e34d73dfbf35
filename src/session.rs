//! Per-session conversation state.
//!
//! A [`SessionState`] owns the append-only sequence of [`ChatTurn`]s for one
//! user session and renders the labeled transcript used as prompt context.
//! The transcript is derived from the turn sequence rather than kept as a
//! separate accumulating string, so history and transcript cannot drift
//! apart. State is process-local: initialized empty at session start and
//! discarded when the session ends.

use crate::models::ChatTurn;

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    turns: Vec<ChatTurn>,
    /// When set, only the most recent N turns are rendered into the
    /// transcript. `None` reproduces the original unbounded behavior.
    history_window: Option<usize>,
}

impl SessionState {
    pub fn new(history_window: Option<usize>) -> Self {
        Self {
            turns: Vec::new(),
            history_window,
        }
    }

    /// Append the user's message. Must happen before the completion request
    /// for the same turn is issued, so the prompt transcript already carries
    /// the new `User:` line.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::user(content));
    }

    /// Append the assistant's answer and return the recorded turn.
    /// Error-synthesized answers are appended identically to normal ones,
    /// carrying only the `is_error` flag.
    pub fn push_assistant(&mut self, content: impl Into<String>, is_error: bool) -> ChatTurn {
        let turn = ChatTurn::assistant(content, is_error);
        self.turns.push(turn.clone());
        turn
    }

    /// Ordered turn sequence for rendering.
    pub fn history(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render the cumulative labeled transcript.
    ///
    /// Each turn becomes `\nUser: …` or `\nAssistant: …` in original order,
    /// matching the accumulating-string format the prompt layout expects
    /// (leading newline included). With a history window configured, only
    /// the most recent turns are rendered.
    pub fn transcript(&self) -> String {
        let start = match self.history_window {
            Some(window) => self.turns.len().saturating_sub(window),
            None => 0,
        };

        let mut out = String::new();
        for turn in &self.turns[start..] {
            out.push('\n');
            out.push_str(turn.label());
            out.push_str(": ");
            out.push_str(&turn.content);
        }
        out
    }
}
