//! Core data models used throughout NotionAtlas.
//!
//! These types represent the chat turns, retrieved chunks, and completion
//! outcomes that flow through the retrieval-augmented chat pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single completed message in the conversation. Immutable once created;
/// the session holds them as an append-only ordered sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    /// True when the content was synthesized from a failed completion call
    /// rather than returned by the model. Stored and rendered into the
    /// transcript exactly like a normal answer; only presentation differs.
    pub is_error: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            is_error: false,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, is_error: bool) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            is_error,
            created_at: Utc::now(),
        }
    }

    /// The transcript label for this turn's role (`"User"` / `"Assistant"`).
    pub fn label(&self) -> &'static str {
        match self.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A chunk of workspace text returned by the vector index for one query.
/// Ephemeral: created per-query, discarded after prompt assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub text: String,
    /// Zero-based position in the index's top-K result list. Chunk order is
    /// passed through to the prompt unchanged.
    pub rank: usize,
}

/// Result of one request/response cycle against the completion endpoint.
///
/// A non-200 status is a `Failed` outcome, not an `Err`: the turn engine
/// folds it into the conversation as an error-flagged answer. Transport
/// faults (timeout, connection refused) still surface as `anyhow::Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// HTTP 200 with the completion text extracted and trimmed.
    Answer(String),
    /// Non-200 status with the raw response body.
    Failed { status: u16, body: String },
}
