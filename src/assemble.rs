//! Prompt assembly.
//!
//! Produces the exact prompt string sent to the completion endpoint by
//! merging the session transcript with the retrieved context block. Both
//! functions are pure: assembling twice from identical inputs yields
//! byte-identical prompts.

use crate::models::RetrievedChunk;

/// Literal substituted for the context block when retrieval returns nothing
/// usable.
pub const FALLBACK_CONTEXT: &str = "No relevant context found.";

/// Join non-empty chunk texts with newline separators, preserving the
/// index's rank order. No deduplication, no truncation. Zero chunks (or
/// all-empty texts) yields [`FALLBACK_CONTEXT`].
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    let joined = chunks
        .iter()
        .filter(|c| !c.text.is_empty())
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if joined.is_empty() {
        FALLBACK_CONTEXT.to_string()
    } else {
        joined
    }
}

/// Compose the combined prompt: labeled transcript first, labeled retrieved
/// context second. The transcript must already end with the current user's
/// `User:` line (the session appends it before the completion request is
/// issued).
pub fn compose_prompt(transcript: &str, context: &str) -> String {
    format!(
        "Conversation history:\n{}\n\nRelevant Notion context:\n{}",
        transcript, context
    )
}
