//! The retrieval-augmented turn engine.
//!
//! Drives one user turn end to end: embed the query, fetch the top-K
//! similar chunks from the vector index, assemble the prompt from the
//! session transcript and retrieved context, call the completion endpoint,
//! and record both turns in session state.
//!
//! ```text
//! user text ──▶ Embedder ──▶ VectorIndex ──▶ assemble ──▶ CompletionClient
//!                                                │                │
//!                                        transcript + context     ▼
//!                                                └─────▶ SessionState update
//! ```
//!
//! Collaborators sit behind the [`Embedder`](crate::embedding::Embedder),
//! [`VectorIndex`](crate::index::VectorIndex), and
//! [`CompletionClient`](crate::completion::CompletionClient) traits so the
//! engine can be exercised without network access.
//!
//! # Error semantics
//!
//! Embedding and index faults propagate and fail the turn; nothing is
//! appended to the session. A completion non-200 is folded into the
//! conversation as an `Error: <body>` answer flagged `is_error`, appended
//! to history and transcript exactly like a normal answer.

use anyhow::Result;

use crate::assemble::{build_context, compose_prompt};
use crate::completion::{CompletionClient, HttpCompletionClient};
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::index::{QdrantIndex, VectorIndex};
use crate::models::{ChatTurn, CompletionOutcome};
use crate::session::SessionState;

pub struct ChatEngine {
    embedder: Box<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    completion: Box<dyn CompletionClient>,
    top_k: usize,
    history_window: Option<usize>,
}

impl ChatEngine {
    pub fn new(
        embedder: Box<dyn Embedder>,
        index: Box<dyn VectorIndex>,
        completion: Box<dyn CompletionClient>,
        top_k: usize,
        history_window: Option<usize>,
    ) -> Self {
        Self {
            embedder,
            index,
            completion,
            top_k,
            history_window,
        }
    }

    /// Build an engine with the HTTP collaborators, reading secrets from
    /// the environment. Missing required secrets fail here, at startup.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let index = Box::new(QdrantIndex::from_env(&config.index)?);
        let completion = Box::new(HttpCompletionClient::from_env(&config.completion)?);

        Ok(Self::new(
            embedder,
            index,
            completion,
            config.index.top_k,
            config.session.history_window,
        ))
    }

    /// Create a session configured for this engine.
    pub fn new_session(&self) -> SessionState {
        SessionState::new(self.history_window)
    }

    /// Process one user turn against the given session and return the
    /// recorded assistant turn.
    ///
    /// The user line is appended to the session before the completion
    /// request is issued, so the prompt transcript carries turns 1..n-1
    /// plus the new `User:` line, in original order. An empty query is
    /// passed through as-is.
    pub async fn run_turn(&self, session: &mut SessionState, query: &str) -> Result<ChatTurn> {
        let vector = self.embedder.embed(query).await?;
        let chunks = self.index.query(&vector, self.top_k).await?;
        let context = build_context(&chunks);

        session.push_user(query);
        let prompt = compose_prompt(&session.transcript(), &context);

        let outcome = self.completion.complete(&prompt).await?;
        let (content, is_error) = match outcome {
            CompletionOutcome::Answer(text) => (text, false),
            CompletionOutcome::Failed { body, .. } => (format!("Error: {}", body), true),
        };

        Ok(session.push_assistant(content, is_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RetrievedChunk, Role};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1, 0.2, 0.3])
        }
        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            anyhow::bail!("embedding backend unavailable")
        }
        fn model_name(&self) -> &str {
            "failing"
        }
    }

    struct FixedIndex {
        chunks: Vec<RetrievedChunk>,
    }

    #[async_trait]
    impl VectorIndex for FixedIndex {
        async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<RetrievedChunk>> {
            Ok(self.chunks.clone())
        }
    }

    /// Records every prompt it receives and replays scripted outcomes.
    struct ScriptedCompletion {
        prompts: Mutex<Vec<String>>,
        outcomes: Mutex<Vec<CompletionOutcome>>,
    }

    impl ScriptedCompletion {
        fn new(outcomes: Vec<CompletionOutcome>) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                outcomes: Mutex::new(outcomes),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn complete(&self, prompt: &str) -> Result<CompletionOutcome> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.outcomes.lock().unwrap().remove(0))
        }
    }

    fn chunk(text: &str, rank: usize) -> RetrievedChunk {
        RetrievedChunk {
            text: text.to_string(),
            rank,
        }
    }

    fn engine_with(
        chunks: Vec<RetrievedChunk>,
        completion: ScriptedCompletion,
    ) -> (ChatEngine, std::sync::Arc<ScriptedCompletion>) {
        let completion = std::sync::Arc::new(completion);

        struct Shared(std::sync::Arc<ScriptedCompletion>);

        #[async_trait]
        impl CompletionClient for Shared {
            async fn complete(&self, prompt: &str) -> Result<CompletionOutcome> {
                self.0.complete(prompt).await
            }
        }

        let engine = ChatEngine::new(
            Box::new(FixedEmbedder),
            Box::new(FixedIndex { chunks }),
            Box::new(Shared(completion.clone())),
            5,
            None,
        );
        (engine, completion)
    }

    #[tokio::test]
    async fn test_turn_records_user_and_assistant() {
        let (engine, _) = engine_with(
            vec![chunk("ctx", 0)],
            ScriptedCompletion::new(vec![CompletionOutcome::Answer("the answer".to_string())]),
        );
        let mut session = engine.new_session();

        let turn = engine.run_turn(&mut session, "a question").await.unwrap();

        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.content, "the answer");
        assert!(!turn.is_error);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].content, "a question");
    }

    #[tokio::test]
    async fn test_prompt_contains_history_then_context() {
        let (engine, completion) = engine_with(
            vec![chunk("NLP chunk A", 0), chunk("NLP chunk B", 1)],
            ScriptedCompletion::new(vec![CompletionOutcome::Answer("ok".to_string())]),
        );
        let mut session = engine.new_session();

        engine
            .run_turn(&mut session, "What is feature extraction?")
            .await
            .unwrap();

        let prompts = completion.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(
            prompts[0],
            "Conversation history:\n\nUser: What is feature extraction?\n\n\
             Relevant Notion context:\nNLP chunk A\nNLP chunk B"
        );
    }

    #[tokio::test]
    async fn test_no_chunks_uses_fallback_literal() {
        let (engine, completion) = engine_with(
            vec![],
            ScriptedCompletion::new(vec![CompletionOutcome::Answer("ok".to_string())]),
        );
        let mut session = engine.new_session();

        engine.run_turn(&mut session, "anything").await.unwrap();

        let prompts = completion.prompts.lock().unwrap();
        assert!(prompts[0].contains("Relevant Notion context:\nNo relevant context found."));
    }

    #[tokio::test]
    async fn test_failed_completion_stored_as_error_answer() {
        let (engine, _) = engine_with(
            vec![chunk("ctx", 0)],
            ScriptedCompletion::new(vec![CompletionOutcome::Failed {
                status: 429,
                body: "rate limited".to_string(),
            }]),
        );
        let mut session = engine.new_session();

        let turn = engine.run_turn(&mut session, "q").await.unwrap();

        assert_eq!(turn.content, "Error: rate limited");
        assert!(turn.is_error);
        // Appended to both history and transcript like a normal answer.
        assert_eq!(session.history().len(), 2);
        assert_eq!(
            session.transcript(),
            "\nUser: q\nAssistant: Error: rate limited"
        );
    }

    #[tokio::test]
    async fn test_transcript_accumulates_across_turns() {
        let (engine, completion) = engine_with(
            vec![chunk("ctx", 0)],
            ScriptedCompletion::new(vec![
                CompletionOutcome::Answer("first answer".to_string()),
                CompletionOutcome::Answer("second answer".to_string()),
            ]),
        );
        let mut session = engine.new_session();

        engine.run_turn(&mut session, "first question").await.unwrap();
        engine.run_turn(&mut session, "second question").await.unwrap();

        // The second prompt carries all prior turns in order, with the new
        // user line appended before context.
        let prompts = completion.prompts.lock().unwrap();
        assert!(prompts[1].starts_with(
            "Conversation history:\n\
             \nUser: first question\
             \nAssistant: first answer\
             \nUser: second question\n"
        ));
    }

    #[tokio::test]
    async fn test_embedding_fault_fails_turn_without_mutating_session() {
        let engine = ChatEngine::new(
            Box::new(FailingEmbedder),
            Box::new(FixedIndex { chunks: vec![] }),
            Box::new(ScriptedCompletion::new(vec![])),
            5,
            None,
        );
        let mut session = engine.new_session();

        let err = engine.run_turn(&mut session, "q").await.unwrap_err();
        assert!(err.to_string().contains("embedding backend unavailable"));
        assert!(session.is_empty());
    }
}
