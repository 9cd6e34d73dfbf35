//! # NotionAtlas
//!
//! A retrieval-augmented chat assistant for Notion workspace knowledge bases.
//!
//! NotionAtlas answers natural-language questions against text chunks
//! previously extracted from a Notion workspace and stored in a vector
//! index. Each turn embeds the query, retrieves the top-K most similar
//! chunks, assembles a prompt from the conversation transcript and the
//! retrieved context, and forwards it to a hosted chat-completion endpoint.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌───────────┐   ┌────────────┐
//! │ Embedder │──▶│ VectorIndex │──▶│ assemble  │──▶│ Completion │
//! │ (HTTP)   │   │ (Qdrant)    │   │ (prompt)  │   │ (HTTP)     │
//! └──────────┘   └─────────────┘   └─────┬─────┘   └─────┬──────┘
//!                                        │               │
//!                                        ▼               ▼
//!                                  ┌───────────────────────┐
//!                                  │     SessionState      │
//!                                  └──────────┬────────────┘
//!                              ┌──────────────┤
//!                              ▼              ▼
//!                         ┌────────┐    ┌──────────┐
//!                         │  CLI   │    │   HTTP   │
//!                         │(atlas) │    │ (chat UI)│
//!                         └────────┘    └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export LLAMA_API_KEY=...          # completion endpoint bearer token
//! atlas ask "What is feature extraction?"
//! atlas chat                        # interactive session
//! atlas serve                       # browser chat page + JSON API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`session`] | Per-session conversation state |
//! | [`assemble`] | Prompt assembly |
//! | [`embedding`] | Embedding collaborator clients |
//! | [`index`] | Vector index collaborator client |
//! | [`completion`] | Completion endpoint client |
//! | [`chat`] | The retrieval-augmented turn engine |
//! | [`server`] | Chat HTTP server |

pub mod assemble;
pub mod chat;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod index;
pub mod models;
pub mod server;
pub mod session;
