//! Memory-injecting chat relay.
//!
//! `memory-relay` is a small HTTP service that forwards a user message to an
//! OpenAI-compatible chat-completion API and splices stored "memory" into the
//! prompt on the way. Each exchange is logged as short-term history; replies
//! carrying a `[[remember]]` marker are promoted to long-term episodes.
//!
//! # Request pipeline
//!
//! 1. The client's model id is resolved to a [`routing::ModelRoute`], which
//!    names the memory profile and the upstream provider.
//! 2. The user message is scanned for the profile's trigger names. A hit
//!    loads that trigger's facts, reflections and episodes.
//! 3. Recent history is replayed oldest-first after the memory blocks.
//! 4. The model may answer with `<<memory_request: NAME>>`; one extra round
//!    is then made with the requested memory in the prompt.
//! 5. Markers are stripped from the reply before it is stored and returned.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`routing`]: validated model → profile table
//! - [`db`]: SQLite initialization, schema, migrations and health checks
//! - [`memory`]: row types, store, triggers, markers, bundles and history
//! - [`chat`]: LLM client, prompt assembly and the orchestrator
//! - [`api`] / [`server`]: axum router and server startup

pub mod api;
pub mod chat;
pub mod config;
pub mod db;
pub mod memory;
pub mod routing;
pub mod server;
