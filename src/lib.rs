//! chatspace — streaming chat core.
//!
//! Request composition for a hosted LLM API, SSE response streaming,
//! incremental turn merging, and in-memory conversation/Space state.

pub mod chat;
pub mod config;
pub mod error;
pub mod files;
pub mod llm;
