//! # cwv-llm
//!
//! The LLM backend seam of the report agent.
//!
//! - [`LlmBackend`]: `invoke(messages) -> LlmResponse`
//! - [`BackendError`]: what a backend reports when a call fails
//! - [`classify`]: maps a [`BackendError`] onto the run's [`FailureKind`]
//! - [`OpenAiChatBackend`]: non-streaming chat-completions client
//!
//! [`FailureKind`]: cwv_core::FailureKind

#![deny(unsafe_code)]

pub mod backend;
pub mod classify;
pub mod error_parsing;
pub mod errors;
pub mod openai;
pub mod retry;

pub use backend::{LlmBackend, LlmResponse, Usage};
pub use classify::classify;
pub use errors::{BackendError, BackendResult};
pub use openai::{OpenAiChatBackend, OpenAiConfig};
