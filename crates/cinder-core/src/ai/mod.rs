//! Model providers
//!
//! A thin provider trait, an HTTP implementation, and credential rotation.
//! The orchestrator only ever sees [`LlmProvider`].

pub mod openrouter;
pub mod provider;
pub mod retry;

pub use openrouter::OpenRouterProvider;
pub use provider::{CompletionOptions, LlmProvider};
pub use retry::KeyRing;
