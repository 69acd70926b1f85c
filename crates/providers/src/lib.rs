//! Hosted-model provider implementations for FitCoach.
//!
//! All providers implement the `fitcoach_core::Provider` trait.
//! [`factory::build_from_config`] wires them behind the retry policy.

mod http;
pub mod factory;
pub mod gemini;
pub mod openai_compat;
pub mod retry;

pub use factory::{ModelProviders, build_from_config};
pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::{RetryPolicy, RetryingProvider};
