//! Model access for FlowMD.
//!
//! This crate owns everything between a clinical question and a typed answer:
//! prompts and response schemas, the Gemini client, the shared response cache,
//! rate-limit retry, and debouncing of input-driven calls.

pub mod client;
pub mod debounce;
pub mod error;
pub mod extraction;
pub mod gateway;
pub mod prompts;
pub mod retry;

pub use client::{tasks, GeminiClient, GenerativeModel, ModelRequest, ScriptedModel};
pub use debounce::Debouncer;
pub use error::{InferenceError, InferenceResult};
pub use extraction::*;
pub use gateway::{or_fallback, InferenceGateway, DISCHARGE_FALLBACK, SUMMARY_FALLBACK};
pub use prompts::ContextQuery;
pub use retry::{fingerprint, CacheKey, ResponseCache, RetryPolicy, DEFAULT_CACHE_TTL};
