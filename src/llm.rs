//! Generation: model routing, prompt assembly, the Gemini adapter, and
//! retry across the fallback ordering.

pub mod client;
pub mod prompt;
pub mod retry;
pub mod routing;

pub use client::{GeminiClient, Generator};
pub use prompt::{EventAttachment, GenerationRequest, compose};
pub use retry::{RetryPolicy, generate_with_retry};
pub use routing::{ModelPreference, ModelProfile, TaskCategory};
