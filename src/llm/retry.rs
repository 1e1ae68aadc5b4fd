//! Bounded retry across a fallback model ordering.

use crate::error::GenerationError;
use crate::llm::client::Generator;
use crate::llm::prompt::GenerationRequest;
use crate::llm::routing::ModelProfile;

use std::time::Duration;

/// Max attempts across the preferred profile and the fallback ordering.
pub const MAX_ATTEMPTS: usize = 3;

/// Retry policy: attempt bound plus backoff schedule.
///
/// Kept independent of the generation adapter so the policy is testable
/// with a scripted generator.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    /// Delay to wait after `failed_attempts` attempts have failed.
    pub backoff: fn(u32) -> Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff: linear_backoff,
        }
    }
}

/// Linear backoff: 1000 + 500×n ms after the n-th failed attempt, so the
/// waits grow 1500ms, 2000ms, ...
pub fn linear_backoff(failed_attempts: u32) -> Duration {
    Duration::from_millis(1000 + 500 * u64::from(failed_attempts))
}

/// Invoke the generator, retrying across the fallback ordering on failure.
///
/// Attempt 1 uses `preferred`; attempts 2.. substitute the next entry of
/// `fallbacks` in order. The fallback list is taken as-is and may repeat
/// the preferred profile. Propagates the last error once attempts are
/// exhausted.
pub async fn generate_with_retry<G: Generator + ?Sized>(
    generator: &G,
    policy: &RetryPolicy,
    request: &GenerationRequest,
    preferred: &'static ModelProfile,
    fallbacks: &[&'static ModelProfile],
) -> Result<String, GenerationError> {
    let candidates: Vec<&ModelProfile> = std::iter::once(preferred)
        .chain(fallbacks.iter().copied())
        .take(policy.max_attempts)
        .collect();

    let mut last_error = None;
    for (index, profile) in candidates.iter().enumerate() {
        if index > 0 {
            let delay = (policy.backoff)(index as u32);
            tracing::debug!(
                model = %profile.key,
                attempt = index + 1,
                delay_ms = delay.as_millis() as u64,
                "retrying after backoff"
            );
            tokio::time::sleep(delay).await;
        }

        match generator.generate(request, profile).await {
            Ok(text) => {
                if index > 0 {
                    tracing::info!(
                        original = %preferred.key,
                        fallback = %profile.key,
                        attempt = index + 1,
                        "fallback model succeeded"
                    );
                }
                return Ok(text);
            }
            Err(error) => {
                tracing::warn!(
                    model = %profile.key,
                    attempt = index + 1,
                    %error,
                    "generation attempt failed"
                );
                last_error = Some(error);
            }
        }
    }

    Err(last_error.unwrap_or(GenerationError::EmptyResponse))
}
