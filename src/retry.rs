//! Retry state, backoff calculation, and error classification.
//!
//! A failing attempt goes through two gates: [`classify`] decides from the
//! response body whether the failure is one the platform documents as
//! transient, and [`RetryState::next_delay`] decides whether the wall-clock
//! budget leaves room for another backoff. Both exits from the loop are
//! named variants, so the termination argument is visible in the types.

use crate::codec::JsonCodec;
use crate::error::{ApiError, Result};
use crate::response::ResponseEnvelope;
use rand::Rng;
use std::time::{Duration, Instant};

/// Error codes the platform documents as transient (rate-limit and
/// temporary-server categories). Everything else fails immediately.
pub const RETRYABLE_ERROR_CODES: [i64; 4] = [4001, 4002, 4003, 4004];

/// Default wall-clock retry budget, measured from the first attempt.
pub const DEFAULT_MAX_RETRY_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Backoff before the next attempt: `2^attempt * 1000ms` plus a uniform
/// 0-1000ms jitter, so herds of clients do not retry in lockstep. The first
/// retry (attempt 0) waits 1-2 seconds.
pub(crate) fn backoff_for_attempt(attempt: u32) -> Duration {
    let base = 2u64.saturating_pow(attempt).saturating_mul(1000);
    let jitter = rand::thread_rng().gen_range(0..1000);
    Duration::from_millis(base.saturating_add(jitter))
}

/// Outcome of inspecting a failing response body.
#[derive(Debug)]
pub(crate) enum Classification {
    /// Allow-listed transient error; the budget check gets the final say.
    Retryable(ApiError),
    /// Anything else: wrong code, non-JSON body, or no body at all. The
    /// parsed error rides along when the body was JSON.
    NotRetryable(Option<ApiError>),
}

/// Decides retryability from a failing envelope.
///
/// A body with an absent or non-JSON content type cannot be trusted, so it
/// is never retried. A valid JSON body missing the structured-error fields
/// default-populates them (code 0 is never on the allow-list, so such
/// failures are returned as-is). Only a body that is not valid JSON at all
/// is a fatal deserialization error, surfaced to the caller rather than
/// quietly treated as non-retryable.
pub(crate) fn classify<C: JsonCodec>(
    envelope: &ResponseEnvelope,
    codec: &C,
) -> Result<Classification> {
    let entity = match &envelope.entity {
        Some(entity) if entity.is_json() => entity,
        _ => return Ok(Classification::NotRetryable(None)),
    };

    let error: ApiError = codec.deserialize(&entity.content)?;

    if RETRYABLE_ERROR_CODES.contains(&error.error_code) {
        Ok(Classification::Retryable(error))
    } else {
        Ok(Classification::NotRetryable(Some(error)))
    }
}

/// Whether the retry loop may pause and go again, or must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    /// Sleep for this backoff, then re-attempt.
    Retry { backoff: Duration },
    /// The next backoff would overrun the budget; surface the last failure.
    BudgetExhausted,
}

/// Per-request retry bookkeeping: attempt counter (from 0), the elapsed
/// clock started at the first attempt, and the wall-clock budget. Lives for
/// one logical request and is discarded after.
#[derive(Debug)]
pub(crate) struct RetryState {
    attempt: u32,
    started: Instant,
    budget: Duration,
}

impl RetryState {
    pub(crate) fn new(budget: Duration) -> Self {
        Self {
            attempt: 0,
            started: Instant::now(),
            budget,
        }
    }

    /// Wire attempts made so far, counting the in-flight one.
    pub(crate) fn attempts(&self) -> u32 {
        self.attempt + 1
    }

    /// Computes the next backoff and checks it against the remaining
    /// budget. The budget is wall-clock, not attempt-count: slow backoffs
    /// self-limit.
    pub(crate) fn next_delay(&self) -> Decision {
        let backoff = backoff_for_attempt(self.attempt);
        if self.started.elapsed() + backoff > self.budget {
            Decision::BudgetExhausted
        } else {
            Decision::Retry { backoff }
        }
    }

    /// Records that another attempt is starting.
    pub(crate) fn advance(&mut self) {
        self.attempt += 1;
    }
}
