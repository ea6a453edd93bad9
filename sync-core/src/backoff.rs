//! Retry delay arithmetic.
//!
//! The default retry policy uses a fixed delay; this module provides the
//! exponential variant for callers that want one.

use std::time::Duration;

/// Maximum jitter added on top of the exponential base.
pub const MAX_JITTER: Duration = Duration::from_millis(1000);

/// Calculate an exponential backoff with jitter.
///
/// Formula: min(cap, base * 2^(attempt-1)) + random(0..=1000ms).
/// `attempt` is 1-based; attempt 0 is treated as 1.
pub fn exponential_backoff(attempt: u32, base: Duration, cap: Duration) -> Duration {
    exponential_base(attempt, base, cap) + Duration::from_millis(random_jitter_ms())
}

/// The exponential delay before jitter is applied.
pub fn exponential_base(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exponent = attempt.max(1).saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(cap)
}

/// Generate random jitter between 0 and MAX_JITTER milliseconds.
fn random_jitter_ms() -> u64 {
    let max = MAX_JITTER.as_millis() as u64;
    let mut bytes = [0u8; 8];
    // No entropy source: no jitter.
    if getrandom::getrandom(&mut bytes).is_err() {
        return 0;
    }
    u64::from_le_bytes(bytes) % (max + 1)
}
