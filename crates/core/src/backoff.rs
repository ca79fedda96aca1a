//! Retry backoff for resources in ERROR.
//!
//! A failed resource is not retried on the immediately-next tick. Instead the
//! repository re-arms the row's lease to `now() + error_backoff()` when
//! marking it ERROR, so the normal lease-eligibility check doubles as the
//! retry gate. Jitter spreads retries out when many resources fail at once
//! (e.g. a backend outage).

use rand::Rng;

/// Base delay before a resource in ERROR becomes claimable again.
pub const ERROR_RETRY_BASE_SECS: u64 = 30;

/// Jitter applied to the base delay, as a fraction (±20%).
pub const ERROR_RETRY_JITTER: f64 = 0.2;

/// The delay to apply when marking a resource ERROR.
pub fn error_backoff() -> std::time::Duration {
    let factor = rand::rng().random_range(1.0 - ERROR_RETRY_JITTER..=1.0 + ERROR_RETRY_JITTER);
    std::time::Duration::from_secs_f64(ERROR_RETRY_BASE_SECS as f64 * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_stays_within_jitter_bounds() {
        for _ in 0..100 {
            let d = error_backoff().as_secs_f64();
            let base = ERROR_RETRY_BASE_SECS as f64;
            assert!(d >= base * (1.0 - ERROR_RETRY_JITTER));
            assert!(d <= base * (1.0 + ERROR_RETRY_JITTER));
        }
    }
}
