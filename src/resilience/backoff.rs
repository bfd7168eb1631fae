//! Exponential backoff.

use std::time::Duration;

/// Delay before the retry that follows attempt `attempt` (0-based):
/// `base_ms * 2^attempt`, saturating instead of overflowing.
pub fn exponential_delay(attempt: u32, base_ms: u64) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(exponential_delay(0, 1000), Duration::from_millis(1000));
        assert_eq!(exponential_delay(1, 1000), Duration::from_millis(2000));
        assert_eq!(exponential_delay(2, 1000), Duration::from_millis(4000));
        assert_eq!(exponential_delay(3, 250), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_saturates() {
        assert_eq!(exponential_delay(80, 1000), Duration::from_millis(u64::MAX));
    }
}
