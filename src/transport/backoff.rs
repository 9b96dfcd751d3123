//! Reconnection delay curves.
//!
//! Two geometric curves, selected per attempt by the health probe result:
//!
//! - **standard**: `base × 2^(attempt-1)`, randomized ±25%, for ordinary
//!   transient failures. Jitter avoids synchronized reconnection storms
//!   across clients recovering from the same outage.
//! - **restart**: `restart_base × 1.5^(attempt-1)`, no jitter, for a backend
//!   that failed its health probe. A full process restart takes tens of
//!   seconds, so this curve starts higher and grows gentler.
//!
//! Both curves are capped at the same maximum. For every attempt within the
//! retry ceiling the restart delay is strictly greater than the standard
//! delay even at maximum positive jitter.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rand::Rng;

// ============================================================================
// BackoffConfig
// ============================================================================

/// Delay-curve parameters.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Base delay of the standard curve.
    pub base_delay: Duration,

    /// Base delay of the restart curve.
    pub restart_base_delay: Duration,

    /// Cap applied to both curves.
    pub max_delay: Duration,

    /// Growth factor of the standard curve per attempt.
    pub multiplier: f64,

    /// Growth factor of the restart curve per attempt.
    pub restart_multiplier: f64,

    /// Jitter applied to the standard curve, as a fraction of the delay.
    ///
    /// 0.25 means the delay is randomized within ±25%.
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            restart_base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            restart_multiplier: 1.5,
            jitter_factor: 0.25,
        }
    }
}

// ============================================================================
// BackoffPolicy
// ============================================================================

/// Computes the delay before a reconnection attempt.
///
/// `attempt` is the 1-based number of the upcoming retry; the exponent is
/// zero-based so the first retry waits exactly the base delay.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    config: BackoffConfig,
}

impl BackoffPolicy {
    /// Creates a policy from the given configuration.
    #[inline]
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Returns the delay for the given attempt and probe result.
    #[inline]
    #[must_use]
    pub fn delay_for(&self, attempt: u32, healthy: bool) -> Duration {
        if healthy {
            self.standard_delay(attempt)
        } else {
            self.restart_delay(attempt)
        }
    }

    /// Standard curve with jitter.
    #[must_use]
    pub fn standard_delay(&self, attempt: u32) -> Duration {
        let capped = self.standard_delay_without_jitter(attempt).as_millis() as f64;
        let jitter = rand::rng().random_range(-self.config.jitter_factor..=self.config.jitter_factor);
        let jittered = capped * (1.0 + jitter);
        Duration::from_millis(jittered.max(0.0) as u64)
    }

    /// Standard curve before jitter is applied.
    #[must_use]
    pub fn standard_delay_without_jitter(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let raw = self.config.base_delay.as_millis() as f64
            * self.config.multiplier.powi(exponent as i32);
        let capped = raw.min(self.config.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Restart curve; deterministic.
    #[must_use]
    pub fn restart_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let raw = self.config.restart_base_delay.as_millis() as f64
            * self.config.restart_multiplier.powi(exponent as i32);
        let capped = raw.min(self.config.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::new(BackoffConfig::default())
    }

    #[test]
    fn test_standard_exponential_growth_without_jitter() {
        let policy = policy();

        assert_eq!(
            policy.standard_delay_without_jitter(1),
            Duration::from_secs(1)
        );
        assert_eq!(
            policy.standard_delay_without_jitter(2),
            Duration::from_secs(2)
        );
        assert_eq!(
            policy.standard_delay_without_jitter(3),
            Duration::from_secs(4)
        );
        assert_eq!(
            policy.standard_delay_without_jitter(4),
            Duration::from_secs(8)
        );
        assert_eq!(
            policy.standard_delay_without_jitter(5),
            Duration::from_secs(16)
        );
    }

    #[test]
    fn test_standard_caps_at_max() {
        let policy = policy();

        // 2^9 seconds is far past the cap.
        assert_eq!(
            policy.standard_delay_without_jitter(10),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_restart_geometric_growth() {
        let policy = policy();

        assert_eq!(policy.restart_delay(1), Duration::from_secs(5));
        assert_eq!(policy.restart_delay(2), Duration::from_millis(7500));
        assert_eq!(policy.restart_delay(3), Duration::from_millis(11250));
        assert_eq!(policy.restart_delay(4), Duration::from_millis(16875));
        assert_eq!(policy.restart_delay(5), Duration::from_millis(25312));
    }

    #[test]
    fn test_restart_caps_at_max() {
        let policy = policy();
        assert_eq!(policy.restart_delay(20), Duration::from_secs(30));
    }

    #[test]
    fn test_restart_strictly_exceeds_jittered_standard_within_ceiling() {
        let policy = policy();

        // The gentler curve must out-wait the standard curve for every
        // attempt the retry ceiling permits, even at +25% jitter.
        for attempt in 1..=5 {
            let standard_max = policy.standard_delay_without_jitter(attempt).as_millis() as f64
                * 1.25;
            let restart = policy.restart_delay(attempt).as_millis() as f64;
            assert!(
                restart > standard_max,
                "attempt {attempt}: restart {restart}ms must exceed standard+jitter {standard_max}ms"
            );
        }
    }

    #[test]
    fn test_delay_for_selects_curve() {
        let policy = policy();

        assert_eq!(
            policy.delay_for(3, false),
            policy.restart_delay(3)
        );
        // The healthy path is jittered; bound it instead of comparing exactly.
        let healthy = policy.delay_for(3, true);
        assert!(healthy >= Duration::from_secs(3));
        assert!(healthy <= Duration::from_secs(5));
    }

    proptest! {
        #[test]
        fn prop_standard_jitter_stays_within_bounds(attempt in 1u32..32) {
            let policy = policy();
            let base = policy.standard_delay_without_jitter(attempt).as_millis() as f64;
            let jittered = policy.standard_delay(attempt).as_millis() as f64;

            prop_assert!(jittered >= base * 0.75 - 1.0);
            prop_assert!(jittered <= base * 1.25 + 1.0);
        }

        #[test]
        fn prop_curves_never_exceed_cap_plus_jitter(attempt in 1u32..64) {
            let policy = policy();
            let cap = Duration::from_secs(30);

            prop_assert!(policy.restart_delay(attempt) <= cap);
            prop_assert!(
                policy.standard_delay(attempt).as_millis() as f64
                    <= cap.as_millis() as f64 * 1.25 + 1.0
            );
        }

        #[test]
        fn prop_unjittered_curves_are_monotone(attempt in 1u32..63) {
            let policy = policy();

            prop_assert!(
                policy.standard_delay_without_jitter(attempt + 1)
                    >= policy.standard_delay_without_jitter(attempt)
            );
            prop_assert!(policy.restart_delay(attempt + 1) >= policy.restart_delay(attempt));
        }
    }
}
