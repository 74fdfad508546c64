//! Consecutive-failure tracking and period backoff
//!
//! Shared by the sampler and the display pipeline. Every `threshold`
//! consecutive failures multiply the component's period by `factor`, up to
//! `factor^max_shift`. One success restores the base period.

use crate::config::BackoffConfig;
use crate::tick::Tick;

/// State change caused by recording an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    Unchanged,
    /// Entered the degraded state
    Degraded,
    /// Already degraded; the period grew again
    Escalated,
    /// Left the degraded state
    Recovered,
}

#[derive(Debug, Clone)]
pub struct FailureBackoff {
    config: BackoffConfig,
    failures: u8,
    shift: u8,
}

impl FailureBackoff {
    pub const fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: 0,
            shift: 0,
        }
    }

    pub fn record_failure(&mut self) -> Transition {
        self.failures = self.failures.saturating_add(1);
        let threshold = self.config.threshold.max(1);
        if self.failures % threshold != 0 || self.shift >= self.config.max_shift {
            return Transition::Unchanged;
        }
        self.shift += 1;
        if self.shift == 1 {
            Transition::Degraded
        } else {
            Transition::Escalated
        }
    }

    pub fn record_success(&mut self) -> Transition {
        let was_degraded = self.is_degraded();
        self.failures = 0;
        self.shift = 0;
        if was_degraded {
            Transition::Recovered
        } else {
            Transition::Unchanged
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.shift > 0
    }

    pub fn consecutive_failures(&self) -> u8 {
        self.failures
    }

    /// Multiplier currently applied to the base period
    pub fn multiplier(&self) -> u32 {
        self.config.factor.saturating_pow(self.shift as u32)
    }

    /// `base` stretched by the current backoff
    pub fn period(&self, base: Tick) -> Tick {
        base.saturating_mul(self.multiplier())
    }

    /// Forget all failures without reporting a transition
    pub fn reset(&mut self) {
        self.failures = 0;
        self.shift = 0;
    }
}

impl Default for FailureBackoff {
    fn default() -> Self {
        Self::new(BackoffConfig::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_at_threshold() {
        let mut backoff = FailureBackoff::default();
        assert_eq!(backoff.record_failure(), Transition::Unchanged);
        assert_eq!(backoff.record_failure(), Transition::Unchanged);
        assert_eq!(backoff.period(100), 100);
        assert_eq!(backoff.record_failure(), Transition::Degraded);
        assert_eq!(backoff.period(100), 200);
        assert!(backoff.is_degraded());
    }

    #[test]
    fn test_compounds_until_cap() {
        let mut backoff = FailureBackoff::default();
        for _ in 0..6 {
            backoff.record_failure();
        }
        assert_eq!(backoff.period(100), 400);
        for _ in 0..30 {
            backoff.record_failure();
        }
        assert_eq!(backoff.period(100), 800);
    }

    #[test]
    fn test_success_restores_base_period() {
        let mut backoff = FailureBackoff::default();
        for _ in 0..3 {
            backoff.record_failure();
        }
        assert_eq!(backoff.record_success(), Transition::Recovered);
        assert_eq!(backoff.period(100), 100);
        assert_eq!(backoff.consecutive_failures(), 0);
        assert_eq!(backoff.record_success(), Transition::Unchanged);
    }

    #[test]
    fn test_failure_count_saturates() {
        let mut backoff = FailureBackoff::default();
        for _ in 0..400 {
            backoff.record_failure();
        }
        assert_eq!(backoff.consecutive_failures(), u8::MAX);
        assert_eq!(backoff.period(100), 800);
    }
}
