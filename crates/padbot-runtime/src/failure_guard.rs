//! [`FailureGuard`] – consecutive-failure streak tracker.
//!
//! Every skipped cycle is recorded.  Once the number of failures in a row
//! reaches the threshold the guard reports the streak as *escalated*, which
//! the reconciler uses to raise its log level from `warn` to `error`.  The
//! first successful cycle resets the streak.
//!
//! # Example
//!
//! ```rust
//! use padbot_runtime::failure_guard::FailureGuard;
//!
//! let mut guard = FailureGuard::new(3);
//!
//! assert!(!guard.record_failure());
//! assert!(!guard.record_failure());
//! assert!(guard.record_failure()); // third failure in a row → escalated
//!
//! // A success reports how long the outage lasted and clears the streak.
//! assert_eq!(guard.record_success(), 3);
//! assert!(!guard.record_failure());
//! ```

/// Counts consecutive failed cycles.
#[derive(Debug)]
pub struct FailureGuard {
    /// Number of consecutive failures that triggers escalation.
    threshold: usize,
    streak: usize,
}

impl FailureGuard {
    /// A `threshold` of 0 is treated as 1.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            streak: 0,
        }
    }

    /// Record a failed cycle.
    ///
    /// Returns `true` when the streak has reached the threshold.
    pub fn record_failure(&mut self) -> bool {
        self.streak = self.streak.saturating_add(1);
        self.is_escalated()
    }

    /// Record a successful cycle and return the length of the streak it
    /// ended (0 if there was none).
    pub fn record_success(&mut self) -> usize {
        std::mem::take(&mut self.streak)
    }

    pub fn streak(&self) -> usize {
        self.streak
    }

    pub fn is_escalated(&self) -> bool {
        self.streak >= self.threshold
    }
}
