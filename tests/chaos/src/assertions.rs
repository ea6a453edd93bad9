//! Assertion helpers for chaos testing.
//!
//! These are pure functions that verify delivery correctness after chaos
//! scenarios complete. They take the delivered sequence numbers (in delivery
//! order, duplicates included) and return pass/fail.

use std::collections::HashSet;
use std::ops::Range;

/// Result of an assertion check.
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Description of what was checked
    pub description: String,
    /// Details on failure
    pub failure_details: Option<String>,
}

impl AssertionResult {
    /// Create a passing result.
    pub fn pass(description: &str) -> Self {
        Self {
            passed: true,
            description: description.into(),
            failure_details: None,
        }
    }

    /// Create a failing result.
    pub fn fail(description: &str, details: &str) -> Self {
        Self {
            passed: false,
            description: description.into(),
            failure_details: Some(details.into()),
        }
    }

    /// Panic with the failure details unless the check passed.
    pub fn expect_pass(self) {
        if !self.passed {
            panic!(
                "{}: {}",
                self.description,
                self.failure_details.unwrap_or_default()
            );
        }
    }
}

/// Assert that every expected message was delivered at least once.
///
/// # Arguments
/// * `delivered` - Sequence numbers in delivery order
/// * `expected` - The messages that must have arrived
pub fn assert_all_delivered(delivered: &[u64], expected: Range<u64>) -> AssertionResult {
    let seen: HashSet<u64> = delivered.iter().copied().collect();
    let missing: Vec<u64> = expected.clone().filter(|seq| !seen.contains(seq)).collect();

    if missing.is_empty() {
        AssertionResult::pass(&format!(
            "All {} messages delivered",
            expected.end.saturating_sub(expected.start)
        ))
    } else {
        AssertionResult::fail(
            "At-least-once delivery",
            &format!(
                "{} of {} messages missing, first missing: {}",
                missing.len(),
                expected.end.saturating_sub(expected.start),
                missing[0]
            ),
        )
    }
}

/// Assert that no message outside `expected` was delivered.
///
/// Catches history leaking through an initial sync.
pub fn assert_only_delivered(delivered: &[u64], expected: Range<u64>) -> AssertionResult {
    match delivered.iter().find(|seq| !expected.contains(*seq)) {
        None => AssertionResult::pass("No unexpected messages delivered"),
        Some(seq) => AssertionResult::fail(
            "No unexpected messages",
            &format!(
                "Message {} delivered but only {:?} expected",
                seq, expected
            ),
        ),
    }
}

/// Assert that no message was delivered twice.
///
/// Holds for runs without crashes or cancellation mid-delivery.
pub fn assert_no_duplicates(delivered: &[u64]) -> AssertionResult {
    let mut seen = HashSet::new();
    for seq in delivered {
        if !seen.insert(*seq) {
            return AssertionResult::fail(
                "Exactly-once delivery",
                &format!("Message {} delivered more than once", seq),
            );
        }
    }
    AssertionResult::pass(&format!("{} messages, no duplicates", delivered.len()))
}

/// Assert that first deliveries happen in sequence order.
///
/// Replays after a crash repeat earlier messages, but a message must never
/// be seen for the first time before one that precedes it.
pub fn assert_first_delivery_ordered(delivered: &[u64]) -> AssertionResult {
    let mut seen = HashSet::new();
    let mut last_new: Option<u64> = None;

    for seq in delivered {
        if !seen.insert(*seq) {
            continue;
        }
        if let Some(prev) = last_new {
            if *seq < prev {
                return AssertionResult::fail(
                    "Ordered delivery",
                    &format!("Message {} first delivered after message {}", seq, prev),
                );
            }
        }
        last_new = Some(*seq);
    }
    AssertionResult::pass("First deliveries are in order")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_delivered_pass() {
        let result = assert_all_delivered(&[0, 1, 1, 2], 0..3);
        assert!(result.passed);
    }

    #[test]
    fn test_all_delivered_fail() {
        let result = assert_all_delivered(&[0, 2], 0..3);
        assert!(!result.passed);
        assert!(result.failure_details.unwrap().contains("first missing: 1"));
    }

    #[test]
    fn test_only_delivered_fail_on_history() {
        let result = assert_only_delivered(&[3, 4, 1], 3..5);
        assert!(!result.passed);
    }

    #[test]
    fn test_no_duplicates() {
        assert!(assert_no_duplicates(&[0, 1, 2]).passed);
        assert!(!assert_no_duplicates(&[0, 1, 1]).passed);
    }

    #[test]
    fn test_first_delivery_ordered_allows_replay() {
        // Crash after 3, replay from 2
        assert!(assert_first_delivery_ordered(&[0, 1, 2, 3, 2, 3, 4]).passed);
    }

    #[test]
    fn test_first_delivery_ordered_fail() {
        let result = assert_first_delivery_ordered(&[0, 2, 1]);
        assert!(!result.passed);
    }

    #[test]
    #[should_panic(expected = "Exactly-once delivery")]
    fn test_expect_pass_panics_on_failure() {
        assert_no_duplicates(&[1, 1]).expect_pass();
    }
}
