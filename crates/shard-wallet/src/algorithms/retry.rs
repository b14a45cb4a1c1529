//! # Retry Classification
//!
//! Pure decision table for one funding attempt:
//!
//! | Outcome                  | Decision                                   |
//! |--------------------------|--------------------------------------------|
//! | chain complete, all ok   | stop, return hash                          |
//! | nothing confirmed        | retry with a fresh envelope                |
//! | any `success = false`    | per `ExecutionFailurePolicy`               |
//! | transient RPC error      | back off, retry; last attempt propagates   |
//! | any other error          | propagate immediately                      |

use crate::domain::{Completion, ExecutionFailurePolicy, Hash, WalletError};

/// Classified result of one attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Whole chain observed and successful.
    Confirmed,
    /// Deadline hit before the chain closed.
    NotConfirmed,
    /// A receipt reported failure.
    ExecutionFailed {
        /// Node-reported reason
        reason: String,
    },
    /// The attempt errored before a receipt could be judged.
    Errored(WalletError),
}

/// What the retry loop does next.
#[derive(Debug)]
pub enum RetryDecision {
    /// Attempt succeeded.
    Done,
    /// Try again immediately with a fresh envelope.
    Retry,
    /// Sleep the backoff interval, then try again.
    RetryAfterBackoff,
    /// Stop with this error.
    Fail(WalletError),
}

/// Classify a receipt wait.
pub fn classify_completion(completion: &Completion) -> AttemptOutcome {
    if let Some(failed) = completion.first_failure() {
        return AttemptOutcome::ExecutionFailed {
            reason: failed
                .error_message
                .clone()
                .unwrap_or_else(|| "execution failed".to_string()),
        };
    }
    if completion.is_complete() {
        AttemptOutcome::Confirmed
    } else {
        AttemptOutcome::NotConfirmed
    }
}

/// Decide the next step after `attempt` (1-based) of `max_attempts`.
pub fn decide(
    outcome: AttemptOutcome,
    hash: Option<Hash>,
    attempt: u32,
    max_attempts: u32,
    policy: ExecutionFailurePolicy,
) -> RetryDecision {
    let exhausted = attempt >= max_attempts;
    let cause = match outcome {
        AttemptOutcome::Confirmed => return RetryDecision::Done,
        AttemptOutcome::Errored(err) if !err.is_transient() => return RetryDecision::Fail(err),
        AttemptOutcome::Errored(err) => {
            return if exhausted {
                RetryDecision::Fail(err)
            } else {
                RetryDecision::RetryAfterBackoff
            };
        }
        AttemptOutcome::ExecutionFailed { reason } => {
            let err = WalletError::ExecutionFailure {
                hash: hash.unwrap_or_default(),
                reason,
            };
            if policy == ExecutionFailurePolicy::Fail {
                return RetryDecision::Fail(err);
            }
            err
        }
        AttemptOutcome::NotConfirmed => WalletError::ConfirmationTimeout {
            hash: hash.unwrap_or_default(),
        },
    };

    if exhausted {
        RetryDecision::Fail(WalletError::RetryExhausted {
            attempts: attempt,
            last: Box::new(cause),
        })
    } else {
        RetryDecision::Retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Receipt;

    #[test]
    fn test_classify_complete_success() {
        let completion = Completion::Complete(vec![Receipt::success([1; 32], 0)]);
        assert!(matches!(classify_completion(&completion), AttemptOutcome::Confirmed));
    }

    #[test]
    fn test_classify_failure_wins_over_partial() {
        let completion = Completion::Partial(vec![Receipt::failure([1; 32], 0, "revert")]);
        match classify_completion(&completion) {
            AttemptOutcome::ExecutionFailed { reason } => assert_eq!(reason, "revert"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_timed_out() {
        assert!(matches!(
            classify_completion(&Completion::TimedOut),
            AttemptOutcome::NotConfirmed
        ));
    }

    #[test]
    fn test_not_confirmed_retries_until_exhausted() {
        let policy = ExecutionFailurePolicy::Retry;
        assert!(matches!(
            decide(AttemptOutcome::NotConfirmed, Some([1; 32]), 1, 3, policy),
            RetryDecision::Retry
        ));
        match decide(AttemptOutcome::NotConfirmed, Some([1; 32]), 3, 3, policy) {
            RetryDecision::Fail(WalletError::RetryExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, WalletError::ConfirmationTimeout { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_execution_failure_policy() {
        let failed = || AttemptOutcome::ExecutionFailed {
            reason: "revert".into(),
        };
        assert!(matches!(
            decide(failed(), None, 1, 3, ExecutionFailurePolicy::Retry),
            RetryDecision::Retry
        ));
        assert!(matches!(
            decide(failed(), None, 1, 3, ExecutionFailurePolicy::Fail),
            RetryDecision::Fail(WalletError::ExecutionFailure { .. })
        ));
    }

    #[test]
    fn test_transient_error_backs_off_then_propagates() {
        let policy = ExecutionFailurePolicy::Retry;
        let transport = || AttemptOutcome::Errored(WalletError::Transport("down".into()));
        assert!(matches!(
            decide(transport(), None, 1, 2, policy),
            RetryDecision::RetryAfterBackoff
        ));
        assert!(matches!(
            decide(transport(), None, 2, 2, policy),
            RetryDecision::Fail(WalletError::Transport(_))
        ));
    }

    #[test]
    fn test_fatal_error_stops_immediately() {
        let outcome = AttemptOutcome::Errored(WalletError::MissingSignature);
        assert!(matches!(
            decide(outcome, None, 1, 5, ExecutionFailurePolicy::Retry),
            RetryDecision::Fail(WalletError::MissingSignature)
        ));
    }
}
