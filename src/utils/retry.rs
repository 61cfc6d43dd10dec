//! Retry utilities driven by an escalating timeout ladder.
//!
//! Every attempt gets the next per-request timeout from the ladder and the
//! wait between attempts grows linearly (`backoff_base × attempt`). Only
//! network-class failures are retried; HTTP status failures return at once.

use async_trait::async_trait;
use std::time::Duration;

use crate::sources::TransportError;

/// Default per-attempt timeouts, in seconds.
pub const DEFAULT_TIMEOUT_LADDER_SECS: [u64; 3] = [10, 15, 20];

/// Default backoff unit between attempts.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Per-attempt request timeouts; one attempt per rung
    pub timeout_ladder: Vec<Duration>,
    /// Backoff unit; attempt `n` waits `backoff_base * n` before attempt `n + 1`
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout_ladder: DEFAULT_TIMEOUT_LADDER_SECS
                .iter()
                .map(|secs| Duration::from_secs(*secs))
                .collect(),
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    /// Build a policy from a ladder given in seconds.
    ///
    /// An empty ladder is replaced by the default one so there is always at
    /// least one attempt.
    pub fn from_secs(ladder: &[u64], backoff_base: Duration) -> Self {
        let timeout_ladder: Vec<Duration> = ladder
            .iter()
            .filter(|secs| **secs > 0)
            .map(|secs| Duration::from_secs(*secs))
            .collect();

        if timeout_ladder.is_empty() {
            return Self {
                backoff_base,
                ..Self::default()
            };
        }

        Self {
            timeout_ladder,
            backoff_base,
        }
    }

    /// Number of attempts the ladder allows
    pub fn max_attempts(&self) -> usize {
        self.timeout_ladder.len()
    }

    /// Wait applied after the given (1-based) failed attempt
    pub fn backoff_after(&self, attempt: usize) -> Duration {
        u32::try_from(attempt)
            .ok()
            .and_then(|factor| self.backoff_base.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

/// Sleep abstraction so retry timing can be observed in tests.
#[async_trait]
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Execute an async operation over the timeout ladder.
///
/// `operation` receives the 1-based attempt number and the timeout for that
/// attempt. A retryable error on the last rung is returned as
/// [`TransportError::Network`] carrying the attempt count.
pub async fn with_timeout_ladder<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T, TransportError>
where
    F: FnMut(usize, Duration) -> Fut,
    Fut: std::future::Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts();

    for (index, timeout) in policy.timeout_ladder.iter().enumerate() {
        let attempt = index + 1;

        match operation(attempt, *timeout).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        "Request succeeded on attempt {} after {} network failures",
                        attempt,
                        attempt - 1
                    );
                }
                return Ok(result);
            }
            Err(error) if !error.is_retryable() => return Err(error),
            Err(error) => {
                if attempt >= max_attempts {
                    tracing::warn!("Request failed after {} attempts: {}", attempt, error);
                    let message = match error {
                        TransportError::Network { message, .. } => message,
                        other => other.to_string(),
                    };
                    return Err(TransportError::Network {
                        attempts: attempt,
                        message,
                    });
                }

                let delay = policy.backoff_after(attempt);
                tracing::warn!(
                    "Network error on attempt {}/{} (timeout {:?}): {}; retrying in {:?}",
                    attempt,
                    max_attempts,
                    timeout,
                    error,
                    delay
                );
                sleeper.sleep(delay).await;
            }
        }
    }

    // Only reachable with an empty ladder, which `RetryPolicy::from_secs` prevents.
    Err(TransportError::Client("empty timeout ladder".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn network_error() -> TransportError {
        TransportError::Network {
            attempts: 1,
            message: "connection reset".to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let sleeper = RecordingSleeper::default();
        let result = with_timeout_ladder(&RetryPolicy::default(), &sleeper, |_, _| async {
            Ok::<_, TransportError>("ok")
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ladder_timeouts_and_backoff() {
        let sleeper = RecordingSleeper::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let result = {
            let seen = seen.clone();
            with_timeout_ladder(&RetryPolicy::default(), &sleeper, move |attempt, timeout| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push((attempt, timeout));
                    if attempt < 3 {
                        Err(network_error())
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await
        };

        assert_eq!(result.unwrap(), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (1, Duration::from_secs(10)),
                (2, Duration::from_secs(15)),
                (3, Duration::from_secs(20)),
            ]
        );
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_exhausted_ladder_reports_attempts() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::from_secs(&[1, 2], Duration::from_millis(5));

        let result: Result<(), _> =
            with_timeout_ladder(&policy, &sleeper, |_, _| async { Err(network_error()) }).await;

        match result {
            Err(TransportError::Network { attempts, message }) => {
                assert_eq!(attempts, 2);
                assert_eq!(message, "connection reset");
            }
            other => panic!("expected network error, got {:?}", other),
        }
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_status_error_not_retried() {
        let sleeper = RecordingSleeper::default();
        let calls = Arc::new(Mutex::new(0));

        let result: Result<(), _> = {
            let calls = calls.clone();
            with_timeout_ladder(&RetryPolicy::default(), &sleeper, move |_, _| {
                let calls = calls.clone();
                async move {
                    *calls.lock().unwrap() += 1;
                    Err(TransportError::Status {
                        status: 404,
                        url: "https://www.yousuu.com/missing".to_string(),
                    })
                }
            })
            .await
        };

        assert!(matches!(result, Err(TransportError::Status { status: 404, .. })));
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_ladder_falls_back_to_default() {
        let policy = RetryPolicy::from_secs(&[], Duration::from_millis(10));
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff_base, Duration::from_millis(10));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(20));
    }

    #[test]
    fn test_huge_backoff_saturates() {
        let policy = RetryPolicy::from_secs(&[1, 1], Duration::from_secs(u64::MAX));
        assert_eq!(policy.backoff_after(1), Duration::from_secs(u64::MAX));
        assert_eq!(policy.backoff_after(2), Duration::MAX);

        let policy = RetryPolicy::from_secs(&[1, 1], Duration::from_millis(u64::MAX));
        assert_eq!(policy.backoff_after(usize::MAX), Duration::MAX);
    }
}
