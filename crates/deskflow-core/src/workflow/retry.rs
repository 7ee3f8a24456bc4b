//! Retry and polling controllers for capabilities whose success is
//! probabilistic (text recognition on a live screen).
//!
//! Both controllers sleep inline on the calling task, so the engine stays
//! strictly sequential. Exhaustion and timeout are outcomes, not errors.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::CapabilityError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Bounded retry: up to `max_retries` attempts, fixed `backoff` between failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Result<Self, CapabilityError> {
        if max_retries == 0 {
            return Err(CapabilityError::InvalidArgument(
                "max_retries must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_retries,
            backoff,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    /// Every attempt failed; `last_error` is set when the final one raised.
    Exhausted {
        attempts: u32,
        last_error: Option<String>,
    },
}

/// Run `attempt` until it yields `Some`, or the policy is used up.
///
/// `Ok(None)` ("not found") and `Err` are both retried; the attempt number
/// passed in starts at 1.
pub async fn retry_bounded<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, CapabilityError>>,
{
    let mut last_error = None;

    for n in 1..=policy.max_retries {
        match attempt(n).await {
            Ok(Some(value)) => {
                return RetryOutcome::Succeeded { value, attempts: n };
            }
            Ok(None) => {
                tracing::debug!("[Retry] attempt {}/{}: not found", n, policy.max_retries);
                last_error = None;
            }
            Err(e) => {
                tracing::debug!("[Retry] attempt {}/{}: {}", n, policy.max_retries, e);
                last_error = Some(e.to_string());
            }
        }

        if n < policy.max_retries {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    RetryOutcome::Exhausted {
        attempts: policy.max_retries,
        last_error,
    }
}

/// Timeout polling: check every `check_interval` until success or `timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub check_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

impl PollPolicy {
    /// Build from fractional seconds, rejecting negative or non-finite values.
    pub fn from_secs_f64(timeout: f64, check_interval: f64) -> Result<Self, CapabilityError> {
        Ok(Self {
            timeout: non_negative_secs("timeout", timeout)?,
            check_interval: non_negative_secs("check_interval", check_interval)?,
        })
    }
}

pub(crate) fn non_negative_secs(name: &str, secs: f64) -> Result<Duration, CapabilityError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        CapabilityError::InvalidArgument(format!(
            "'{}' must be a non-negative number of seconds, got {}",
            name, secs
        ))
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Ready {
        value: T,
        elapsed: Duration,
        checks: u32,
    },
    TimedOut {
        elapsed: Duration,
        checks: u32,
    },
}

/// Probe immediately, then every `check_interval`, until it yields `Some`.
///
/// Elapsed time is measured from invocation, before the first probe.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, mut probe: F) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = Instant::now();
    let mut checks = 0;

    loop {
        checks += 1;
        if let Some(value) = probe().await {
            return PollOutcome::Ready {
                value,
                elapsed: started.elapsed(),
                checks,
            };
        }

        if started.elapsed() >= policy.timeout {
            break;
        }
        tokio::time::sleep(policy.check_interval).await;
        if started.elapsed() >= policy.timeout {
            break;
        }
    }

    tracing::debug!("[Poll] timed out after {} check(s)", checks);
    PollOutcome::TimedOut {
        elapsed: started.elapsed(),
        checks,
    }
}
