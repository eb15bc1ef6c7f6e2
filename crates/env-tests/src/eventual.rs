//! Eventual consistency helpers for timing-dependent tests.
//!
//! AWS side effects (log delivery to CloudWatch, SNS -> SQS -> Lambda
//! propagation, network changes) are not observable right after the
//! triggering call. The helpers here poll a producer at a fixed interval until
//! it yields the expected value or a deadline passes, then report the final
//! state through the regular assertion engine.

use crate::assert::{are_equal, is_true, AssertResult, AssertionError, Expectable};
use common::config::PollingConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Shortest pause between two attempts. Smaller intervals, zero included,
/// are raised to this value.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Categories of eventual consistency with documented propagation windows.
///
/// Each category has a polling interval and a maximum timeout based on how
/// long the AWS path usually takes to become observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyCategory {
    /// Lambda/EC2 log events reaching CloudWatch Logs (5s interval, 120s)
    LogDelivery,

    /// SNS -> SQS -> consumer message delivery (2s interval, 60s)
    MessagePropagation,

    /// S3/DynamoDB events triggering a Lambda (5s interval, 180s)
    EventTrigger,

    /// Public IP / DNS propagation after a network change (10s interval, 300s)
    NetworkPropagation,

    /// Control-plane describe calls reflecting an update (5s interval, 60s)
    ResourceUpdate,
}

impl ConsistencyCategory {
    /// Get the maximum timeout for this consistency category.
    pub fn timeout(&self) -> Duration {
        match self {
            ConsistencyCategory::LogDelivery => Duration::from_secs(120),
            ConsistencyCategory::MessagePropagation => Duration::from_secs(60),
            ConsistencyCategory::EventTrigger => Duration::from_secs(180),
            ConsistencyCategory::NetworkPropagation => Duration::from_secs(300),
            ConsistencyCategory::ResourceUpdate => Duration::from_secs(60),
        }
    }

    /// Get the delay between two attempts.
    pub fn interval(&self) -> Duration {
        match self {
            ConsistencyCategory::MessagePropagation => Duration::from_secs(2),
            ConsistencyCategory::NetworkPropagation => Duration::from_secs(10),
            ConsistencyCategory::LogDelivery
            | ConsistencyCategory::EventTrigger
            | ConsistencyCategory::ResourceUpdate => Duration::from_secs(5),
        }
    }
}

/// Polling interval and total timeout for one eventual-consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            timeout,
        }
    }

    pub fn for_category(category: ConsistencyCategory) -> Self {
        Self::new(category.interval(), category.timeout())
    }
}

impl From<ConsistencyCategory> for PollSettings {
    fn from(category: ConsistencyCategory) -> Self {
        Self::for_category(category)
    }
}

impl From<&PollingConfig> for PollSettings {
    fn from(config: &PollingConfig) -> Self {
        Self::new(config.interval(), config.timeout())
    }
}

/// What the polling loop saw when it stopped.
enum PollOutcome<T> {
    Matched,
    /// Deadline passed; the most recent value the producer returned.
    Observed(T),
    /// Deadline passed and every attempt failed.
    NoValue { attempts: u32, last_error: String },
}

async fn poll_until<T, E, F, Fut>(
    mut producer: F,
    is_match: impl Fn(&T) -> bool,
    render: impl Fn(&T) -> String,
    context: &str,
    settings: PollSettings,
) -> PollOutcome<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    // Fields are public, so a struct literal can still carry a zero interval
    let interval = settings.interval.max(MIN_POLL_INTERVAL);
    let mut attempts: u32 = 0;
    let mut last_observed: Option<T> = None;
    let mut last_error = String::new();

    loop {
        attempts += 1;

        match producer().await {
            Ok(value) if is_match(&value) => {
                debug!(
                    context,
                    attempts,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Condition met"
                );
                return PollOutcome::Matched;
            }
            Ok(value) => {
                debug!(
                    context,
                    attempt = attempts,
                    actual = %render(&value),
                    "Condition not met yet"
                );
                last_observed = Some(value);
            }
            Err(e) => {
                warn!(context, attempt = attempts, error = %e, "Producer failed, retrying");
                last_error = e.to_string();
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= settings.timeout {
            break;
        }

        // Cap delay at remaining time
        let remaining = settings.timeout.saturating_sub(elapsed);
        sleep(interval.min(remaining)).await;
    }

    match last_observed {
        Some(value) => PollOutcome::Observed(value),
        None => PollOutcome::NoValue {
            attempts,
            last_error,
        },
    }
}

fn no_value_error(
    context: &str,
    settings: PollSettings,
    attempts: u32,
    last_error: String,
) -> AssertionError {
    warn!(context, attempts, "Deadline passed without any observed value");
    AssertionError::PollTimeout {
        context: context.to_string(),
        timeout: settings.timeout,
        attempts,
        last_error,
    }
}

/// Assert that `producer` eventually yields `expected`.
///
/// The first attempt runs immediately. After that the producer is invoked
/// every `settings.interval` until its value matches (same rules as
/// [`are_equal`]) or `settings.timeout` elapses. Producer errors count as
/// "not matching yet".
///
/// On timeout the last observed value is reported through [`are_equal`], so
/// the failure names the final mismatch. If the producer never returned a
/// value, [`AssertionError::PollTimeout`] carries its last error.
///
/// # Example
///
/// ```rust,ignore
/// use env_tests::eventual::{assert_becomes_equal, ConsistencyCategory};
///
/// assert_becomes_equal(
///     1,
///     || sqs.approximate_message_count(&queue_url),
///     "Message delivered to the queue",
///     ConsistencyCategory::MessagePropagation.into(),
/// )
/// .await?;
/// ```
pub async fn assert_becomes_equal<T, E, F, Fut>(
    expected: T,
    producer: F,
    context: &str,
    settings: PollSettings,
) -> AssertResult
where
    T: Expectable,
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let outcome = poll_until(
        producer,
        |actual: &T| actual.matches_expected(&expected),
        |actual: &T| actual.render(),
        context,
        settings,
    )
    .await;

    match outcome {
        PollOutcome::Matched => Ok(()),
        PollOutcome::Observed(actual) => are_equal(actual, expected, context),
        PollOutcome::NoValue {
            attempts,
            last_error,
        } => Err(no_value_error(context, settings, attempts, last_error)),
    }
}

/// Assert that a fallible predicate eventually returns `true`.
///
/// Same timing and error policy as [`assert_becomes_equal`]; on timeout the
/// failure comes from [`is_true`] with `context` as the message.
pub async fn assert_eventually<E, F, Fut>(
    condition: F,
    context: &str,
    settings: PollSettings,
) -> AssertResult
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let outcome = poll_until(
        condition,
        |satisfied: &bool| *satisfied,
        bool::to_string,
        context,
        settings,
    )
    .await;

    match outcome {
        PollOutcome::Matched => Ok(()),
        PollOutcome::Observed(satisfied) => is_true(satisfied, context),
        PollOutcome::NoValue {
            attempts,
            last_error,
        } => Err(no_value_error(context, settings, attempts, last_error)),
    }
}

/// Wait for an infallible condition within the window of `category`.
///
/// # Example
///
/// ```rust,ignore
/// use env_tests::eventual::{wait_for, ConsistencyCategory};
///
/// wait_for(ConsistencyCategory::LogDelivery, || async {
///     logs.contains_event(&log_group, "Image uploaded").await
/// })
/// .await?;
/// ```
pub async fn wait_for<F, Fut>(category: ConsistencyCategory, mut condition: F) -> AssertResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let context = format!("Condition met within {category:?} window");
    assert_eventually(
        || {
            let attempt = condition();
            async move { Ok::<bool, std::convert::Infallible>(attempt.await) }
        },
        &context,
        category.into(),
    )
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_consistency_category_windows() {
        assert_eq!(
            ConsistencyCategory::LogDelivery.timeout(),
            Duration::from_secs(120)
        );
        assert_eq!(
            ConsistencyCategory::MessagePropagation.interval(),
            Duration::from_secs(2)
        );
        assert_eq!(
            ConsistencyCategory::NetworkPropagation.timeout(),
            Duration::from_secs(300)
        );

        let settings = PollSettings::for_category(ConsistencyCategory::EventTrigger);
        assert_eq!(
            settings,
            PollSettings::new(Duration::from_secs(5), Duration::from_secs(180))
        );
    }

    #[test]
    fn test_settings_from_polling_config() {
        let config = PollingConfig {
            interval_ms: 250,
            timeout_ms: 4_000,
        };
        let settings = PollSettings::from(&config);
        assert_eq!(settings.interval, Duration::from_millis(250));
        assert_eq!(settings.timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_zero_interval_is_raised_to_minimum() {
        let settings = PollSettings::new(Duration::ZERO, Duration::from_secs(1));
        assert_eq!(settings.interval, MIN_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_still_reaches_deadline() {
        let mut calls: u32 = 0;

        // Struct literal skips the clamp in `new`
        let settings = PollSettings {
            interval: Duration::ZERO,
            timeout: Duration::from_millis(50),
        };

        let err = assert_becomes_equal(
            1,
            || {
                calls += 1;
                async { Ok::<_, String>(0) }
            },
            "Queue depth",
            settings,
        )
        .await
        .expect_err("Should time out");

        assert_eq!(err.to_string(), "Check that '0' equals to '1' failed");
        // One attempt at start, then one per 10ms slot up to the deadline
        assert_eq!(calls, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_matches_immediately_without_sleeping() {
        let start = Instant::now();
        let mut calls = 0;

        let result = assert_becomes_equal(
            "ACTIVE",
            || {
                calls += 1;
                async { Ok::<_, String>("active") }
            },
            "Table status",
            PollSettings::new(Duration::from_secs(2), Duration::from_secs(10)),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_errors_are_retried() {
        let mut calls = 0;

        let result = assert_becomes_equal(
            3,
            || {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt < 3 {
                        Err(format!("throttled on attempt {attempt}"))
                    } else {
                        Ok(3)
                    }
                }
            },
            "Subscriptions count",
            PollSettings::new(Duration::from_secs(1), Duration::from_secs(10)),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_producer_reports_last_error() {
        let result = assert_becomes_equal(
            1,
            || async { Err::<i32, _>("AccessDenied") },
            "Queue depth",
            PollSettings::new(Duration::from_secs(2), Duration::from_secs(5)),
        )
        .await;

        match result {
            Err(AssertionError::PollTimeout {
                context,
                attempts,
                last_error,
                ..
            }) => {
                assert_eq!(context, "Queue depth");
                assert_eq!(attempts, 4);
                assert_eq!(last_error, "AccessDenied");
            }
            other => panic!("Expected PollTimeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_timeout_uses_is_true_message() {
        let err = assert_eventually(
            || async { Ok::<_, String>(false) },
            "Log stream created",
            PollSettings::new(Duration::from_secs(1), Duration::from_secs(3)),
        )
        .await
        .expect_err("Should time out");

        assert!(err
            .to_string()
            .contains("Check the condition is true: 'Log stream created' failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_succeeds_after_retry() {
        let mut calls = 0;

        let result = wait_for(ConsistencyCategory::ResourceUpdate, || {
            calls += 1;
            let ready = calls >= 2;
            async move { ready }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls, 2);
    }
}
