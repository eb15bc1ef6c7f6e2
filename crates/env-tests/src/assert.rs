//! Assertion engine for environment validation tests.
//!
//! Every check either passes silently (logging an informational line when a
//! message is given) or returns an [`AssertionError`] carrying a rendered
//! expected/actual description. Checks hold no state and never retry; retrying
//! is the job of [`crate::eventual`].
//!
//! # Example
//!
//! ```rust
//! use env_tests::assert::{are_equal, collection_contains, AssertionError};
//! use env_tests::assert_scope;
//!
//! fn check_bucket() -> Result<(), AssertionError> {
//!     let tags = vec!["cloudx".to_string(), "qa".to_string()];
//!
//!     assert_scope!(
//!         || are_equal("Enabled", "enabled", "Versioning status"),
//!         || collection_contains(&tags, &["cloudx".to_string()], "Bucket tags"),
//!     )
//! }
//!
//! assert!(check_bucket().is_ok());
//! ```

use chrono::{DateTime, TimeZone};
use common::error::SuiteError;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::{BuildHasher, Hash};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Default tolerance for [`dates_are_equal_with_offset`].
pub const DEFAULT_DATE_OFFSET_SECS: u64 = 120;

/// Default tolerance for [`numbers_are_equal_with_offset`].
pub const DEFAULT_NUMBER_OFFSET: f64 = 120.0;

/// Result of a single check.
pub type AssertResult = Result<(), AssertionError>;

/// A deferred check, as collected by [`assert_scope`].
pub type Check<'a> = Box<dyn FnOnce() -> AssertResult + 'a>;

/// Failure raised by an assertion.
#[derive(Debug, Error)]
pub enum AssertionError {
    /// A single expectation was not met.
    #[error("{message}")]
    Failed { message: String },

    /// One or more checks inside a scope failed, in check order.
    #[error("{} assertion(s) failed:\n{}", .failures.len(), render_failures(.failures))]
    Aggregate { failures: Vec<AssertionError> },

    /// A tolerance comparison was given a non-numeric operand.
    #[error("The type of numbers must be numeric, got {type_name}")]
    TypeMismatch { type_name: &'static str },

    /// The poller's deadline passed without the producer ever yielding a value.
    #[error("{context}: no value observed within {timeout:?} after {attempts} attempt(s); last error: {last_error}")]
    PollTimeout {
        context: String,
        timeout: Duration,
        attempts: u32,
        last_error: String,
    },
}

impl AssertionError {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        AssertionError::Failed {
            message: message.into(),
        }
    }

    /// Inner failures of an aggregate; a single-element slice otherwise.
    pub fn failures(&self) -> &[AssertionError] {
        match self {
            AssertionError::Aggregate { failures } => failures,
            other => std::slice::from_ref(other),
        }
    }
}

impl From<SuiteError> for AssertionError {
    fn from(err: SuiteError) -> Self {
        AssertionError::failed(err.to_string())
    }
}

fn render_failures(failures: &[AssertionError]) -> String {
    failures
        .iter()
        .enumerate()
        .map(|(i, failure)| format!("  {}) {}", i + 1, failure))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join items as `a, b, c` for failure and log messages.
pub fn join_values<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn log_message(message: &str) {
    if !message.is_empty() {
        info!("{}", message);
    }
}

fn check(result: bool, failure: impl FnOnce() -> String) -> AssertResult {
    if result {
        return Ok(());
    }

    let message = failure();
    error!("{}", message);
    Err(AssertionError::failed(message))
}

/// Fail unconditionally with `message`.
pub fn fail(message: impl Into<String>) -> AssertResult {
    check(false, || message.into())
}

pub fn is_true(condition: bool, message: &str) -> AssertResult {
    log_message(message);
    check(condition, || {
        format!("Check the condition is true: '{message}' failed")
    })
}

pub fn is_false(condition: bool, message: &str) -> AssertResult {
    log_message(message);
    check(!condition, || {
        format!("Check the condition is false: '{message}' failed")
    })
}

/// Values that [`are_equal`] and the poller know how to compare.
///
/// Text compares case-insensitively; `Option::None` stands for an absent
/// value and is treated as equal to an empty string.
pub trait Expectable {
    /// Whether `self` (the actual value) satisfies `expected`.
    fn matches_expected(&self, expected: &Self) -> bool;

    /// Human-readable rendering for logs and failure messages.
    fn render(&self) -> String;

    /// True for empty text, which is interchangeable with an absent value.
    fn is_empty_text(&self) -> bool {
        false
    }
}

impl<T: Expectable + ?Sized> Expectable for &T {
    fn matches_expected(&self, expected: &Self) -> bool {
        (**self).matches_expected(*expected)
    }

    fn render(&self) -> String {
        (**self).render()
    }

    fn is_empty_text(&self) -> bool {
        (**self).is_empty_text()
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

impl Expectable for str {
    fn matches_expected(&self, expected: &Self) -> bool {
        eq_ignore_case(self, expected)
    }

    fn render(&self) -> String {
        self.to_string()
    }

    fn is_empty_text(&self) -> bool {
        self.is_empty()
    }
}

impl Expectable for String {
    fn matches_expected(&self, expected: &Self) -> bool {
        self.as_str().matches_expected(expected.as_str())
    }

    fn render(&self) -> String {
        self.clone()
    }

    fn is_empty_text(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! natural_expectable {
    ($($t:ty),* $(,)?) => {
        $(
            impl Expectable for $t {
                fn matches_expected(&self, expected: &Self) -> bool {
                    self == expected
                }

                fn render(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

natural_expectable!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char);

// NaN matches NaN so that every value equals itself.
macro_rules! float_expectable {
    ($($t:ty),* $(,)?) => {
        $(
            impl Expectable for $t {
                fn matches_expected(&self, expected: &Self) -> bool {
                    self == expected || (self.is_nan() && expected.is_nan())
                }

                fn render(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

float_expectable!(f32, f64);

impl<T: Expectable> Expectable for Option<T> {
    fn matches_expected(&self, expected: &Self) -> bool {
        match (self, expected) {
            (None, None) => true,
            (None, Some(expected)) => expected.is_empty_text(),
            (Some(actual), None) => actual.is_empty_text(),
            (Some(actual), Some(expected)) => actual.matches_expected(expected),
        }
    }

    fn render(&self) -> String {
        match self {
            Some(value) => value.render(),
            None => "null".to_string(),
        }
    }

    fn is_empty_text(&self) -> bool {
        self.as_ref().is_some_and(Expectable::is_empty_text)
    }
}

impl<T: Expectable> Expectable for [T] {
    fn matches_expected(&self, expected: &Self) -> bool {
        self.len() == expected.len()
            && self
                .iter()
                .zip(expected)
                .all(|(actual, expected)| actual.matches_expected(expected))
    }

    fn render(&self) -> String {
        self.iter()
            .map(Expectable::render)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<T: Expectable> Expectable for Vec<T> {
    fn matches_expected(&self, expected: &Self) -> bool {
        self.as_slice().matches_expected(expected.as_slice())
    }

    fn render(&self) -> String {
        self.as_slice().render()
    }
}

impl<Tz: TimeZone> Expectable for DateTime<Tz>
where
    Tz::Offset: Display,
{
    fn matches_expected(&self, expected: &Self) -> bool {
        self == expected
    }

    fn render(&self) -> String {
        self.to_rfc3339()
    }
}

impl Expectable for serde_json::Value {
    fn matches_expected(&self, expected: &Self) -> bool {
        use serde_json::Value;

        match (self, expected) {
            (Value::String(actual), Value::String(expected)) => eq_ignore_case(actual, expected),
            (Value::Null, other) | (other, Value::Null) => {
                other.is_null() || other.is_empty_text()
            }
            _ => self == expected,
        }
    }

    fn render(&self) -> String {
        match self {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => "null".to_string(),
            other => other.to_string(),
        }
    }

    fn is_empty_text(&self) -> bool {
        self.as_str().is_some_and(str::is_empty)
    }
}

/// Assert that `actual` equals `expected`.
///
/// Expected and actual are always logged first. Absent values (`None`,
/// JSON `null`) are equal to each other and to an empty string; text is
/// compared case-insensitively; everything else uses natural equality.
pub fn are_equal<T: Expectable>(actual: T, expected: T, message: &str) -> AssertResult {
    info!(
        "{}\nExpected: {}\nActual  : {}",
        message,
        expected.render(),
        actual.render()
    );

    check(actual.matches_expected(&expected), || {
        format!(
            "Check that '{}' equals to '{}' failed",
            actual.render(),
            expected.render()
        )
    })
}

/// Assert that every element of `subset` is present in `set`.
pub fn collection_contains<T>(set: &[T], subset: &[T], message: &str) -> AssertResult
where
    T: PartialEq + Display,
{
    log_message(message);
    let result = subset.iter().all(|item| set.contains(item));
    check(result, || {
        format!(
            "Check that collection '{}' contains '{}' failed",
            join_values(set),
            join_values(subset)
        )
    })
}

/// Assert that no element of `subset` is present in `set`.
pub fn collection_not_contains<T>(set: &[T], subset: &[T], message: &str) -> AssertResult
where
    T: PartialEq + Display,
{
    log_message(message);
    let result = !subset.iter().any(|item| set.contains(item));
    check(result, || {
        format!(
            "Check that collection '{}' doesn't contain '{}' failed",
            join_values(set),
            join_values(subset)
        )
    })
}

fn same_multiset<T: PartialEq>(actual: &[T], expected: &[T]) -> bool {
    if actual.len() != expected.len() {
        return false;
    }

    let mut used = vec![false; expected.len()];
    actual.iter().all(|item| {
        expected
            .iter()
            .zip(used.iter_mut())
            .find(|(candidate, taken)| !**taken && *candidate == item)
            .map(|(_, taken)| *taken = true)
            .is_some()
    })
}

/// Assert that both collections hold the same elements with the same
/// multiplicities, irrespective of order.
pub fn collection_equals<T>(actual: &[T], expected: &[T], message: &str) -> AssertResult
where
    T: PartialEq + Display,
{
    info!(
        "{}\nExpected: {}\nActual  : {}",
        message,
        join_values(expected),
        join_values(actual)
    );

    check(same_multiset(actual, expected), || {
        format!(
            "Check that collection '{}' equals to '{}' failed",
            join_values(actual),
            join_values(expected)
        )
    })
}

pub fn collection_is_not_empty<T: Display>(set: &[T], message: &str) -> AssertResult {
    log_message(message);
    check(!set.is_empty(), || {
        format!("Check that collection '{}' is not empty failed", join_values(set))
    })
}

pub fn is_null<T>(value: &Option<T>, message: &str) -> AssertResult {
    log_message(message);
    check(value.is_none(), || "Check that object is null failed".to_string())
}

pub fn is_not_null<T>(value: &Option<T>, message: &str) -> AssertResult {
    log_message(message);
    check(value.is_some(), || {
        format!(
            "Check that object {} is not null failed",
            std::any::type_name::<T>()
        )
    })
}

/// Assert that every key/value pair of `expected` is present in `actual`.
///
/// Each expected entry is checked independently, so all missing or
/// mismatched keys show up in one [`AssertionError::Aggregate`], in
/// ascending key order.
pub fn equals_map<K, V, S>(
    actual: &HashMap<K, V, S>,
    expected: &HashMap<K, V, S>,
    message: &str,
) -> AssertResult
where
    K: Eq + Hash + Ord + Display,
    V: PartialEq + Display,
    S: BuildHasher,
{
    log_message(message);

    let mut entries: Vec<(&K, &V)> = expected.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let checks = entries.into_iter().map(|(key, value)| {
        deferred(move || {
            debug!("Check key: '{}', value: '{}' presence", key, value);
            match actual.get(key) {
                Some(found) => check(found == value, || {
                    format!(
                        "Check that dictionaries are equal failed: key '{key}' has value '{found}', expected '{value}'"
                    )
                }),
                None => check(false, || {
                    format!(
                        "Check that dictionaries are equal failed: key '{key}' is missing, expected value '{value}'"
                    )
                }),
            }
        })
    });

    assert_scope(checks)
}

/// Assert two timestamps are within `seconds_offset` of each other.
///
/// Compared at whole-second granularity; the difference must be strictly
/// below the offset.
pub fn dates_are_equal_with_offset<Tz1, Tz2>(
    expected: &DateTime<Tz1>,
    actual: &DateTime<Tz2>,
    seconds_offset: u64,
    message: &str,
) -> AssertResult
where
    Tz1: TimeZone,
    Tz2: TimeZone,
    Tz1::Offset: Display,
    Tz2::Offset: Display,
{
    info!(
        "{}\nExpected: {};\nActual  : {}",
        message,
        expected.to_rfc3339(),
        actual.to_rfc3339()
    );

    let difference = expected.timestamp().abs_diff(actual.timestamp());
    check(difference < seconds_offset, || {
        format!(
            "Check that date '{}' equals to '{}' within {}s failed (difference {}s)",
            actual.to_rfc3339(),
            expected.to_rfc3339(),
            seconds_offset,
            difference
        )
    })
}

/// Conversion used by [`numbers_are_equal_with_offset`].
///
/// Non-numeric implementors return [`AssertionError::TypeMismatch`].
pub trait ToNumber {
    fn to_number(&self) -> Result<f64, AssertionError>;
}

impl<T: ToNumber + ?Sized> ToNumber for &T {
    fn to_number(&self) -> Result<f64, AssertionError> {
        (**self).to_number()
    }
}

macro_rules! numeric_to_number {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToNumber for $t {
                #[allow(
                    clippy::cast_precision_loss,
                    clippy::cast_lossless,
                    clippy::unnecessary_cast
                )]
                fn to_number(&self) -> Result<f64, AssertionError> {
                    Ok(*self as f64)
                }
            }
        )*
    };
}

numeric_to_number!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl ToNumber for str {
    fn to_number(&self) -> Result<f64, AssertionError> {
        Err(AssertionError::TypeMismatch { type_name: "string" })
    }
}

impl ToNumber for String {
    fn to_number(&self) -> Result<f64, AssertionError> {
        self.as_str().to_number()
    }
}

impl ToNumber for serde_json::Value {
    fn to_number(&self) -> Result<f64, AssertionError> {
        use serde_json::Value;

        let type_name = match self {
            Value::Number(n) => {
                return n
                    .as_f64()
                    .ok_or(AssertionError::TypeMismatch { type_name: "number" })
            }
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        };

        Err(AssertionError::TypeMismatch { type_name })
    }
}

/// Assert two numbers differ by strictly less than `offset`.
pub fn numbers_are_equal_with_offset<T>(
    expected: T,
    actual: T,
    offset: f64,
    message: &str,
) -> AssertResult
where
    T: ToNumber + Display,
{
    info!("{}\nExpected: {};\nActual  : {}", message, expected, actual);

    let difference = (expected.to_number()? - actual.to_number()?).abs();
    check(difference < offset, || {
        format!("Check that number '{actual}' equals to '{expected}' failed")
    })
}

/// Box a closure as a [`Check`] for [`assert_scope`].
pub fn deferred<'a, F>(check: F) -> Check<'a>
where
    F: FnOnce() -> AssertResult + 'a,
{
    Box::new(check)
}

/// Run every check in order and report all failures together.
///
/// Checks never short-circuit: a failing check is recorded and the next one
/// still runs. If any failed, the result is one [`AssertionError::Aggregate`]
/// holding the failures in input order.
pub fn assert_scope<'a, I>(checks: I) -> AssertResult
where
    I: IntoIterator<Item = Check<'a>>,
{
    let failures: Vec<AssertionError> = checks
        .into_iter()
        .filter_map(|check| check().err())
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(AssertionError::Aggregate { failures })
    }
}

/// Build an [`assert_scope`] call from closures returning [`AssertResult`].
#[macro_export]
macro_rules! assert_scope {
    ($($check:expr),+ $(,)?) => {
        $crate::assert::assert_scope(::std::vec![$($crate::assert::deferred($check)),+])
    };
}

/// Chainable containment checks on strings.
pub trait StrAssertions {
    fn should_contain(&self, expected: &str) -> Result<&Self, AssertionError>;

    fn should_not_contain(&self, expected: &str) -> Result<&Self, AssertionError>;
}

impl StrAssertions for str {
    fn should_contain(&self, expected: &str) -> Result<&Self, AssertionError> {
        is_true(
            self.contains(expected),
            &format!("Check string '{self}' contains '{expected}'"),
        )?;
        Ok(self)
    }

    fn should_not_contain(&self, expected: &str) -> Result<&Self, AssertionError> {
        is_false(
            self.contains(expected),
            &format!("Check string '{self}' doesn't contain '{expected}'"),
        )?;
        Ok(self)
    }
}
