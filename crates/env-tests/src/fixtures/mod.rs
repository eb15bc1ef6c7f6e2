//! Expected-value fixtures for environment validation tests.
//!
//! Fixtures are JSON documents describing how the deployed environment should
//! look (instance types, tags, queue names, ...). They are deserialized into
//! typed structs once and validated eagerly, so a broken fixture fails at load
//! time instead of at the first field access inside a test.

pub mod lookup;

pub use lookup::{find_by_prefix, find_required};

use common::config::SuiteConfig;
use common::error::{Result, SuiteError};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Eager validation hook run right after a fixture is deserialized.
pub trait Validate {
    /// # Errors
    ///
    /// Returns [`SuiteError::Configuration`] describing the invalid field.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<()> {
        self.iter().try_for_each(Validate::validate)
    }
}

impl<T: Validate> Validate for HashMap<String, T> {
    fn validate(&self) -> Result<()> {
        self.values().try_for_each(Validate::validate)
    }
}

impl Validate for serde_json::Value {}

/// Reject an empty required string field.
///
/// # Errors
///
/// Returns [`SuiteError::Configuration`] naming `field` when `value` is blank.
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SuiteError::Configuration(format!(
            "fixture field '{field}' must not be empty"
        )));
    }
    Ok(())
}

/// Load and validate a fixture file.
///
/// # Errors
///
/// Returns [`SuiteError::Configuration`] if the file cannot be read or fails
/// validation, and [`SuiteError::Serialization`] if the JSON does not match
/// `T` (including missing required fields).
pub fn load_fixture<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        SuiteError::Configuration(format!("Can't load fixture {}: {e}", path.display()))
    })?;

    let fixture: T = serde_json::from_str(&raw)?;
    fixture.validate()?;

    info!(path = %path.display(), "Fixture loaded");
    Ok(fixture)
}

/// Load a fixture by file name from the configured fixtures directory.
///
/// # Errors
///
/// See [`load_fixture`].
pub fn load_suite_fixture<T>(config: &SuiteConfig, file_name: &str) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    load_fixture(config.fixture_path(file_name))
}
