//! Input checks for the values a user supplies to start an upload.
//!
//! Each [`Field`] maps to a pure `&str -> bool` predicate through
//! [`validator_for`]. [`check`] adds the missing-versus-invalid distinction
//! the command line reports.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::distribution::parse_distribution_groups;

/// Owner (user or organization) and app names.
#[allow(clippy::expect_used)]
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+$").expect("name regex is valid") // Static pattern, safe to panic
});

/// One distribution group name.
#[allow(clippy::expect_used)]
static GROUP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9 ._-]+$").expect("group regex is valid") // Static pattern, safe to panic
});

/// A user-supplied upload parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ApiToken,
    OwnerName,
    AppName,
    DistributionGroups,
    PathToApp,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ApiToken => "API token",
            Self::OwnerName => "owner name",
            Self::AppName => "app name",
            Self::DistributionGroups => "distribution groups",
            Self::PathToApp => "path to app",
        })
    }
}

/// Why a field value was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Nothing (or only whitespace) was given.
    #[error("{0} is required")]
    Missing(Field),
    /// A value was given but is not acceptable.
    #[error("{0} is invalid")]
    Invalid(Field),
}

/// Returns the predicate for `field`.
#[must_use]
pub fn validator_for(field: Field) -> fn(&str) -> bool {
    match field {
        Field::ApiToken => is_valid_api_token,
        Field::OwnerName | Field::AppName => is_valid_name,
        Field::DistributionGroups => is_valid_distribution_groups,
        Field::PathToApp => is_valid_path_to_app,
    }
}

/// Checks `value` for `field`.
///
/// # Errors
///
/// Returns [`FieldError::Missing`] for blank input and
/// [`FieldError::Invalid`] when the predicate rejects it.
pub fn check(field: Field, value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::Missing(field));
    }
    if validator_for(field)(value) {
        Ok(())
    } else {
        Err(FieldError::Invalid(field))
    }
}

fn is_valid_api_token(value: &str) -> bool {
    !value.trim().is_empty() && !value.chars().any(char::is_whitespace)
}

fn is_valid_name(value: &str) -> bool {
    NAME_PATTERN.is_match(value)
}

fn is_valid_distribution_groups(value: &str) -> bool {
    let groups = parse_distribution_groups(value);
    !groups.is_empty() && groups.iter().all(|g| GROUP_PATTERN.is_match(g))
}

fn is_valid_path_to_app(value: &str) -> bool {
    !value.trim().is_empty()
        && value.trim() == value
        && !value.ends_with('/')
        && !value.ends_with(std::path::MAIN_SEPARATOR)
}
