//! Distribution group names and their resolved identifiers.

use crate::api::DestinationBody;

/// Splits free-form group text into distinct group names.
///
/// Accepts commas and line breaks as separators, trims each name, drops
/// empty entries and keeps the first occurrence of duplicates.
///
/// # Examples
///
/// ```
/// use appcenter_core::distribution::parse_distribution_groups;
///
/// assert_eq!(
///     parse_distribution_groups("beta, qa\npublic"),
///     vec!["beta", "qa", "public"]
/// );
/// ```
#[must_use]
pub fn parse_distribution_groups(text: &str) -> Vec<String> {
    let mut groups: Vec<String> = Vec::new();
    for name in text.split([',', '\n', '\r']).map(str::trim) {
        if !name.is_empty() && !groups.iter().any(|g| g == name) {
            groups.push(name.to_string());
        }
    }
    groups
}

/// A distribution group resolved on the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationId {
    /// Group name as given by the user.
    pub name: String,
    /// Service identifier of the group.
    pub id: String,
}

impl DestinationId {
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    pub(crate) fn to_body(&self) -> DestinationBody {
        DestinationBody {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}
