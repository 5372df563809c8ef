//! Distribution groups: parsing, resolution and release assignment.
//!
//! Groups are resolved to [`DestinationId`]s before a session is opened, so a
//! release is never committed without a target set in hand.

mod error;
mod groups;
mod manager;

pub use error::DistributionError;
pub use groups::{DestinationId, parse_distribution_groups};
pub use manager::DistributionManager;
