//! Error types for placement operations.

use thiserror::Error;

use crate::bucket::{ItemId, ObjectId};

/// Result type alias for placement operations.
pub type Result<T> = std::result::Result<T, PlacementError>;

/// Errors that can occur during placement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// A weight outside the valid range was supplied.
    ///
    /// Weights must be non-negative and fit in 32 bits; invalid values
    /// are rejected at the call boundary and never enter the bucket.
    #[error("invalid weight {0}: must be in 0..={max}", max = u32::MAX)]
    InvalidWeight(i64),

    /// No item is selectable: every item is disabled or has zero weight.
    #[error("no eligible item: all items are disabled or zero-weight")]
    NoEligibleItem,

    /// The retrying selector hit its attempt cap without converging.
    ///
    /// Not expected in normal operation; the cap is a defensive bound so
    /// pathological inputs cannot loop unboundedly.
    #[error("selection did not converge after {attempts} attempts")]
    RetryExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// Item id not present in the bucket.
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// The object id is already assigned in this bucket.
    #[error("object {0} is already assigned")]
    DuplicateObject(ObjectId),
}
