//! Error taxonomy for event processing.
//!
//! Every failure is resolved at the boundary of the single event being
//! processed; none of these ever crosses to another connection.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or incomplete inbound event. Dropped, never propagated.
    #[error("validation: {0}")]
    Validation(String),
    /// Referenced message, conversation or channel does not exist.
    #[error("not found")]
    NotFound,
    /// Actor lacks authority over the target message.
    #[error("forbidden")]
    Forbidden,
    /// Operation not applicable to the target, e.g. editing a file message.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// Backing store call failed. The connection stays alive; no retry.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}
