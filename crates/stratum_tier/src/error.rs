// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::fmt::{Display, Formatter};

use crate::UpdateFailure;

/// The class of a cache error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An argument was rejected before any tier was touched.
    InvalidArgument,
    /// An operation could not reach a well-defined result.
    InvalidState,
    /// A tier failed to perform I/O.
    Tier,
    /// A backplane failed to publish or deliver a notification.
    Backplane,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::InvalidArgument => "invalid argument",
            Self::InvalidState => "invalid state",
            Self::Tier => "tier failure",
            Self::Backplane => "backplane failure",
        })
    }
}

/// An error from a cache operation.
///
/// Errors carry an [`ErrorKind`] and, for failed updates, the
/// [`UpdateFailure`] that caused them. The cause chain names the operation,
/// key and region involved.
///
/// # Example
///
/// ```
/// use stratum_tier::{Error, ErrorKind};
///
/// let error = Error::tier("connection reset");
/// assert_eq!(error.kind(), ErrorKind::Tier);
/// ```
#[ohno::error]
#[display("{kind}")]
pub struct Error {
    kind: ErrorKind,
    failure: Option<UpdateFailure>,
}

impl Error {
    /// Creates an [`ErrorKind::InvalidArgument`] error.
    pub fn invalid_argument(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::InvalidArgument, None, cause)
    }

    /// Creates an [`ErrorKind::InvalidState`] error.
    pub fn invalid_state(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::InvalidState, None, cause)
    }

    /// Creates an [`ErrorKind::InvalidState`] error for an update that did not succeed.
    pub fn update_failed(failure: UpdateFailure, cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::InvalidState, Some(failure), cause)
    }

    /// Creates an [`ErrorKind::Tier`] error.
    ///
    /// This is the public API for tier implementations reporting I/O failures.
    pub fn tier(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Tier, None, cause)
    }

    /// Creates an [`ErrorKind::Backplane`] error.
    pub fn backplane(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Backplane, None, cause)
    }

    /// Returns the class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the update failure behind this error, if any.
    #[must_use]
    pub fn update_failure(&self) -> Option<UpdateFailure> {
        self.failure
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use ohno::ErrorExt;

    use super::*;

    #[test]
    fn constructors_set_kind() {
        assert_eq!(Error::invalid_argument("x").kind(), ErrorKind::InvalidArgument);
        assert_eq!(Error::invalid_state("x").kind(), ErrorKind::InvalidState);
        assert_eq!(Error::tier("x").kind(), ErrorKind::Tier);
        assert_eq!(Error::backplane("x").kind(), ErrorKind::Backplane);
        assert_eq!(Error::tier("x").update_failure(), None);
    }

    #[test]
    fn update_failed_is_invalid_state_with_failure() {
        let error = Error::update_failed(UpdateFailure::RetriesExhausted, "update of 'k' failed");
        assert_eq!(error.kind(), ErrorKind::InvalidState);
        assert_eq!(error.update_failure(), Some(UpdateFailure::RetriesExhausted));
    }

    #[test]
    fn message_contains_kind_and_cause() {
        let error = Error::invalid_argument("key must not be blank");
        let message = error.message();
        assert!(message.contains("invalid argument"), "got: {message}");
        assert!(message.contains("key must not be blank"), "got: {message}");
    }

    #[test]
    fn result_type_alias_propagates_errors() {
        fn returns_err() -> Result<i32> {
            Err(Error::tier("expected failure"))
        }

        let err = returns_err().expect_err("should return an error");
        assert!(format!("{err}").contains("expected failure"));
    }
}
