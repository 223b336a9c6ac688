//! Error types for the profile service.
//!
//! This module defines the central [`Error`] enum, the single taxonomy every
//! operation of the resource service reports through. It implements
//! `From<Error>` for `tonic::Status` so that the gRPC handler and the HTTP
//! gateway agree on the status code a given failure produces.
//!
//! ## Error Cases
//! - `InvalidArgument`: The client request was malformed (empty update mask,
//!   negative offset, undecodable body).
//! - `NotFound`: The addressed user does not exist.
//! - `Storage`: The storage adapter failed for any reason other than a
//!   missing row. The cause is kept in the message for diagnostics.
//! - `RowCount`: A mutation addressed by primary key touched more than one
//!   row.
//! - `Unimplemented`: The operation is intentionally unsupported.

use tonic::{Code, Status};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the profile service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The client request was invalid.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// No user with the given id exists.
    #[error("User {id} not found")]
    NotFound { id: i64 },

    /// The storage adapter failed.
    #[error("Storage failure during {op}: {cause}")]
    Storage { op: &'static str, cause: String },

    /// A single-row mutation affected an unexpected number of rows.
    #[error("{op} affected {rows} rows, expected exactly 1")]
    RowCount { op: &'static str, rows: u64 },

    /// The operation is not supported by this service.
    #[error("{method} is not implemented")]
    Unimplemented { method: &'static str },
}

impl Error {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// The gRPC code this error is reported with on every transport.
    pub const fn code(&self) -> Code {
        match self {
            Self::InvalidArgument { .. } => Code::InvalidArgument,
            Self::NotFound { .. } => Code::NotFound,
            Self::Storage { .. } | Self::RowCount { .. } => Code::Internal,
            Self::Unimplemented { .. } => Code::Unimplemented,
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        let message = match &err {
            Error::InvalidArgument { reason } => reason.clone(),
            _ => err.to_string(),
        };
        Status::new(err.code(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_onto_status_codes() {
        let cases = [
            (Error::invalid_argument("empty mask"), Code::InvalidArgument),
            (Error::NotFound { id: 7 }, Code::NotFound),
            (
                Error::Storage {
                    op: "insert",
                    cause: "connection reset".into(),
                },
                Code::Internal,
            ),
            (Error::RowCount { op: "delete", rows: 2 }, Code::Internal),
            (Error::Unimplemented { method: "Replace" }, Code::Unimplemented),
        ];

        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn storage_cause_is_kept_in_the_message() {
        let status = Status::from(Error::Storage {
            op: "count",
            cause: "pool timed out".into(),
        });
        assert!(status.message().contains("pool timed out"));
        assert!(status.message().contains("count"));
    }

    #[test]
    fn invalid_argument_message_is_the_bare_reason() {
        let status = Status::from(Error::invalid_argument("field mask must not be empty"));
        assert_eq!(status.message(), "field mask must not be empty");
    }
}
