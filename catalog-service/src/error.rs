//! Store-level error taxonomy and its translation to gRPC statuses
//!
//! Stores report what happened in their own terms; the conversion to
//! `tonic::Status` happens once, at the handler boundary, so raw internal
//! errors never leak to the caller.

use thiserror::Error;
use tonic::Status;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record already exists")]
    AlreadyExists,
    #[error("record not found")]
    NotFound,
    #[error("call deadline exceeded")]
    DeadlineExceeded,
}

impl From<StoreError> for Status {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists => Status::already_exists(err.to_string()),
            StoreError::NotFound => Status::not_found(err.to_string()),
            StoreError::DeadlineExceeded => Status::deadline_exceeded(err.to_string()),
        }
    }
}
