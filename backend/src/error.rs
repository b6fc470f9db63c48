//! Error types for the rosterload onboarding pipeline.
//!
//! This module defines a small hierarchy of error types:
//!
//! - [`StoreError`] - storage collaborator failures
//! - [`MailError`] - welcome-email delivery failures
//! - [`RequestError`] - top-level request outcomes (bad input, missing
//!   references, authorization, storage)
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Row-level validation problems are NOT errors: they are collected as
//! [`crate::models::ValidationIssue`] values and never abort a request.

use thiserror::Error;

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by storage collaborators.
///
/// The import executor records these with their raw message and keeps
/// processing sibling rows; only precondition lookups escalate them into a
/// whole-request failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failure (connection, query, IO).
    #[error("Storage failure: {0}")]
    Backend(String),

    /// A uniqueness or integrity constraint was violated.
    #[error("Constraint violation: {0}")]
    Conflict(String),
}

// =============================================================================
// Mail Errors
// =============================================================================

/// Errors from the welcome-email sender.
///
/// Never fatal: the executor counts them under `emailsFailed` and moves on.
#[derive(Debug, Error)]
pub enum MailError {
    /// Transport-level failure (SMTP, provider API).
    #[error("Mail transport failure: {0}")]
    Transport(String),

    /// The provider rejected the recipient address.
    #[error("Mail rejected for {0}")]
    Rejected(String),
}

// =============================================================================
// Request Errors (top-level)
// =============================================================================

/// Top-level request outcomes for preview, import and assignment calls.
///
/// These abort the whole request before any row is touched; per-row failures
/// are reported inside [`crate::models::ImportOutcome`] instead.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Malformed or empty input (missing CSV, zero data rows, nothing to
    /// assign).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A referenced entity does not exist (unknown program year).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller is not an administrator of the owning program.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A precondition lookup failed in storage.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for mail operations.
pub type MailResult<T> = Result<T, MailError>;

/// Result type for request-level operations.
pub type RequestResult<T> = Result<T, RequestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // StoreError -> RequestError
        let store_err = StoreError::Backend("connection reset".into());
        let request_err: RequestError = store_err.into();
        assert!(request_err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_request_error_format() {
        let err = RequestError::NotFound("program year 42".into());
        assert_eq!(err.to_string(), "Not found: program year 42");

        let err = RequestError::Forbidden("not an admin of Youth Assembly".into());
        assert!(err.to_string().starts_with("Forbidden"));
    }

    #[test]
    fn test_mail_error_format() {
        let err = MailError::Rejected("bad@".into());
        assert!(err.to_string().contains("bad@"));
    }
}
