//! Cloud database session, auth gate and record writer

pub mod auth_gate;
pub mod firebase;
pub mod writer;

pub use auth_gate::{AuthError, AuthGate};
pub use writer::{CloudWriter, WriteError};

use core::future::Future;

use heapless::String;
use thiserror_no_std::Error;

use crate::app_state::FromUnchecked;

/// Identifier the database generated for an appended record
pub type RecordId = String<32>;

/// Code and message of a failed cloud request.
///
/// `code` is the HTTP status where one was received, negative for
/// connection-level failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (code {code})")]
pub struct TransportError {
    pub code: i32,
    pub message: String<64>,
}

impl TransportError {
    pub const CONNECTION: i32 = -1;
    pub const NOT_AUTHENTICATED: i32 = -2;
    pub const RESPONSE: i32 = -3;

    pub fn new(code: i32, message: &str) -> Self {
        Self {
            code,
            message: String::from_unchecked(message),
        }
    }
}

/// Authenticated connection to the record database.
///
/// The session is owned by the controller and only advances when
/// [`poll`](CloudSession::poll) is awaited.
pub trait CloudSession {
    /// Credentials were supplied and sign-in can be attempted.
    fn is_initialized(&self) -> bool;

    /// A usable token is held.
    fn is_ready(&self) -> bool;

    /// Run one step of sign-in or token refresh, if one is due.
    fn poll(&mut self) -> impl Future<Output = ()>;

    /// Append `body` (a JSON document) under `path`.
    fn push(
        &mut self,
        path: &str,
        body: &[u8],
    ) -> impl Future<Output = Result<RecordId, TransportError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_truncates_message() {
        let long = [b'x'; 100];
        let err = TransportError::new(400, core::str::from_utf8(&long).unwrap());
        assert_eq!(err.code, 400);
        assert_eq!(err.message.len(), 64);
    }
}
