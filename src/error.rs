//! Error kinds returned by the protocol layer.
//!
//! The cryptographic rejections (`WrapFailed`, `UnwrapFailed`, `DecryptionFailed`) deliberately carry no detail: without an integrity tag
//! there is no way to tell a wrong key from corrupted transport or tampering, so callers should not try.

use thiserror::Error;

/// Error is the single failure type of the protocol core and its storage/transport boundaries.
#[derive(Error, Debug)]
pub enum Error {
    /// The system RNG could not be read. Fatal.
    #[error("entropy unavailable: {0}")]
    EntropyUnavailable(String),

    /// Key text did not parse as SPKI / PKCS8 PEM, or a key size was refused.
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// Envelope text is not well-formed, lacks a field, or carries bad base64.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The session key could not be wrapped under the recipient key.
    #[error("session key wrap failed: {0}")]
    WrapFailed(String),

    #[error("session key unwrap failed")]
    UnwrapFailed,

    #[error("message decryption failed")]
    DecryptionFailed,

    /// The envelope names another user as its recipient.
    #[error("envelope addressed to another user: {0}")]
    MisaddressedEnvelope(String),

    /// No conversation entry exists for this contact id.
    #[error("unknown contact: {0}")]
    UnknownContact(String),

    /// User ids are 100 lowercase or uppercase hex characters.
    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),

    /// A persisted user record did not parse.
    #[error("malformed user record: {0}")]
    MalformedRecord(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl Error {
    /// is_recoverable is false only for RNG failure: everything else rejects one message or record and the caller can move on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::EntropyUnavailable(_))
    }
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/* ------------------------------------------------------------------------- */

// TESTS
