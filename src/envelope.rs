//! The envelope is the unit that moves between parties: who sent it, who it is for, the wrapped session key, the IV, and
//! the ciphertext, plus a send timestamp.
//!
//! On the wire it is a JSON object with base64 (standard alphabet, padded) binary fields:
//!
//! ```text
//! {"sender_id": "...", "recipient_id": "...", "encrypted_aes_key": "<b64>", "iv": "<b64>", "ciphertext": "<b64>",
//!  "timestamp": "\"2024-05-01T12:00:00.000000Z\""}
//! ```
//!
//! The timestamp is an ISO-8601 string that is itself JSON-encoded before being placed in the object, so the field holds a
//! quoted string. Existing peers produce it that way, so we keep it.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::cipher::Sealed;
use crate::error::{Error, Result};

/// Envelope is immutable once built. Binary fields are kept as raw bytes and only base64 encoded on serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    sender_id: String,
    recipient_id: String,
    wrapped_session_key: Vec<u8>,
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
    timestamp: String,
}

/// WireEnvelope is the JSON shape. Field names are fixed by the wire format.
#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    sender_id: String,
    recipient_id: String,
    encrypted_aes_key: String,
    iv: String,
    ciphertext: String,
    timestamp: String,
}

impl Envelope {
    /// build stamps the current UTC time (microsecond precision)
    pub fn build(sender_id: &str, recipient_id: &str, wrapped_session_key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Envelope {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        Self::build_at(sender_id, recipient_id, wrapped_session_key, nonce, ciphertext, &now)
    }

    /// build_at is build with a caller supplied timestamp
    pub fn build_at(
        sender_id: &str,
        recipient_id: &str,
        wrapped_session_key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        timestamp: &str,
    ) -> Envelope {
        Envelope {
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            wrapped_session_key: wrapped_session_key.to_vec(),
            nonce: nonce.to_vec(),
            ciphertext: ciphertext.to_vec(),
            timestamp: timestamp.to_string(),
        }
    }

    /// from_sealed wraps up the output of cipher::seal
    pub fn from_sealed(sender_id: &str, recipient_id: &str, sealed: &Sealed) -> Envelope {
        Self::build(sender_id, recipient_id, &sealed.wrapped_session_key, &sealed.nonce, &sealed.ciphertext)
    }

    /// serialize renders the JSON wire form
    pub fn serialize(&self) -> Result<String> {
        let timestamp = serde_json::to_string(&self.timestamp).map_err(|e| Error::MalformedEnvelope(e.to_string()))?;
        let wire = WireEnvelope {
            sender_id: self.sender_id.clone(),
            recipient_id: self.recipient_id.clone(),
            encrypted_aes_key: BASE64.encode(&self.wrapped_session_key),
            iv: BASE64.encode(&self.nonce),
            ciphertext: BASE64.encode(&self.ciphertext),
            timestamp,
        };
        serde_json::to_string(&wire).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }

    /// parse reads the JSON wire form. Missing fields, bad base64, a timestamp that isn't a quoted string, or text that
    /// isn't a JSON object all fail with MalformedEnvelope. Unknown extra fields are ignored.
    pub fn parse(text: &str) -> Result<Envelope> {
        let wire: WireEnvelope = serde_json::from_str(text).map_err(|e| Error::MalformedEnvelope(e.to_string()))?;
        let timestamp: String = serde_json::from_str(&wire.timestamp)
            .map_err(|e| Error::MalformedEnvelope(format!("timestamp: {}", e)))?;
        Ok(Envelope {
            wrapped_session_key: decode_field("encrypted_aes_key", &wire.encrypted_aes_key)?,
            nonce: decode_field("iv", &wire.iv)?,
            ciphertext: decode_field("ciphertext", &wire.ciphertext)?,
            sender_id: wire.sender_id,
            recipient_id: wire.recipient_id,
            timestamp,
        })
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    pub fn wrapped_session_key(&self) -> &[u8] {
        &self.wrapped_session_key
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// timestamp is the ISO-8601 send time, unquoted
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    BASE64.decode(value).map_err(|e| Error::MalformedEnvelope(format!("{}: {}", name, e)))
}

/* ------------------------------------------------------------------------- */

// TESTS
