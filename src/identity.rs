//! Long-term identity keys and user ids. A user's identity is an RSA key pair generated once at account creation, and the same
//! generator produces the per-contact conversation key pairs.
//!
//! Keys travel as text: public keys as SubjectPublicKeyInfo PEM, private keys as *unencrypted* PKCS8 PEM. The latter is a known
//! weakness of the persisted format and must not be "fixed" here by adding a passphrase, since that changes the format.

use rand_core::{OsRng, RngCore};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// MIN_RSA_BITS is the smallest modulus we will generate (2048 bits)
pub const MIN_RSA_BITS: usize = 2048;
/// MAX_RSA_BITS is the largest modulus the SPKI decoder will read back (4096 bits)
pub const MAX_RSA_BITS: usize = 4096;
/// USER_ID_BYTES is 50 random bytes, so ids are 100 hex characters
pub const USER_ID_BYTES: usize = 50;
/// USER_ID_LENGTH is the hex length of a user or contact id
pub const USER_ID_LENGTH: usize = USER_ID_BYTES * 2;

/// IdentityKeyPair is an asymmetric key pair. Used both as a user's identity and as a conversation key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityKeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public", &fingerprint(&self.public).unwrap_or_else(|_| "?".to_string()))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

impl IdentityKeyPair {
    /// generate builds a fresh 2048-bit key pair from the OS RNG
    pub fn generate() -> Result<Self> {
        Self::generate_with_bits(MIN_RSA_BITS)
    }

    /// generate_with_bits builds a key pair with a larger modulus. Anything outside 2048..=4096 bits is refused, since a
    /// bigger public key could be written out but never parsed again.
    pub fn generate_with_bits(bits: usize) -> Result<Self> {
        if bits < MIN_RSA_BITS {
            return Err(Error::MalformedKey(format!("refusing {}-bit modulus, minimum is {}", bits, MIN_RSA_BITS)));
        }
        if bits > MAX_RSA_BITS {
            return Err(Error::MalformedKey(format!("refusing {}-bit modulus, maximum is {}", bits, MAX_RSA_BITS)));
        }
        // OsRng panics inside key generation if the RNG is gone, so draw from it first to fail with a typed error
        let mut sample = [0u8; 16];
        OsRng.try_fill_bytes(&mut sample).map_err(|e| Error::EntropyUnavailable(e.to_string()))?;
        let private = RsaPrivateKey::new(&mut OsRng, bits).map_err(|e| Error::EntropyUnavailable(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        tracing::debug!(bits, "generated key pair");
        Ok(Self { private, public })
    }

    /// from_private rebuilds the pair from a stored private key
    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        Self { private, public }
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// into_parts hands over both halves: (private, public)
    pub fn into_parts(self) -> (RsaPrivateKey, RsaPublicKey) {
        (self.private, self.public)
    }
}

/// serialize_public encodes a public key as SubjectPublicKeyInfo PEM
pub fn serialize_public(key: &RsaPublicKey) -> Result<String> {
    key.to_public_key_pem(LineEnding::LF).map_err(|e| Error::MalformedKey(e.to_string()))
}

/// serialize_private encodes a private key as unencrypted PKCS8 PEM
pub fn serialize_private(key: &RsaPrivateKey) -> Result<String> {
    let pem = key.to_pkcs8_pem(LineEnding::LF).map_err(|e| Error::MalformedKey(e.to_string()))?;
    Ok(pem.to_string())
}

/// deserialize_public parses SubjectPublicKeyInfo PEM. Surrounding whitespace (as left by copy-paste) is ignored.
pub fn deserialize_public(text: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(text.trim()).map_err(|e| Error::MalformedKey(e.to_string()))
}

/// deserialize_private parses unencrypted PKCS8 PEM
pub fn deserialize_private(text: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(text.trim()).map_err(|e| Error::MalformedKey(e.to_string()))
}

/// fingerprint is the first 8 bytes of SHA-256 over the DER public key, hex encoded. Only for display and logs.
pub fn fingerprint(key: &RsaPublicKey) -> Result<String> {
    let der = key.to_public_key_der().map_err(|e| Error::MalformedKey(e.to_string()))?;
    let digest = Sha256::digest(der.as_bytes());
    Ok(hex::encode(&digest[..8]))
}

/// generate_user_id draws 50 random bytes and hex encodes them (100 characters). Collisions are not a practical concern,
/// which is what lets ids work without a registry.
pub fn generate_user_id() -> Result<String> {
    let mut bytes = [0u8; USER_ID_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| Error::EntropyUnavailable(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// is_valid_user_id checks the 100-hex-character shape
pub fn is_valid_user_id(id: &str) -> bool {
    id.len() == USER_ID_LENGTH && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// short_id trims an id for log lines
pub(crate) fn short_id(id: &str) -> &str {
    match id.char_indices().nth(12) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/* ------------------------------------------------------------------------- */

// TESTS
