//! The hybrid cipher. Message bodies are encrypted with AES-256-CBC under a one-time session key, and only that 32-byte
//! session key goes through RSA-OAEP (SHA-256 for both the hash and MGF1). This sidesteps the size limit and cost of
//! encrypting bulk text asymmetrically.
//!
//! There is no MAC. Tampering is only caught when it breaks the PKCS#7 padding, OAEP decoding, or UTF-8 decoding, and a
//! failure says nothing about *why* it failed.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand_core::{OsRng, RngCore};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// SESSION_KEY_LENGTH is 32 bytes (AES-256)
pub const SESSION_KEY_LENGTH: usize = 32;
/// NONCE_LENGTH is 16 bytes, one AES block
pub const NONCE_LENGTH: usize = 16;
/// BLOCK_LENGTH is the AES block size
const BLOCK_LENGTH: usize = 16;
/// OAEP_OVERHEAD is 2 * hash length + 2 for SHA-256
const OAEP_OVERHEAD: usize = 2 * 32 + 2;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// SessionKey is the per-message symmetric key. It lives for one encrypt call, is never persisted, and is wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_LENGTH]);

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

impl SessionKey {
    /// from_slice accepts exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; SESSION_KEY_LENGTH] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LENGTH] {
        &self.0
    }
}

/// Sealed is everything the sender needs to put in an envelope
pub struct Sealed {
    pub wrapped_session_key: Vec<u8>,
    pub nonce: [u8; NONCE_LENGTH],
    pub ciphertext: Vec<u8>,
}

/// generate_session_key draws a fresh 256-bit key from the OS RNG
pub fn generate_session_key() -> Result<SessionKey> {
    let mut key = SessionKey([0u8; SESSION_KEY_LENGTH]);
    OsRng.try_fill_bytes(&mut key.0).map_err(|e| Error::EntropyUnavailable(e.to_string()))?;
    Ok(key)
}

/// wrap_session_key encrypts the session key to the recipient with RSA-OAEP/SHA-256
pub fn wrap_session_key(session_key: &SessionKey, recipient: &RsaPublicKey) -> Result<Vec<u8>> {
    // Can't happen for a 32-byte key under a 2048-bit modulus, but keys come from untrusted text
    let capacity = recipient.size().saturating_sub(OAEP_OVERHEAD);
    if SESSION_KEY_LENGTH > capacity {
        return Err(Error::WrapFailed(format!(
            "{}-byte modulus fits at most {} bytes, session key is {}",
            recipient.size(),
            capacity,
            SESSION_KEY_LENGTH
        )));
    }
    recipient
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), session_key.as_bytes())
        .map_err(|e| Error::WrapFailed(e.to_string()))
}

/// unwrap_session_key reverses wrap_session_key. Wrong key and corrupted input are indistinguishable here.
pub fn unwrap_session_key(wrapped: &[u8], private_key: &RsaPrivateKey) -> Result<SessionKey> {
    let mut bytes = private_key.decrypt(Oaep::new::<Sha256>(), wrapped).map_err(|_| Error::UnwrapFailed)?;
    let key = SessionKey::from_slice(&bytes);
    bytes.zeroize();
    key.ok_or(Error::UnwrapFailed)
}

/// encrypt_body encrypts the UTF-8 bytes of plaintext under a fresh random IV. The IV is returned as the nonce and must
/// travel with the ciphertext.
pub fn encrypt_body(plaintext: &str, session_key: &SessionKey) -> Result<([u8; NONCE_LENGTH], Vec<u8>)> {
    let mut nonce = [0u8; NONCE_LENGTH];
    OsRng.try_fill_bytes(&mut nonce).map_err(|e| Error::EntropyUnavailable(e.to_string()))?;
    let ciphertext = Aes256CbcEnc::new(session_key.as_bytes().into(), (&nonce).into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    Ok((nonce, ciphertext))
}

/// decrypt_body reverses encrypt_body. Any length, padding, or UTF-8 problem is the same DecryptionFailed.
pub fn decrypt_body(nonce: &[u8], ciphertext: &[u8], session_key: &SessionKey) -> Result<String> {
    let nonce: &[u8; NONCE_LENGTH] = nonce.try_into().map_err(|_| Error::DecryptionFailed)?;
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LENGTH != 0 {
        return Err(Error::DecryptionFailed);
    }
    let plaintext = Aes256CbcDec::new(session_key.as_bytes().into(), nonce.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::DecryptionFailed)?;
    String::from_utf8(plaintext).map_err(|e| {
        e.into_bytes().zeroize();
        Error::DecryptionFailed
    })
}

/// seal runs the whole send side: fresh session key, body encryption, key wrap. The session key is dropped (and wiped)
/// before returning.
pub fn seal(plaintext: &str, recipient: &RsaPublicKey) -> Result<Sealed> {
    let session_key = generate_session_key()?;
    let (nonce, ciphertext) = encrypt_body(plaintext, &session_key)?;
    let wrapped_session_key = wrap_session_key(&session_key, recipient)?;
    Ok(Sealed { wrapped_session_key, nonce, ciphertext })
}

/// open runs the whole receive side
pub fn open(wrapped_session_key: &[u8], nonce: &[u8], ciphertext: &[u8], private_key: &RsaPrivateKey) -> Result<String> {
    let session_key = unwrap_session_key(wrapped_session_key, private_key)?;
    decrypt_body(nonce, ciphertext, &session_key)
}

/* ------------------------------------------------------------------------- */

// TESTS
