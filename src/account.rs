//! The local user's record: id, identity key pair, and contact book. This is the unit the record store loads and saves.
//!
//! Persisted as pretty JSON:
//!
//! ```text
//! {"user_id": "<100 hex>", "public_key": "<SPKI PEM>", "private_key": "<PKCS8 PEM, unencrypted>",
//!  "contacts": {"<id>": {"public_key": ..., "conversation_private_key": ..., "conversation_public_key": ...}}}
//! ```

use serde::{Deserialize, Serialize};

use crate::contacts::ContactBook;
use crate::error::{Error, Result};
use crate::identity::{self, IdentityKeyPair};

/// UserRecord is owned by exactly one local user. Nothing in this crate deletes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    user_id: String,
    identity: IdentityKeyPair,
    contacts: ContactBook,
}

#[derive(Serialize, Deserialize)]
struct StoredUserRecord {
    user_id: String,
    public_key: String,
    private_key: String,
    contacts: ContactBook,
}

impl UserRecord {
    /// create makes a brand new user with a random id
    pub fn create(bits: usize) -> Result<Self> {
        let user_id = identity::generate_user_id()?;
        Self::create_with_id(&user_id, bits)
    }

    /// create_with_id makes a new user under an id the user typed in. The id must still be 100 hex characters.
    pub fn create_with_id(user_id: &str, bits: usize) -> Result<Self> {
        if !identity::is_valid_user_id(user_id) {
            return Err(Error::InvalidUserId(user_id.to_string()));
        }
        let identity = IdentityKeyPair::generate_with_bits(bits)?;
        tracing::info!(user_id = identity::short_id(user_id), "created user");
        Ok(Self {
            user_id: user_id.to_string(),
            identity,
            contacts: ContactBook::new(),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn identity(&self) -> &IdentityKeyPair {
        &self.identity
    }

    /// public_key_pem is the text to hand to contacts
    pub fn public_key_pem(&self) -> Result<String> {
        identity::serialize_public(self.identity.public_key())
    }

    pub fn contacts(&self) -> &ContactBook {
        &self.contacts
    }

    pub fn contacts_mut(&mut self) -> &mut ContactBook {
        &mut self.contacts
    }

    /// to_json renders the persisted format
    pub fn to_json(&self) -> Result<String> {
        let stored = StoredUserRecord {
            user_id: self.user_id.clone(),
            public_key: identity::serialize_public(self.identity.public_key())?,
            private_key: identity::serialize_private(self.identity.private_key())?,
            contacts: self.contacts.clone(),
        };
        serde_json::to_string_pretty(&stored).map_err(|e| Error::MalformedRecord(e.to_string()))
    }

    /// from_json parses the persisted format. The stored public key must belong to the stored private key.
    pub fn from_json(text: &str) -> Result<Self> {
        let stored: StoredUserRecord = serde_json::from_str(text).map_err(|e| Error::MalformedRecord(e.to_string()))?;
        let private = identity::deserialize_private(&stored.private_key)?;
        let public = identity::deserialize_public(&stored.public_key)?;
        let identity = IdentityKeyPair::from_private(private);
        if identity.public_key() != &public {
            return Err(Error::MalformedRecord(format!("public key does not match private key for {}", stored.user_id)));
        }
        Ok(Self {
            user_id: stored.user_id,
            identity,
            contacts: stored.contacts,
        })
    }
}

/* ------------------------------------------------------------------------- */

// TESTS
