//! # Courier Library
//!
//! The cryptographic protocol and key-lifecycle layer of a serverless two-party messenger. Messages are encrypted with a
//! hybrid scheme: a fresh AES-256 session key per message (CBC mode, PKCS#7 padding) wrapped with RSA-OAEP/SHA-256 under
//! the recipient's per-conversation public key, and shipped in a JSON envelope.
//!
//! ### Warnings and Disclaimers
//!
//! - DO NOT USE IN PRODUCTION: this library and its protocol have NOT been audited.
//! - Encryption is NOT authenticated. CBC without a MAC means tampering is only caught when it happens to break padding or
//! UTF-8 decoding, and a decryption failure cannot tell you whether the key was wrong or the message was modified.
//! - Private keys are stored on disk as unencrypted PKCS8 PEM. The record format depends on it.
//! - There is no handshake. Conversation public keys have to be swapped out of band.
//!
//! ### Examples / API
//!
//! Alice and Bob each open an account (a record store plus a shared transport).
//!
//! ```rust
//! let transport = Arc::new(MemoryTransport::new());
//! let mut alice = Messenger::open(&config, FileRecordStore::new(&config), transport.clone(), None)?;
//! let mut bob = Messenger::open(&config, FileRecordStore::new(&config), transport.clone(), None)?;
//! ```
//!
//! They swap ids and identity public keys **over a trusted channel** and add each other. Adding a contact generates a key
//! pair used only for that conversation.
//!
//! ```rust
//! alice.add_contact(bob.user_id(), &bob.public_key_pem()?)?;
//! bob.add_contact(alice.user_id(), &alice.public_key_pem()?)?;
//! let bob_conversation_key = bob.conversation_key_for(alice.user_id())?; // handed to Alice out of band
//! ```
//!
//! Alice can now send, and Bob drains his inbox. Each inbound message is decrypted on its own, so one bad envelope does
//! not hide the others.
//!
//! ```rust
//! alice.send_message(bob.user_id(), &bob_conversation_key, "hello")?;
//! for message in bob.receive_messages()? {
//!     println!("{:?}", message?.body);
//! }
//! ```
//!
//! ### Under the Hood
//!
//! The lower layers are usable on their own: `identity` for key generation and PEM text, `contacts` for the conversation
//! key store, `cipher` for the four primitive operations (session key, wrap/unwrap, body encrypt/decrypt), and `envelope`
//! for the wire format. None of them do I/O; only `store` and `transport` touch the outside world, and both sit behind
//! traits.

pub mod account;
pub mod cipher;
pub mod config;
pub mod contacts;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod messenger;
pub mod store;
pub mod transport;

#[cfg(test)]
mod proptests;

pub use account::UserRecord;
pub use config::Config;
pub use contacts::{AddContactOutcome, ContactBook, ConversationEntry};
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use identity::IdentityKeyPair;
pub use messenger::{Messenger, ReceivedMessage};
pub use store::{FileRecordStore, MemoryRecordStore, RecordStore};
pub use transport::{MemoryTransport, Transport};
