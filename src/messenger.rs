//! Messenger ties a user record to a record store and a transport: open or create the account, add contacts, send, and
//! drain the inbox.
//!
//! Sending wraps the session key under the recipient's *conversation* public key for this sender. That key has to reach
//! the sender out of band (the recipient exports it with `conversation_key_for`), because no handshake exchanges it.

use std::sync::Arc;

use anyhow::{bail, Context};

use crate::account::UserRecord;
use crate::cipher;
use crate::config::Config;
use crate::contacts::AddContactOutcome;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::identity::{self, short_id};
use crate::store::RecordStore;
use crate::transport::Transport;

/// ReceivedMessage is one decrypted inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub sender_id: String,
    pub timestamp: String,
    pub body: String,
}

pub struct Messenger<S: RecordStore> {
    record: UserRecord,
    store: S,
    transport: Arc<dyn Transport>,
    rsa_bits: usize,
}

impl<S: RecordStore> Messenger<S> {
    /// open loads the user's record, or creates and saves a new one. With no id a fresh random id is drawn; with an id
    /// that has no record yet, a new user is created under that id.
    pub fn open(config: &Config, store: S, transport: Arc<dyn Transport>, user_id: Option<&str>) -> anyhow::Result<Self> {
        let record = match user_id {
            Some(id) => match store.load(id).with_context(|| format!("loading user {}", short_id(id)))? {
                Some(record) => record,
                None => {
                    tracing::info!(user_id = short_id(id), "no record for user, creating one");
                    UserRecord::create_with_id(id, config.rsa_bits)?
                }
            },
            None => UserRecord::create(config.rsa_bits)?,
        };
        store.save(&record).context("saving user record")?;
        Ok(Self {
            record,
            store,
            transport,
            rsa_bits: config.rsa_bits,
        })
    }

    pub fn user_id(&self) -> &str {
        self.record.user_id()
    }

    pub fn record(&self) -> &UserRecord {
        &self.record
    }

    /// public_key_pem is our identity key, for sharing with people who want to add us
    pub fn public_key_pem(&self) -> anyhow::Result<String> {
        Ok(self.record.public_key_pem()?)
    }

    pub fn contacts(&self) -> Vec<&str> {
        self.record.contacts().list_contacts()
    }

    /// add_contact records the contact and persists the record when something changed
    pub fn add_contact(&mut self, contact_id: &str, contact_public_key_pem: &str) -> anyhow::Result<AddContactOutcome> {
        if contact_id.trim().is_empty() || contact_public_key_pem.trim().is_empty() {
            bail!("contact id and public key are both required");
        }
        let outcome = self
            .record
            .contacts_mut()
            .add_contact_with_bits(contact_id, contact_public_key_pem, self.rsa_bits)
            .with_context(|| format!("adding contact {}", short_id(contact_id)))?;
        if outcome == AddContactOutcome::Added {
            self.store.save(&self.record).context("saving user record")?;
        }
        Ok(outcome)
    }

    /// conversation_key_for exports the conversation public key we generated for contact_id. The contact needs it to
    /// send to us.
    pub fn conversation_key_for(&self, contact_id: &str) -> anyhow::Result<String> {
        let key = self
            .record
            .contacts()
            .get_conversation_public_key(contact_id)
            .ok_or_else(|| Error::UnknownContact(contact_id.to_string()))?;
        Ok(identity::serialize_public(key)?)
    }

    /// send_message encrypts text to the recipient's conversation key and delivers the envelope
    pub fn send_message(&self, recipient_id: &str, recipient_conversation_key_pem: &str, text: &str) -> anyhow::Result<()> {
        if recipient_id.is_empty() || text.is_empty() {
            bail!("recipient id and message text cannot be empty");
        }
        if !self.record.contacts().contains(recipient_id) {
            return Err(Error::UnknownContact(recipient_id.to_string())).context("add the recipient as a contact first");
        }
        let recipient_key = identity::deserialize_public(recipient_conversation_key_pem)
            .context("recipient conversation key")?;
        let sealed = cipher::seal(text, &recipient_key)?;
        let envelope = Envelope::from_sealed(self.user_id(), recipient_id, &sealed);
        self.transport
            .deliver(recipient_id, envelope.serialize()?)
            .with_context(|| format!("delivering to {}", short_id(recipient_id)))?;
        tracing::info!(recipient_id = short_id(recipient_id), "message sent");
        Ok(())
    }

    /// receive_messages drains the inbox and decrypts each envelope on its own. One bad envelope is reported in its slot
    /// and does not stop the rest.
    pub fn receive_messages(&self) -> anyhow::Result<Vec<Result<ReceivedMessage>>> {
        let raw = self.transport.fetch(self.user_id()).context("fetching inbox")?;
        let results: Vec<Result<ReceivedMessage>> = raw.iter().map(|text| self.open_envelope(text)).collect();
        for result in &results {
            if let Err(e) = result {
                tracing::warn!(error = %e, "could not process inbound message");
            }
        }
        tracing::info!(count = results.len(), "inbox drained");
        Ok(results)
    }

    fn open_envelope(&self, text: &str) -> Result<ReceivedMessage> {
        let envelope = Envelope::parse(text)?;
        // Check it was meant for us before touching any key
        if envelope.recipient_id() != self.user_id() {
            return Err(Error::MisaddressedEnvelope(short_id(envelope.recipient_id()).to_string()));
        }
        let private_key = self
            .record
            .contacts()
            .get_conversation_private_key(envelope.sender_id())
            .ok_or_else(|| Error::UnknownContact(envelope.sender_id().to_string()))?;
        let body = cipher::open(envelope.wrapped_session_key(), envelope.nonce(), envelope.ciphertext(), private_key)?;
        Ok(ReceivedMessage {
            sender_id: envelope.sender_id().to_string(),
            timestamp: envelope.timestamp().to_string(),
            body,
        })
    }
}

/* ------------------------------------------------------------------------- */

// TESTS

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;
    use crate::transport::MemoryTransport;

    fn pair() -> (Messenger<MemoryRecordStore>, Messenger<MemoryRecordStore>, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let config = Config::default();
        let alice = Messenger::open(&config, MemoryRecordStore::new(), transport.clone(), None).unwrap();
        let bob = Messenger::open(&config, MemoryRecordStore::new(), transport.clone(), None).unwrap();
        (alice, bob, transport)
    }

    #[test]
    fn open_reloads_existing_record() {
        let store = MemoryRecordStore::new();
        let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
        let id = identity::generate_user_id().unwrap();
        let first = Messenger::open(&Config::default(), store, transport.clone(), Some(id.as_str())).unwrap();
        assert_eq!(first.user_id(), id);
        let Messenger { record, store, .. } = first;
        let second = Messenger::open(&Config::default(), store, transport, Some(id.as_str())).unwrap();
        assert_eq!(second.record(), &record);
    }

    #[test]
    fn send_requires_contact() {
        let (alice, bob, transport) = pair();
        let key = bob.public_key_pem().unwrap();
        let err = alice.send_message(bob.user_id(), &key, "hi").unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::UnknownContact(_))));
        assert_eq!(transport.pending(bob.user_id()), 0);
        assert!(alice.send_message(bob.user_id(), &key, "").is_err());
    }

    #[test]
    fn garbage_does_not_stop_the_batch() {
        let (mut alice, mut bob, transport) = pair();
        alice.add_contact(bob.user_id(), &bob.public_key_pem().unwrap()).unwrap();
        bob.add_contact(alice.user_id(), &alice.public_key_pem().unwrap()).unwrap();
        let bob_key = bob.conversation_key_for(alice.user_id()).unwrap();
        transport.deliver(bob.user_id(), "garbage".to_string()).unwrap();
        alice.send_message(bob.user_id(), &bob_key, "still arrives").unwrap();
        let results = bob.receive_messages().unwrap();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(Error::MalformedEnvelope(_))));
        assert_eq!(results[1].as_ref().unwrap().body, "still arrives");
        assert_eq!(results[1].as_ref().unwrap().sender_id, alice.user_id());
    }

    #[test]
    fn envelopes_for_someone_else_are_rejected() {
        let (mut alice, mut bob, transport) = pair();
        alice.add_contact(bob.user_id(), &bob.public_key_pem().unwrap()).unwrap();
        bob.add_contact(alice.user_id(), &alice.public_key_pem().unwrap()).unwrap();
        let bob_key = bob.conversation_key_for(alice.user_id()).unwrap();

        // Sealed correctly for Bob, but the envelope names a third user as recipient
        let carol_id = identity::generate_user_id().unwrap();
        let sealed = cipher::seal("not yours", &identity::deserialize_public(&bob_key).unwrap()).unwrap();
        let stray = Envelope::from_sealed(alice.user_id(), &carol_id, &sealed).serialize().unwrap();
        transport.deliver(bob.user_id(), stray).unwrap();
        alice.send_message(bob.user_id(), &bob_key, "yours").unwrap();

        let results = bob.receive_messages().unwrap();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(Error::MisaddressedEnvelope(_))));
        assert_eq!(results[1].as_ref().unwrap().body, "yours");
    }

    #[test]
    fn add_contact_persists_once() {
        let (mut alice, bob, _transport) = pair();
        let bob_key = bob.public_key_pem().unwrap();
        assert_eq!(alice.add_contact(bob.user_id(), &bob_key).unwrap(), AddContactOutcome::Added);
        assert_eq!(alice.add_contact(bob.user_id(), &bob_key).unwrap(), AddContactOutcome::AlreadyExists);
        let saved = alice.store.load(alice.user_id()).unwrap().unwrap();
        assert_eq!(saved.contacts().list_contacts(), vec![bob.user_id()]);
        assert!(alice.add_contact("", &bob_key).is_err());
        assert!(alice.conversation_key_for("nobody").is_err());
    }
}
