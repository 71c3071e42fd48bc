//! The transport boundary. A transport only moves serialized envelopes; it never sees keys or plaintext.
//!
//! Contract for any implementation:
//! - `deliver` appends to the recipient's queue, FIFO in call order.
//! - `fetch` returns *and drains* everything queued for the user in one atomic step. An envelope handed out by one fetch
//!   is never handed out again, and an envelope delivered concurrently lands either in this fetch or the next one.

use std::collections::VecDeque;

use dashmap::DashMap;

use crate::error::Result;
use crate::identity::short_id;

/// Transport moves serialized envelopes between users
pub trait Transport: Send + Sync {
    fn deliver(&self, recipient_id: &str, envelope: String) -> Result<()>;

    fn fetch(&self, user_id: &str) -> Result<Vec<String>>;
}

/// MemoryTransport is an in-process mailbox. Each recipient's queue sits behind its own map entry lock, so a deliver and
/// a fetch on the same recipient are serialized while different recipients don't contend.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    queues: DashMap<String, VecDeque<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// pending counts queued envelopes without draining them
    pub fn pending(&self, user_id: &str) -> usize {
        self.queues.get(user_id).map(|queue| queue.len()).unwrap_or(0)
    }
}

impl Transport for MemoryTransport {
    fn deliver(&self, recipient_id: &str, envelope: String) -> Result<()> {
        let mut queue = self.queues.entry(recipient_id.to_string()).or_default();
        queue.push_back(envelope);
        tracing::debug!(recipient_id = short_id(recipient_id), queued = queue.len(), "delivered envelope");
        Ok(())
    }

    fn fetch(&self, user_id: &str) -> Result<Vec<String>> {
        // Removing the whole entry is the drain: anything delivered afterwards starts a fresh queue
        let drained: Vec<String> = match self.queues.remove(user_id) {
            Some((_, queue)) => queue.into_iter().collect(),
            None => Vec::new(),
        };
        tracing::debug!(user_id = short_id(user_id), count = drained.len(), "fetched envelopes");
        Ok(drained)
    }
}

/* ------------------------------------------------------------------------- */

// TESTS
