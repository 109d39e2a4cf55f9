//! Durable offline queue.
//!
//! Requests submitted without connectivity are kept as a JSON array under
//! [`QUEUED_REQUESTS_KEY`] until they can be dispatched. The queue is written
//! through on every change so a crash never loses a queued SOS.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::request::SosRequest;
use crate::storage::{load_json, save_json, KeyValueStore, QUEUED_REQUESTS_KEY};

/// The persisted list of requests waiting to be dispatched.
#[derive(Debug, Clone)]
pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
}

impl OfflineQueue {
    /// Create a queue over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the queued requests.
    ///
    /// A missing or malformed queue is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(&self) -> Result<Vec<SosRequest>> {
        let queued: Vec<SosRequest> =
            load_json(self.store.as_ref(), QUEUED_REQUESTS_KEY)?.unwrap_or_default();
        debug!("Loaded {} queued request(s)", queued.len());
        Ok(queued)
    }

    /// Number of requests waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    /// Whether nothing is waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Append a request to the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn enqueue(&self, request: &SosRequest) -> Result<()> {
        let mut queued = self.load()?;
        queued.push(request.clone());
        self.save(&queued)?;
        info!("Queued request {} ({} waiting)", request.id, queued.len());
        Ok(())
    }

    /// Drop the given ids from the queue, keeping everything else in order.
    ///
    /// Returns how many entries were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn remove_ids(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut queued = self.load()?;
        let before = queued.len();
        queued.retain(|r| !ids.contains(&r.id));
        let removed = before - queued.len();
        self.save(&queued)?;
        debug!("Removed {} request(s) from the queue", removed);
        Ok(removed)
    }

    /// Replace the whole queue.
    ///
    /// An empty queue is stored as an empty array rather than removed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store write fails.
    pub fn save(&self, queued: &[SosRequest]) -> Result<()> {
        save_json(self.store.as_ref(), QUEUED_REQUESTS_KEY, queued)
    }

    /// Forget every queued request.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(QUEUED_REQUESTS_KEY)?;
        Ok(())
    }
}
