//! Queue registry: creation, closing, and lookup of live queues.

#![allow(dead_code)]

use crate::core::queue::{QueueCell, QueueSnapshot, QueueState};
use crate::core::token::{InstitutionId, QueueId};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Arena of live queues keyed by id. Each cell guards its own state, so
/// the registry never serializes operations on unrelated queues.
pub struct QueueRegistry {
    queues: DashMap<QueueId, Arc<QueueCell>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self {
            queues: DashMap::new(),
        }
    }

    /// Create a queue for an institution. Validates configuration before
    /// anything is inserted.
    pub fn create_queue(
        &self,
        institution_id: InstitutionId,
        name: &str,
        capacity: u32,
        service_time_minutes: u32,
        max_swaps_per_token: u32,
    ) -> Result<QueueSnapshot> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("queue name must not be empty".to_string()));
        }
        if capacity == 0 {
            return Err(Error::Validation(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if service_time_minutes == 0 {
            return Err(Error::Validation(
                "service time must be greater than zero".to_string(),
            ));
        }

        let state = QueueState::new(
            name.to_string(),
            capacity,
            service_time_minutes,
            max_swaps_per_token,
        );
        let cell = Arc::new(QueueCell::new(institution_id, state));
        let snapshot = cell.snapshot();
        self.queues.insert(cell.id, cell);

        info!("Created queue '{}' ({})", name, snapshot.id);
        Ok(snapshot)
    }

    /// Look up a queue cell. Clones the `Arc` out so no registry shard
    /// lock is held while the caller works with the cell.
    pub fn get(&self, queue_id: QueueId) -> Result<Arc<QueueCell>> {
        self.queues
            .get(&queue_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::NotFound(format!("queue {}", queue_id)))
    }

    /// Close a queue. Existing tokens continue through the state machine;
    /// only new bookings are refused.
    pub fn close_queue(
        &self,
        institution_id: InstitutionId,
        queue_id: QueueId,
    ) -> Result<QueueSnapshot> {
        let cell = self.get(queue_id)?;
        if cell.institution_id != institution_id {
            return Err(Error::Forbidden(
                "queue belongs to a different institution".to_string(),
            ));
        }
        {
            let mut state = cell.lock();
            state.closed = true;
        }
        info!("Closed queue {}", queue_id);
        Ok(cell.snapshot())
    }

    /// All queues owned by an institution. Arcs are cloned out before any
    /// cell lock is taken.
    pub fn queues_for(&self, institution_id: InstitutionId) -> Vec<Arc<QueueCell>> {
        self.queues
            .iter()
            .filter(|entry| entry.value().institution_id == institution_id)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Snapshots of an institution's queues, ordered by creation time.
    pub fn snapshots_for(&self, institution_id: InstitutionId) -> Vec<QueueSnapshot> {
        let cells = self.queues_for(institution_id);
        let mut snapshots: Vec<QueueSnapshot> = cells.iter().map(|c| c.snapshot()).collect();
        snapshots.sort_by_key(|s| s.created_at);
        snapshots
    }

    /// Every live queue cell.
    pub fn all_queues(&self) -> Vec<Arc<QueueCell>> {
        self.queues
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self::new()
    }
}
