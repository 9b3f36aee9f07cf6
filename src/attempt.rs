use crate::error::{CourierError, Result};
use crate::message::now_millis;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Delivery lifecycle of a message.
///
/// `Queued -> Sending -> (Sent | Failed)`, with `Retrying` between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Queued,
    Sending,
    Sent,
    Failed,
    Retrying,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::Queued => write!(f, "queued"),
            AttemptStatus::Sending => write!(f, "sending"),
            AttemptStatus::Sent => write!(f, "sent"),
            AttemptStatus::Failed => write!(f, "failed"),
            AttemptStatus::Retrying => write!(f, "retrying"),
        }
    }
}

/// Mutable record tracking one message's delivery. Owned by the orchestrator;
/// readers always get a copy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: String,
    pub message_id: String,
    pub status: AttemptStatus,
    /// Send rounds started, including the first.
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl AttemptRecord {
    pub fn new(message_id: &str) -> Self {
        let now = now_millis();
        Self {
            id: format!("attempt-{}", Uuid::new_v4()),
            message_id: message_id.to_string(),
            status: AttemptStatus::Queued,
            attempts: 0,
            last_error: None,
            provider: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// In-memory attempt records keyed by message id.
///
/// Records accumulate until process restart; there is no eviction.
#[derive(Clone, Default)]
pub struct AttemptStore {
    records: Arc<RwLock<HashMap<String, AttemptRecord>>>,
}

impl AttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic check-and-insert. Returns the stored record and whether it
    /// already existed.
    pub fn get_or_create<F>(&self, message_id: &str, make: F) -> Result<(AttemptRecord, bool)>
    where
        F: FnOnce() -> AttemptRecord,
    {
        let mut records = self.write()?;

        if let Some(existing) = records.get(message_id) {
            return Ok((existing.clone(), true));
        }

        let record = make();
        records.insert(message_id.to_string(), record.clone());
        Ok((record, false))
    }

    pub fn get(&self, message_id: &str) -> Result<Option<AttemptRecord>> {
        let records = self.records.read().map_err(|_| {
            CourierError::Internal("failed to acquire read lock on attempts".to_string())
        })?;
        Ok(records.get(message_id).cloned())
    }

    /// Apply `mutator` to the record for `message_id` and stamp `updated_at`.
    pub fn update<F>(&self, message_id: &str, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut AttemptRecord),
    {
        let mut records = self.write()?;

        let record = records
            .get_mut(message_id)
            .ok_or(CourierError::NotFound)?;
        mutator(record);
        record.updated_at = now_millis();
        Ok(())
    }

    pub fn all(&self) -> Result<Vec<AttemptRecord>> {
        let records = self.records.read().map_err(|_| {
            CourierError::Internal("failed to acquire read lock on attempts".to_string())
        })?;
        Ok(records.values().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        let records = self.records.read().map_err(|_| {
            CourierError::Internal("failed to acquire read lock on attempts".to_string())
        })?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, AttemptRecord>>> {
        self.records.write().map_err(|_| {
            CourierError::Internal("failed to acquire write lock on attempts".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let store = AttemptStore::new();

        let (first, existed) = store
            .get_or_create("msg-1", || AttemptRecord::new("msg-1"))
            .unwrap();
        assert!(!existed);

        let (second, existed) = store
            .get_or_create("msg-1", || AttemptRecord::new("msg-1"))
            .unwrap();
        assert!(existed);
        assert_eq!(first.id, second.id);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_update_mutates_and_stamps() {
        let store = AttemptStore::new();
        store
            .get_or_create("msg-1", || AttemptRecord::new("msg-1"))
            .unwrap();

        store
            .update("msg-1", |record| {
                record.status = AttemptStatus::Sending;
                record.attempts = 1;
            })
            .unwrap();

        let record = store.get("msg-1").unwrap().unwrap();
        assert_eq!(record.status, AttemptStatus::Sending);
        assert_eq!(record.attempts, 1);
        assert!(record.updated_at >= record.created_at);
    }

    #[test]
    fn test_update_unknown_message_fails() {
        let store = AttemptStore::new();
        let result = store.update("missing", |record| record.attempts = 1);
        assert!(matches!(result, Err(CourierError::NotFound)));
    }

    #[test]
    fn test_readers_get_a_copy() {
        let store = AttemptStore::new();
        store
            .get_or_create("msg-1", || AttemptRecord::new("msg-1"))
            .unwrap();

        let mut snapshot = store.get("msg-1").unwrap().unwrap();
        snapshot.status = AttemptStatus::Failed;

        assert_eq!(
            store.get("msg-1").unwrap().unwrap().status,
            AttemptStatus::Queued
        );
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = AttemptRecord::new("msg-1");
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("messageId").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["status"], "queued");
        // Unset optionals are omitted
        assert!(json.get("lastError").is_none());
    }
}
