use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Durable view of one recording session. Mirrors the orchestrator's
/// in-memory state; the process handle itself never leaves the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub session_id: String,
    pub camera_id: String,
    pub camera_url: String,
    pub user_id: i64,
    #[serde(skip_serializing, default)]
    pub file_path: String,
    pub start_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
    pub is_moved: bool,
}

/// A miss must stay distinguishable from a transport/database failure:
/// callers react differently to "no such row" and "the write did not land".
#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Internal(anyhow::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "record not found"),
            StoreError::Internal(err) => write!(f, "store error: {err}"),
        }
    }
}

#[async_trait]
pub trait RecordingStore: Send + Sync {
    async fn create(&self, recording: &Recording) -> Result<(), StoreError>;
    async fn set_stop_time(
        &self,
        session_id: &str,
        stop_time: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn mark_moved(&self, session_id: &str) -> Result<(), StoreError>;
    async fn delete(&self, session_id: &str) -> Result<(), StoreError>;
    async fn fetch(&self, session_id: &str) -> Result<Recording, StoreError>;
    async fn camera_recordings(
        &self,
        camera_id: &str,
        limit: usize,
        offset: usize,
        user_id: i64,
    ) -> Result<Vec<Recording>, StoreError>;
}

/// In-memory store. The relational backend lives behind the
/// `RecordingStore` boundary and is deployment-specific.
#[derive(Default)]
pub struct MemStore {
    records: RwLock<HashMap<String, Recording>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordingStore for MemStore {
    async fn create(&self, recording: &Recording) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(recording.session_id.clone(), recording.clone());
        Ok(())
    }

    async fn set_stop_time(
        &self,
        session_id: &str,
        stop_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        match self.records.write().await.get_mut(session_id) {
            Some(rec) => {
                rec.stop_time = Some(stop_time);
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn mark_moved(&self, session_id: &str) -> Result<(), StoreError> {
        match self.records.write().await.get_mut(session_id) {
            Some(rec) => {
                rec.is_moved = true;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        match self.records.write().await.remove(session_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    async fn fetch(&self, session_id: &str) -> Result<Recording, StoreError> {
        self.records
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn camera_recordings(
        &self,
        camera_id: &str,
        limit: usize,
        offset: usize,
        user_id: i64,
    ) -> Result<Vec<Recording>, StoreError> {
        let records = self.records.read().await;
        let mut recs: Vec<Recording> = records
            .values()
            .filter(|r| r.camera_id == camera_id && r.user_id == user_id)
            .cloned()
            .collect();
        recs.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(recs.into_iter().skip(offset).take(limit).collect())
    }
}
