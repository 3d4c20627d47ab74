#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use liverec::config;
use liverec::recorder::archive::ArchiveSink;
use liverec::recorder::directory::StaticDirectory;
use liverec::recorder::pipeline::PipelinePlanner;
use liverec::recorder::probe::{CameraCapability, CameraProber};
use liverec::recorder::store::{MemStore, Recording, RecordingStore, StoreError};
use liverec::recorder::RecordingService;

/// Probe stub: succeeds with a fixed capability, or fails for any address
/// containing `fail_for`.
pub struct StubProber {
    pub has_audio: bool,
    pub fail_for: Option<String>,
}

impl StubProber {
    pub fn ok() -> Self {
        Self {
            has_audio: false,
            fail_for: None,
        }
    }

    pub fn failing_for(needle: &str) -> Self {
        Self {
            has_audio: false,
            fail_for: Some(needle.to_string()),
        }
    }
}

#[async_trait]
impl CameraProber for StubProber {
    async fn probe(&self, address: &str) -> Result<CameraCapability> {
        if let Some(needle) = &self.fail_for {
            if address.contains(needle.as_str()) {
                bail!("connection refused");
            }
        }
        Ok(CameraCapability {
            has_audio: self.has_audio,
        })
    }
}

/// Store wrapper that can be switched to fail writes, for exercising the
/// "side effect happened, record of it did not" paths.
pub struct FlakyStore {
    inner: MemStore,
    pub fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemStore::new(),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Internal(anyhow::anyhow!("database is down")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordingStore for FlakyStore {
    async fn create(&self, recording: &Recording) -> Result<(), StoreError> {
        self.check()?;
        self.inner.create(recording).await
    }

    async fn set_stop_time(
        &self,
        session_id: &str,
        stop_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set_stop_time(session_id, stop_time).await
    }

    async fn mark_moved(&self, session_id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.mark_moved(session_id).await
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        self.inner.delete(session_id).await
    }

    async fn fetch(&self, session_id: &str) -> Result<Recording, StoreError> {
        self.inner.fetch(session_id).await
    }

    async fn camera_recordings(
        &self,
        camera_id: &str,
        limit: usize,
        offset: usize,
        user_id: i64,
    ) -> Result<Vec<Recording>, StoreError> {
        self.inner
            .camera_recordings(camera_id, limit, offset, user_id)
            .await
    }
}

pub fn cameras(ids: &[&str]) -> Vec<config::Camera> {
    ids.iter()
        .map(|id| config::Camera {
            id: id.to_string(),
            url: format!("rtsp://{id}.local:554/main"),
            location: format!("room-{id}"),
        })
        .collect()
}

pub struct Harness {
    pub service: Arc<RecordingService>,
    pub store: Arc<MemStore>,
    pub videos: TempDir,
}

/// Service wired with stub collaborators. The launcher is `sleep`, so a
/// spawn succeeds without GStreamer being installed.
pub fn harness(ids: &[&str], prober: StubProber) -> Harness {
    harness_with_archive(ids, prober, None)
}

pub fn harness_with_archive(
    ids: &[&str],
    prober: StubProber,
    archive: Option<Arc<dyn ArchiveSink>>,
) -> Harness {
    let videos = TempDir::new().expect("failed to create temp dir");
    let store = Arc::new(MemStore::new());
    let service = Arc::new(RecordingService::new(
        Arc::new(StaticDirectory::new(&cameras(ids))),
        Arc::new(prober),
        PipelinePlanner::new("sleep"),
        store.clone(),
        archive,
        videos.path(),
    ));
    Harness {
        service,
        store,
        videos,
    }
}

pub async fn shutdown_signal() {
    let _str = liverec::signal::wait_for_stop_signal().await;
}
