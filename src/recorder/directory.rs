use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::config;

/// Resolved camera identity: transport address plus a human-readable
/// location used for archive metadata.
#[derive(Debug, Clone)]
pub struct CameraEntry {
    pub id: String,
    pub url: String,
    pub location: String,
}

/// Maps a camera identifier to its transport address.
#[async_trait]
pub trait CameraDirectory: Send + Sync {
    async fn lookup(&self, camera_id: &str) -> Result<CameraEntry>;
    async fn cameras(&self) -> Vec<CameraEntry>;
}

/// Directory backed by the `[[cameras]]` config table.
pub struct StaticDirectory {
    entries: HashMap<String, CameraEntry>,
}

impl StaticDirectory {
    pub fn new(cameras: &[config::Camera]) -> Self {
        let entries = cameras
            .iter()
            .map(|c| {
                (
                    c.id.clone(),
                    CameraEntry {
                        id: c.id.clone(),
                        url: c.url.clone(),
                        location: c.location.clone(),
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

#[async_trait]
impl CameraDirectory for StaticDirectory {
    async fn lookup(&self, camera_id: &str) -> Result<CameraEntry> {
        self.entries
            .get(camera_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown camera: {camera_id}"))
    }

    async fn cameras(&self) -> Vec<CameraEntry> {
        let mut cameras: Vec<CameraEntry> = self.entries.values().cloned().collect();
        cameras.sort_by(|a, b| a.id.cmp(&b.id));
        cameras
    }
}
