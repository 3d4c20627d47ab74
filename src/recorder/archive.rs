use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::config;
use crate::recorder::store::Recording;

/// Hands a finished recording to the external archive. The upload is not
/// idempotent: the archive has no deduplication key, so a blind re-run
/// after a successful upload duplicates the archive entry.
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    async fn upload(&self, recording: &Recording) -> Result<()>;
}

#[derive(Serialize)]
struct Metadata {
    flavor: String,
    fields: Vec<Field>,
}

#[derive(Serialize)]
struct Field {
    id: String,
    value: serde_json::Value,
}

/// Opencast events endpoint. One multipart POST carrying the media bytes
/// plus dublincore metadata, a static ACL and a workflow descriptor.
pub struct Opencast {
    address: String,
    login: String,
    password: String,
    acl: String,
    processing: String,
    client: reqwest::Client,
}

impl Opencast {
    pub fn new(cfg: &config::Archive) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout))
            .build()?;
        Ok(Self {
            address: cfg.address.trim_end_matches('/').to_string(),
            login: cfg.login.clone(),
            password: cfg.password.clone(),
            acl: serde_json::to_string(&cfg.acl)?,
            processing: serde_json::to_string(&json!({
                "workflow": cfg.processing.workflow,
                "configuration": cfg.processing.configuration,
            }))?,
            client,
        })
    }
}

#[async_trait]
impl ArchiveSink for Opencast {
    async fn upload(&self, recording: &Recording) -> Result<()> {
        let stop_time = recording
            .stop_time
            .ok_or_else(|| anyhow!("recording has not been stopped yet"))?;

        let media = tokio::fs::read(&recording.file_path)
            .await
            .with_context(|| format!("failed to read {}", recording.file_path))?;

        let metadata = vec![Metadata {
            flavor: "dublincore/episode".to_string(),
            fields: vec![
                Field {
                    id: "title".to_string(),
                    value: recording.camera_url.clone().into(),
                },
                Field {
                    id: "startDate".to_string(),
                    value: recording.start_time.format("%Y-%m-%d").to_string().into(),
                },
                Field {
                    id: "startTime".to_string(),
                    value: recording.start_time.format("%H:%M:%S").to_string().into(),
                },
                Field {
                    id: "duration".to_string(),
                    value: format_duration(stop_time - recording.start_time).into(),
                },
                Field {
                    id: "location".to_string(),
                    value: recording.camera_url.clone().into(),
                },
            ],
        }];

        let extension = Path::new(&recording.file_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mkv");

        let form = reqwest::multipart::Form::new()
            .part(
                "presenter",
                reqwest::multipart::Part::bytes(media)
                    .file_name(format!("presenter.{extension}")),
            )
            .text("metadata", serde_json::to_string(&metadata)?)
            .text("acl", self.acl.clone())
            .text("processing", self.processing.clone());

        let response = self
            .client
            .post(format!("{}/api/events", self.address))
            .basic_auth(&self.login, Some(&self.password))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK && status != reqwest::StatusCode::CREATED {
            bail!("archive rejected upload: {status}");
        }

        info!("recording {} uploaded to archive", recording.session_id);
        Ok(())
    }
}

/// `HH:MM:SS`, zero padded; hours are not wrapped at 24.
fn format_duration(duration: chrono::Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}
