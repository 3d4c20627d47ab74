use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::process::{Child, Command};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::result::Result;

pub mod archive;
pub mod directory;
pub mod pipeline;
pub mod probe;
pub mod schedule;
pub mod store;

use archive::ArchiveSink;
use directory::CameraDirectory;
use pipeline::{CameraInput, PipelinePlanner};
use probe::CameraProber;
use schedule::ScheduleRegistry;
use store::{Recording, RecordingStore, StoreError};

/// The pipeline composes at most two cameras. A fixed policy ceiling.
const MAX_CAMERAS: usize = 2;

/// Orchestrates recording sessions: probes cameras, spawns the capture
/// pipeline, tracks live processes and drives persistence.
///
/// The session registry is the single source of truth for liveness. Each
/// process handle is owned by exactly one registry entry and leaves the
/// registry exactly once, at stop.
pub struct RecordingService {
    directory: Arc<dyn CameraDirectory>,
    prober: Arc<dyn CameraProber>,
    planner: PipelinePlanner,
    store: Arc<dyn RecordingStore>,
    archive: Option<Arc<dyn ArchiveSink>>,
    sessions: RwLock<HashMap<String, Child>>,
    schedules: ScheduleRegistry,
    videos_dir: PathBuf,
}

impl RecordingService {
    pub fn new(
        directory: Arc<dyn CameraDirectory>,
        prober: Arc<dyn CameraProber>,
        planner: PipelinePlanner,
        store: Arc<dyn RecordingStore>,
        archive: Option<Arc<dyn ArchiveSink>>,
        videos_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            directory,
            prober,
            planner,
            store,
            archive,
            sessions: RwLock::new(HashMap::new()),
            schedules: ScheduleRegistry::new(),
            videos_dir: videos_dir.into(),
        }
    }

    /// Starts a capture session over one or two cameras.
    ///
    /// All validation and probing happens before any side effect: a failed
    /// probe leaves no process, no registry entry and no store row. Once
    /// the process is spawned the asymmetry flips: a failed store write
    /// is reported as `PersistenceWriteFailed` carrying the session id, and
    /// the process keeps running for the caller to compensate.
    pub async fn start(&self, camera_ids: &[String], user_id: i64) -> Result<String> {
        if camera_ids.is_empty() || camera_ids.len() > MAX_CAMERAS {
            return Err(AppError::UnsupportedCameraCount(camera_ids.len()));
        }

        let mut cameras = Vec::with_capacity(camera_ids.len());
        for camera_id in camera_ids {
            let entry = self
                .directory
                .lookup(camera_id)
                .await
                .map_err(AppError::camera_unavailable)?;
            // Capability is probed per session, never cached: availability
            // and the audio track can change between calls.
            let capability = self
                .prober
                .probe(&entry.url)
                .await
                .map_err(|e| AppError::CameraUnavailable(format!("{camera_id}: {e}")))?;
            cameras.push(CameraInput {
                url: entry.url,
                has_audio: capability.has_audio,
            });
        }

        let session_id = Uuid::new_v4().to_string();
        let start_time = Utc::now();
        let file_path = self
            .videos_dir
            .join(&camera_ids[0])
            .join(format!(
                "{}_{}.mkv",
                session_id,
                start_time.format("%Y-%m-%d_%H-%M-%S")
            ))
            .to_string_lossy()
            .into_owned();

        if let Some(parent) = std::path::Path::new(&file_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let argv = self.planner.plan(&cameras, &file_path)?;
        info!("starting recording {session_id} for cameras {camera_ids:?}");

        let child = Command::new(&argv[0]).args(&argv[1..]).spawn()?;
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), child);

        let recording = Recording {
            session_id: session_id.clone(),
            camera_id: camera_ids[0].clone(),
            camera_url: cameras[0].url.clone(),
            user_id,
            file_path,
            start_time,
            stop_time: None,
            is_moved: false,
        };
        if let Err(e) = self.store.create(&recording).await {
            error!("recording {session_id} started but start record not written: {e}");
            return Err(AppError::persistence_write_failed(Some(session_id), e));
        }

        Ok(session_id)
    }

    /// Stops a live session. The registry removal is atomic with the
    /// lookup, so concurrent stops of the same session cannot both signal
    /// the process; the entry is gone even when signal delivery fails.
    /// A signal failure is still reported to the caller, distinct from
    /// `PersistenceWriteFailed`, after the stop time is persisted.
    pub async fn stop(&self, session_id: &str) -> Result<()> {
        let mut child = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| AppError::session_not_found(session_id))?;

        let kill_result = child.start_kill();
        // Reap off the stop path; the handle is already out of the registry.
        tokio::spawn(async move {
            let _ = child.wait().await;
        });
        info!("recording {session_id} stopped");

        if let Err(e) = self.store.set_stop_time(session_id, Utc::now()).await {
            error!("recording {session_id} stopped but stop record not written: {e}");
            return Err(AppError::persistence_write_failed(
                Some(session_id.to_string()),
                e,
            ));
        }

        if let Err(e) = kill_result {
            error!("failed to signal pipeline for {session_id}: {e}");
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "failed to signal pipeline for {session_id}: {e}"
            )));
        }

        Ok(())
    }

    /// Arms a deferred start at `start_at`; when that fires and succeeds,
    /// a deferred stop follows after `duration`. Failures at fire time are
    /// observable through logs only, the caller is long gone by then.
    /// Returns a schedule id usable with [`cancel_schedule`] while the
    /// start has not fired yet.
    ///
    /// [`cancel_schedule`]: RecordingService::cancel_schedule
    pub async fn schedule(
        self: &Arc<Self>,
        camera_ids: Vec<String>,
        start_at: DateTime<Utc>,
        duration: &str,
        user_id: i64,
    ) -> Result<String> {
        if camera_ids.is_empty() || camera_ids.len() > MAX_CAMERAS {
            return Err(AppError::UnsupportedCameraCount(camera_ids.len()));
        }
        let now = Utc::now();
        if start_at <= now {
            return Err(AppError::invalid_start_time(start_at));
        }
        let duration = humantime::parse_duration(duration)
            .map_err(|e| AppError::InvalidDuration(e.to_string()))?;
        if duration.is_zero() {
            return Err(AppError::InvalidDuration(
                "duration must be positive".to_string(),
            ));
        }
        let delay = (start_at - now).to_std().unwrap_or(Duration::ZERO);

        let schedule_id = Uuid::new_v4().to_string();
        info!(
            "scheduling recording {schedule_id} for cameras {camera_ids:?} at {start_at} for {duration:?}"
        );

        let service = Arc::clone(self);
        let id = schedule_id.clone();
        self.schedules
            .register(schedule_id.clone(), move || {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    // Past this point the schedule can no longer be cancelled.
                    service.schedules.complete(&id).await;

                    let session_id = match service.start(&camera_ids, user_id).await {
                        Ok(session_id) => session_id,
                        Err(AppError::PersistenceWriteFailed {
                            session_id: Some(session_id),
                            message,
                        }) => {
                            // The pipeline is running; still arm the stop.
                            error!("scheduled start {id} not persisted: {message}");
                            session_id
                        }
                        Err(e) => {
                            error!("scheduled start {id} failed: {e:?}");
                            return;
                        }
                    };

                    tokio::time::sleep(duration).await;
                    if let Err(e) = service.stop(&session_id).await {
                        error!("scheduled stop of {session_id} failed: {e:?}");
                    }
                })
            })
            .await;

        Ok(schedule_id)
    }

    /// Cancels a schedule whose start has not fired yet.
    pub async fn cancel_schedule(&self, schedule_id: &str) -> Result<()> {
        if self.schedules.cancel(schedule_id).await {
            info!("schedule {schedule_id} cancelled");
            Ok(())
        } else {
            Err(AppError::session_not_found(schedule_id))
        }
    }

    /// Uploads a finished recording to the archive and marks it moved.
    ///
    /// A failed flag write after a successful upload is reported as
    /// `PersistenceWriteFailed`: the upload is not idempotent, so only the
    /// flag-set step may be retried.
    pub async fn move_to_archive(&self, session_id: &str) -> Result<()> {
        let recording = self.fetch(session_id).await?;

        let archive = self
            .archive
            .as_ref()
            .ok_or_else(|| AppError::archive_upload_failed("archive is not configured"))?;
        archive
            .upload(&recording)
            .await
            .map_err(AppError::archive_upload_failed)?;

        if let Err(e) = self.store.mark_moved(session_id).await {
            error!("recording {session_id} uploaded but moved flag not written: {e}");
            return Err(AppError::persistence_write_failed(
                Some(session_id.to_string()),
                e,
            ));
        }

        Ok(())
    }

    /// Deletes the recording row, unlinking the media file first when it
    /// was never handed to the archive.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        let recording = self.fetch(session_id).await?;

        if !recording.is_moved {
            tokio::fs::remove_file(&recording.file_path).await?;
        }

        self.store
            .delete(session_id)
            .await
            .map_err(|e| store_error(session_id, e))?;
        info!("recording {session_id} deleted");

        Ok(())
    }

    /// Path of the media file for download. A moved recording is never
    /// served locally; a recording whose file vanished from disk is
    /// opportunistically deleted and reported missing.
    pub async fn file_path(&self, session_id: &str) -> Result<String> {
        let recording = self.fetch(session_id).await?;

        if recording.is_moved {
            return Err(AppError::FileAlreadyMoved(session_id.to_string()));
        }

        if tokio::fs::metadata(&recording.file_path).await.is_err() {
            if let Err(e) = self.store.delete(session_id).await {
                warn!("failed to delete record for missing file {session_id}: {e}");
            }
            return Err(AppError::FileNotFound(session_id.to_string()));
        }

        Ok(recording.file_path)
    }

    pub async fn camera_recordings(
        &self,
        camera_id: &str,
        limit: usize,
        offset: usize,
        user_id: i64,
    ) -> Result<Vec<Recording>> {
        self.store
            .camera_recordings(camera_id, limit, offset, user_id)
            .await
            .map_err(|e| store_error(camera_id, e))
    }

    pub fn directory(&self) -> &Arc<dyn CameraDirectory> {
        &self.directory
    }

    /// Whether the session holds a live process handle in the registry.
    pub async fn is_recording(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Kills every live pipeline. Used on shutdown; persistence of the
    /// stop times still flows through the normal stop path.
    pub async fn shutdown(&self) {
        let session_ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        for session_id in session_ids {
            if let Err(e) = self.stop(&session_id).await {
                warn!("failed to stop {session_id} during shutdown: {e:?}");
            }
        }
    }

    async fn fetch(&self, session_id: &str) -> Result<Recording> {
        self.store
            .fetch(session_id)
            .await
            .map_err(|e| store_error(session_id, e))
    }
}

fn store_error(id: &str, err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AppError::session_not_found(id),
        StoreError::Internal(e) => AppError::InternalServerError(e),
    }
}
