use std::sync::Arc;

use crate::config::Config;
use crate::recorder::RecordingService;

pub mod camera;
pub mod recording;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub recorder: Arc<RecordingService>,
}
