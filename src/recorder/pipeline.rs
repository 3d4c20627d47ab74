use crate::error::AppError;
use crate::result::Result;

/// One camera participating in a session, after a successful probe.
#[derive(Debug, Clone)]
pub struct CameraInput {
    pub url: String,
    pub has_audio: bool,
}

/// Builds the capture pipeline argument vector. Pure: same inputs, same
/// argv. The launcher binary is a deployment knob; the pipeline templates
/// are fixed.
#[derive(Debug, Clone)]
pub struct PipelinePlanner {
    launcher: String,
}

impl PipelinePlanner {
    pub fn new(launcher: impl Into<String>) -> Self {
        Self {
            launcher: launcher.into(),
        }
    }

    /// Four supported compositions: one or two cameras, with or without an
    /// audio branch. Anything else is a fixed policy ceiling, not a
    /// limitation to extend silently.
    pub fn plan(&self, cameras: &[CameraInput], output: &str) -> Result<Vec<String>> {
        let pipeline = match cameras {
            [cam] if cam.has_audio => format!(
                "{} uridecodebin uri={} name=dec ! queue ! videoconvert ! x264enc ! matroskamux name=mux ! filesink location={} dec. ! queue ! audioconvert ! lamemp3enc ! mux.",
                self.launcher, cam.url, output
            ),
            [cam] => format!(
                "{} rtspsrc location={} ! rtph264depay ! h264parse ! matroskamux ! filesink location={}",
                self.launcher, cam.url, output
            ),
            [first, _second] if first.has_audio => format!(
                "{} rtspsrc location={} name=src ! rtph264depay ! h264parse ! queue ! mux. src. ! rtpmp4gdepay ! aacparse ! queue ! mux. matroskamux name=mux ! filesink location={}",
                self.launcher, first.url, output
            ),
            [first, second] => format!(
                "{} -e videomixer name=mix sink_0::xpos=0 sink_1::xpos=640 ! videoconvert ! x264enc ! queue ! mux. uridecodebin uri={} ! videoconvert ! videoscale ! video/x-raw,width=640,height=480 ! mix.sink_0 uridecodebin uri={} ! videoconvert ! videoscale ! video/x-raw,width=640,height=480 ! mix.sink_1 matroskamux name=mux ! filesink location={}",
                self.launcher, first.url, second.url, output
            ),
            _ => return Err(AppError::UnsupportedCameraCount(cameras.len())),
        };

        Ok(pipeline.split(' ').map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(url: &str, has_audio: bool) -> CameraInput {
        CameraInput {
            url: url.to_string(),
            has_audio,
        }
    }

    #[test]
    fn plan_is_deterministic() {
        let planner = PipelinePlanner::new("gst-launch-1.0");
        let cameras = vec![
            camera("rtsp://10.0.0.5/main", true),
            camera("rtsp://10.0.0.6/main", false),
        ];
        let a = planner.plan(&cameras, "/videos/out.mkv").unwrap();
        let b = planner.plan(&cameras, "/videos/out.mkv").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_camera_without_audio() {
        let planner = PipelinePlanner::new("gst-launch-1.0");
        let argv = planner
            .plan(&[camera("rtsp://10.0.0.5/main", false)], "/videos/out.mkv")
            .unwrap();
        assert_eq!(argv[0], "gst-launch-1.0");
        assert!(argv.contains(&"rtspsrc".to_string()));
        assert!(argv.contains(&"location=rtsp://10.0.0.5/main".to_string()));
        assert!(argv.contains(&"location=/videos/out.mkv".to_string()));
        assert!(!argv.iter().any(|a| a.contains("audio")));
    }

    #[test]
    fn single_camera_with_audio_adds_audio_branch() {
        let planner = PipelinePlanner::new("gst-launch-1.0");
        let argv = planner
            .plan(&[camera("rtsp://10.0.0.5/main", true)], "/videos/out.mkv")
            .unwrap();
        assert!(argv.contains(&"uri=rtsp://10.0.0.5/main".to_string()));
        assert!(argv.contains(&"lamemp3enc".to_string()));
    }

    #[test]
    fn two_cameras_without_audio_composites_video() {
        let planner = PipelinePlanner::new("gst-launch-1.0");
        let argv = planner
            .plan(
                &[
                    camera("rtsp://10.0.0.5/main", false),
                    camera("rtsp://10.0.0.6/main", false),
                ],
                "/videos/out.mkv",
            )
            .unwrap();
        assert!(argv.iter().any(|a| a.starts_with("videomixer")));
        assert!(argv.contains(&"uri=rtsp://10.0.0.5/main".to_string()));
        assert!(argv.contains(&"uri=rtsp://10.0.0.6/main".to_string()));
    }

    #[test]
    fn two_cameras_with_audio_muxes_aac() {
        let planner = PipelinePlanner::new("gst-launch-1.0");
        let argv = planner
            .plan(
                &[
                    camera("rtsp://10.0.0.5/main", true),
                    camera("rtsp://10.0.0.6/main", false),
                ],
                "/videos/out.mkv",
            )
            .unwrap();
        assert!(argv.contains(&"aacparse".to_string()));
    }

    #[test]
    fn unsupported_camera_counts_rejected() {
        let planner = PipelinePlanner::new("gst-launch-1.0");
        for count in [0usize, 3, 4] {
            let cameras: Vec<CameraInput> = (0..count)
                .map(|i| camera(&format!("rtsp://10.0.0.{i}/main"), false))
                .collect();
            match planner.plan(&cameras, "/videos/out.mkv") {
                Err(AppError::UnsupportedCameraCount(n)) => assert_eq!(n, count),
                other => panic!("expected UnsupportedCameraCount, got {other:?}"),
            }
        }
    }
}
