use std::collections::HashSet;
use std::{env, fs, net::SocketAddr, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub recorder: Recorder,
    #[serde(default)]
    pub archive: Option<Archive>,
    #[serde(default)]
    pub cameras: Vec<Camera>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Auth {
    /// Static bearer token. Empty disables authentication.
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recorder {
    /// Directory the capture pipeline writes output files into.
    #[serde(default = "default_videos_dir")]
    pub videos_dir: String,
    /// Capture pipeline launcher binary.
    #[serde(default = "default_launcher")]
    pub launcher: String,
    /// Per-camera probe timeout in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    pub id: String,
    /// RTSP address of the camera's media endpoint.
    pub url: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archive {
    pub address: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    /// Upload request timeout in seconds.
    #[serde(default = "default_archive_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub acl: Vec<AclRule>,
    #[serde(default)]
    pub processing: Processing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclRule {
    pub action: String,
    pub allow: bool,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Processing {
    #[serde(default)]
    pub workflow: String,
    #[serde(default)]
    pub configuration: serde_json::Map<String, serde_json::Value>,
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("7788"))
    ))
    .expect("invalid listen address")
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            videos_dir: default_videos_dir(),
            launcher: default_launcher(),
            probe_timeout: default_probe_timeout(),
        }
    }
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_videos_dir() -> String {
    String::from("./videos")
}

fn default_launcher() -> String {
    String::from("gst-launch-1.0")
}

fn default_probe_timeout() -> u64 {
    3
}

fn default_archive_timeout() -> u64 {
    60
}

impl Config {
    pub fn parse(path: Option<String>) -> Self {
        let result = fs::read_to_string(path.unwrap_or(String::from("liverec.toml")))
            .or(fs::read_to_string("/etc/liverec/liverec.toml"))
            .unwrap_or("".to_string());
        let cfg: Self = toml::from_str(result.as_str()).expect("config parse error");
        match cfg.validate() {
            Ok(_) => cfg,
            Err(err) => panic!("config validate [{}]", err),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for camera in self.cameras.iter() {
            if camera.id.trim().is_empty() {
                return Err(anyhow::anyhow!("camera id cannot be empty"));
            }
            if camera.url.trim().is_empty() {
                return Err(anyhow::anyhow!("camera {} has an empty url", camera.id));
            }
            if !seen.insert(camera.id.clone()) {
                return Err(anyhow::anyhow!("duplicate camera id: {}", camera.id));
            }
        }

        if let Some(archive) = &self.archive {
            if archive.address.trim().is_empty() {
                return Err(anyhow::anyhow!("archive address cannot be empty"));
            }
        }

        Ok(())
    }
}
