use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use rtsp_types::{headers, Message, Method, Request, StatusCode, Url, Version};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

const USER_AGENT: &str = "liverec";
const DEFAULT_RTSP_PORT: u16 = 554;
const MAX_RESPONSE_SIZE: usize = 64 * 1024;

/// What the camera advertised during the probe handshake. Valid for the
/// session being started only; capability can change between calls.
#[derive(Debug, Clone, Copy)]
pub struct CameraCapability {
    pub has_audio: bool,
}

/// Opens a lightweight handshake against a camera's media endpoint. Any
/// transport or protocol failure means the same thing to the orchestrator:
/// do not start the session.
#[async_trait]
pub trait CameraProber: Send + Sync {
    async fn probe(&self, address: &str) -> Result<CameraCapability>;
}

/// RTSP DESCRIBE with a bounded timeout covering connect and handshake.
pub struct RtspProber {
    timeout: Duration,
}

impl RtspProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CameraProber for RtspProber {
    async fn probe(&self, address: &str) -> Result<CameraCapability> {
        tokio::time::timeout(self.timeout, describe(address))
            .await
            .map_err(|_| anyhow!("probe timed out after {:?}", self.timeout))?
    }
}

async fn describe(address: &str) -> Result<CameraCapability> {
    let url = address.parse::<Url>()?;
    if url.scheme() != "rtsp" {
        bail!("unsupported scheme: {}", url.scheme());
    }
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("camera url has no host"))?;
    let port = url.port().unwrap_or(DEFAULT_RTSP_PORT);

    let mut stream = TcpStream::connect((host, port)).await?;

    let describe_request = Request::builder(Method::Describe, Version::V1_0)
        .request_uri(url.clone())
        .header(headers::CSEQ, "1".to_string())
        .header(headers::ACCEPT, "application/sdp".to_string())
        .header(headers::USER_AGENT, USER_AGENT.to_string())
        .empty();

    let mut buffer = Vec::new();
    describe_request.map_body(|_| Vec::<u8>::new()).write(&mut buffer)?;
    stream.write_all(&buffer).await?;
    trace!("sent RTSP DESCRIBE to {address}");

    // The response can arrive split across segments; accumulate and
    // re-parse until a complete message.
    let mut accumulated = Vec::new();
    let response: rtsp_types::Response<Vec<u8>> = loop {
        let mut buf = vec![0; 1024];
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            bail!("connection closed before a complete response");
        }
        accumulated.extend_from_slice(&buf[..n]);

        match Message::parse(&accumulated) {
            Ok((Message::Response(response), _consumed)) => break response,
            Ok(_) => bail!("expected a response message"),
            Err(rtsp_types::ParseError::Incomplete(_)) => {
                if accumulated.len() > MAX_RESPONSE_SIZE {
                    bail!("response exceeds {MAX_RESPONSE_SIZE} bytes");
                }
            }
            Err(e) => bail!("parse error: {e:?}"),
        }
    };
    if response.status() != StatusCode::Ok {
        bail!("DESCRIBE failed: {}", response.status());
    }

    parse_capability(std::str::from_utf8(response.body())?)
}

/// Available means at least one advertised media section; the audio flag
/// selects the pipeline template.
fn parse_capability(sdp: &str) -> Result<CameraCapability> {
    let mut tracks = 0;
    let mut has_audio = false;
    for line in sdp.lines() {
        let line = line.trim();
        if line.starts_with("m=") {
            tracks += 1;
            if line.starts_with("m=audio") {
                has_audio = true;
            }
        }
    }
    if tracks == 0 {
        bail!("no media tracks advertised");
    }
    Ok(CameraCapability { has_audio })
}
