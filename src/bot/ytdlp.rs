//! yt-dlp subprocess downloader.
//!
//! Spawns the yt-dlp binary with a JSON progress template and streams the
//! parsed progress reports to the caller over a channel. Stderr is forwarded
//! to tracing logs.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bot::progress::ProgressEvent;

/// Errors starting a download.
#[derive(Debug)]
pub enum DownloadError {
    /// The yt-dlp process could not be spawned.
    Spawn {
        binary: PathBuf,
        source: std::io::Error,
    },
    /// A stdio handle was missing after spawn.
    MissingPipe(&'static str),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { binary, source } => {
                write!(f, "failed to spawn {}: {}", binary.display(), source)
            }
            Self::MissingPipe(pipe) => write!(f, "no {pipe} handle on yt-dlp process"),
        }
    }
}

impl std::error::Error for DownloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::MissingPipe(_) => None,
        }
    }
}

/// A media downloader that reports progress over a channel. The channel
/// closes when the download finishes; a failed download delivers a terminal
/// [`ProgressEvent::Error`] first.
pub trait Downloader: Send + Sync {
    fn download(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<mpsc::UnboundedReceiver<ProgressEvent>, DownloadError>> + Send;
}

/// Downloader backed by the yt-dlp binary.
pub struct YtDlp {
    binary: PathBuf,
    download_dir: PathBuf,
}

impl YtDlp {
    pub fn new(binary: PathBuf, download_dir: PathBuf) -> Self {
        Self {
            binary,
            download_dir,
        }
    }
}

/// Progress JSON emitted by yt-dlp's `%(progress)j` template. Field names
/// follow yt-dlp's progress-hook dict.
#[derive(Deserialize)]
struct RawProgress {
    status: String,
    #[serde(rename = "_percent_str")]
    percent_str: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one stdout line into a progress event. Non-progress output (site
/// banners, warnings echoed to stdout) returns None.
fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    let raw: RawProgress = serde_json::from_str(line).ok()?;

    Some(match raw.status.as_str() {
        "downloading" => ProgressEvent::Downloading {
            percent: raw
                .percent_str
                .unwrap_or_else(|| "?".to_string())
                .trim()
                .to_string(),
        },
        "finished" => ProgressEvent::Finished,
        "error" => ProgressEvent::Error {
            message: raw.error.unwrap_or_else(|| "unknown error".to_string()),
        },
        _ => ProgressEvent::Other { status: raw.status },
    })
}

impl Downloader for YtDlp {
    async fn download(
        &self,
        url: &str,
    ) -> Result<mpsc::UnboundedReceiver<ProgressEvent>, DownloadError> {
        let output_template = self.download_dir.join("%(title)s-%(id)s.%(ext)s");

        let mut child = Command::new(&self.binary)
            .arg("--newline")
            .arg("--quiet")
            .arg("--progress")
            .arg("--progress-template")
            .arg("%(progress)j")
            .arg("--no-overwrites")
            .arg("--output")
            .arg(&output_template)
            .arg("--")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloadError::Spawn {
                binary: self.binary.clone(),
                source: e,
            })?;

        info!("yt-dlp spawned (pid {:?}) for {url}", child.id());

        let stdout = child
            .stdout
            .take()
            .ok_or(DownloadError::MissingPipe("stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or(DownloadError::MissingPipe("stderr"))?;

        // Stderr reader task: forward to logs, keep the last ERROR line for
        // the terminal event.
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut last_error = None;
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(rest) = line.strip_prefix("ERROR:") {
                    last_error = Some(rest.trim().to_string());
                }
                debug!(target: "yt_dlp", "{line}");
            }
            last_error
        });

        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut receiver_gone = false;
            while let Ok(Some(line)) = lines.next_line().await {
                let Some(event) = parse_progress_line(&line) else {
                    debug!(target: "yt_dlp", "{line}");
                    continue;
                };
                // Receiver gone: stop forwarding but keep reading to EOF,
                // otherwise the child blocks on a full stdout pipe and
                // wait() below never returns.
                if !receiver_gone && tx.send(event).is_err() {
                    receiver_gone = true;
                }
            }

            let last_error = stderr_task.await.unwrap_or(None);

            match child.wait().await {
                Ok(status) if status.success() => {
                    info!("yt-dlp finished");
                }
                Ok(status) => {
                    let message =
                        last_error.unwrap_or_else(|| format!("yt-dlp exited with {status}"));
                    warn!("yt-dlp failed: {message}");
                    let _ = tx.send(ProgressEvent::Error { message });
                }
                Err(e) => {
                    warn!("Failed to wait for yt-dlp: {e}");
                    let _ = tx.send(ProgressEvent::Error {
                        message: e.to_string(),
                    });
                }
            }
        });

        Ok(rx)
    }
}
