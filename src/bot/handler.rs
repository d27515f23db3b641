//! Per-message orchestration: acknowledge, validate, download, clean up.

use std::fmt;
use std::time::Duration;

use tracing::info;

use crate::bot::progress::ProgressReporter;
use crate::bot::telegram::{ChatApi, ChatError};
use crate::bot::url::is_url;
use crate::bot::ytdlp::{DownloadError, Downloader};

/// Deadline for sending the initial status message.
const STATUS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from handling one inbound message.
#[derive(Debug)]
pub enum HandlerError {
    Chat(ChatError),
    Download(DownloadError),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat(e) => write!(f, "chat error: {e}"),
            Self::Download(e) => write!(f, "download error: {e}"),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Chat(e) => Some(e),
            Self::Download(e) => Some(e),
        }
    }
}

impl From<ChatError> for HandlerError {
    fn from(e: ChatError) -> Self {
        Self::Chat(e)
    }
}

impl From<DownloadError> for HandlerError {
    fn from(e: DownloadError) -> Self {
        Self::Download(e)
    }
}

/// Handles one inbound message at a time: sends the status and ack messages,
/// validates the URL, runs the download with progress edits, and deletes the
/// original message when done.
pub struct MessageHandler<C: ChatApi, D: Downloader> {
    api: C,
    downloader: D,
}

impl<C: ChatApi, D: Downloader> MessageHandler<C, D> {
    pub fn new(api: C, downloader: D) -> Self {
        Self { api, downloader }
    }

    pub async fn handle(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), HandlerError> {
        // Status message first; every progress update edits this in place.
        let status_id = self
            .api
            .send_message(chat_id, "Downloading...", Some(STATUS_SEND_TIMEOUT))
            .await?;
        let mut progress = ProgressReporter::new(&self.api, chat_id, status_id);

        self.api
            .send_message(chat_id, "Message received, sending to downloader", None)
            .await?;

        if !is_url(text) {
            info!("Rejecting non-URL message {} in chat {}", message_id, chat_id);
            self.api.send_message(chat_id, "Invalid URL", None).await?;
            // The status message has nothing to report on this path.
            self.api.delete_message(chat_id, status_id).await?;
            self.api.delete_message(chat_id, message_id).await?;
            return Ok(());
        }

        let mut events = self.downloader.download(text).await?;
        while let Some(event) = events.recv().await {
            progress.update(&event).await?;
        }

        self.api.delete_message(chat_id, message_id).await?;
        Ok(())
    }
}
