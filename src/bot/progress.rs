//! Download progress formatting and rate-limited status-message edits.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::bot::telegram::{ChatApi, ChatError};

/// Minimum interval between status-message edits. Telegram rate-limits
/// message edits, and yt-dlp reports progress far more often than once a
/// second.
const EDIT_INTERVAL: Duration = Duration::from_secs(1);

/// A progress report from the downloader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Downloading { percent: String },
    Finished,
    Error { message: String },
    /// Any status tag we don't recognise.
    Other { status: String },
}

/// Format a progress event into the text shown to the user.
pub fn format_progress(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Downloading { percent } => format!("Downloading: {percent} complete"),
        ProgressEvent::Finished => "Download complete".to_string(),
        ProgressEvent::Error { message } => format!("Error: {message}"),
        ProgressEvent::Other { status } => format!("Unknown status: {status}"),
    }
}

/// Pushes progress events into one status message, throttled to at most one
/// edit per [`EDIT_INTERVAL`] and skipping edits whose text matches the last
/// one sent.
///
/// One reporter exists per handled message and is dropped when handling
/// completes.
pub struct ProgressReporter<'a, C: ChatApi> {
    api: &'a C,
    chat_id: i64,
    /// The status message this reporter edits in place.
    message_id: i64,
    last_edit: Option<Instant>,
    last_text: Option<String>,
}

impl<'a, C: ChatApi> ProgressReporter<'a, C> {
    pub fn new(api: &'a C, chat_id: i64, message_id: i64) -> Self {
        Self {
            api,
            chat_id,
            message_id,
            last_edit: None,
            last_text: None,
        }
    }

    /// Handle one progress event, editing the status message if the throttle
    /// and dedup gates both pass.
    ///
    /// A repeated identical status does not refresh the throttle window. An
    /// edit that times out is dropped silently; the user just misses one
    /// update. Any other chat error propagates.
    pub async fn update(&mut self, event: &ProgressEvent) -> Result<(), ChatError> {
        if let Some(last) = self.last_edit {
            if last.elapsed() <= EDIT_INTERVAL {
                return Ok(());
            }
        }

        let text = format_progress(event);
        if self.last_text.as_deref() == Some(text.as_str()) {
            return Ok(());
        }

        self.last_edit = Some(Instant::now());
        self.last_text = Some(text.clone());

        match self
            .api
            .edit_message_text(self.chat_id, self.message_id, &text)
            .await
        {
            Ok(()) => Ok(()),
            Err(ChatError::TimedOut) => {
                debug!("Progress edit timed out, skipping update: {text}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
