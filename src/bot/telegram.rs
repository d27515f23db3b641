//! Telegram client using teloxide.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::info;

/// Errors from chat operations.
#[derive(Debug)]
pub enum ChatError {
    /// The network call timed out (either our own send deadline or a
    /// transport-level timeout reported by the client).
    TimedOut,
    /// Any other failure from the Telegram API.
    Request(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut => write!(f, "telegram request timed out"),
            Self::Request(msg) => write!(f, "telegram request failed: {msg}"),
        }
    }
}

impl std::error::Error for ChatError {}

/// Chat operations the bot needs. Implemented by [`TelegramClient`] in
/// production and by a recording mock in tests.
pub trait ChatApi: Send + Sync {
    /// Send a message, optionally bounded by a deadline. Returns the new
    /// message's id.
    fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<i64, ChatError>> + Send;

    /// Edit an existing message in place.
    fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> impl Future<Output = Result<(), ChatError>> + Send;

    /// Delete a message.
    fn delete_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> impl Future<Output = Result<(), ChatError>> + Send;
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn map_request_error(e: RequestError) -> ChatError {
    match e {
        RequestError::Network(ref inner) if inner.is_timeout() => ChatError::TimedOut,
        other => ChatError::Request(other.to_string()),
    }
}

impl ChatApi for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<i64, ChatError> {
        let request = self.bot.send_message(ChatId(chat_id), text);

        let sent = match timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| ChatError::TimedOut)?,
            None => request.await,
        };

        sent.map(|msg| i64::from(msg.id.0)).map_err(map_request_error)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), ChatError> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), text)
            .await
            .map(|_| ())
            .map_err(map_request_error)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ChatError> {
        info!("Deleting message {} in chat {}", message_id, chat_id);

        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id as i32))
            .await
            .map(|_| ())
            .map_err(map_request_error)
    }
}

impl<T: ChatApi> ChatApi for std::sync::Arc<T> {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<i64, ChatError> {
        (**self).send_message(chat_id, text, timeout).await
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), ChatError> {
        (**self).edit_message_text(chat_id, message_id, text).await
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ChatError> {
        (**self).delete_message(chat_id, message_id).await
    }
}
