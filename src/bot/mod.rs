//! Bot module - relays URLs from Telegram messages to yt-dlp and reports
//! progress back by editing a status message.

pub mod handler;
pub mod progress;
pub mod telegram;
pub mod url;
pub mod ytdlp;


pub use handler::MessageHandler;
pub use telegram::TelegramClient;
pub use ytdlp::YtDlp;
