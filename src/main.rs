mod bot;
mod config;

use std::sync::Arc;

use teloxide::prelude::*;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use bot::{MessageHandler, TelegramClient, YtDlp};
use config::Config;

struct BotState {
    handler: MessageHandler<TelegramClient, YtDlp>,
    /// Downloads run one at a time; handling a message blocks until the
    /// previous one's download has finished.
    busy: Mutex<()>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = config.ensure_download_dir() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let bot = Bot::new(&config.telegram_token);
    let handler = MessageHandler::new(
        TelegramClient::new(bot.clone()),
        YtDlp::new(config.ytdlp_bin.clone(), config.download_dir.clone()),
    );
    let state = Arc::new(BotState {
        handler,
        busy: Mutex::new(()),
    });

    info!("Bot started (downloads to {})", config.download_dir.display());

    let tree = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, tree)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    let _busy = state.busy.lock().await;

    let text_preview: String = text.chars().take(100).collect();
    info!("Message {} from chat {}: \"{text_preview}\"", msg.id.0, msg.chat.id);

    if let Err(e) = state
        .handler
        .handle(msg.chat.id.0, i64::from(msg.id.0), &text)
        .await
    {
        warn!("Failed to handle message {}: {e}", msg.id.0);
    }

    Ok(())
}
