//! Client construction and lifecycle.

use std::sync::Arc;

use serenity::all::{Client, GatewayIntents};
use tokio_util::sync::CancellationToken;
use tracing::info;

use guildbot_core::{config::Config, errors::Error, ports::FeedFetcher, Result};

use crate::handler::Handler;

/// Connect to the gateway and run until the process is told to stop.
///
/// Blocks until the client shuts down. Ctrl-C cancels the feed poller and
/// closes the gateway connection.
pub async fn run(cfg: Config, fetcher: Arc<dyn FeedFetcher>) -> Result<()> {
    // GUILD_MEMBERS and the reaction intent must also be enabled in the
    // Discord developer portal.
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let cancel = CancellationToken::new();
    let handler = Handler::new(cfg.clone(), fetcher, cancel.clone());

    let mut client = Client::builder(&cfg.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| Error::External(format!("client construction failed: {e}")))?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            cancel.cancel();
            shard_manager.shutdown_all().await;
        }
    });

    info!("starting Discord client");
    client
        .start()
        .await
        .map_err(|e| Error::External(format!("client error: {e}")))
}
