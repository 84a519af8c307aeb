use std::sync::Arc;

use guildbot_core::config::Config;
use guildbot_scraper::SnscrapeFetcher;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), guildbot_core::Error> {
    guildbot_core::logging::init("guildbot")?;

    let cfg = Config::load()?;
    info!(
        feeds = %cfg.feed_config_path.display(),
        interval_secs = cfg.poll_interval.as_secs(),
        "configuration loaded"
    );

    let fetcher = Arc::new(SnscrapeFetcher::new(cfg.snscrape_path.clone()));

    guildbot_discord::run(cfg, fetcher).await
}
