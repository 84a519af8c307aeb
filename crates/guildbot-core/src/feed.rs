//! Periodic feed polling with per-source dedup cursors.
//!
//! One timer drives the whole engine. Every cycle re-reads the source list,
//! fetches the latest item per source under a hard timeout, and dispatches at
//! most one notification per new item id. Cursors live only in process
//! memory: a restart may re-notify the latest item once, which is accepted in
//! exchange for carrying no persistence layer.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    domain::FeedSource,
    errors::Error,
    formatting,
    ports::{ChatPort, FeedFetcher, SourceStore},
    Result,
};

pub struct FeedPoller {
    chat: Arc<dyn ChatPort>,
    fetcher: Arc<dyn FeedFetcher>,
    sources: Arc<dyn SourceStore>,
    poll_interval: Duration,
    fetch_timeout: Duration,
    text_limit: usize,
    // Last-notified item id per source handle. Single writer (the poll
    // cycle); never rolled back within a process run.
    cursors: Mutex<HashMap<String, String>>,
}

impl FeedPoller {
    pub fn new(
        chat: Arc<dyn ChatPort>,
        fetcher: Arc<dyn FeedFetcher>,
        sources: Arc<dyn SourceStore>,
        poll_interval: Duration,
        fetch_timeout: Duration,
        text_limit: usize,
    ) -> Self {
        Self {
            chat,
            fetcher,
            sources,
            poll_interval,
            fetch_timeout,
            text_limit,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// Poll until cancelled. The first cycle runs immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(interval_secs = self.poll_interval.as_secs(), "feed poller started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => self.run_cycle().await,
            }
        }
        info!("feed poller stopped");
    }

    /// One full poll cycle. A source-list load failure aborts the cycle; a
    /// failure in one source never blocks the others.
    pub async fn run_cycle(&self) {
        let sources = match self.sources.load().await {
            Ok(sources) => sources,
            Err(e) => {
                error!("failed to load feed sources, skipping cycle: {e}");
                return;
            }
        };

        for source in &sources {
            if let Err(e) = self.poll_source(source).await {
                warn!(handle = source.handle.as_str(), "source skipped this cycle: {e}");
            }
        }
    }

    async fn poll_source(&self, source: &FeedSource) -> Result<()> {
        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.fetcher.latest_item(&source.handle),
        )
        .await
        .map_err(|_| {
            Error::Fetch(format!(
                "timed out after {}s",
                self.fetch_timeout.as_secs()
            ))
        })??;

        let Some(item) = fetched else {
            return Err(Error::Fetch("feed returned no items".to_string()));
        };

        // Dedup + advance. The cursor moves *before* dispatch so a dispatch
        // failure drops at most this one notification instead of ever
        // duplicating it on a later cycle.
        {
            let mut cursors = self.cursors.lock().await;
            if cursors.get(&source.handle) == Some(&item.id) {
                debug!(handle = source.handle.as_str(), item = item.id.as_str(), "already notified");
                return Ok(());
            }
            cursors.insert(source.handle.clone(), item.id.clone());
        }

        let embed = formatting::feed_post(&source.handle, &item, self.text_limit);
        match self.chat.send_embed(source.channel, embed).await {
            Ok(_) => {
                info!(handle = source.handle.as_str(), item = item.id.as_str(), "relayed new post");
            }
            Err(e) => {
                // Cursor stays advanced: a skipped notification is preferred
                // over duplicate spam.
                warn!(
                    handle = source.handle.as_str(),
                    item = item.id.as_str(),
                    "notification dropped: {e}"
                );
            }
        }
        Ok(())
    }

    #[cfg(test)]
    async fn cursor_for(&self, handle: &str) -> Option<String> {
        self.cursors.lock().await.get(handle).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelId, FeedItem, GuildId, MessageId, OutgoingEmbed, RoleId, UserId};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct FakeChat {
        sent: StdMutex<Vec<(ChannelId, OutgoingEmbed)>>,
        fail_sends: bool,
    }

    impl FakeChat {
        fn new() -> Self {
            Self {
                sent: StdMutex::new(Vec::new()),
                fail_sends: false,
            }
        }

        fn sent(&self) -> Vec<(ChannelId, OutgoingEmbed)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatPort for FakeChat {
        async fn send_embed(&self, channel: ChannelId, embed: OutgoingEmbed) -> Result<MessageId> {
            if self.fail_sends {
                return Err(Error::Dispatch("channel unavailable".to_string()));
            }
            self.sent.lock().unwrap().push((channel, embed));
            Ok(MessageId(1))
        }

        async fn send_text(&self, _channel: ChannelId, _text: &str) -> Result<MessageId> {
            unimplemented!("not used by the poller")
        }

        async fn add_reaction(
            &self,
            _channel: ChannelId,
            _message: MessageId,
            _emoji: &str,
        ) -> Result<()> {
            unimplemented!("not used by the poller")
        }

        async fn role_by_name(&self, _guild: GuildId, _name: &str) -> Result<Option<RoleId>> {
            unimplemented!("not used by the poller")
        }

        async fn member_role_names(&self, _guild: GuildId, _user: UserId) -> Result<Vec<String>> {
            unimplemented!("not used by the poller")
        }

        async fn add_role(&self, _guild: GuildId, _user: UserId, _role: RoleId) -> Result<()> {
            unimplemented!("not used by the poller")
        }

        async fn remove_role(&self, _guild: GuildId, _user: UserId, _role: RoleId) -> Result<()> {
            unimplemented!("not used by the poller")
        }
    }

    /// Scripted per-handle fetch results.
    struct FakeFetcher {
        items: StdMutex<HashMap<String, Result<Option<FeedItem>>>>,
        fetches: StdMutex<Vec<String>>,
        hang_on: Option<String>,
    }

    impl FakeFetcher {
        fn new() -> Self {
            Self {
                items: StdMutex::new(HashMap::new()),
                fetches: StdMutex::new(Vec::new()),
                hang_on: None,
            }
        }

        fn set_item(&self, handle: &str, id: &str) {
            self.items.lock().unwrap().insert(
                handle.to_string(),
                Ok(Some(FeedItem {
                    id: id.to_string(),
                    url: format!("https://example.com/{handle}/status/{id}"),
                    text: format!("post {id}"),
                    posted_at: None,
                })),
            );
        }

        fn set_error(&self, handle: &str) {
            self.items.lock().unwrap().insert(
                handle.to_string(),
                Err(Error::Fetch("scrape failed".to_string())),
            );
        }
    }

    #[async_trait]
    impl FeedFetcher for FakeFetcher {
        async fn latest_item(&self, handle: &str) -> Result<Option<FeedItem>> {
            self.fetches.lock().unwrap().push(handle.to_string());
            if self.hang_on.as_deref() == Some(handle) {
                std::future::pending::<()>().await;
                unreachable!();
            }
            match self.items.lock().unwrap().get(handle) {
                Some(Ok(v)) => Ok(v.clone()),
                Some(Err(_)) => Err(Error::Fetch("scrape failed".to_string())),
                None => Ok(None),
            }
        }
    }

    struct FakeStore {
        sources: StdMutex<Result<Vec<FeedSource>>>,
    }

    impl FakeStore {
        fn with(sources: Vec<FeedSource>) -> Self {
            Self {
                sources: StdMutex::new(Ok(sources)),
            }
        }

        fn failing() -> Self {
            Self {
                sources: StdMutex::new(Err(Error::Config("unreadable".to_string()))),
            }
        }
    }

    #[async_trait]
    impl SourceStore for FakeStore {
        async fn load(&self) -> Result<Vec<FeedSource>> {
            match &*self.sources.lock().unwrap() {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(Error::Config("unreadable".to_string())),
            }
        }
    }

    fn source(handle: &str, channel: u64) -> FeedSource {
        FeedSource {
            handle: handle.to_string(),
            channel: ChannelId(channel),
        }
    }

    fn poller(
        chat: Arc<FakeChat>,
        fetcher: Arc<FakeFetcher>,
        store: Arc<FakeStore>,
    ) -> FeedPoller {
        FeedPoller::new(
            chat,
            fetcher,
            store,
            Duration::from_secs(300),
            Duration::from_secs(30),
            400,
        )
    }

    #[tokio::test]
    async fn first_cycle_notifies_once_and_sets_cursor() {
        let chat = Arc::new(FakeChat::new());
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_item("alice", "123");
        let store = Arc::new(FakeStore::with(vec![source("alice", 42)]));
        let p = poller(chat.clone(), fetcher.clone(), store);

        p.run_cycle().await;

        let sent = chat.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChannelId(42));
        assert_eq!(p.cursor_for("alice").await.as_deref(), Some("123"));

        // Same item again: zero notifications.
        p.run_cycle().await;
        assert_eq!(chat.sent().len(), 1);

        // A newer item advances the cursor and notifies once.
        fetcher.set_item("alice", "124");
        p.run_cycle().await;
        assert_eq!(chat.sent().len(), 2);
        assert_eq!(p.cursor_for("alice").await.as_deref(), Some("124"));
    }

    #[tokio::test]
    async fn failure_in_one_source_does_not_block_others() {
        let chat = Arc::new(FakeChat::new());
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_error("broken");
        fetcher.set_item("bob", "9");
        let store = Arc::new(FakeStore::with(vec![
            source("broken", 1),
            source("bob", 2),
        ]));
        let p = poller(chat.clone(), fetcher.clone(), store);

        p.run_cycle().await;

        let sent = chat.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChannelId(2));
        assert!(p.cursor_for("broken").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_fetch_times_out_and_other_sources_proceed() {
        let chat = Arc::new(FakeChat::new());
        let mut fetcher = FakeFetcher::new();
        fetcher.hang_on = Some("stuck".to_string());
        fetcher.set_item("carol", "7");
        let fetcher = Arc::new(fetcher);
        let store = Arc::new(FakeStore::with(vec![
            source("stuck", 1),
            source("carol", 2),
        ]));
        let p = poller(chat.clone(), fetcher.clone(), store);

        p.run_cycle().await;

        assert_eq!(chat.sent().len(), 1);
        assert!(p.cursor_for("stuck").await.is_none());
        assert_eq!(p.cursor_for("carol").await.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn dispatch_failure_keeps_cursor_advanced() {
        let mut raw = FakeChat::new();
        raw.fail_sends = true;
        let chat = Arc::new(raw);
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_item("alice", "123");
        let store = Arc::new(FakeStore::with(vec![source("alice", 42)]));
        let p = poller(chat.clone(), fetcher.clone(), store);

        p.run_cycle().await;

        // The notification was dropped, not retried: cursor stays at 123.
        assert_eq!(p.cursor_for("alice").await.as_deref(), Some("123"));
        assert!(chat.sent().is_empty());

        p.run_cycle().await;
        assert!(chat.sent().is_empty());
    }

    #[tokio::test]
    async fn source_list_load_failure_aborts_the_cycle() {
        let chat = Arc::new(FakeChat::new());
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_item("alice", "123");
        let store = Arc::new(FakeStore::failing());
        let p = poller(chat.clone(), fetcher.clone(), store);

        p.run_cycle().await;

        assert!(fetcher.fetches.lock().unwrap().is_empty());
        assert!(chat.sent().is_empty());
    }

    #[tokio::test]
    async fn empty_feed_is_a_fetch_failure_and_leaves_no_cursor() {
        let chat = Arc::new(FakeChat::new());
        let fetcher = Arc::new(FakeFetcher::new());
        let store = Arc::new(FakeStore::with(vec![source("quiet", 3)]));
        let p = poller(chat.clone(), fetcher, store);

        p.run_cycle().await;

        assert!(chat.sent().is_empty());
        assert!(p.cursor_for("quiet").await.is_none());
    }

    #[tokio::test]
    async fn removed_source_keeps_its_cursor_harmlessly() {
        let chat = Arc::new(FakeChat::new());
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_item("alice", "123");
        let store = Arc::new(FakeStore::with(vec![source("alice", 42)]));
        let p = poller(chat.clone(), fetcher.clone(), store.clone());

        p.run_cycle().await;
        assert_eq!(p.cursor_for("alice").await.as_deref(), Some("123"));

        *store.sources.lock().unwrap() = Ok(vec![]);
        p.run_cycle().await;
        assert_eq!(p.cursor_for("alice").await.as_deref(), Some("123"));
        assert_eq!(chat.sent().len(), 1);
    }
}
