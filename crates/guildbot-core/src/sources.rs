//! File-backed feed source store.
//!
//! The sources live in a small JSON file next to the bot:
//!
//! ```json
//! { "accounts": { "some_handle": "123456789012345678" } }
//! ```
//!
//! keyed by feed handle, valued by the destination channel id. Channel ids
//! are strings in the file because they exceed what JSON numbers carry
//! losslessly everywhere.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::{
    domain::{ChannelId, FeedSource},
    errors::Error,
    ports::SourceStore,
    Result,
};

#[derive(Deserialize)]
struct SourceFile {
    #[serde(default)]
    accounts: std::collections::BTreeMap<String, String>,
}

/// Reads the source file from disk on every `load`, so edits take effect on
/// the next poll cycle without a restart.
pub struct JsonSourceStore {
    path: PathBuf,
}

impl JsonSourceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, raw: &str) -> Result<Vec<FeedSource>> {
        let file: SourceFile = serde_json::from_str(raw)?;
        let mut sources = Vec::with_capacity(file.accounts.len());
        for (handle, channel) in file.accounts {
            match channel.parse::<u64>() {
                Ok(id) => sources.push(FeedSource {
                    handle,
                    channel: ChannelId(id),
                }),
                Err(_) => {
                    warn!(handle = handle.as_str(), "skipping source with invalid channel id");
                }
            }
        }
        Ok(sources)
    }
}

#[async_trait]
impl SourceStore for JsonSourceStore {
    async fn load(&self) -> Result<Vec<FeedSource>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", self.path.display()))
        })?;
        self.parse(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("guildbot-sources-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn loads_handles_and_channels() {
        let path = tmp_file(
            "ok.json",
            r#"{ "accounts": { "alice": "111", "bob": "222" } }"#,
        );
        let store = JsonSourceStore::new(path);
        let sources = store.load().await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].handle, "alice");
        assert_eq!(sources[0].channel, ChannelId(111));
        assert_eq!(sources[1].handle, "bob");
        assert_eq!(sources[1].channel, ChannelId(222));
    }

    #[tokio::test]
    async fn skips_entries_with_bad_channel_ids() {
        let path = tmp_file(
            "bad-channel.json",
            r#"{ "accounts": { "alice": "111", "mallory": "not-a-channel" } }"#,
        );
        let store = JsonSourceStore::new(path);
        let sources = store.load().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].handle, "alice");
    }

    #[tokio::test]
    async fn missing_accounts_key_means_no_sources() {
        let path = tmp_file("empty.json", "{}");
        let store = JsonSourceStore::new(path);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_a_config_error() {
        let store = JsonSourceStore::new("/definitely/not/here/feeds.json");
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let path = tmp_file("broken.json", "{ this is not json");
        let store = JsonSourceStore::new(path);
        assert!(store.load().await.is_err());
    }
}
