//! snscrape subprocess adapter.
//!
//! Shells out to `snscrape --jsonl --max-results 1 twitter-user:<handle>`
//! and parses the single JSONL record it prints. The scraper is an external
//! Python tool; everything it misbehaves with (missing binary, rate limits,
//! layout changes upstream) surfaces as [`Error::Fetch`] so the poll engine
//! can isolate the failure to one source.

use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use chrono::DateTime;
use tokio::process::Command;
use tracing::debug;

use guildbot_core::{
    domain::FeedItem,
    errors::Error,
    ports::FeedFetcher,
    Result,
};

const STDERR_TAIL_MAX_CHARS: usize = 500;

pub struct SnscrapeFetcher {
    program: PathBuf,
}

impl SnscrapeFetcher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl FeedFetcher for SnscrapeFetcher {
    async fn latest_item(&self, handle: &str) -> Result<Option<FeedItem>> {
        let output = Command::new(&self.program)
            .arg("--jsonl")
            .arg("--max-results")
            .arg("1")
            .arg(format!("twitter-user:{handle}"))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::Fetch(format!("failed to spawn snscrape: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Fetch(format!(
                "snscrape exited with {}: {}",
                output.status,
                stderr_tail(&stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some(line) = stdout.lines().find(|l| !l.trim().is_empty()) else {
            debug!(handle, "snscrape produced no output");
            return Ok(None);
        };

        parse_item(line).map(Some)
    }
}

/// Parse one snscrape JSONL record into a feed item. The `id` field comes as
/// either a JSON number or a string depending on the snscrape version.
fn parse_item(line: &str) -> Result<FeedItem> {
    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| Error::Parse(format!("snscrape output is not JSON: {e}")))?;

    let id = match value.get("id") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => {
            return Err(Error::Parse(
                "snscrape record is missing the item id".to_string(),
            ))
        }
    };

    let url = value
        .get("url")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Parse("snscrape record is missing the item url".to_string()))?
        .to_string();

    let text = value
        .get("content")
        .or_else(|| value.get("renderedContent"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let posted_at = value
        .get("date")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.to_utc());

    Ok(FeedItem {
        id,
        url,
        text,
        posted_at,
    })
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.chars().count() <= STDERR_TAIL_MAX_CHARS {
        return trimmed.to_string();
    }
    let skip = trimmed.chars().count() - STDERR_TAIL_MAX_CHARS;
    trimmed.chars().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_record() {
        let line = r#"{
            "id": 1234567890,
            "url": "https://twitter.com/someone/status/1234567890",
            "content": "hello world",
            "date": "2023-05-01T12:00:00+00:00"
        }"#;
        let item = parse_item(line).unwrap();
        assert_eq!(item.id, "1234567890");
        assert_eq!(item.url, "https://twitter.com/someone/status/1234567890");
        assert_eq!(item.text, "hello world");
        assert!(item.posted_at.is_some());
    }

    #[test]
    fn accepts_string_ids() {
        let line = r#"{"id": "42", "url": "https://example.com/42"}"#;
        let item = parse_item(line).unwrap();
        assert_eq!(item.id, "42");
        assert_eq!(item.text, "");
        assert!(item.posted_at.is_none());
    }

    #[test]
    fn falls_back_to_rendered_content() {
        let line = r#"{"id": 1, "url": "https://example.com/1", "renderedContent": "rendered"}"#;
        assert_eq!(parse_item(line).unwrap().text, "rendered");
    }

    #[test]
    fn rejects_records_without_id_or_url() {
        assert!(parse_item(r#"{"url": "https://example.com/x"}"#).is_err());
        assert!(parse_item(r#"{"id": 5}"#).is_err());
        assert!(parse_item("not json at all").is_err());
    }

    #[test]
    fn invalid_dates_become_none() {
        let line = r#"{"id": 1, "url": "https://example.com/1", "date": "yesterday"}"#;
        assert!(parse_item(line).unwrap().posted_at.is_none());
    }

    #[test]
    fn stderr_tail_keeps_the_end() {
        let long = format!("{}THE-END", "a".repeat(600));
        let tail = stderr_tail(&long);
        assert_eq!(tail.chars().count(), STDERR_TAIL_MAX_CHARS);
        assert!(tail.ends_with("THE-END"));
        assert_eq!(stderr_tail("  short  "), "short");
    }

    #[tokio::test]
    async fn missing_binary_is_a_fetch_error() {
        let fetcher = SnscrapeFetcher::new("/definitely/not/a/real/snscrape");
        let err = fetcher.latest_item("someone").await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }
}
