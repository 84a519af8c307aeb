use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    domain::{ChannelId, MessageId},
    errors::Error,
    Result,
};

/// Reference deployment mapping (reaction emoji -> role display name).
/// Overridable via `EMOJI_ROLE_MAP`.
const DEFAULT_EMOJI_ROLES: &[(&str, &str)] = &[
    ("🍤", "いのりちゃん推"),
    ("🐬", "JGP Queen"),
    ("😺", "ミケちゃん推"),
    ("🐺", "ひかるちゃん推"),
];

/// Typed configuration for the bot, loaded from environment variables
/// (with `.env` honored for local development).
#[derive(Clone, Debug)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub welcome_channel: ChannelId,
    pub register_channel: ChannelId,
    pub default_role_name: Option<String>,

    // Role sync
    pub role_options: Vec<String>,
    pub emoji_roles: Vec<(String, String)>,
    pub tracked_message: Option<MessageId>,

    // Feed relay
    pub feed_config_path: PathBuf,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub feed_text_limit: usize,
    pub snscrape_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let discord_token = env_str("DISCORD_TOKEN").unwrap_or_default();
        if discord_token.trim().len() < 50 {
            return Err(Error::Config(
                "DISCORD_TOKEN environment variable is missing or malformed".to_string(),
            ));
        }

        let welcome_channel = ChannelId(require_u64("WELCOME_CHANNEL_ID")?);
        let register_channel = ChannelId(require_u64("REGISTER_CHANNEL_ID")?);
        let default_role_name = env_str("DEFAULT_ROLE_NAME").and_then(non_empty);

        let role_options = parse_csv(env_str("ROLE_OPTIONS"));
        if role_options.is_empty() {
            return Err(Error::Config(
                "ROLE_OPTIONS environment variable is required".to_string(),
            ));
        }

        let emoji_roles = match env_str("EMOJI_ROLE_MAP").and_then(non_empty) {
            Some(raw) => parse_emoji_roles(&raw)?,
            None => DEFAULT_EMOJI_ROLES
                .iter()
                .map(|(e, r)| (e.to_string(), r.to_string()))
                .collect(),
        };

        // 0 means "not configured yet" (the id is only known after the prompt
        // message has been published once).
        let tracked_message = env_u64("REACTION_MESSAGE_ID")
            .filter(|id| *id != 0)
            .map(MessageId);

        let feed_config_path =
            PathBuf::from(env_str("FEED_CONFIG").unwrap_or("feeds.json".to_string()));
        let poll_interval =
            Duration::from_secs(env_u64("FEED_POLL_INTERVAL_SECS").unwrap_or(300).max(1));
        let fetch_timeout =
            Duration::from_secs(env_u64("FEED_FETCH_TIMEOUT_SECS").unwrap_or(30).max(1));
        let feed_text_limit = env_usize("FEED_TEXT_LIMIT").unwrap_or(400);

        let snscrape_path = env_path("SNSCRAPE_PATH")
            .or_else(|| which_in_path("snscrape"))
            .unwrap_or_else(|| PathBuf::from("snscrape"));

        Ok(Self {
            discord_token,
            welcome_channel,
            register_channel,
            default_role_name,
            role_options,
            emoji_roles,
            tracked_message,
            feed_config_path,
            poll_interval,
            fetch_timeout,
            feed_text_limit,
            snscrape_path,
        })
    }
}

/// Parse `EMOJI_ROLE_MAP` entries of the form `emoji=Role Name,emoji=Role Name`.
fn parse_emoji_roles(raw: &str) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some((emoji, role)) = entry.split_once('=') else {
            return Err(Error::Config(format!(
                "EMOJI_ROLE_MAP entry missing '=': {entry}"
            )));
        };
        let emoji = emoji.trim();
        let role = role.trim();
        if emoji.is_empty() || role.is_empty() {
            return Err(Error::Config(format!(
                "EMOJI_ROLE_MAP entry has an empty side: {entry}"
            )));
        }
        out.push((emoji.to_string(), role.to_string()));
    }
    if out.is_empty() {
        return Err(Error::Config("EMOJI_ROLE_MAP has no entries".to_string()));
    }
    Ok(out)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn require_u64(key: &str) -> Result<u64> {
    env_u64(key).ok_or_else(|| {
        Error::Config(format!(
            "{key} environment variable is required and must be numeric"
        ))
    })
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn which_in_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    for dir in env::split_paths(&path) {
        let candidate = dir.join(binary);
        if is_executable_file(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable_file(p: &Path) -> bool {
    if !p.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(md) = fs::metadata(p) {
            return (md.permissions().mode() & 0o111) != 0;
        }
    }
    true
}
