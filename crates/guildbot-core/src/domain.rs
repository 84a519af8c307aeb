use chrono::{DateTime, Utc};

/// Discord guild id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GuildId(pub u64);

/// Discord channel id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

/// Discord user id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

/// Discord message id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub u64);

/// Discord role id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RoleId(pub u64);

/// A reaction add/remove event, reduced to what role sync needs.
#[derive(Clone, Debug)]
pub struct ReactionEvent {
    pub guild_id: GuildId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: String,
    pub added: bool,
}

/// One configured feed source: which account to watch and where its posts go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedSource {
    pub handle: String,
    pub channel: ChannelId,
}

/// A single decoded feed item (the most recent post for a source).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedItem {
    pub id: String,
    pub url: String,
    pub text: String,
    pub posted_at: Option<DateTime<Utc>>,
}

/// Platform-neutral outgoing embed. The Discord adapter translates this into
/// the wire format; the core only composes it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutgoingEmbed {
    pub title: Option<String>,
    pub body: String,
    pub url: Option<String>,
    pub color: u32,
    pub footer: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}
