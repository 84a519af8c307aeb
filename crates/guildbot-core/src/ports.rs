use async_trait::async_trait;

use crate::{
    domain::{ChannelId, FeedItem, FeedSource, GuildId, MessageId, OutgoingEmbed, RoleId, UserId},
    Result,
};

/// Hexagonal port for the chat platform.
///
/// Discord is the first implementation; the shape is kept platform-neutral so
/// the engines can be exercised in tests without a live connection.
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Send an embed to a channel, returning the new message's id.
    async fn send_embed(&self, channel: ChannelId, embed: OutgoingEmbed) -> Result<MessageId>;

    /// Send a plain text message to a channel.
    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<MessageId>;

    /// Attach a reaction to a message. Used only during prompt publication.
    async fn add_reaction(&self, channel: ChannelId, message: MessageId, emoji: &str)
        -> Result<()>;

    /// Resolve a role by display name in a guild. `None` means the role does
    /// not exist (configuration drift, not an error).
    async fn role_by_name(&self, guild: GuildId, name: &str) -> Result<Option<RoleId>>;

    /// Display names of every role the member currently holds.
    async fn member_role_names(&self, guild: GuildId, user: UserId) -> Result<Vec<String>>;

    /// Grant a role. Idempotent: granting a role the member already holds
    /// must not error (Discord guarantees this).
    async fn add_role(&self, guild: GuildId, user: UserId, role: RoleId) -> Result<()>;

    /// Revoke a role. Idempotent: revoking a role the member lacks must not
    /// error (Discord guarantees this).
    async fn remove_role(&self, guild: GuildId, user: UserId, role: RoleId) -> Result<()>;
}

/// Port for fetching the most recent item of an external feed.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// The single most recent item for the handle, or `None` when the feed
    /// exists but has no items. The caller applies the timeout.
    async fn latest_item(&self, handle: &str) -> Result<Option<FeedItem>>;
}

/// Port for loading the configured feed sources.
///
/// Re-read at the start of every poll cycle so edits take effect without a
/// restart.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn load(&self) -> Result<Vec<FeedSource>>;
}
