//! [`ChatPort`] implementation over the serenity HTTP client.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    CreateEmbed, CreateEmbedFooter, CreateMessage, ReactionType, Timestamp,
};
use serenity::http::Http;

use guildbot_core::{
    domain::{ChannelId, GuildId, MessageId, OutgoingEmbed, RoleId, UserId},
    errors::Error,
    ports::ChatPort,
    Result,
};

pub struct DiscordChat {
    http: Arc<Http>,
}

impl DiscordChat {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn build_embed(embed: OutgoingEmbed) -> CreateEmbed {
    let mut out = CreateEmbed::new()
        .description(embed.body)
        .color(embed.color);
    if let Some(title) = embed.title {
        out = out.title(title);
    }
    if let Some(url) = embed.url {
        out = out.url(url);
    }
    if let Some(footer) = embed.footer {
        out = out.footer(CreateEmbedFooter::new(footer));
    }
    if let Some(ts) = embed.timestamp {
        // Out-of-range timestamps degrade to no timestamp rather than failing
        // the whole message.
        if let Ok(ts) = Timestamp::from_unix_timestamp(ts.timestamp()) {
            out = out.timestamp(ts);
        }
    }
    out
}

#[async_trait]
impl ChatPort for DiscordChat {
    async fn send_embed(&self, channel: ChannelId, embed: OutgoingEmbed) -> Result<MessageId> {
        let message = serenity::all::ChannelId::new(channel.0)
            .send_message(&self.http, CreateMessage::new().embed(build_embed(embed)))
            .await
            .map_err(|e| Error::Dispatch(format!("embed send failed: {e}")))?;
        Ok(MessageId(message.id.get()))
    }

    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<MessageId> {
        let message = serenity::all::ChannelId::new(channel.0)
            .send_message(&self.http, CreateMessage::new().content(text))
            .await
            .map_err(|e| Error::Dispatch(format!("message send failed: {e}")))?;
        Ok(MessageId(message.id.get()))
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<()> {
        self.http
            .create_reaction(
                serenity::all::ChannelId::new(channel.0),
                serenity::all::MessageId::new(message.0),
                &ReactionType::Unicode(emoji.to_string()),
            )
            .await
            .map_err(|e| Error::Dispatch(format!("reaction failed: {e}")))
    }

    async fn role_by_name(&self, guild: GuildId, name: &str) -> Result<Option<RoleId>> {
        let roles = self
            .http
            .get_guild_roles(serenity::all::GuildId::new(guild.0))
            .await
            .map_err(|e| Error::External(format!("role listing failed: {e}")))?;
        Ok(roles
            .iter()
            .find(|r| r.name == name)
            .map(|r| RoleId(r.id.get())))
    }

    async fn member_role_names(&self, guild: GuildId, user: UserId) -> Result<Vec<String>> {
        let member = self
            .http
            .get_member(
                serenity::all::GuildId::new(guild.0),
                serenity::all::UserId::new(user.0),
            )
            .await
            .map_err(|e| Error::External(format!("member lookup failed: {e}")))?;
        let roles = self
            .http
            .get_guild_roles(serenity::all::GuildId::new(guild.0))
            .await
            .map_err(|e| Error::External(format!("role listing failed: {e}")))?;

        Ok(roles
            .iter()
            .filter(|r| member.roles.contains(&r.id))
            .map(|r| r.name.clone())
            .collect())
    }

    async fn add_role(&self, guild: GuildId, user: UserId, role: RoleId) -> Result<()> {
        self.http
            .add_member_role(
                serenity::all::GuildId::new(guild.0),
                serenity::all::UserId::new(user.0),
                serenity::all::RoleId::new(role.0),
                Some("self-service role assignment"),
            )
            .await
            .map_err(|e| Error::External(format!("role grant failed: {e}")))
    }

    async fn remove_role(&self, guild: GuildId, user: UserId, role: RoleId) -> Result<()> {
        self.http
            .remove_member_role(
                serenity::all::GuildId::new(guild.0),
                serenity::all::UserId::new(user.0),
                serenity::all::RoleId::new(role.0),
                Some("self-service role assignment"),
            )
            .await
            .map_err(|e| Error::External(format!("role revoke failed: {e}")))
    }
}
