//! Reaction-driven and menu-driven role assignment.
//!
//! The engine converts reaction events and select-menu submissions into
//! add/remove role calls through [`ChatPort`]. It never talks to the platform
//! directly and holds no mutable state besides the lazily learned bot user id,
//! so every operation can run concurrently with the feed poller.

use std::sync::{Arc, OnceLock};

use tracing::{debug, info, warn};

use crate::{
    domain::{ChannelId, GuildId, MessageId, ReactionEvent, UserId},
    errors::Error,
    formatting,
    ports::ChatPort,
    rolemap::{RoleMappings, SelfServiceRoles},
    Result,
};

pub struct RoleSyncEngine {
    chat: Arc<dyn ChatPort>,
    mappings: RoleMappings,
    self_service: SelfServiceRoles,
    tracked_message: Option<MessageId>,
    // Learned from the gateway ready event; reactions are ignored until then
    // so the bot's own prompt seeding can never trigger a grant.
    bot_user: OnceLock<UserId>,
}

impl RoleSyncEngine {
    pub fn new(
        chat: Arc<dyn ChatPort>,
        mappings: RoleMappings,
        self_service: SelfServiceRoles,
        tracked_message: Option<MessageId>,
    ) -> Self {
        if tracked_message.is_none() {
            warn!("REACTION_MESSAGE_ID is not set; reaction-based role sync is disabled");
        }
        Self {
            chat,
            mappings,
            self_service,
            tracked_message,
            bot_user: OnceLock::new(),
        }
    }

    pub fn set_bot_user(&self, user: UserId) {
        let _ = self.bot_user.set(user);
    }

    pub fn self_service(&self) -> &SelfServiceRoles {
        &self.self_service
    }

    /// Publish the reaction-role prompt to `channel` and seed one reaction per
    /// mapping entry, in insertion order.
    ///
    /// Returns the new message id so the operator can persist it as the
    /// tracked message. A failure after some reactions were attached is not
    /// rolled back; the partially seeded prompt stays and the operator can
    /// recreate it.
    pub async fn publish_prompt(
        &self,
        can_manage_roles: bool,
        channel: ChannelId,
    ) -> Result<MessageId> {
        if !can_manage_roles {
            return Err(Error::PermissionDenied("Manage Roles"));
        }

        let prompt = formatting::role_prompt(&self.mappings);
        let message = self.chat.send_embed(channel, prompt).await?;

        for (emoji, _) in self.mappings.iter() {
            self.chat.add_reaction(channel, message, emoji).await?;
        }

        info!(message_id = message.0, "published reaction-role prompt");
        Ok(message)
    }

    /// React to a reaction add/remove on the tracked message.
    ///
    /// Everything that does not line up (wrong message, the bot itself, an
    /// unmapped emoji, a role that no longer exists) is a silent no-op; this
    /// handler sits behind a failure-isolation boundary and its errors are
    /// logged by the caller, never propagated into the gateway loop.
    pub async fn handle_reaction(&self, ev: &ReactionEvent) -> Result<()> {
        let Some(tracked) = self.tracked_message else {
            return Ok(());
        };
        if ev.message_id != tracked {
            return Ok(());
        }
        match self.bot_user.get() {
            Some(bot) if *bot != ev.user_id => {}
            _ => return Ok(()),
        }
        let Some(role_name) = self.mappings.role_for(&ev.emoji) else {
            return Ok(());
        };
        let Some(role) = self.chat.role_by_name(ev.guild_id, role_name).await? else {
            debug!(role = role_name, "mapped role missing in guild, skipping");
            return Ok(());
        };

        if ev.added {
            self.chat.add_role(ev.guild_id, ev.user_id, role).await?;
            info!(user = ev.user_id.0, role = role_name, "granted role via reaction");
        } else {
            self.chat.remove_role(ev.guild_id, ev.user_id, role).await?;
            info!(user = ev.user_id.0, role = role_name, "revoked role via reaction");
        }
        Ok(())
    }

    /// Replace the member's self-service roles with `selection`.
    ///
    /// Removal happens before addition so nothing outside the new selection is
    /// left over. Selected names outside the self-service set are ignored
    /// (stale UI selections must never hard-fail), and names that no longer
    /// resolve to a role are skipped. Returns the applied set for
    /// confirmation messaging.
    pub async fn set_roles(
        &self,
        guild: GuildId,
        user: UserId,
        selection: &[String],
    ) -> Result<Vec<String>> {
        let held = self.chat.member_role_names(guild, user).await?;
        for name in held.iter().filter(|n| self.self_service.contains(n)) {
            if let Some(role) = self.chat.role_by_name(guild, name).await? {
                self.chat.remove_role(guild, user, role).await?;
            }
        }

        let mut applied = Vec::new();
        for name in selection {
            if !self.self_service.contains(name) {
                continue;
            }
            let Some(role) = self.chat.role_by_name(guild, name).await? else {
                debug!(role = name.as_str(), "selected role missing in guild, skipping");
                continue;
            };
            self.chat.add_role(guild, user, role).await?;
            applied.push(name.clone());
        }

        info!(user = user.0, roles = ?applied, "self-service roles replaced");
        Ok(applied)
    }

    /// Remove every self-service role the target currently holds. Operator
    /// action, gated on Manage Roles. Returns the removed names.
    pub async fn clear_roles(
        &self,
        can_manage_roles: bool,
        guild: GuildId,
        target: UserId,
    ) -> Result<Vec<String>> {
        if !can_manage_roles {
            return Err(Error::PermissionDenied("Manage Roles"));
        }

        let held = self.chat.member_role_names(guild, target).await?;
        let mut removed = Vec::new();
        for name in held.into_iter().filter(|n| self.self_service.contains(n)) {
            if let Some(role) = self.chat.role_by_name(guild, &name).await? {
                self.chat.remove_role(guild, target, role).await?;
                removed.push(name);
            }
        }

        info!(user = target.0, roles = ?removed, "self-service roles cleared");
        Ok(removed)
    }

    /// The self-service roles the member currently holds, for `/myroles`.
    pub async fn held_self_service(&self, guild: GuildId, user: UserId) -> Result<Vec<String>> {
        let held = self.chat.member_role_names(guild, user).await?;
        Ok(held
            .into_iter()
            .filter(|n| self.self_service.contains(n))
            .collect())
    }
}
