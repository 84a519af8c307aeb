//! Gateway event handler. Wires serenity events into the core engines and
//! keeps every per-event failure out of the gateway loop.

use std::sync::{Arc, OnceLock};

use serenity::all::{Context, EventHandler, Interaction, Member, Reaction, Ready};
use serenity::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use guildbot_core::{
    config::Config,
    domain::{self, ReactionEvent},
    feed::FeedPoller,
    formatting,
    ports::{ChatPort, FeedFetcher},
    rolemap::{RoleMappings, SelfServiceRoles},
    rolesync::RoleSyncEngine,
    sources::JsonSourceStore,
};

use crate::{chat::DiscordChat, commands};

/// Everything the command handlers need, built once on the first ready event
/// (the HTTP client only exists once the gateway context does).
pub(crate) struct AppState {
    pub chat: Arc<DiscordChat>,
    pub rolesync: Arc<RoleSyncEngine>,
}

pub struct Handler {
    cfg: Config,
    fetcher: Arc<dyn FeedFetcher>,
    cancel: CancellationToken,
    state: OnceLock<Arc<AppState>>,
}

impl Handler {
    pub fn new(cfg: Config, fetcher: Arc<dyn FeedFetcher>, cancel: CancellationToken) -> Self {
        Self {
            cfg,
            fetcher,
            cancel,
            state: OnceLock::new(),
        }
    }

    async fn relay_reaction(&self, reaction: Reaction, added: bool) {
        let Some(state) = self.state.get() else {
            return;
        };
        // DMs and uncached users carry no guild/user id; role sync only makes
        // sense inside a guild anyway.
        let (Some(guild_id), Some(user_id)) = (reaction.guild_id, reaction.user_id) else {
            return;
        };

        let ev = ReactionEvent {
            guild_id: domain::GuildId(guild_id.get()),
            message_id: domain::MessageId(reaction.message_id.get()),
            user_id: domain::UserId(user_id.get()),
            emoji: reaction.emoji.to_string(),
            added,
        };
        if let Err(e) = state.rolesync.handle_reaction(&ev).await {
            warn!(user = ev.user_id.0, "reaction role sync failed: {e}");
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} connected to Discord", ready.user.name);

        let chat = Arc::new(DiscordChat::new(ctx.http.clone()));
        let rolesync = Arc::new(RoleSyncEngine::new(
            chat.clone(),
            RoleMappings::new(self.cfg.emoji_roles.clone()),
            SelfServiceRoles::new(self.cfg.role_options.clone()),
            self.cfg.tracked_message,
        ));
        rolesync.set_bot_user(domain::UserId(ready.user.id.get()));

        let state = Arc::new(AppState {
            chat: chat.clone(),
            rolesync,
        });
        if self.state.set(state).is_err() {
            // Reconnects re-deliver ready; everything is already running.
            return;
        }

        match commands::register_all(&ctx).await {
            Ok(count) => info!(count, "slash commands synced"),
            Err(e) => error!("slash command registration failed: {e}"),
        }

        let poller = Arc::new(FeedPoller::new(
            chat,
            self.fetcher.clone(),
            Arc::new(JsonSourceStore::new(self.cfg.feed_config_path.clone())),
            self.cfg.poll_interval,
            self.cfg.fetch_timeout,
            self.cfg.feed_text_limit,
        ));
        let cancel = self.cancel.clone();
        tokio::spawn(async move { poller.run(cancel).await });
    }

    async fn reaction_add(&self, _ctx: Context, reaction: Reaction) {
        self.relay_reaction(reaction, true).await;
    }

    async fn reaction_remove(&self, _ctx: Context, reaction: Reaction) {
        self.relay_reaction(reaction, false).await;
    }

    async fn guild_member_addition(&self, _ctx: Context, new_member: Member) {
        let Some(state) = self.state.get() else {
            return;
        };
        let guild = domain::GuildId(new_member.guild_id.get());
        let user = domain::UserId(new_member.user.id.get());

        let welcome = formatting::welcome_post(user, self.cfg.register_channel);
        if let Err(e) = state.chat.send_embed(self.cfg.welcome_channel, welcome).await {
            warn!(user = user.0, "welcome message failed: {e}");
        }

        // Default role is best effort: a deleted role must not break joins.
        if let Some(name) = &self.cfg.default_role_name {
            let grant = async {
                match state.chat.role_by_name(guild, name).await? {
                    Some(role) => state.chat.add_role(guild, user, role).await,
                    None => {
                        warn!(role = name.as_str(), "default role missing in guild");
                        Ok(())
                    }
                }
            };
            if let Err(e) = grant.await {
                warn!(user = user.0, "default role grant failed: {e}");
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(state) = self.state.get() else {
            return;
        };
        let result = match &interaction {
            Interaction::Command(cmd) => {
                commands::handle_command(state, &self.cfg, &ctx, cmd).await
            }
            Interaction::Component(comp) => {
                commands::handle_component(state, &ctx, comp).await
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            error!("interaction handling failed: {e}");
        }
    }
}
