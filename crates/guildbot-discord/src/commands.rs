//! Slash command definitions and dispatch.
//!
//! Engine failures in user-triggered operations never propagate past this
//! layer: every outcome, success or failure, is turned into an ephemeral
//! reply by the pure `*_reply` builders, and the underlying error is logged
//! here. Only failures to deliver the reply itself bubble up.

use serenity::all::{
    Command, CommandDataOptionValue, CommandInteraction, CommandOptionType,
    ComponentInteraction, ComponentInteractionDataKind, Context, CreateCommand,
    CreateCommandOption, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateSelectMenu, CreateSelectMenuKind,
    CreateSelectMenuOption, Permissions,
};
use tracing::{error, info};

use guildbot_core::{
    config::Config,
    domain,
    errors::Error,
    formatting,
    ports::ChatPort,
    Result,
};

use crate::handler::AppState;

const ROLE_SELECT_ID: &str = "role_select";

// Discord caps string select menus at 25 options.
const SELECT_MENU_MAX_OPTIONS: usize = 25;

/// Register the global slash command set, returning how many were synced.
pub(crate) async fn register_all(ctx: &Context) -> Result<usize> {
    let commands = vec![
        CreateCommand::new("register").description("Pick your self-service roles"),
        CreateCommand::new("myroles").description("Show the self-service roles you hold"),
        CreateCommand::new("reset_roles")
            .description("Remove a member's self-service roles (moderators only)")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "member", "Member to reset")
                    .required(true),
            ),
        CreateCommand::new("say")
            .description("Post a message as the bot (moderators only)")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "message", "Text to post")
                    .required(true),
            ),
        CreateCommand::new("rolemenu")
            .description("Publish the reaction-role prompt here (moderators only)"),
    ];

    let synced = Command::set_global_commands(&ctx.http, commands)
        .await
        .map_err(|e| Error::External(format!("command registration failed: {e}")))?;
    Ok(synced.len())
}

pub(crate) async fn handle_command(
    state: &AppState,
    cfg: &Config,
    ctx: &Context,
    cmd: &CommandInteraction,
) -> Result<()> {
    match cmd.data.name.as_str() {
        "register" => register(state, cfg, ctx, cmd).await,
        "myroles" => myroles(state, ctx, cmd).await,
        "reset_roles" => reset_roles(state, ctx, cmd).await,
        "say" => say(state, ctx, cmd).await,
        "rolemenu" => rolemenu(state, ctx, cmd).await,
        other => {
            info!(command = other, "ignoring unknown command");
            Ok(())
        }
    }
}

/// The selection-menu submission from `/register`.
pub(crate) async fn handle_component(
    state: &AppState,
    ctx: &Context,
    comp: &ComponentInteraction,
) -> Result<()> {
    if comp.data.custom_id != ROLE_SELECT_ID {
        return Ok(());
    }
    let ComponentInteractionDataKind::StringSelect { values } = &comp.data.kind else {
        return Ok(());
    };
    let Some(guild) = comp.guild_id else {
        return Ok(());
    };

    let result = state
        .rolesync
        .set_roles(
            domain::GuildId(guild.get()),
            domain::UserId(comp.user.id.get()),
            values,
        )
        .await;
    if let Err(e) = &result {
        error!(user = comp.user.id.get(), "role selection failed: {e}");
    }

    comp.create_response(
        &ctx.http,
        CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(selection_reply(&result))
                .ephemeral(true),
        ),
    )
    .await
    .map_err(|e| Error::Dispatch(format!("component response failed: {e}")))
}

async fn register(
    state: &AppState,
    cfg: &Config,
    ctx: &Context,
    cmd: &CommandInteraction,
) -> Result<()> {
    if cmd.guild_id.is_none() {
        return respond_ephemeral(ctx, cmd, "This command only works inside a server.").await;
    }
    if cmd.channel_id.get() != cfg.register_channel.0 {
        let hint = format!(
            "Please use this command in {}.",
            formatting::channel_mention(cfg.register_channel)
        );
        return respond_ephemeral(ctx, cmd, hint).await;
    }

    let options: Vec<CreateSelectMenuOption> = state
        .rolesync
        .self_service()
        .iter()
        .take(SELECT_MENU_MAX_OPTIONS)
        .map(|name| CreateSelectMenuOption::new(name, name))
        .collect();
    let count = options.len() as u8;
    let menu = CreateSelectMenu::new(ROLE_SELECT_ID, CreateSelectMenuKind::String { options })
        .placeholder("Pick your roles")
        .min_values(1)
        .max_values(count);

    cmd.create_response(
        &ctx.http,
        CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content("Choose the roles you want. Your previous selection is replaced.")
                .select_menu(menu)
                .ephemeral(true),
        ),
    )
    .await
    .map_err(|e| Error::Dispatch(format!("register response failed: {e}")))
}

async fn myroles(state: &AppState, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    let Some(guild) = cmd.guild_id else {
        return respond_ephemeral(ctx, cmd, "This command only works inside a server.").await;
    };

    let result = state
        .rolesync
        .held_self_service(
            domain::GuildId(guild.get()),
            domain::UserId(cmd.user.id.get()),
        )
        .await;
    if let Err(e) = &result {
        error!(user = cmd.user.id.get(), "role lookup failed: {e}");
    }
    respond_ephemeral(ctx, cmd, held_roles_reply(&result)).await
}

async fn reset_roles(state: &AppState, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    let Some(guild) = cmd.guild_id else {
        return respond_ephemeral(ctx, cmd, "This command only works inside a server.").await;
    };
    let Some(target) = first_user_value(cmd.data.options.iter().map(|o| &o.value)) else {
        return respond_ephemeral(ctx, cmd, "Missing the member to reset.").await;
    };

    let result = state
        .rolesync
        .clear_roles(
            has_manage_roles(member_permissions(cmd)),
            domain::GuildId(guild.get()),
            target,
        )
        .await;
    if let Err(e) = &result {
        if !matches!(e, Error::PermissionDenied(_)) {
            error!(target = target.0, "role reset failed: {e}");
        }
    }
    respond_ephemeral(ctx, cmd, reset_reply(&result)).await
}

async fn say(state: &AppState, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    if !has_manage_messages(member_permissions(cmd)) {
        return respond_ephemeral(ctx, cmd, "You need the Manage Messages permission.").await;
    }
    let Some(text) = first_string_value(cmd.data.options.iter().map(|o| &o.value)) else {
        return respond_ephemeral(ctx, cmd, "Missing the message text.").await;
    };

    let result = state
        .chat
        .send_text(domain::ChannelId(cmd.channel_id.get()), &text)
        .await;
    if let Err(e) = &result {
        error!("relay failed: {e}");
    }
    respond_ephemeral(ctx, cmd, say_reply(&result)).await
}

async fn rolemenu(state: &AppState, ctx: &Context, cmd: &CommandInteraction) -> Result<()> {
    if !has_manage_roles(member_permissions(cmd)) {
        return respond_ephemeral(ctx, cmd, "You need the Manage Roles permission.").await;
    }

    // Publishing seeds one reaction per mapping entry, which can take a
    // moment; defer so the interaction does not time out. Once deferred, the
    // followup must always go out or the requester is stuck on "thinking".
    cmd.defer_ephemeral(&ctx.http)
        .await
        .map_err(|e| Error::Dispatch(format!("defer failed: {e}")))?;

    let result = state
        .rolesync
        .publish_prompt(true, domain::ChannelId(cmd.channel_id.get()))
        .await;
    if let Err(e) = &result {
        error!("prompt publication failed: {e}");
    }

    cmd.create_followup(
        &ctx.http,
        CreateInteractionResponseFollowup::new().content(rolemenu_reply(&result)),
    )
    .await
    .map_err(|e| Error::Dispatch(format!("followup failed: {e}")))?;
    Ok(())
}

fn selection_reply(result: &Result<Vec<String>>) -> String {
    match result {
        Ok(applied) if applied.is_empty() => "Your self-service roles were cleared.".to_string(),
        Ok(applied) => format!("Your roles are now: {}", applied.join(", ")),
        Err(_) => "Something went wrong applying your selection, please try again.".to_string(),
    }
}

fn held_roles_reply(result: &Result<Vec<String>>) -> String {
    match result {
        Ok(held) if held.is_empty() => {
            "You hold no self-service roles. Use /register to pick some.".to_string()
        }
        Ok(held) => format!("Your self-service roles: {}", held.join(", ")),
        Err(_) => "Something went wrong looking up your roles, please try again.".to_string(),
    }
}

fn reset_reply(result: &Result<Vec<String>>) -> String {
    match result {
        Ok(removed) if removed.is_empty() => {
            "That member holds no self-service roles.".to_string()
        }
        Ok(removed) => format!("Removed: {}", removed.join(", ")),
        Err(Error::PermissionDenied(perm)) => format!("You need the {perm} permission."),
        Err(_) => "Something went wrong resetting those roles, please try again.".to_string(),
    }
}

fn say_reply(result: &Result<domain::MessageId>) -> String {
    match result {
        Ok(_) => "Message sent.".to_string(),
        Err(_) => "Could not post the message, please try again.".to_string(),
    }
}

fn rolemenu_reply(result: &Result<domain::MessageId>) -> String {
    match result {
        Ok(message) => format!(
            "Prompt published. Set REACTION_MESSAGE_ID={} and restart to track it.",
            message.0
        ),
        Err(_) => {
            "Publishing the prompt failed partway; check the channel before retrying.".to_string()
        }
    }
}

fn member_permissions(cmd: &CommandInteraction) -> Option<Permissions> {
    cmd.member.as_ref().and_then(|m| m.permissions)
}

fn has_manage_roles(perms: Option<Permissions>) -> bool {
    perms.map(|p| p.manage_roles()).unwrap_or(false)
}

fn has_manage_messages(perms: Option<Permissions>) -> bool {
    perms.map(|p| p.manage_messages()).unwrap_or(false)
}

fn first_user_value<'a, I>(values: I) -> Option<domain::UserId>
where
    I: IntoIterator<Item = &'a CommandDataOptionValue>,
{
    values.into_iter().find_map(|v| match v {
        CommandDataOptionValue::User(id) => Some(domain::UserId(id.get())),
        _ => None,
    })
}

fn first_string_value<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a CommandDataOptionValue>,
{
    values.into_iter().find_map(|v| match v {
        CommandDataOptionValue::String(s) => Some(s.clone()),
        _ => None,
    })
}

async fn respond_ephemeral(
    ctx: &Context,
    cmd: &CommandInteraction,
    content: impl Into<String>,
) -> Result<()> {
    cmd.create_response(
        &ctx.http,
        CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(content)
                .ephemeral(true),
        ),
    )
    .await
    .map_err(|e| Error::Dispatch(format!("interaction response failed: {e}")))
}
