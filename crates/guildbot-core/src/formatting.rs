//! Embed composition and text helpers shared by the engines and the
//! command handlers.

use crate::{
    domain::{ChannelId, FeedItem, OutgoingEmbed, UserId},
    rolemap::RoleMappings,
};

pub const COLOR_BLUE: u32 = 0x3498db;
pub const COLOR_GOLD: u32 = 0xf1c40f;
pub const COLOR_GREEN: u32 = 0x2ecc71;
pub const COLOR_BLURPLE: u32 = 0x5865f2;

pub fn channel_mention(channel: ChannelId) -> String {
    format!("<#{}>", channel.0)
}

pub fn user_mention(user: UserId) -> String {
    format!("<@{}>", user.0)
}

/// Truncate to at most `max` characters, appending an ellipsis marker when
/// anything was cut. Char-based, never splits a code point.
pub fn truncate_text(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

/// The reaction-role prompt: one `emoji → role` line per mapping entry, in
/// insertion order.
pub fn role_prompt(mappings: &RoleMappings) -> OutgoingEmbed {
    let body = mappings
        .iter()
        .map(|(emoji, role)| format!("{emoji} → {role}"))
        .collect::<Vec<_>>()
        .join("\n");

    OutgoingEmbed {
        title: Some("📌 Role selection".to_string()),
        body,
        color: COLOR_BLUE,
        footer: Some(
            "React below to pick up a role, or use /register for the selection menu.".to_string(),
        ),
        ..Default::default()
    }
}

/// Notification for a new feed item, body capped at `text_limit` characters.
pub fn feed_post(handle: &str, item: &FeedItem, text_limit: usize) -> OutgoingEmbed {
    OutgoingEmbed {
        title: Some(format!("🐤 New post from @{handle}")),
        body: truncate_text(&item.text, text_limit),
        url: Some(item.url.clone()),
        color: COLOR_BLUE,
        footer: Some("Powered by snscrape".to_string()),
        timestamp: item.posted_at,
    }
}

/// Welcome embed for a newly joined member, pointing at the register channel.
pub fn welcome_post(member: UserId, register_channel: ChannelId) -> OutgoingEmbed {
    OutgoingEmbed {
        title: Some("🎉 Welcome!".to_string()),
        body: format!(
            "Welcome {}! Head over to {} and use /register to pick your roles.",
            user_mention(member),
            channel_mention(register_channel),
        ),
        color: COLOR_GOLD,
        ..Default::default()
    }
}
