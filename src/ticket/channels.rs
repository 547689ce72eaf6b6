use std::collections::HashMap;

use anyhow::{Context as _, Result};
use poise::serenity_prelude::{
    CacheHttp as _, ChannelId, ChannelType, Context as SerenityContext, CreateChannel, GetMessages,
    Message, PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, UserId,
};
use serenity::async_trait;
use tracing::debug;

use crate::config::{Config, TRANSCRIPT_PAGE_SIZE};
use crate::ticket::{
    tracker::TicketChannels,
    types::{TicketKind, TicketUser, TranscriptMessage},
};

pub const MEMBER_PERMISSIONS: Permissions = Permissions::VIEW_CHANNEL
    .union(Permissions::SEND_MESSAGES)
    .union(Permissions::READ_MESSAGE_HISTORY);

/// Discord-backed ticket channels: private text channels under the ticket category.
pub struct DiscordChannels<'a> {
    ctx: &'a SerenityContext,
    config: &'a Config,
}

impl<'a> DiscordChannels<'a> {
    pub fn new(ctx: &'a SerenityContext, config: &'a Config) -> Self {
        Self { ctx, config }
    }

    async fn is_staff(&self, user_id: UserId, cache: &mut HashMap<UserId, bool>) -> bool {
        if let Some(is_staff) = cache.get(&user_id) {
            return *is_staff;
        }

        let staff_role = self.config.staff_role_id;
        let cached = self
            .ctx
            .cache
            .member(self.config.guild_id, user_id)
            .map(|member| member.roles.contains(&staff_role));

        let is_staff = match cached {
            Some(is_staff) => is_staff,
            // members who left the guild count as non-staff
            None => self
                .config
                .guild_id
                .member(self.ctx, user_id)
                .await
                .is_ok_and(|member| member.roles.contains(&staff_role)),
        };

        cache.insert(user_id, is_staff);
        is_staff
    }
}

/// Channel name for a new ticket, e.g. `⭐promotion-alice`.
pub fn channel_name(kind: TicketKind, username: &str) -> String {
    let username: String = username
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(80)
        .collect();
    let username = if username.is_empty() {
        "user".to_string()
    } else {
        username
    };

    format!("{}{}-{}", kind.emoji(), kind.slug(), username)
}

/// Text kept for a message: its content, else the first embed's description.
pub fn transcript_content(content: &str, embed_description: Option<&str>) -> String {
    if !content.is_empty() {
        return content.to_string();
    }
    match embed_description {
        Some(description) if !description.is_empty() => description.to_string(),
        _ => "Embed/Attachment".to_string(),
    }
}

fn keep_in_transcript(message: &Message) -> bool {
    !message.author.bot || !message.embeds.is_empty()
}

#[async_trait]
impl TicketChannels for DiscordChannels<'_> {
    async fn open_channel(&self, owner: &TicketUser, kind: TicketKind) -> Result<ChannelId> {
        let guild_id = self.config.guild_id;

        let overwrites = [
            // @everyone shares the guild's ID
            PermissionOverwrite {
                allow: Permissions::empty(),
                deny: Permissions::VIEW_CHANNEL,
                kind: PermissionOverwriteType::Role(RoleId::new(guild_id.get())),
            },
            PermissionOverwrite {
                allow: MEMBER_PERMISSIONS,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Member(owner.id),
            },
            PermissionOverwrite {
                allow: MEMBER_PERMISSIONS | Permissions::MANAGE_MESSAGES,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Role(self.config.staff_role_id),
            },
        ];

        let channel = guild_id
            .create_channel(
                self.ctx,
                CreateChannel::new(channel_name(kind, &owner.username))
                    .kind(ChannelType::Text)
                    .category(self.config.category_id)
                    .topic(format!("{} ticket for {} ({})", kind.label(), owner.username, owner.id))
                    .permissions(overwrites),
            )
            .await
            .context("Failed to create ticket channel")?;

        Ok(channel.id)
    }

    async fn collect_transcript(&self, channel_id: ChannelId) -> Result<Vec<TranscriptMessage>> {
        let mut transcript = Vec::new();
        let mut staff_cache = HashMap::new();
        let mut before = None;

        loop {
            let mut request = GetMessages::new().limit(TRANSCRIPT_PAGE_SIZE);
            if let Some(message_id) = before {
                request = request.before(message_id);
            }

            let page = channel_id
                .messages(self.ctx.http(), request)
                .await
                .context("Failed to fetch ticket messages")?;

            let Some(oldest) = page.last() else {
                break;
            };
            before = Some(oldest.id);
            let page_len = page.len();

            // pages arrive newest first
            for message in page.iter().filter(|message| keep_in_transcript(message)) {
                let is_staff = self.is_staff(message.author.id, &mut staff_cache).await;
                transcript.push(TranscriptMessage {
                    id: message.id,
                    author: message.author.name.clone(),
                    content: transcript_content(
                        &message.content,
                        message
                            .embeds
                            .first()
                            .and_then(|embed| embed.description.as_deref()),
                    ),
                    timestamp: *message.timestamp,
                    is_staff,
                });
            }

            if page_len < usize::from(TRANSCRIPT_PAGE_SIZE) {
                break;
            }
        }

        transcript.reverse();
        debug!(
            "Collected {} transcript messages from channel {channel_id}",
            transcript.len()
        );

        Ok(transcript)
    }
}
