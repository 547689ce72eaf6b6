use anyhow::{Context as _, Result, anyhow};
use chrono::Utc;
use poise::{
    CreateReply,
    serenity_prelude::{ChannelId, Mentionable as _},
};
use tracing::info;

use crate::error::UserError;
use crate::shared::{Context, types::ServerConfig};
use crate::ticket::embeds;

/// Choose the channel where the ticket panel is posted
#[poise::command(
    slash_command,
    rename = "ticket-config",
    guild_only,
    default_member_permissions = "MANAGE_CHANNELS",
    required_permissions = "MANAGE_CHANNELS"
)]
pub async fn ticket_config(
    ctx: Context<'_>,
    #[rename = "canal"]
    #[description = "Channel for the ticket panel"]
    channel: ChannelId,
) -> Result<()> {
    let guild_id = ctx
        .guild_id()
        .context(UserError(anyhow!("Command must be run inside a guild")))?;
    let db = &ctx.data().db_handle;

    let now = Utc::now();
    let configured_at = db
        .server_config(guild_id)
        .await?
        .map_or(now, |existing| existing.configured_at);

    db.set_server_config(
        guild_id,
        ServerConfig {
            ticket_channel_id: channel,
            configured_by: ctx.author().id,
            configured_at,
            updated_at: None,
        },
    )
    .await?;

    info!("{} set the ticket channel of {guild_id} to {channel}", ctx.author().name);
    ctx.send(
        CreateReply::default()
            .embed(embeds::notice_embed(format!(
                "Ticket channel set to {}. Run `/ticket-panel` to post the panel there.",
                channel.mention()
            )))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}
