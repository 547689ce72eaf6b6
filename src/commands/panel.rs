use anyhow::{Context as _, Result, anyhow, bail};
use poise::CreateReply;
use tracing::info;

use crate::error::UserError;
use crate::shared::Context;
use crate::ticket::embeds;

/// Post the ticket panel in this channel
#[poise::command(
    slash_command,
    rename = "ticket-panel",
    guild_only,
    default_member_permissions = "MANAGE_CHANNELS",
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn ticket_panel(ctx: Context<'_>) -> Result<()> {
    let guild_id = ctx
        .guild_id()
        .context(UserError(anyhow!("Command must be run inside a guild")))?;
    let data = ctx.data();

    let server_config = data.db_handle.server_config(guild_id).await?;
    if server_config.is_none_or(|config| config.ticket_channel_id != ctx.channel_id()) {
        bail!(UserError(anyhow!(
            "This channel is not configured for tickets, run `/ticket-config` first"
        )));
    }

    ctx.send(
        CreateReply::default()
            .embed(embeds::panel_embed(data.config.panel_image_url.as_deref()))
            .components(embeds::panel_components()),
    )
    .await?;

    info!("{} posted the ticket panel in {}", ctx.author().name, ctx.channel_id());
    Ok(())
}
