use anyhow::Result;
use poise::CreateReply;

use crate::shared::Context;
use crate::ticket::embeds;

/// Get a link to the ticket dashboard
#[poise::command(slash_command)]
pub async fn dashboard(ctx: Context<'_>) -> Result<()> {
    let url = &ctx.data().config.dashboard_url;

    ctx.send(
        CreateReply::default()
            .embed(embeds::dashboard_embed(url))
            .components(embeds::dashboard_components(url))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}
