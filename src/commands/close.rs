use std::sync::atomic::Ordering;

use anyhow::{Context as _, Result};
use poise::{ApplicationContext, serenity_prelude::CreateInteractionResponse};

use crate::shared::BotData;
use crate::ticket::interaction::{PREFIX, ensure_owner_or_staff, modal::CloseReason, ticket_in_channel};

/// Close the ticket in this channel
#[poise::command(slash_command, rename = "close-ticket", guild_only)]
pub async fn close_ticket(ctx: ApplicationContext<'_, BotData, anyhow::Error>) -> Result<()> {
    let data = poise::Context::Application(ctx).data();
    let interaction = ctx.interaction;

    let ticket = ticket_in_channel(data, interaction.channel_id).await?;
    ensure_owner_or_staff(
        interaction.user.id,
        interaction.member.as_deref(),
        &ticket,
        data.config.staff_role_id,
    )?;

    // the reason is collected by the same modal as the close button
    interaction
        .create_response(
            ctx.serenity_context,
            CreateInteractionResponse::Modal(CloseReason::create(PREFIX)),
        )
        .await
        .context("Failed to open the close reason modal")?;
    ctx.has_sent_initial_response.store(true, Ordering::SeqCst);

    Ok(())
}
