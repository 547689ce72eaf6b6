use std::{sync::LazyLock, time::Duration};

use anyhow::{Context as _, Result, anyhow, bail};
use either::Either;
use poise::serenity_prelude::{
    CacheHttp as _, ChannelId, ComponentInteraction, ComponentInteractionDataKind,
    Context as SerenityContext, CreateMessage, EditChannel, Member, Mentionable as _,
    ModalInteraction, PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, UserId,
};
use regex::Regex;
use tracing::{error, info};

use crate::config::CHANNEL_DELETE_DELAY_SECS;
use crate::error::UserError;
use crate::maintenance;
use crate::shared::{
    BotData,
    respond::{Reply, Responder},
};
use crate::ticket::{
    TicketError,
    channels::{DiscordChannels, MEMBER_PERMISSIONS},
    embeds,
    types::{ActiveTicket, TicketKind, TicketUser},
};

pub mod modal;

pub const PREFIX: &str = "ticket";

static USER_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:<@!?)?(\d{17,20})>?$").unwrap());

pub async fn handle_interaction(
    ctx: &SerenityContext,
    data: &BotData,
    interaction: Either<&ComponentInteraction, &ModalInteraction>,
    action: impl Iterator<Item = &str>,
) -> Result<()> {
    match interaction {
        Either::Left(component_interaction) => {
            info!(
                "{} triggered component interaction: '{}'",
                component_interaction.user.name, component_interaction.data.custom_id
            );
            component(ctx, data, component_interaction, action).await
        }
        Either::Right(modal_interaction) => {
            info!(
                "{} triggered modal interaction: '{}'",
                modal_interaction.user.name, modal_interaction.data.custom_id
            );
            modal(ctx, data, modal_interaction, action).await
        }
    }
}

async fn component(
    ctx: &SerenityContext,
    data: &BotData,
    interaction: &ComponentInteraction,
    mut action: impl Iterator<Item = &str>,
) -> Result<()> {
    let mut responder = Responder::new(ctx, Either::Left(interaction));
    let staff_role = data.config.staff_role_id;

    match action.next().unwrap_or_default() {
        "select" => open_ticket(ctx, data, interaction, &mut responder).await,
        "close" => {
            let ticket = ticket_in_channel(data, interaction.channel_id).await?;
            ensure_owner_or_staff(interaction.user.id, interaction.member.as_ref(), &ticket, staff_role)?;

            responder.open_modal(modal::CloseReason::create(PREFIX)).await
        }
        "claim" => {
            ensure_staff(interaction.member.as_ref(), staff_role, "claim tickets")?;
            ticket_in_channel(data, interaction.channel_id).await?;

            info!("{} claimed ticket channel {}", interaction.user.name, interaction.channel_id);
            responder
                .send(Reply::new().embed(embeds::claimed_embed(&interaction.user)))
                .await
        }
        "add_member" => {
            ensure_staff(interaction.member.as_ref(), staff_role, "add members")?;
            ticket_in_channel(data, interaction.channel_id).await?;

            responder.open_modal(modal::AddMember::create(PREFIX)).await
        }
        "remove_member" => {
            ensure_staff(interaction.member.as_ref(), staff_role, "remove members")?;
            ticket_in_channel(data, interaction.channel_id).await?;

            responder.open_modal(modal::RemoveMember::create(PREFIX)).await
        }
        "rename" => {
            ensure_staff(interaction.member.as_ref(), staff_role, "rename tickets")?;
            ticket_in_channel(data, interaction.channel_id).await?;

            let current_name = interaction
                .channel
                .as_ref()
                .and_then(|channel| channel.name.clone())
                .unwrap_or_default();
            responder
                .open_modal(modal::RenameTicket::create_prefilled(PREFIX, current_name))
                .await
        }
        "warn" => {
            ensure_staff(interaction.member.as_ref(), staff_role, "warn members")?;
            let ticket = ticket_in_channel(data, interaction.channel_id).await?;

            responder
                .send(
                    Reply::new()
                        .content(ticket.owner.id.mention().to_string())
                        .embed(embeds::inactivity_warning_embed(&interaction.user)),
                )
                .await
        }
        _ => bail!("Invalid interaction: Unexpected action"),
    }
}

async fn modal(
    ctx: &SerenityContext,
    data: &BotData,
    interaction: &ModalInteraction,
    mut action: impl Iterator<Item = &str>,
) -> Result<()> {
    let mut responder = Responder::new(ctx, Either::Right(interaction));
    let staff_role = data.config.staff_role_id;
    let channel_id = interaction.channel_id;

    match action.next().unwrap_or_default() {
        "close_submit" => {
            let fields = modal::CloseReason::validate(&interaction.data.components)?;
            let reason = fields.reason.trim();
            if reason.is_empty() {
                bail!(UserError(anyhow!("A reason is required to close a ticket")));
            }

            let ticket = ticket_in_channel(data, channel_id).await?;
            ensure_owner_or_staff(interaction.user.id, interaction.member.as_ref(), &ticket, staff_role)?;

            // collecting the transcript can outlast the interaction deadline
            responder.defer().await?;

            let channels = DiscordChannels::new(ctx, &data.config);
            let archived = data
                .tracker
                .close_ticket(
                    &channels,
                    channel_id,
                    reason.to_string(),
                    TicketUser::from(&interaction.user),
                )
                .await?;

            maintenance::schedule_channel_deletion(
                ctx.http.clone(),
                channel_id,
                Duration::from_secs(CHANNEL_DELETE_DELAY_SECS),
            );

            let log_message = CreateMessage::new().embed(embeds::close_log_embed(
                &archived,
                &data.config.dashboard_url,
                CHANNEL_DELETE_DELAY_SECS,
            ));
            if let Err(err) = channel_id.send_message(ctx.http(), log_message).await {
                error!("Failed to post close log in channel {channel_id}: {err:#}");
            }

            responder
                .send(
                    Reply::new()
                        .embed(embeds::notice_embed(format!(
                            "Ticket `{}` has been archived",
                            archived.id
                        )))
                        .ephemeral(true),
                )
                .await
        }
        "add_member_submit" => {
            ensure_staff(interaction.member.as_ref(), staff_role, "add members")?;
            let fields = modal::AddMember::validate(&interaction.data.components)?;
            let user_id = parse_user_id(&fields.user_id)?;
            ticket_in_channel(data, channel_id).await?;

            let member = data
                .config
                .guild_id
                .member(ctx, user_id)
                .await
                .map_err(|_| UserError(anyhow!("There is no member with ID {user_id} in this server")))?;

            channel_id
                .create_permission(
                    ctx.http(),
                    PermissionOverwrite {
                        allow: MEMBER_PERMISSIONS,
                        deny: Permissions::empty(),
                        kind: PermissionOverwriteType::Member(user_id),
                    },
                )
                .await
                .context("Failed to grant channel access")?;

            info!("{} added {} to ticket channel {channel_id}", interaction.user.name, member.user.name);
            responder
                .send(Reply::new().embed(embeds::notice_embed(format!(
                    "{} was added to this ticket by {}",
                    member.mention(),
                    interaction.user.mention()
                ))))
                .await
        }
        "remove_member_submit" => {
            ensure_staff(interaction.member.as_ref(), staff_role, "remove members")?;
            let fields = modal::RemoveMember::validate(&interaction.data.components)?;
            let user_id = parse_user_id(&fields.user_id)?;
            let ticket = ticket_in_channel(data, channel_id).await?;

            if user_id == ticket.owner.id {
                bail!(UserError(anyhow!("The ticket owner cannot be removed from their ticket")));
            }

            channel_id
                .delete_permission(ctx.http(), PermissionOverwriteType::Member(user_id))
                .await
                .context("Failed to revoke channel access")?;

            info!("{} removed {user_id} from ticket channel {channel_id}", interaction.user.name);
            responder
                .send(Reply::new().embed(embeds::notice_embed(format!(
                    "{} was removed from this ticket by {}",
                    user_id.mention(),
                    interaction.user.mention()
                ))))
                .await
        }
        "rename_submit" => {
            ensure_staff(interaction.member.as_ref(), staff_role, "rename tickets")?;
            let fields = modal::RenameTicket::validate(&interaction.data.components)?;
            let name = sanitize_channel_name(&fields.name)?;
            ticket_in_channel(data, channel_id).await?;

            channel_id
                .edit(ctx, EditChannel::new().name(name.clone()))
                .await
                .context("Failed to rename ticket channel")?;

            info!("{} renamed ticket channel {channel_id} to {name}", interaction.user.name);
            responder
                .send(Reply::new().embed(embeds::notice_embed(format!(
                    "Ticket renamed to `{name}` by {}",
                    interaction.user.mention()
                ))))
                .await
        }
        _ => bail!("Invalid interaction: Unexpected action"),
    }
}

async fn open_ticket(
    ctx: &SerenityContext,
    data: &BotData,
    interaction: &ComponentInteraction,
    responder: &mut Responder<'_>,
) -> Result<()> {
    let ComponentInteractionDataKind::StringSelect { values } = &interaction.data.kind else {
        bail!("Invalid interaction: Expected a string select menu");
    };
    let kind: TicketKind = values
        .first()
        .context("Invalid interaction: No ticket type selected")?
        .parse()
        .map_err(|err: String| UserError(anyhow!(err)))?;

    // answered before deferring so the conflict notice is the initial response
    if let Some(existing) = data.tracker.active_for(interaction.user.id).await {
        return Err(TicketError::Conflict {
            user_id: interaction.user.id,
            channel_id: existing.channel_id,
        }
        .into());
    }

    responder.defer().await?;

    let channels = DiscordChannels::new(ctx, &data.config);
    let ticket = data
        .tracker
        .create_ticket(&channels, TicketUser::from(&interaction.user), kind)
        .await?;

    let welcome = CreateMessage::new()
        .content(embeds::welcome_content(&ticket, data.config.staff_role_id))
        .embed(embeds::welcome_embed(&ticket))
        .components(embeds::welcome_components());
    if let Err(err) = ticket.channel_id.send_message(ctx.http(), welcome).await {
        error!("Failed to send welcome message in channel {}: {err:#}", ticket.channel_id);
    }

    responder
        .send(
            Reply::new()
                .embed(embeds::notice_embed(format!(
                    "Your ticket has been opened: {}",
                    ticket.channel_id.mention()
                )))
                .ephemeral(true),
        )
        .await
}

pub async fn ticket_in_channel(data: &BotData, channel_id: ChannelId) -> Result<ActiveTicket> {
    Ok(data
        .tracker
        .find_by_channel(channel_id)
        .await
        .ok_or(TicketError::NotFound { channel_id })?)
}

pub fn is_staff(member: Option<&Member>, staff_role: RoleId) -> bool {
    member.is_some_and(|member| member.roles.contains(&staff_role))
}

fn ensure_staff(member: Option<&Member>, staff_role: RoleId, action: &str) -> Result<()> {
    if !is_staff(member, staff_role) {
        bail!(UserError(anyhow!("Only staff members can {action}")));
    }
    Ok(())
}

pub fn ensure_owner_or_staff(
    user_id: UserId,
    member: Option<&Member>,
    ticket: &ActiveTicket,
    staff_role: RoleId,
) -> Result<()> {
    if user_id != ticket.owner.id && !is_staff(member, staff_role) {
        bail!(UserError(anyhow!(
            "Only the ticket owner or staff members can close this ticket"
        )));
    }
    Ok(())
}

/// Accepts a raw ID or a user mention.
pub fn parse_user_id(raw: &str) -> Result<UserId> {
    USER_ID_REGEX
        .captures(raw.trim())
        .and_then(|captures| captures[1].parse::<u64>().ok())
        .filter(|id| *id != 0)
        .map(UserId::new)
        .ok_or_else(|| UserError(anyhow!("{raw:?} is not a valid user ID")).into())
}

/// Discord lowercases text channel names and replaces spaces with dashes.
pub fn sanitize_channel_name(raw: &str) -> Result<String> {
    let name: String = raw
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| !c.is_ascii() || c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(100)
        .collect();

    if name.is_empty() {
        bail!(UserError(anyhow!("{raw:?} is not a usable channel name")));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_accept_mentions() {
        assert_eq!(parse_user_id("123456789012345678").unwrap(), UserId::new(123456789012345678));
        assert_eq!(parse_user_id(" <@123456789012345678> ").unwrap(), UserId::new(123456789012345678));
        assert_eq!(parse_user_id("<@!123456789012345678>").unwrap(), UserId::new(123456789012345678));
    }

    #[test]
    fn malformed_user_ids_are_user_errors() {
        for raw in ["", "alice", "12345", "<#123456789012345678>"] {
            let err = parse_user_id(raw).unwrap_err();
            assert!(err.is::<UserError>(), "{raw:?}");
        }
    }

    #[test]
    fn channel_names_are_normalized() {
        assert_eq!(sanitize_channel_name("  Ban Appeal #2 ").unwrap(), "ban-appeal-2");
        assert_eq!(sanitize_channel_name("⭐promotion-alice").unwrap(), "⭐promotion-alice");
        assert!(sanitize_channel_name("!!!").is_err());
    }
}
