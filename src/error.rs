use anyhow::{Error, Result, anyhow};
use either::Either;
use poise::{
    BoxFuture, CreateReply, FrameworkError,
    serenity_prelude::{
        Context as SerenityContext, CreateEmbed, FullEvent, Interaction,
        colours::css::{DANGER, WARNING},
    },
};
use thiserror::Error;
use tracing::{error, warn};

use crate::shared::respond::{Reply, Responder};
use crate::ticket::TicketError;

/// Marks an error as caused by the user's input rather than by the bot.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct UserError(#[from] pub anyhow::Error);

pub fn deduplicate_error_chain(error: &mut Error) {
    let mut error_chain: Vec<String> = error.chain().map(|err| err.to_string()).collect();

    error_chain.dedup();

    let mut error_chain = error_chain.into_iter().rev();
    let Some(root) = error_chain.next() else {
        return;
    };
    let mut new_error = anyhow!(root);

    for message in error_chain {
        new_error = new_error.context(message);
    }

    *error = new_error;
}

/// Whether anything in the chain was marked as the user's fault.
pub fn is_user_error(error: &Error) -> bool {
    error.is::<UserError>()
        || error.chain().any(|cause| {
            cause.downcast_ref::<UserError>().is_some()
                || cause
                    .downcast_ref::<TicketError>()
                    .is_some_and(TicketError::is_user_facing)
        })
}

fn internal_error_embed(error: &Error) -> CreateEmbed {
    CreateEmbed::new()
        .title("Internal Error")
        .description(format!(
            "```\n{error:?}\n```\nPlease report this to the server staff!"
        ))
        .colour(DANGER)
}

fn user_error_embed(error: &Error) -> CreateEmbed {
    CreateEmbed::new()
        .title("Something went wrong")
        .description(format!("{error:#}"))
        .colour(WARNING)
}

fn warning_embed(title: &str, description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(description)
        .colour(WARNING)
}

fn error_reply(embed: CreateEmbed) -> CreateReply {
    CreateReply::default()
        .embed(embed)
        .reply(true)
        .ephemeral(true)
}

/// Reports a failed component or modal handler back to the user who triggered it.
pub async fn event_handler_error(mut error: Error, ctx: &SerenityContext, event: &FullEvent) {
    let embed = if is_user_error(&error) {
        deduplicate_error_chain(&mut error);
        warn!("User error while handling event: {error:#}");
        user_error_embed(&error)
    } else {
        deduplicate_error_chain(&mut error);
        error!("Failed to handle event {event:?}: {error:#}");
        internal_error_embed(&error)
    };

    let interaction = match event {
        FullEvent::InteractionCreate {
            interaction: Interaction::Component(interaction),
        } => Either::Left(interaction),
        FullEvent::InteractionCreate {
            interaction: Interaction::Modal(interaction),
        } => Either::Right(interaction),
        _ => return,
    };

    let reply = Reply::new().embed(embed).ephemeral(true);
    if let Err(err) = Responder::new(ctx, interaction).send(reply).await {
        error!("Failed to report event handler error to the user: {err:#}");
    }
}

async fn try_handle_error<U>(error: FrameworkError<'_, U, Error>) -> Result<()>
where
    U: Send + Sync + 'static,
{
    match error {
        FrameworkError::Setup { mut error, .. } => {
            deduplicate_error_chain(&mut error);
            error!("Framework setup failed: {error:#}");
        }
        FrameworkError::EventHandler {
            error, ctx, event, ..
        } => {
            event_handler_error(error, ctx, event).await;
        }
        FrameworkError::Command { mut error, ctx, .. } => {
            let invocation_string = ctx.invocation_string();
            let embed = if is_user_error(&error) {
                deduplicate_error_chain(&mut error);
                warn!("A user error occurred while executing {invocation_string:?}: {error:#}");
                user_error_embed(&error)
            } else {
                deduplicate_error_chain(&mut error);
                error!("An error occurred while executing {invocation_string:?}: {error:#}");
                internal_error_embed(&error)
            };

            ctx.send(error_reply(embed)).await?;
        }
        FrameworkError::CommandPanic { ctx, payload, .. } => {
            match payload {
                Some(payload) => error!(
                    "[PANIC] Invocation `{}` caused a panic with payload: {}",
                    ctx.invocation_string(),
                    payload
                ),
                None => error!(
                    "[PANIC] Invocation `{}` caused a panic with unknown payload",
                    ctx.invocation_string()
                ),
            }

            ctx.send(error_reply(
                CreateEmbed::new()
                    .title("Panicked")
                    .description(
                        "A critical error occurred and the command handler panicked!\n\
                        This does not affect the bot as a whole. Please report this to the server staff!",
                    )
                    .colour(DANGER),
            ))
            .await?;
        }
        FrameworkError::ArgumentParse {
            error, input, ctx, ..
        } => {
            let invocation_string = ctx.invocation_string();
            let description = match input {
                Some(input) => format!(
                    "Failed to parse {input:?} from `{invocation_string}` into an argument: {error}",
                ),
                None => format!("Failed to parse an argument from `{invocation_string}`: {error}"),
            };

            warn!("{description}");

            ctx.send(error_reply(warning_embed("Failed to parse argument", description)))
                .await?;
        }
        FrameworkError::CommandStructureMismatch {
            description, ctx, ..
        } => {
            error!(
                "Mismatch between registered command and poise command for `/{}`: {description}",
                ctx.command.qualified_name,
            );

            poise::Context::Application(ctx)
                .send(error_reply(warning_embed(
                    "Command structure mismatch",
                    format!(
                        "```\n{description}\n```\nCommands are re-registered when the bot restarts."
                    ),
                )))
                .await?;
        }
        FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            warn!(
                "Bot is lacking permissions for {:?}: {missing_permissions}",
                ctx.invocation_string()
            );

            ctx.send(error_reply(warning_embed(
                "Lacking Bot Permissions",
                format!(
                    "The bot is missing the following permissions to execute this command: **{missing_permissions}**"
                ),
            )))
            .await?;
        }
        FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let description = if let Some(permissions) = missing_permissions {
                warn!(
                    "User is lacking permissions for {:?}: {permissions}",
                    ctx.invocation_string(),
                );
                format!(
                    "You are missing the following permissions to execute this command: **{permissions}**"
                )
            } else {
                warn!(
                    "User is lacking permissions for {:?}",
                    ctx.invocation_string(),
                );
                "You do not have the permissions needed to execute this command".to_string()
            };

            ctx.send(error_reply(warning_embed("Lacking User Permissions", description)))
                .await?;
        }
        FrameworkError::GuildOnly { ctx, .. } => {
            warn!(
                "User attempted to invoke {:?} outside of a guild",
                ctx.invocation_string(),
            );

            ctx.send(error_reply(warning_embed(
                "Server-only Command",
                "You cannot use this command outside of a server.",
            )))
            .await?;
        }
        FrameworkError::UnknownInteraction { interaction, .. } => {
            warn!(
                "Received interaction for an unknown command: {:?}",
                interaction.data.name,
            );
        }
        other => {
            // no command here has subcommands, cooldowns, checks or prefix gates
            warn!("Unhandled framework error: {other}");
        }
    }

    Ok(())
}

pub fn error_handler<U>(error: FrameworkError<'_, U, Error>) -> BoxFuture<'_, ()>
where
    U: Send + Sync + 'static,
{
    Box::pin(async move {
        if let Err(mut err) = try_handle_error(error).await {
            deduplicate_error_chain(&mut err);
            error!("Failed to handle error: {err:#}");
        }
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Context as _;

    use super::*;

    #[test]
    fn duplicate_messages_are_collapsed() {
        let mut error = anyhow!("Ticket not found")
            .context("Ticket not found")
            .context("Failed to close ticket");

        deduplicate_error_chain(&mut error);

        let chain: Vec<String> = error.chain().map(|cause| cause.to_string()).collect();
        assert_eq!(chain, vec!["Failed to close ticket", "Ticket not found"]);
    }

    #[test]
    fn user_errors_are_detected_through_context() {
        let error: Error = Err::<(), _>(UserError(anyhow!("Invalid user ID")))
            .context("Failed to add member")
            .unwrap_err();

        assert!(is_user_error(&error));
        assert!(!is_user_error(&anyhow!("Discord API unavailable")));
    }

    #[test]
    fn ticket_conflicts_are_user_errors() {
        use poise::serenity_prelude::ChannelId;

        let not_found = Error::from(TicketError::NotFound {
            channel_id: ChannelId::new(1),
        });
        let archive = Error::from(TicketError::Archive(anyhow!("disk full")));

        assert!(is_user_error(&not_found));
        assert!(is_user_error(&not_found.context("Failed to close ticket")));
        assert!(!is_user_error(&archive));
    }
}
