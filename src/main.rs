use std::{future, process, sync::Arc};

use anyhow::{Context as _, Result, anyhow};
use either::Either;
use poise::{
    Framework, FrameworkOptions,
    serenity_prelude::{
        ClientBuilder, Context as SerenityContext, FullEvent, GatewayIntents, Interaction,
    },
};
use tokio::{net::TcpListener, signal, sync::mpsc};
use tracing::{error, info};

use config::Config;
use db::{DbHandle, store::StoreOptions};
use shared::BotData;
use ticket::TicketTracker;
use web::AppState;

mod commands;
mod config;
mod db;
mod error;
mod log;
mod maintenance;
mod shared;
mod ticket;
mod web;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = log::init_log();

    _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            process::exit(1);
        }
    };

    let (db_tx, db_rx) = mpsc::channel(32);
    let store_options = StoreOptions {
        data_dir: config.data_dir.clone(),
        retention: config.archive_retention,
        backup_retention: config.backup_retention,
    };
    match db::db_thread::start_db_thread(db_rx, store_options).await {
        Ok(Ok(())) => {
            info!("Database thread has completed initialisation");
            Ok(())
        }
        Ok(Err(err)) => Err(anyhow!("Failed to initialise database thread: {err:#}")),
        Err(_) => Err(anyhow!("Database thread panicked during initialisation")),
    }?;

    let db_handle = DbHandle::new(db_tx);
    let tracker = Arc::new(TicketTracker::new(db_handle.clone()));

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind dashboard port {}", config.port))?;
    let app_state = Arc::new(AppState::new(db_handle.clone(), tracker.clone()));
    tokio::spawn(async move {
        if let Err(err) = web::serve(listener, app_state, shutdown_signal()).await {
            error!("{err:#}");
        }
    });

    maintenance::spawn_backup_task(db_handle.clone(), config.backup_interval);
    if let Some(max_age_days) = config.archive_max_age_days {
        maintenance::spawn_prune_task(db_handle.clone(), max_age_days);
    }

    // `MESSAGE_CONTENT`: transcripts keep the text of every message
    // `GUILD_MEMBERS`: staff detection for transcript authors
    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;

    let token = config.token.clone();
    let guild_id = config.guild_id;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![
                commands::panel::ticket_panel(),
                commands::close::close_ticket(),
                commands::configure::ticket_config(),
                commands::dashboard::dashboard(),
            ],
            on_error: error::error_handler,
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "[>] `{}` invoked by {}",
                        ctx.invocation_string(),
                        ctx.author().name,
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "[<] {}'s `{}` invocation completed successfully",
                        ctx.author().name,
                        ctx.invocation_string(),
                    );
                })
            },
            event_handler: |ctx, event, _framework, data| Box::pin(handle_event(ctx, event, data)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);

                let commands = &framework.options().commands;
                poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                info!("Registered {} commands in guild {guild_id}", commands.len());

                Ok(BotData {
                    db_handle,
                    tracker,
                    config,
                })
            })
        })
        .initialize_owners(false)
        .build();

    let mut client = ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, disconnecting from Discord");
        shard_manager.shutdown_all().await;
    });

    client.start().await?;

    Ok(())
}

async fn handle_event(ctx: &SerenityContext, event: &FullEvent, data: &BotData) -> Result<()> {
    match event {
        FullEvent::InteractionCreate { interaction } => match interaction {
            Interaction::Component(interaction) => {
                let mut action = interaction.data.custom_id.split(':');

                match action.next().unwrap_or_default() {
                    ticket::interaction::PREFIX => {
                        ticket::interaction::handle_interaction(
                            ctx,
                            data,
                            Either::Left(interaction),
                            action,
                        )
                        .await
                    }
                    _ => Ok(()),
                }
            }
            Interaction::Modal(interaction) => {
                let mut action = interaction.data.custom_id.split(':');

                match action.next().unwrap_or_default() {
                    ticket::interaction::PREFIX => {
                        ticket::interaction::handle_interaction(
                            ctx,
                            data,
                            Either::Right(interaction),
                            action,
                        )
                        .await
                    }
                    _ => Ok(()),
                }
            }
            _ => Ok(()),
        },
        FullEvent::ChannelDelete { channel, .. } => {
            data.tracker.discard_channel(channel.id).await;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {err}");
            future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => (),
        _ = terminate => (),
    }
}
