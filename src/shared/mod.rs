use std::sync::Arc;

use anyhow::Error;

use crate::config::Config;
use crate::db::DbHandle;
use crate::ticket::TicketTracker;

pub mod db;
pub mod respond;
pub mod types;

pub struct BotData {
    pub db_handle: DbHandle,
    // shared with the web server, which reports the active ticket count
    pub tracker: Arc<TicketTracker>,
    pub config: Config,
}

pub type Context<'a> = poise::Context<'a, BotData, Error>;
