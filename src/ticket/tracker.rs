use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use poise::serenity_prelude::{ChannelId, UserId};
use serenity::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::db::DbHandle;
use crate::ticket::types::{ActiveTicket, ArchivedTicket, TicketKind, TicketUser, TranscriptMessage};

/// Where ticket channels come from and where their history is read back.
#[async_trait]
pub trait TicketChannels: Send + Sync {
    async fn open_channel(&self, owner: &TicketUser, kind: TicketKind) -> Result<ChannelId>;

    /// All messages in the channel, oldest first.
    async fn collect_transcript(&self, channel_id: ChannelId) -> Result<Vec<TranscriptMessage>>;
}

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("<@{user_id}> already has an open ticket: <#{channel_id}>")]
    Conflict {
        user_id: UserId,
        channel_id: ChannelId,
    },
    #[error("There is no open ticket in this channel")]
    NotFound { channel_id: ChannelId },
    #[error("Failed to set up the ticket channel")]
    Channel(#[source] anyhow::Error),
    #[error("Failed to read the ticket transcript")]
    Transcript(#[source] anyhow::Error),
    #[error("Failed to archive the ticket")]
    Archive(#[source] anyhow::Error),
}

impl TicketError {
    pub fn is_user_facing(&self) -> bool {
        matches!(self, TicketError::Conflict { .. } | TicketError::NotFound { .. })
    }
}

#[derive(Default)]
struct TrackerState {
    active: HashMap<UserId, ActiveTicket>,
    // archive IDs are derived from the close time and must not repeat
    last_archive_millis: i64,
}

/// Owns the set of open tickets, at most one per user.
///
/// The state lock is held across the channel and archive calls, so creates and closes are
/// applied one at a time.
pub struct TicketTracker {
    state: Mutex<TrackerState>,
    db: DbHandle,
}

impl TicketTracker {
    pub fn new(db: DbHandle) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            db,
        }
    }

    pub async fn create_ticket(
        &self,
        channels: &dyn TicketChannels,
        owner: TicketUser,
        kind: TicketKind,
    ) -> Result<ActiveTicket, TicketError> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.active.get(&owner.id) {
            return Err(TicketError::Conflict {
                user_id: owner.id,
                channel_id: existing.channel_id,
            });
        }

        let channel_id = channels
            .open_channel(&owner, kind)
            .await
            .map_err(TicketError::Channel)?;

        let ticket = ActiveTicket {
            owner,
            channel_id,
            kind,
            created_at: Utc::now(),
        };

        info!(
            "Opened {} ticket for {} in channel {}",
            kind.slug(),
            ticket.owner.username,
            channel_id
        );
        state.active.insert(ticket.owner.id, ticket.clone());

        Ok(ticket)
    }

    pub async fn close_ticket(
        &self,
        channels: &dyn TicketChannels,
        channel_id: ChannelId,
        reason: String,
        staff: TicketUser,
    ) -> Result<ArchivedTicket, TicketError> {
        let mut state = self.state.lock().await;

        let (owner_id, active) = state
            .active
            .iter()
            .find(|(_, ticket)| ticket.channel_id == channel_id)
            .map(|(owner_id, ticket)| (*owner_id, ticket.clone()))
            .ok_or(TicketError::NotFound { channel_id })?;

        let messages = channels
            .collect_transcript(channel_id)
            .await
            .map_err(TicketError::Transcript)?;

        let closed_at = Utc::now();
        let archive_millis = closed_at
            .timestamp_millis()
            .max(state.last_archive_millis + 1);

        let archived = ArchivedTicket::from_active(
            ArchivedTicket::archive_id(archive_millis),
            active,
            staff,
            reason,
            messages,
            closed_at,
        );

        self.db
            .add_closed_ticket(archived.clone())
            .await
            .map_err(TicketError::Archive)?;

        state.last_archive_millis = archive_millis;
        state.active.remove(&owner_id);

        info!(
            "Closed ticket {} ({} messages) for {} by {}",
            archived.id,
            archived.messages.len(),
            archived.user.username,
            archived.staff.username
        );

        Ok(archived)
    }

    pub async fn find_by_channel(&self, channel_id: ChannelId) -> Option<ActiveTicket> {
        self.state
            .lock()
            .await
            .active
            .values()
            .find(|ticket| ticket.channel_id == channel_id)
            .cloned()
    }

    pub async fn active_for(&self, user_id: UserId) -> Option<ActiveTicket> {
        self.state.lock().await.active.get(&user_id).cloned()
    }

    pub async fn active_count(&self) -> usize {
        self.state.lock().await.active.len()
    }

    /// Forgets a ticket whose channel was deleted without being closed.
    pub async fn discard_channel(&self, channel_id: ChannelId) -> Option<ActiveTicket> {
        let mut state = self.state.lock().await;

        let owner_id = state
            .active
            .iter()
            .find(|(_, ticket)| ticket.channel_id == channel_id)
            .map(|(owner_id, _)| *owner_id)?;

        let ticket = state.active.remove(&owner_id);
        warn!("Ticket channel {channel_id} was deleted before the ticket was closed");
        ticket
    }
}
