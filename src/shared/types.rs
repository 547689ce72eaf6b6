use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, UserId};
use serde::{Deserialize, Serialize};

/// Per-guild settings, stored keyed by guild ID.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub ticket_channel_id: ChannelId,
    pub configured_by: UserId,
    pub configured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
