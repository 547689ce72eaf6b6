use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, MessageId, User, UserId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    #[serde(alias = "corregedoria")]
    Disciplinary,
    #[serde(alias = "up_patente")]
    Promotion,
    #[serde(alias = "duvidas")]
    Inquiry,
}

impl TicketKind {
    pub const ALL: [TicketKind; 3] = [
        TicketKind::Disciplinary,
        TicketKind::Promotion,
        TicketKind::Inquiry,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            TicketKind::Disciplinary => "disciplinary",
            TicketKind::Promotion => "promotion",
            TicketKind::Inquiry => "inquiry",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TicketKind::Disciplinary => "Disciplinary",
            TicketKind::Promotion => "Promotion Request",
            TicketKind::Inquiry => "General Inquiry",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TicketKind::Disciplinary => "Report misconduct or appeal a punishment",
            TicketKind::Promotion => "Request a rank promotion",
            TicketKind::Inquiry => "Ask the staff team a question",
        }
    }

    pub fn emoji(self) -> char {
        match self {
            TicketKind::Disciplinary => '⚖',
            TicketKind::Promotion => '⭐',
            TicketKind::Inquiry => '❓',
        }
    }

    /// Status an archived ticket of this kind receives when closed.
    pub fn closing_status(self) -> TicketStatus {
        match self {
            TicketKind::Promotion => TicketStatus::Approved,
            TicketKind::Disciplinary | TicketKind::Inquiry => TicketStatus::Resolved,
        }
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TicketKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| format!("Unknown ticket type {s:?}"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Resolved,
    Approved,
    Rejected,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 3] = [
        TicketStatus::Resolved,
        TicketStatus::Approved,
        TicketStatus::Rejected,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Approved => "Approved",
            TicketStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketUser {
    pub id: UserId,
    pub username: String,
    pub avatar: Option<String>,
}

impl From<&User> for TicketUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.name.clone(),
            avatar: Some(user.face()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActiveTicket {
    pub owner: TicketUser,
    pub channel_id: ChannelId,
    pub kind: TicketKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    pub id: MessageId,
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_staff: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedTicket {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TicketKind,
    pub title: String,
    pub user: TicketUser,
    pub staff: TicketUser,
    pub channel_id: ChannelId,
    pub created_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub reason: String,
    pub status: TicketStatus,
    pub messages: Vec<TranscriptMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl ArchivedTicket {
    pub fn archive_id(closed_at_millis: i64) -> String {
        format!("TKT-{closed_at_millis}")
    }

    pub fn from_active(
        id: String,
        active: ActiveTicket,
        staff: TicketUser,
        reason: String,
        messages: Vec<TranscriptMessage>,
        closed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: format!("{} - {}", active.kind.label(), active.owner.username),
            status: active.kind.closing_status(),
            kind: active.kind,
            user: active.owner,
            staff,
            channel_id: active.channel_id,
            created_at: active.created_at,
            closed_at,
            reason,
            messages,
            saved_at: None,
        }
    }
}

/// Aggregate view of the archive served to the dashboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    pub total: usize,
    pub by_type: BTreeMap<TicketKind, usize>,
    pub by_status: BTreeMap<TicketStatus, usize>,
    pub recent: Vec<ArchivedTicket>,
    pub oldest_ticket: Option<DateTime<Utc>>,
    pub newest_ticket: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}


#[cfg(test)]
mod tests {
    use super::{fixtures::*, *};

    #[test]
    fn promotion_tickets_close_as_approved() {
        assert_eq!(TicketKind::Promotion.closing_status(), TicketStatus::Approved);
        assert_eq!(TicketKind::Inquiry.closing_status(), TicketStatus::Resolved);
        assert_eq!(TicketKind::Disciplinary.closing_status(), TicketStatus::Resolved);
    }

    #[test]
    fn archived_ticket_uses_camel_case_fields() {
        let ticket = archived(1, TicketKind::Promotion);
        let json = serde_json::to_value(&ticket).unwrap();

        assert_eq!(json["type"], "promotion");
        assert_eq!(json["status"], "approved");
        assert_eq!(json["title"], "Promotion Request - user1");
        assert_eq!(json["channelId"], "501");
        assert_eq!(json["user"]["id"], "101");
        assert_eq!(json["messages"][0]["isStaff"], false);
        assert!(json.get("savedAt").is_none());
    }

    #[test]
    fn legacy_kind_names_are_accepted() {
        let kind: TicketKind = serde_json::from_str("\"up_patente\"").unwrap();
        assert_eq!(kind, TicketKind::Promotion);
        let kind: TicketKind = serde_json::from_str("\"corregedoria\"").unwrap();
        assert_eq!(kind, TicketKind::Disciplinary);
    }

    #[test]
    fn kinds_parse_from_their_slug() {
        for kind in TicketKind::ALL {
            assert_eq!(kind.slug().parse::<TicketKind>(), Ok(kind));
        }
        assert!("billing".parse::<TicketKind>().is_err());
    }
}
