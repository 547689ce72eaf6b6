use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::config::RECENT_TICKETS;
use crate::db::store::Store;
use crate::ticket::types::{ArchivedTicket, TicketKind, TicketStats, TicketStatus};

pub fn closed_tickets(store: &Store, limit: Option<usize>) -> Vec<ArchivedTicket> {
    let limit = limit.unwrap_or(store.closed_tickets.len());
    store.closed_tickets.iter().take(limit).cloned().collect()
}

pub fn ticket_by_id(store: &Store, id: &str) -> Option<ArchivedTicket> {
    store
        .closed_tickets
        .iter()
        .find(|ticket| ticket.id == id)
        .cloned()
}

/// Counts are seeded with every kind and status so the dashboard always shows all of them.
pub fn stats(tickets: &[ArchivedTicket], now: DateTime<Utc>) -> TicketStats {
    let mut by_type: BTreeMap<TicketKind, usize> =
        TicketKind::ALL.into_iter().map(|kind| (kind, 0)).collect();
    let mut by_status: BTreeMap<TicketStatus, usize> =
        TicketStatus::ALL.into_iter().map(|status| (status, 0)).collect();

    for ticket in tickets {
        *by_type.entry(ticket.kind).or_default() += 1;
        *by_status.entry(ticket.status).or_default() += 1;
    }

    TicketStats {
        total: tickets.len(),
        by_type,
        by_status,
        recent: tickets.iter().take(RECENT_TICKETS).cloned().collect(),
        oldest_ticket: tickets.last().map(|ticket| ticket.created_at),
        newest_ticket: tickets.first().map(|ticket| ticket.created_at),
        last_updated: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::types::fixtures;

    #[test]
    fn stats_sum_to_the_total() {
        let mut tickets: Vec<ArchivedTicket> = (1..=7)
            .rev()
            .map(|n| {
                let kind = TicketKind::ALL[n as usize % 3];
                fixtures::archived(n, kind)
            })
            .collect();
        tickets[0].status = TicketStatus::Rejected;

        let stats = stats(&tickets, fixtures::at(0));

        assert_eq!(stats.total, 7);
        assert_eq!(stats.by_type.values().sum::<usize>(), stats.total);
        assert_eq!(stats.by_status.values().sum::<usize>(), stats.total);
        assert_eq!(stats.by_status[&TicketStatus::Rejected], 1);
        assert_eq!(stats.newest_ticket, Some(tickets[0].created_at));
        assert_eq!(stats.oldest_ticket, Some(tickets[6].created_at));
    }

    #[test]
    fn empty_archive_reports_zero_for_every_category() {
        let stats = stats(&[], fixtures::at(0));

        assert_eq!(stats.total, 0);
        assert_eq!(stats.by_type.len(), 3);
        assert!(stats.by_type.values().all(|count| *count == 0));
        assert_eq!(stats.by_status.len(), 3);
        assert!(stats.recent.is_empty());
        assert_eq!(stats.oldest_ticket, None);
    }

    #[test]
    fn recent_is_capped() {
        let tickets: Vec<ArchivedTicket> = (1..=15)
            .rev()
            .map(|n| fixtures::archived(n, TicketKind::Inquiry))
            .collect();

        let stats = stats(&tickets, fixtures::at(0));

        assert_eq!(stats.recent.len(), RECENT_TICKETS);
        assert_eq!(stats.recent[0].id, tickets[0].id);
    }

    #[test]
    fn stats_serialize_with_string_keys() {
        let stats = stats(&[fixtures::archived(1, TicketKind::Promotion)], fixtures::at(0));
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["byType"]["promotion"], 1);
        assert_eq!(json["byStatus"]["approved"], 1);
        assert_eq!(json["total"], 1);
    }
}
