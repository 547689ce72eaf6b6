use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Retention;
use crate::db::store::Store;
use crate::ticket::types::ArchivedTicket;

/// Prepends `ticket` to the archive and applies the retention limit. Memory is only updated
/// once the file write has succeeded.
pub fn add_closed_ticket(
    store: &mut Store,
    mut ticket: ArchivedTicket,
    now: DateTime<Utc>,
) -> Result<()> {
    ticket.saved_at.get_or_insert(now);

    store.closed_tickets.insert(0, ticket);

    let mut kept = store.closed_tickets.len();
    if let Retention::Capped(limit) = store.retention() {
        kept = kept.min(limit);
    }

    if let Err(err) = store.write_closed_tickets(&store.closed_tickets[..kept]) {
        store.closed_tickets.remove(0);
        return Err(err);
    }

    store.closed_tickets.truncate(kept);
    Ok(())
}

/// Drops archived tickets opened before `cutoff`, returning how many were removed.
pub fn prune_older_than(store: &mut Store, cutoff: DateTime<Utc>) -> Result<usize> {
    let kept: Vec<ArchivedTicket> = store
        .closed_tickets
        .iter()
        .filter(|ticket| ticket.created_at >= cutoff)
        .cloned()
        .collect();

    let removed = store.closed_tickets.len() - kept.len();
    if removed == 0 {
        return Ok(0);
    }

    store.write_closed_tickets(&kept)?;
    store.closed_tickets = kept;

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::config::CLOSED_TICKETS_FILE;
    use crate::db::store::{Store, test_options};
    use crate::ticket::types::{TicketKind, fixtures};

    fn ids(store: &Store) -> Vec<String> {
        store
            .closed_tickets
            .iter()
            .map(|ticket| ticket.id.clone())
            .collect()
    }

    #[test]
    fn retention_keeps_exactly_the_newest_tickets() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::load(test_options(dir.path(), Retention::Capped(3))).unwrap();

        for n in 1..=5 {
            add_closed_ticket(&mut store, fixtures::archived(n, TicketKind::Inquiry), fixtures::at(0)).unwrap();
        }

        let expected: Vec<String> = [5, 4, 3]
            .iter()
            .map(|n| ArchivedTicket::archive_id(1_700_000_000_000 + n))
            .collect();
        assert_eq!(ids(&store), expected);

        let reloaded = Store::load(test_options(dir.path(), Retention::Capped(3))).unwrap();
        assert_eq!(ids(&reloaded), expected);
    }

    #[test]
    fn unbounded_retention_keeps_everything() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::load(test_options(dir.path(), Retention::Unbounded)).unwrap();

        for n in 1..=20 {
            add_closed_ticket(&mut store, fixtures::archived(n, TicketKind::Promotion), fixtures::at(0)).unwrap();
        }

        assert_eq!(store.closed_tickets.len(), 20);
    }

    #[test]
    fn saved_at_is_stamped_once() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::load(test_options(dir.path(), Retention::Unbounded)).unwrap();

        let mut stamped = fixtures::archived(1, TicketKind::Inquiry);
        stamped.saved_at = Some(fixtures::at(5));
        add_closed_ticket(&mut store, stamped, fixtures::at(99)).unwrap();
        add_closed_ticket(&mut store, fixtures::archived(2, TicketKind::Inquiry), fixtures::at(99)).unwrap();

        assert_eq!(store.closed_tickets[0].saved_at, Some(fixtures::at(99)));
        assert_eq!(store.closed_tickets[1].saved_at, Some(fixtures::at(5)));
    }

    #[test]
    fn failed_write_leaves_archive_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::load(test_options(dir.path(), Retention::Capped(2))).unwrap();
        add_closed_ticket(&mut store, fixtures::archived(1, TicketKind::Inquiry), fixtures::at(0)).unwrap();
        add_closed_ticket(&mut store, fixtures::archived(2, TicketKind::Inquiry), fixtures::at(0)).unwrap();
        let before = ids(&store);

        // a directory in place of the temp file makes the write fail
        fs::create_dir(dir.path().join(format!("{CLOSED_TICKETS_FILE}.tmp"))).unwrap();

        assert!(add_closed_ticket(&mut store, fixtures::archived(3, TicketKind::Inquiry), fixtures::at(0)).is_err());
        assert_eq!(ids(&store), before);
    }

    #[test]
    fn pruning_removes_only_old_tickets() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::load(test_options(dir.path(), Retention::Unbounded)).unwrap();
        for n in 1..=4 {
            add_closed_ticket(&mut store, fixtures::archived(n, TicketKind::Disciplinary), fixtures::at(0)).unwrap();
        }

        // fixture n is created at n minutes
        let removed = prune_older_than(&mut store, fixtures::at(3 * 60)).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.closed_tickets.len(), 2);
        assert_eq!(prune_older_than(&mut store, fixtures::at(3 * 60)).unwrap(), 0);

        let reloaded = Store::load(test_options(dir.path(), Retention::Unbounded)).unwrap();
        assert_eq!(reloaded.closed_tickets.len(), 2);
    }
}
