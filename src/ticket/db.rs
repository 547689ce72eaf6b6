use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::db::{DbHandle, DbRequest, store::Store};
use crate::ticket::types::{ArchivedTicket, TicketStats};

pub mod read;
pub mod write;

impl DbHandle {
    pub async fn add_closed_ticket(&self, ticket: ArchivedTicket) -> Result<()> {
        self.dispatch_request(|response_tx| TicketDb::AddClosedTicket {
            response_tx,
            ticket: Box::new(ticket),
            now: Utc::now(),
        })
        .await?
    }

    pub async fn closed_tickets(&self, limit: Option<usize>) -> Result<Vec<ArchivedTicket>> {
        self.dispatch_request(|response_tx| TicketDb::GetClosedTickets { response_tx, limit })
            .await?
    }

    pub async fn ticket_by_id(&self, id: String) -> Result<Option<ArchivedTicket>> {
        self.dispatch_request(|response_tx| TicketDb::GetTicketById { response_tx, id })
            .await?
    }

    pub async fn ticket_stats(&self) -> Result<TicketStats> {
        self.dispatch_request(|response_tx| TicketDb::GetStats {
            response_tx,
            now: Utc::now(),
        })
        .await?
    }

    pub async fn prune_tickets_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.dispatch_request(|response_tx| TicketDb::PruneOlderThan {
            response_tx,
            cutoff,
        })
        .await?
    }
}

pub enum TicketDb {
    AddClosedTicket {
        response_tx: oneshot::Sender<Result<()>>,
        ticket: Box<ArchivedTicket>,
        now: DateTime<Utc>,
    },
    GetClosedTickets {
        response_tx: oneshot::Sender<Result<Vec<ArchivedTicket>>>,
        limit: Option<usize>,
    },
    GetTicketById {
        response_tx: oneshot::Sender<Result<Option<ArchivedTicket>>>,
        id: String,
    },
    GetStats {
        response_tx: oneshot::Sender<Result<TicketStats>>,
        now: DateTime<Utc>,
    },
    PruneOlderThan {
        response_tx: oneshot::Sender<Result<usize>>,
        cutoff: DateTime<Utc>,
    },
}

impl DbRequest for TicketDb {
    fn execute(self: Box<Self>, store: &mut Store) {
        match *self {
            TicketDb::AddClosedTicket {
                response_tx,
                ticket,
                now,
            } => {
                let result = write::add_closed_ticket(store, *ticket, now)
                    .context("Failed to save closed ticket to the archive");
                let _ = response_tx.send(result);
            }
            TicketDb::GetClosedTickets { response_tx, limit } => {
                let _ = response_tx.send(Ok(read::closed_tickets(store, limit)));
            }
            TicketDb::GetTicketById { response_tx, id } => {
                let _ = response_tx.send(Ok(read::ticket_by_id(store, &id)));
            }
            TicketDb::GetStats { response_tx, now } => {
                let _ = response_tx.send(Ok(read::stats(&store.closed_tickets, now)));
            }
            TicketDb::PruneOlderThan {
                response_tx,
                cutoff,
            } => {
                let result = write::prune_older_than(store, cutoff)
                    .context("Failed to prune old tickets from the archive");
                let _ = response_tx.send(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::config::Retention;
    use crate::db::{spawn_test_db, store::test_options};
    use crate::ticket::types::{TicketKind, fixtures};

    #[tokio::test]
    async fn requests_round_trip_through_the_database_thread() {
        let dir = TempDir::new().unwrap();
        let db = spawn_test_db(test_options(dir.path(), Retention::Capped(2))).await;

        for n in 1..=3 {
            db.add_closed_ticket(fixtures::archived(n, TicketKind::Inquiry))
                .await
                .unwrap();
        }

        let tickets = db.closed_tickets(None).await.unwrap();
        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|ticket| ticket.saved_at.is_some()));

        let newest = db.ticket_by_id(tickets[0].id.clone()).await.unwrap();
        assert_eq!(newest.as_ref(), Some(&tickets[0]));
        assert_eq!(db.ticket_by_id("TKT-0".to_string()).await.unwrap(), None);

        assert_eq!(db.closed_tickets(Some(1)).await.unwrap().len(), 1);
        assert_eq!(db.ticket_stats().await.unwrap().total, 2);
    }
}
