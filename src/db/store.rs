use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use poise::serenity_prelude::GuildId;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{BACKUP_DIR, CLOSED_TICKETS_FILE, Retention, SERVER_CONFIGS_FILE};
use crate::db::{
    backup::{self, BackupReport},
    json,
};
use crate::shared::types::ServerConfig;
use crate::ticket::types::ArchivedTicket;

#[derive(Clone, Debug)]
pub struct StoreOptions {
    pub data_dir: PathBuf,
    pub retention: Retention,
    pub backup_retention: usize,
}

/// The archive and guild settings, held in memory and mirrored to flat JSON files.
///
/// Only the database thread owns a `Store`; every mutation rewrites the affected file in full.
pub struct Store {
    pub(crate) closed_tickets: Vec<ArchivedTicket>,
    pub(crate) server_configs: BTreeMap<GuildId, ServerConfig>,
    options: StoreOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BackupSnapshot<'a> {
    created_at: DateTime<Utc>,
    closed_tickets: &'a [ArchivedTicket],
    server_configs: &'a BTreeMap<GuildId, ServerConfig>,
}

impl Store {
    pub fn load(options: StoreOptions) -> Result<Self> {
        fs::create_dir_all(&options.data_dir).with_context(|| {
            format!("Failed to create data directory {}", options.data_dir.display())
        })?;

        let mut closed_tickets: Vec<ArchivedTicket> =
            json::read_or_init(&options.data_dir.join(CLOSED_TICKETS_FILE))?;
        let server_configs = json::read_or_init(&options.data_dir.join(SERVER_CONFIGS_FILE))?;

        // a lowered retention limit takes effect on the next write
        options.retention.apply(&mut closed_tickets);

        info!(
            "Loaded {} archived tickets from {}",
            closed_tickets.len(),
            options.data_dir.display()
        );

        Ok(Self {
            closed_tickets,
            server_configs,
            options,
        })
    }

    pub fn retention(&self) -> Retention {
        self.options.retention
    }

    fn closed_tickets_path(&self) -> PathBuf {
        self.options.data_dir.join(CLOSED_TICKETS_FILE)
    }

    fn server_configs_path(&self) -> PathBuf {
        self.options.data_dir.join(SERVER_CONFIGS_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.options.data_dir.join(BACKUP_DIR)
    }

    /// Writes an arbitrary ticket list to the archive file without touching memory, so callers
    /// can persist first and commit after.
    pub fn write_closed_tickets(&self, tickets: &[ArchivedTicket]) -> Result<()> {
        json::write_atomic(&self.closed_tickets_path(), tickets)?;
        debug!("Saved {} archived tickets", tickets.len());
        Ok(())
    }

    pub fn save_server_configs(&self) -> Result<()> {
        json::write_atomic(&self.server_configs_path(), &self.server_configs)?;
        debug!("Saved {} server configs", self.server_configs.len());
        Ok(())
    }

    pub fn backup(&self, now: DateTime<Utc>) -> Result<BackupReport> {
        let snapshot = BackupSnapshot {
            created_at: now,
            closed_tickets: &self.closed_tickets,
            server_configs: &self.server_configs,
        };

        backup::write_backup(
            &self.backup_dir(),
            &snapshot,
            now,
            self.options.backup_retention,
        )
    }
}

#[cfg(test)]
pub fn test_options(dir: &Path, retention: Retention) -> StoreOptions {
    StoreOptions {
        data_dir: dir.to_path_buf(),
        retention,
        backup_retention: 3,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use poise::serenity_prelude::{ChannelId, UserId};
    use tempfile::TempDir;

    use super::*;
    use crate::ticket::types::{TicketKind, fixtures};

    #[test]
    fn save_then_reload_reproduces_the_archive() {
        let dir = TempDir::new().unwrap();

        let mut store = Store::load(test_options(dir.path(), Retention::Unbounded)).unwrap();
        store.closed_tickets = vec![
            fixtures::archived(3, TicketKind::Inquiry),
            fixtures::archived(2, TicketKind::Promotion),
            fixtures::archived(1, TicketKind::Disciplinary),
        ];
        store.server_configs.insert(
            GuildId::new(42),
            ServerConfig {
                ticket_channel_id: ChannelId::new(7),
                configured_by: UserId::new(8),
                configured_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                updated_at: None,
            },
        );
        store.write_closed_tickets(&store.closed_tickets).unwrap();
        store.save_server_configs().unwrap();

        let reloaded = Store::load(test_options(dir.path(), Retention::Unbounded)).unwrap();

        assert_eq!(reloaded.closed_tickets, store.closed_tickets);
        assert_eq!(reloaded.server_configs, store.server_configs);
    }

    #[test]
    fn server_configs_are_keyed_by_guild_id() {
        let dir = TempDir::new().unwrap();

        let mut store = Store::load(test_options(dir.path(), Retention::Unbounded)).unwrap();
        store.server_configs.insert(
            GuildId::new(123456789012345678),
            ServerConfig {
                ticket_channel_id: ChannelId::new(223456789012345678),
                configured_by: UserId::new(8),
                configured_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                updated_at: None,
            },
        );
        store.save_server_configs().unwrap();

        let raw = fs::read_to_string(dir.path().join(SERVER_CONFIGS_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            json["123456789012345678"]["ticketChannelId"],
            "223456789012345678"
        );
    }

    #[test]
    fn backups_hold_the_whole_state() {
        let dir = TempDir::new().unwrap();

        let mut store = Store::load(test_options(dir.path(), Retention::Unbounded)).unwrap();
        store.closed_tickets = vec![fixtures::archived(1, TicketKind::Inquiry)];

        let report = store.backup(Utc.timestamp_opt(1_700_000_000, 0).unwrap()).unwrap();

        let raw = fs::read_to_string(&report.path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["closedTickets"].as_array().unwrap().len(), 1);
        assert!(json["serverConfigs"].is_object());
        assert!(json["createdAt"].is_string());
    }
}
