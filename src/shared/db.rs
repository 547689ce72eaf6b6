use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use poise::serenity_prelude::GuildId;
use tokio::sync::oneshot;

use crate::db::{DbHandle, DbRequest, backup::BackupReport, store::Store};
use crate::shared::types::ServerConfig;

pub mod read;
pub mod write;

impl DbHandle {
    pub async fn set_server_config(&self, guild_id: GuildId, config: ServerConfig) -> Result<()> {
        self.dispatch_request(|response_tx| SharedDb::SetServerConfig {
            response_tx,
            guild_id,
            config,
            now: Utc::now(),
        })
        .await?
    }

    pub async fn server_config(&self, guild_id: GuildId) -> Result<Option<ServerConfig>> {
        self.dispatch_request(|response_tx| SharedDb::GetServerConfig {
            response_tx,
            guild_id,
        })
        .await?
    }

    pub async fn create_backup(&self, now: DateTime<Utc>) -> Result<BackupReport> {
        self.dispatch_request(|response_tx| SharedDb::CreateBackup { response_tx, now })
            .await?
    }
}

pub enum SharedDb {
    SetServerConfig {
        response_tx: oneshot::Sender<Result<()>>,
        guild_id: GuildId,
        config: ServerConfig,
        now: DateTime<Utc>,
    },
    GetServerConfig {
        response_tx: oneshot::Sender<Result<Option<ServerConfig>>>,
        guild_id: GuildId,
    },
    CreateBackup {
        response_tx: oneshot::Sender<Result<BackupReport>>,
        now: DateTime<Utc>,
    },
}

impl DbRequest for SharedDb {
    fn execute(self: Box<Self>, store: &mut Store) {
        match *self {
            SharedDb::SetServerConfig {
                response_tx,
                guild_id,
                config,
                now,
            } => {
                let result = write::set_server_config(store, guild_id, config, now)
                    .context("Failed to save server configuration");
                let _ = response_tx.send(result);
            }
            SharedDb::GetServerConfig {
                response_tx,
                guild_id,
            } => {
                let _ = response_tx.send(Ok(read::server_config(store, guild_id)));
            }
            SharedDb::CreateBackup { response_tx, now } => {
                let result = store.backup(now).context("Failed to write backup");
                let _ = response_tx.send(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::config::Retention;
    use crate::db::{backup::list_backups, spawn_test_db, store::test_options};
    use crate::ticket::types::fixtures;

    #[tokio::test]
    async fn backups_respect_retention() {
        let dir = TempDir::new().unwrap();
        // test options keep three backups
        let db = spawn_test_db(test_options(dir.path(), Retention::Unbounded)).await;

        for hour in 0..5 {
            db.create_backup(fixtures::at(hour * 3600)).await.unwrap();
        }

        let backups = list_backups(&dir.path().join("backups")).unwrap();
        assert_eq!(backups.len(), 3);
    }
}
