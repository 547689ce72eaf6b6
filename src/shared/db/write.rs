use anyhow::Result;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::GuildId;

use crate::db::store::Store;
use crate::shared::types::ServerConfig;

/// Stores the guild's settings, stamping `updated_at`. The previous value is restored if the
/// file write fails.
pub fn set_server_config(
    store: &mut Store,
    guild_id: GuildId,
    mut config: ServerConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    config.updated_at = Some(now);

    let previous = store.server_configs.insert(guild_id, config);

    if let Err(err) = store.save_server_configs() {
        match previous {
            Some(previous) => store.server_configs.insert(guild_id, previous),
            None => store.server_configs.remove(&guild_id),
        };
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::{ChannelId, UserId};
    use tempfile::TempDir;

    use super::*;
    use crate::config::Retention;
    use crate::db::store::test_options;
    use crate::shared::db::read;
    use crate::ticket::types::fixtures;

    fn config(channel: u64) -> ServerConfig {
        ServerConfig {
            ticket_channel_id: ChannelId::new(channel),
            configured_by: UserId::new(9),
            configured_at: fixtures::at(0),
            updated_at: None,
        }
    }

    #[test]
    fn reconfiguring_replaces_the_channel() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::load(test_options(dir.path(), Retention::Unbounded)).unwrap();
        let guild = GuildId::new(1);

        set_server_config(&mut store, guild, config(10), fixtures::at(1)).unwrap();
        set_server_config(&mut store, guild, config(20), fixtures::at(2)).unwrap();

        let stored = read::server_config(&store, guild).unwrap();
        assert_eq!(stored.ticket_channel_id, ChannelId::new(20));
        assert_eq!(stored.updated_at, Some(fixtures::at(2)));
        assert_eq!(read::server_config(&store, GuildId::new(2)), None);

        let reloaded = Store::load(test_options(dir.path(), Retention::Unbounded)).unwrap();
        assert_eq!(read::server_config(&reloaded, guild), Some(stored));
    }
}
