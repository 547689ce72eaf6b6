use poise::serenity_prelude::GuildId;

use crate::db::store::Store;
use crate::shared::types::ServerConfig;

pub fn server_config(store: &Store, guild_id: GuildId) -> Option<ServerConfig> {
    store.server_configs.get(&guild_id).cloned()
}
