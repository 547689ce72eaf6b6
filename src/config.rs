use std::{env, path::PathBuf, str::FromStr, sync::LazyLock, time::Duration};

use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use regex::Regex;
use thiserror::Error;

// delay between closing a ticket and deleting its channel
pub const CHANNEL_DELETE_DELAY_SECS: u64 = 10;
// discord caps message history requests at 100 per page
pub const TRANSCRIPT_PAGE_SIZE: u8 = 100;
// tickets listed under `recent` in the archive statistics
pub const RECENT_TICKETS: usize = 10;

// file names inside the data directory
pub const CLOSED_TICKETS_FILE: &str = "closed-tickets.json";
pub const SERVER_CONFIGS_FILE: &str = "server-configs.json";
pub const BACKUP_DIR: &str = "backups";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_ARCHIVE_RETENTION: usize = 1000;
const DEFAULT_BACKUP_INTERVAL_SECS: u64 = 3600;
const DEFAULT_BACKUP_RETENTION: usize = 24;

static SNOWFLAKE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{17,19}$").unwrap());
static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap());

/// How many archived tickets are kept, newest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retention {
    Unbounded,
    Capped(usize),
}

impl Retention {
    /// Drops everything past the cap from a newest-first list.
    pub fn apply<T>(self, items: &mut Vec<T>) {
        if let Retention::Capped(limit) = self {
            items.truncate(limit);
        }
    }
}

impl Default for Retention {
    fn default() -> Self {
        Retention::Capped(DEFAULT_ARCHIVE_RETENTION)
    }
}

impl FromStr for Retention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unbounded" | "unlimited" | "none" => Ok(Retention::Unbounded),
            value => match value.parse::<usize>() {
                Ok(0) | Err(_) => Err(format!(
                    "expected a positive integer or 'unbounded', got {value:?}"
                )),
                Ok(limit) => Ok(Retention::Capped(limit)),
            },
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid configuration:\n{}", format_problems(.problems))]
pub struct ConfigError {
    pub problems: Vec<String>,
}

fn format_problems(problems: &[String]) -> String {
    problems
        .iter()
        .map(|problem| format!("- {problem}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone, Debug)]
pub struct Config {
    pub token: String,
    pub guild_id: GuildId,
    pub category_id: ChannelId,
    pub staff_role_id: RoleId,
    pub panel_image_url: Option<String>,
    pub port: u16,
    pub dashboard_url: String,
    pub data_dir: PathBuf,
    pub archive_retention: Retention,
    pub archive_max_age_days: Option<u32>,
    pub backup_interval: Duration,
    pub backup_retention: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source, collecting every problem
    /// instead of stopping at the first one.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut problems = Vec::new();

        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let token = match var("DISCORD_TOKEN").or_else(|| var("TOKEN")) {
            Some(token) if token.len() > 50 && token.contains('.') => token,
            Some(_) => {
                problems.push("DISCORD_TOKEN does not look like a bot token".to_string());
                String::new()
            }
            None => {
                problems.push("Missing environment variable 'DISCORD_TOKEN'".to_string());
                String::new()
            }
        };

        // serenity ID constructors panic on zero
        let mut snowflake = |name: &str| match var(name) {
            Some(value) => match value.parse::<u64>() {
                Ok(id) if id != 0 && SNOWFLAKE_REGEX.is_match(&value) => Some(id),
                _ => {
                    problems.push(format!(
                        "{name} must be a Discord ID (17-19 digits), got {value:?}"
                    ));
                    None
                }
            },
            None => {
                problems.push(format!("Missing environment variable '{name}'"));
                None
            }
        };

        let guild_id = snowflake("GUILD_ID").map(GuildId::new);
        let category_id = snowflake("TICKET_CATEGORY_ID").map(ChannelId::new);
        let staff_role_id = snowflake("STAFF_ROLE_ID").map(RoleId::new);

        let panel_image_url = match var("PANEL_IMAGE_URL") {
            Some(url) if URL_REGEX.is_match(&url) => Some(url),
            Some(url) => {
                problems.push(format!("PANEL_IMAGE_URL is not a valid URL: {url:?}"));
                None
            }
            None => None,
        };

        let mut parsed = |name: &str, default: u64| match var(name) {
            Some(value) => match value.parse::<u64>() {
                Ok(parsed) if parsed > 0 => parsed,
                _ => {
                    problems.push(format!("{name} must be a positive integer, got {value:?}"));
                    default
                }
            },
            None => default,
        };

        let port = parsed("PORT", DEFAULT_PORT.into());
        let backup_interval_secs = parsed("BACKUP_INTERVAL_SECS", DEFAULT_BACKUP_INTERVAL_SECS);
        let backup_retention = parsed("BACKUP_RETENTION", DEFAULT_BACKUP_RETENTION as u64);
        let archive_max_age_days = var("ARCHIVE_MAX_AGE_DAYS").map(|_| parsed("ARCHIVE_MAX_AGE_DAYS", 0));

        let port = u16::try_from(port).unwrap_or_else(|_| {
            problems.push(format!("PORT must fit in 16 bits, got {port}"));
            DEFAULT_PORT
        });

        let archive_retention = match var("ARCHIVE_RETENTION") {
            Some(value) => value.parse::<Retention>().unwrap_or_else(|err| {
                problems.push(format!("ARCHIVE_RETENTION: {err}"));
                Retention::default()
            }),
            None => Retention::default(),
        };

        let dashboard_url = var("DASHBOARD_URL")
            .or_else(|| var("RENDER_EXTERNAL_URL"))
            .or_else(|| var("RAILWAY_STATIC_URL"))
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let data_dir = var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        match (guild_id, category_id, staff_role_id) {
            (Some(guild_id), Some(category_id), Some(staff_role_id)) if problems.is_empty() => {
                Ok(Config {
                    token,
                    guild_id,
                    category_id,
                    staff_role_id,
                    panel_image_url,
                    port,
                    dashboard_url,
                    data_dir,
                    archive_retention,
                    archive_max_age_days: archive_max_age_days
                        .filter(|days| *days > 0)
                        .map(|days| u32::try_from(days).unwrap_or(u32::MAX)),
                    backup_interval: Duration::from_secs(backup_interval_secs),
                    backup_retention: backup_retention as usize,
                })
            }
            _ => Err(ConfigError { problems }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const TOKEN: &str = "MTIzNDU2Nzg5MDEyMzQ1Njc4.GabcDE.abcdefghijklmnopqrstuvwxyz0123456789";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DISCORD_TOKEN", TOKEN),
            ("GUILD_ID", "123456789012345678"),
            ("TICKET_CATEGORY_ID", "223456789012345678"),
            ("STAFF_ROLE_ID", "323456789012345678"),
        ]
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup(&required())).unwrap();

        assert_eq!(config.guild_id, GuildId::new(123456789012345678));
        assert_eq!(config.category_id, ChannelId::new(223456789012345678));
        assert_eq!(config.staff_role_id, RoleId::new(323456789012345678));
        assert_eq!(config.port, 3000);
        assert_eq!(config.dashboard_url, "http://localhost:3000");
        assert_eq!(config.archive_retention, Retention::Capped(1000));
        assert_eq!(config.archive_max_age_days, None);
        assert_eq!(config.backup_interval, Duration::from_secs(3600));
        assert_eq!(config.backup_retention, 24);
        assert_eq!(config.panel_image_url, None);
    }

    #[test]
    fn reports_every_missing_variable_at_once() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();

        assert_eq!(err.problems.len(), 4);
        let message = err.to_string();
        for name in ["DISCORD_TOKEN", "GUILD_ID", "TICKET_CATEGORY_ID", "STAFF_ROLE_ID"] {
            assert!(message.contains(name), "{message}");
        }
    }

    #[test]
    fn rejects_malformed_values() {
        let mut vars = required();
        vars.retain(|(name, _)| !matches!(*name, "GUILD_ID" | "STAFF_ROLE_ID" | "DISCORD_TOKEN"));
        vars.push(("GUILD_ID", "12345"));
        vars.push(("STAFF_ROLE_ID", "00000000000000000"));
        vars.push(("DISCORD_TOKEN", "short"));
        vars.push(("PANEL_IMAGE_URL", "not a url"));
        vars.push(("ARCHIVE_RETENTION", "0"));

        let err = Config::from_lookup(lookup(&vars)).unwrap_err();

        assert_eq!(err.problems.len(), 5, "{:?}", err.problems);
        assert!(err.to_string().contains("STAFF_ROLE_ID"));
    }

    #[test]
    fn zero_ids_are_reported_instead_of_panicking() {
        let mut vars = required();
        vars.retain(|(name, _)| *name != "GUILD_ID");
        vars.push(("GUILD_ID", "00000000000000000"));

        let err = Config::from_lookup(lookup(&vars)).unwrap_err();

        assert_eq!(err.problems.len(), 1, "{:?}", err.problems);
        assert!(err.problems[0].starts_with("GUILD_ID"));
    }

    #[test]
    fn dashboard_url_falls_back_through_hosting_variables() {
        let mut vars = required();
        vars.push(("RAILWAY_STATIC_URL", "https://tickets.up.railway.app/"));
        vars.push(("PORT", "8080"));

        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.dashboard_url, "https://tickets.up.railway.app");
    }

    #[test]
    fn optional_values_are_parsed() {
        let mut vars = required();
        vars.push(("PANEL_IMAGE_URL", "https://cdn.example.com/panel.png"));
        vars.push(("ARCHIVE_RETENTION", "unbounded"));
        vars.push(("ARCHIVE_MAX_AGE_DAYS", "90"));
        vars.push(("DATA_DIR", "/var/lib/tickets"));

        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(
            config.panel_image_url.as_deref(),
            Some("https://cdn.example.com/panel.png")
        );
        assert_eq!(config.archive_retention, Retention::Unbounded);
        assert_eq!(config.archive_max_age_days, Some(90));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/tickets"));
    }

    #[test]
    fn retention_truncates_newest_first_lists() {
        let mut items = vec![5, 4, 3, 2, 1];
        Retention::Capped(3).apply(&mut items);
        assert_eq!(items, vec![5, 4, 3]);

        let mut items = vec![5, 4, 3, 2, 1];
        Retention::Unbounded.apply(&mut items);
        assert_eq!(items.len(), 5);
    }
}
