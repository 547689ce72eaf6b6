use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use poise::serenity_prelude::{ChannelId, Http};
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::db::DbHandle;

const PRUNE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Deletes a closed ticket's channel once the delay has passed.
pub fn schedule_channel_deletion(http: Arc<Http>, channel_id: ChannelId, delay: Duration) {
    tokio::spawn(async move {
        time::sleep(delay).await;

        match channel_id.delete(&http).await {
            Ok(_) => info!("Deleted ticket channel {channel_id}"),
            Err(err) => error!("Failed to delete ticket channel {channel_id}: {err:#}"),
        }
    });
}

/// Writes a backup of the archive every `every`, starting one interval after startup.
pub fn spawn_backup_task(db: DbHandle, every: Duration) {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            match db.create_backup(Utc::now()).await {
                Ok(report) => info!(
                    "Wrote backup {} ({} old backups pruned)",
                    report.path.display(),
                    report.pruned
                ),
                Err(err) => error!("Failed to write backup: {err:#}"),
            }
        }
    });
}

/// Drops archived tickets opened more than `max_age_days` ago, once a day.
pub fn spawn_prune_task(db: DbHandle, max_age_days: u32) {
    tokio::spawn(async move {
        let mut interval = time::interval(PRUNE_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let cutoff = prune_cutoff(Utc::now(), max_age_days);
            match db.prune_tickets_older_than(cutoff).await {
                Ok(0) => (),
                Ok(pruned) => info!("Pruned {pruned} archived tickets opened before {cutoff}"),
                Err(err) => error!("Failed to prune archived tickets: {err:#}"),
            }
        }
    });
}

pub fn prune_cutoff(now: DateTime<Utc>, max_age_days: u32) -> DateTime<Utc> {
    now - TimeDelta::days(i64::from(max_age_days))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn cutoff_is_whole_days_back() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(
            prune_cutoff(now, 7),
            Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap()
        );
        assert_eq!(prune_cutoff(now, 0), now);
    }
}
