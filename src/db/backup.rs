use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::db::json;

const BACKUP_PREFIX: &str = "backup-";
const BACKUP_SUFFIX: &str = ".json";

#[derive(Debug)]
pub struct BackupReport {
    pub path: PathBuf,
    pub pruned: usize,
}

pub fn backup_file_name(now: DateTime<Utc>) -> String {
    format!("{BACKUP_PREFIX}{}{BACKUP_SUFFIX}", now.format("%Y%m%d-%H%M%S"))
}

/// Writes `snapshot` as a timestamped backup and deletes the oldest backups beyond `keep`.
pub fn write_backup<T>(dir: &Path, snapshot: &T, now: DateTime<Utc>, keep: usize) -> Result<BackupReport>
where
    T: Serialize,
{
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create backup directory {}", dir.display()))?;

    let path = dir.join(backup_file_name(now));
    json::write_atomic(&path, snapshot)?;

    let pruned = prune_backups(dir, keep)?;

    Ok(BackupReport { path, pruned })
}

/// Backup names sort chronologically, so the newest `keep` are the last ones by name.
pub fn prune_backups(dir: &Path, keep: usize) -> Result<usize> {
    let mut backups = list_backups(dir)?;
    if backups.len() <= keep {
        return Ok(0);
    }

    let excess = backups.len() - keep;
    for path in backups.drain(..excess) {
        debug!("Deleting old backup {}", path.display());
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete old backup {}", path.display()))?;
    }

    Ok(excess)
}

pub fn list_backups(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut backups: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list backup directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_SUFFIX))
        })
        .collect();

    backups.sort();
    Ok(backups)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use tempfile::TempDir;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn file_names_carry_the_timestamp() {
        assert_eq!(backup_file_name(at(9)), "backup-20260314-090000.json");
    }

    #[test]
    fn oldest_backups_beyond_retention_are_deleted() {
        let dir = TempDir::new().unwrap();

        for hour in 0..5 {
            write_backup(dir.path(), &vec![hour], at(hour), 3).unwrap();
        }

        let remaining: Vec<String> = list_backups(dir.path())
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            remaining,
            vec![
                "backup-20260314-020000.json",
                "backup-20260314-030000.json",
                "backup-20260314-040000.json",
            ]
        );
    }

    #[test]
    fn unrelated_files_are_left_alone() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let report = write_backup(dir.path(), &Vec::<u8>::new(), at(1), 1).unwrap();
        write_backup(dir.path(), &Vec::<u8>::new(), at(2), 1).unwrap();

        assert_eq!(report.pruned, 0);
        assert!(dir.path().join("notes.txt").exists());
        assert!(!report.path.exists());
        assert_eq!(list_backups(dir.path()).unwrap().len(), 1);
    }
}
