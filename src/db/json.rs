use std::{fs, path::Path};

use anyhow::{Context as _, Result};
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{info, warn};

/// Reads a JSON document, creating it with the default value when missing. A document that
/// cannot be parsed is moved aside and replaced by the default.
pub fn read_or_init<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Serialize + Default,
{
    if !path.exists() {
        let value = T::default();
        write_atomic(path, &value)?;
        info!("Created empty data file {}", path.display());
        return Ok(value);
    }

    let parsed = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
        .and_then(|raw| {
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", path.display()))
        });

    match parsed {
        Ok(value) => Ok(value),
        Err(err) => {
            let aside = path.with_extension(format!("corrupt-{}", Utc::now().format("%Y%m%d-%H%M%S")));
            warn!(
                "{err:#}; moving it to {} and starting empty",
                aside.display()
            );
            fs::rename(path, &aside)
                .with_context(|| format!("Failed to move aside {}", path.display()))?;

            let value = T::default();
            write_atomic(path, &value)?;
            Ok(value)
        }
    }
}

/// Serializes `value` next to `path` and renames it into place, so readers never observe a
/// partially written document.
pub fn write_atomic<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let serialized = serde_json::to_vec_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, serialized)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    fs::rename(tmp_path, path)
        .with_context(|| format!("Failed to move {} into place", tmp_path.display()))?;

    Ok(())
}
