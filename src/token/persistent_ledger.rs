//! On-disk snapshot of the Hiwa account table
//!
//! The whole table is written as one JSON document. Writes go to a sibling
//! temp file first and are renamed into place, so a crash mid-write leaves the
//! previous snapshot intact. In-flight games are never part of the snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Account;
use crate::error::{Error, Result};

/// Snapshot format version for upgrade compatibility
pub const LEDGER_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
}

impl LedgerSnapshot {
    /// Capture accounts, sorted by user id for stable output
    pub fn new<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Self {
        let mut accounts: Vec<Account> = accounts.into_iter().cloned().collect();
        accounts.sort_by_key(|a| a.user_id);
        Self {
            version: LEDGER_VERSION,
            saved_at: Utc::now(),
            accounts,
        }
    }

    /// Load a snapshot; `None` if the file does not exist yet
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: LedgerSnapshot = serde_json::from_str(&contents)?;
        if snapshot.version > LEDGER_VERSION {
            return Err(Error::Serialization(format!(
                "ledger snapshot version {} is newer than supported version {}",
                snapshot.version, LEDGER_VERSION
            )));
        }
        Ok(Some(snapshot))
    }

    /// Atomically replace the snapshot at `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_vec_pretty(self)?;
        let tmp = temp_path(path);
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
