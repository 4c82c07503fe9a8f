// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! The station outbox: a durable, at-least-once delivery buffer. Owns
//! every sealed ballot from append to acknowledgement, mirrored to one
//! `<id>.ballot` file per ballot under a configured directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::core::types::Ballot;

/// Outbox errors.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// Filesystem operation failed.
    #[error("outbox io error: {0}")]
    Io(String),
    /// On-disk ballot file was not valid JSON.
    #[error("malformed ballot file: {0}")]
    Malformed(String),
}

/// A ballot's delivery lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutboxState {
    /// Not yet positively acknowledged by the tallier.
    Pending,
    /// Positively acknowledged; eligible for pruning after an age threshold.
    Acknowledged,
}

#[derive(Clone)]
struct OutboxEntry {
    ballot: Ballot,
    state: OutboxState,
    acknowledged_at: Option<SystemTime>,
}

fn ballot_path(dir: &Path, id: Uuid) -> PathBuf {
    dir.join(format!("{id}.ballot"))
}

fn set_private_perms_best_effort(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// Atomic write to disk: write to a `.tmp` sibling, fsync, then rename.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), OutboxError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| OutboxError::Io(e.to_string()))?;
    }
    let mut tmp = path.to_path_buf();
    tmp.set_extension("tmp");
    {
        let mut f = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .map_err(|e| OutboxError::Io(e.to_string()))?;
        f.write_all(bytes).map_err(|e| OutboxError::Io(e.to_string()))?;
        f.sync_all().map_err(|e| OutboxError::Io(e.to_string()))?;
    }
    set_private_perms_best_effort(&tmp);
    fs::rename(&tmp, path).map_err(|e| OutboxError::Io(e.to_string()))?;
    Ok(())
}

/// The station's durable outbox.
pub struct Outbox {
    dir: PathBuf,
    entries: DashMap<Uuid, OutboxEntry>,
}

impl Outbox {
    /// Open an outbox rooted at `dir`, recovering any pending ballots left
    /// over from a prior process (see [`Outbox::recover`]).
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, OutboxError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| OutboxError::Io(e.to_string()))?;
        let outbox = Self { dir, entries: DashMap::new() };
        outbox.recover()?;
        Ok(outbox)
    }

    /// Atomically insert `ballot` as *pending* and persist it to disk
    /// before returning. The fsync in [`atomic_write`] is the durability
    /// boundary the spec requires.
    pub fn append(&self, ballot: Ballot) -> Result<(), OutboxError> {
        let path = ballot_path(&self.dir, ballot.id);
        let bytes = serde_json::to_vec(&ballot).map_err(|e| OutboxError::Malformed(e.to_string()))?;
        atomic_write(&path, &bytes)?;
        self.entries.insert(ballot.id, OutboxEntry { ballot, state: OutboxState::Pending, acknowledged_at: None });
        Ok(())
    }

    /// Transition `id` to *acknowledged*. The on-disk file is left in place
    /// (it is only deleted by [`Outbox::prune`]); acknowledged status
    /// itself is never persisted, per spec §4.2's recovery rule.
    pub fn mark_acknowledged(&self, id: Uuid) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.state = OutboxState::Acknowledged;
            entry.acknowledged_at = Some(SystemTime::now());
        }
    }

    /// Demote `id` from *acknowledged* back to *pending*. Used by the
    /// confirmation auditor when the tallier's ack turned out to be
    /// unconfirmed.
    pub fn mark_pending(&self, id: Uuid) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.state = OutboxState::Pending;
            entry.acknowledged_at = None;
        }
    }

    /// All ballots currently pending.
    pub fn list_pending(&self) -> Vec<Ballot> {
        self.entries
            .iter()
            .filter(|e| e.state == OutboxState::Pending)
            .map(|e| e.ballot.clone())
            .collect()
    }

    /// All ballots currently acknowledged.
    pub fn list_acknowledged(&self) -> Vec<Ballot> {
        self.entries
            .iter()
            .filter(|e| e.state == OutboxState::Acknowledged)
            .map(|e| e.ballot.clone())
            .collect()
    }

    /// At startup, scan the directory and rehydrate every file as
    /// *pending*, regardless of any prior acknowledged status (which is
    /// never persisted). Deduplication on the tallier side makes replaying
    /// an already-acknowledged ballot safe.
    pub fn recover(&self) -> Result<(), OutboxError> {
        let read_dir = fs::read_dir(&self.dir).map_err(|e| OutboxError::Io(e.to_string()))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| OutboxError::Io(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("ballot") {
                continue;
            }
            let bytes = fs::read(&path).map_err(|e| OutboxError::Io(e.to_string()))?;
            let ballot: Ballot = serde_json::from_slice(&bytes).map_err(|e| OutboxError::Malformed(e.to_string()))?;
            self.entries
                .entry(ballot.id)
                .or_insert(OutboxEntry { ballot, state: OutboxState::Pending, acknowledged_at: None });
        }
        Ok(())
    }

    /// Delete on-disk files (and drop in-memory entries) for acknowledged
    /// ballots older than `age`.
    pub fn prune(&self, age: Duration) -> Result<usize, OutboxError> {
        let cutoff = SystemTime::now().checked_sub(age).unwrap_or(UNIX_EPOCH);
        let mut pruned = 0usize;
        let stale: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|e| e.state == OutboxState::Acknowledged && e.acknowledged_at.map(|t| t <= cutoff).unwrap_or(false))
            .map(|e| *e.key())
            .collect();
        for id in stale {
            let path = ballot_path(&self.dir, id);
            let _ = fs::remove_file(path);
            self.entries.remove(&id);
            pruned += 1;
        }
        Ok(pruned)
    }

    /// Number of ballots currently pending (for metrics).
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.state == OutboxState::Pending).count()
    }
}
