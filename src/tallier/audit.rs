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

//! Append-only audit journal: pipe-delimited records, one file per kind
//! per day, under a configured directory.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;

use crate::core::types::mask_document;

/// Audit journal errors.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Underlying filesystem operation failed.
    #[error("journal io error: {0}")]
    Io(String),
}

/// The kinds of audit record defined by spec §4.9.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditKind {
    /// A ballot arrived at the RPC entry point.
    Recepcion,
    /// Signature verification outcome.
    Verificacion,
    /// A ballot was counted.
    Contabilizacion,
    /// A duplicate submission was rejected.
    Duplicado,
    /// Station-side transmission outcome.
    Transmision,
    /// A voting attempt (voter-eligibility collaborator; out of scope to
    /// implement, but the journal schema is part of the external contract).
    IntentoVoto,
    /// A suspected fraud attempt.
    IntentoFraude,
}

impl AuditKind {
    fn prefix(self) -> &'static str {
        match self {
            AuditKind::Recepcion => "RECEPCION",
            AuditKind::Verificacion => "VERIFICACION",
            AuditKind::Contabilizacion => "CONTABILIZACION",
            AuditKind::Duplicado => "DUPLICADO",
            AuditKind::Transmision => "TRANSMISION",
            AuditKind::IntentoVoto => "INTENTO_VOTO",
            AuditKind::IntentoFraude => "INTENTO_FRAUDE",
        }
    }

    fn file_stem(self) -> &'static str {
        match self {
            AuditKind::Recepcion => "recepcion",
            AuditKind::Verificacion => "verificacion",
            AuditKind::Contabilizacion => "contabilizacion",
            AuditKind::Duplicado => "duplicado",
            AuditKind::Transmision => "transmision",
            AuditKind::IntentoVoto => "intento_voto",
            AuditKind::IntentoFraude => "intento_fraude",
        }
    }
}

fn success_token(success: bool) -> &'static str {
    if success {
        "EXITOSO"
    } else {
        "FALLIDO"
    }
}

/// Append-only journal writer. Opens (and keeps appending to) one file per
/// `<prefix>_YYYYMMDD.log` under `dir`.
pub struct AuditJournal {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditJournal {
    /// Open a journal rooted at `dir`, creating it if necessary.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| JournalError::Io(e.to_string()))?;
        Ok(Self { dir, write_lock: Mutex::new(()) })
    }

    fn path_for(&self, kind: AuditKind) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d");
        self.dir.join(format!("{}_{}.log", kind.file_stem(), stamp))
    }

    fn append_line(&self, kind: AuditKind, line: &str) -> Result<(), JournalError> {
        let _guard = self.write_lock.lock().expect("journal lock poisoned");
        let path = self.path_for(kind);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| JournalError::Io(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| JournalError::Io(e.to_string()))?;
        // Durable at OS-flush granularity only; spec §4.9 does not require
        // fsync per record.
        Ok(())
    }

    /// `RECEPCION|ballot_id|station_id|success`
    pub fn recepcion(&self, ballot_id: &str, station_id: &str, success: bool) -> Result<(), JournalError> {
        self.append_line(
            AuditKind::Recepcion,
            &format!("{}|{}|{}|{}", AuditKind::Recepcion.prefix(), ballot_id, station_id, success_token(success)),
        )
    }

    /// `VERIFICACION|ballot_id|station_id|success`
    pub fn verificacion(&self, ballot_id: &str, station_id: &str, success: bool) -> Result<(), JournalError> {
        self.append_line(
            AuditKind::Verificacion,
            &format!("{}|{}|{}|{}", AuditKind::Verificacion.prefix(), ballot_id, station_id, success_token(success)),
        )
    }

    /// `CONTABILIZACION|ballot_id|station_id|candidate_id`
    pub fn contabilizacion(&self, ballot_id: &str, station_id: &str, candidate_id: &str) -> Result<(), JournalError> {
        self.append_line(
            AuditKind::Contabilizacion,
            &format!("{}|{}|{}|{}", AuditKind::Contabilizacion.prefix(), ballot_id, station_id, candidate_id),
        )
    }

    /// `DUPLICADO|ballot_id|station_id`
    pub fn duplicado(&self, ballot_id: &str, station_id: &str) -> Result<(), JournalError> {
        self.append_line(
            AuditKind::Duplicado,
            &format!("{}|{}|{}", AuditKind::Duplicado.prefix(), ballot_id, station_id),
        )
    }

    /// `TRANSMISION|ballot_id|station_id|success`
    pub fn transmision(&self, ballot_id: &str, station_id: &str, success: bool) -> Result<(), JournalError> {
        self.append_line(
            AuditKind::Transmision,
            &format!("{}|{}|{}|{}", AuditKind::Transmision.prefix(), ballot_id, station_id, success_token(success)),
        )
    }

    /// `INTENTO_VOTO|station_id|masked_document|success`
    pub fn intento_voto(&self, station_id: &str, document: &str, success: bool) -> Result<(), JournalError> {
        self.append_line(
            AuditKind::IntentoVoto,
            &format!("{}|{}|{}|{}", AuditKind::IntentoVoto.prefix(), station_id, mask_document(document), success_token(success)),
        )
    }

    /// `INTENTO_FRAUDE|station_id|masked_document|reason`
    pub fn intento_fraude(&self, station_id: &str, document: &str, reason: &str) -> Result<(), JournalError> {
        self.append_line(
            AuditKind::IntentoFraude,
            &format!("{}|{}|{}|{}", AuditKind::IntentoFraude.prefix(), station_id, mask_document(document), reason),
        )
    }

    /// Read back every line recorded today for a given kind.
    pub fn read_today(&self, kind: AuditKind) -> Vec<String> {
        let path = self.path_for(kind);
        fs::read_to_string(path)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
