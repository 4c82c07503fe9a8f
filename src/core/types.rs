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

//! Deterministic wire/data records shared by station and tallier.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ballot identifier: a 128-bit UUID, generated at creation.
pub type BallotId = Uuid;

/// Wall-clock timestamp rendered as ISO-8601 with second resolution.
///
/// Stored as the exact string used both on the wire and as the signature
/// input, so stations and the tallier never risk disagreeing on formatting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsoTimestamp(pub String);

impl IsoTimestamp {
    /// Capture the current wall clock at second resolution.
    pub fn now() -> Self {
        Self(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl std::fmt::Display for IsoTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A ballot as held by the station: immutable once sealed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ballot {
    /// Ballot id.
    pub id: BallotId,
    /// Emitting polling station.
    pub station_id: String,
    /// Wall-clock time of emission.
    pub emitted_at: IsoTimestamp,
    /// Plaintext candidate choice (station-local only; never sent on the wire).
    pub candidate_id: String,
    /// IV || AES-256-CBC(PKCS7) ciphertext of `candidate_id`. Empty until sealed.
    #[serde(default)]
    pub sealed_payload: Vec<u8>,
    /// RSA-2048/SHA-256 signature over the canonical signing bytes. Empty until sealed.
    #[serde(default)]
    pub signature: Vec<u8>,
}

impl Ballot {
    /// Construct a new, unsealed ballot.
    pub fn new(station_id: impl Into<String>, candidate_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            station_id: station_id.into(),
            emitted_at: IsoTimestamp::now(),
            candidate_id: candidate_id.into(),
            sealed_payload: Vec::new(),
            signature: Vec::new(),
        }
    }

    /// Whether `Seal` has populated the cryptographic fields.
    pub fn is_sealed(&self) -> bool {
        !self.sealed_payload.is_empty() && !self.signature.is_empty()
    }
}

/// A ballot as observed by the tallier, carried through the intake pipeline.
#[derive(Clone, Debug)]
pub struct ReceivedBallot {
    /// Ballot id.
    pub id: BallotId,
    /// Claimed emitting station.
    pub station_id: String,
    /// Claimed emission time (wire string, unparsed beyond validity checks).
    pub emitted_at: IsoTimestamp,
    /// Sealed payload bytes as received.
    pub sealed_payload: Vec<u8>,
    /// Signature bytes as received.
    pub signature: Vec<u8>,
    /// Tallier wall clock at RPC arrival.
    pub received_at: IsoTimestamp,
    /// Populated after successful decryption.
    pub decrypted_candidate_id: Option<String>,
    /// Monotonic false -> true: set once signature verification succeeds.
    pub verified: bool,
    /// Monotonic false -> true: set once the ballot is counted.
    pub counted: bool,
}

impl ReceivedBallot {
    /// Build a fresh received ballot from wire fields, stamped with the current time.
    pub fn from_wire(
        id: BallotId,
        station_id: String,
        emitted_at: IsoTimestamp,
        sealed_payload: Vec<u8>,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            id,
            station_id,
            emitted_at,
            sealed_payload,
            signature,
            received_at: IsoTimestamp::now(),
            decrypted_candidate_id: None,
            verified: false,
            counted: false,
        }
    }
}

/// Canonical signature input: `id || station_id || emitted_at || sealed_payload`.
///
/// Any implementation MUST match this bit-for-bit: the verifier recomputes it
/// from the received wire fields and the station recomputes it from the same
/// ballot it is about to transmit.
pub fn signing_bytes(
    id: &BallotId,
    station_id: &str,
    emitted_at: &IsoTimestamp,
    sealed_payload: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(36 + station_id.len() + emitted_at.0.len() + sealed_payload.len());
    out.extend_from_slice(id.to_string().as_bytes());
    out.extend_from_slice(station_id.as_bytes());
    out.extend_from_slice(emitted_at.0.as_bytes());
    out.extend_from_slice(sealed_payload);
    out
}

/// Mask a document/identifier for audit logging: `XXXX` + up to the last 4 characters.
pub fn mask_document(document: &str) -> String {
    let tail_len = document.chars().count().min(4);
    let tail: String = document
        .chars()
        .rev()
        .take(tail_len)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("XXXX{tail}")
}
