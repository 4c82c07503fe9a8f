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

//! The `BallotReceiver` RPC contract and its wire types, shared by every
//! transport adapter (HTTP server, HTTP client, in-process loopback).

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::types::{Ballot, BallotId, IsoTimestamp};

/// Base64-(de)serialise a byte vector as a JSON string field.
mod b64_bytes {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Wire request for `SubmitBallot`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitBallotRequest {
    /// Ballot id.
    pub ballot_id: BallotId,
    /// Claimed emitting station.
    pub station_id: String,
    /// ISO-8601 emission timestamp.
    pub emitted_at: String,
    /// Sealed payload (IV || AES-256-CBC ciphertext), base64 on the wire.
    #[serde(with = "b64_bytes")]
    pub sealed_payload: Vec<u8>,
    /// RSA/SHA-256 signature, base64 on the wire.
    #[serde(with = "b64_bytes")]
    pub signature: Vec<u8>,
    /// Station's claimed public signing key, X.509 SPKI, base64. Carried
    /// for diagnostics only: it is never trusted as a registration source.
    pub station_pubkey_b64: String,
}

impl SubmitBallotRequest {
    /// Build a wire request from a sealed ballot plus the station's public key.
    pub fn from_sealed(ballot: &Ballot, station_pubkey_b64: String) -> Self {
        Self {
            ballot_id: ballot.id,
            station_id: ballot.station_id.clone(),
            emitted_at: ballot.emitted_at.to_string(),
            sealed_payload: ballot.sealed_payload.clone(),
            signature: ballot.signature.clone(),
            station_pubkey_b64,
        }
    }
}

/// Wire response for `SubmitBallot`: the authoritative boolean acknowledgement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitBallotResponse {
    /// `true` iff the tallier durably counted the ballot.
    pub ok: bool,
}

/// Wire response for `Ping`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PingResponse {
    /// Always `true` when reachable.
    pub ok: bool,
}

/// Wire response for `FetchServerPublicKey`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    /// The tallier's RSA public key, X.509 SPKI, base64.
    pub public_key_b64: String,
}

/// Wire response for `ConfirmBallot`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfirmBallotResponse {
    /// `true` iff the tallier's own record shows this ballot was durably
    /// counted. Independent of whatever the original `SubmitBallot` call
    /// returned.
    pub confirmed: bool,
}

/// Server-side RPC contract implemented by the tallier's intake pipeline.
#[async_trait]
pub trait BallotReceiver: Send + Sync {
    /// Run a submitted ballot through the full intake pipeline.
    async fn submit_ballot(&self, req: SubmitBallotRequest) -> bool;
    /// Liveness probe.
    async fn ping(&self) -> bool;
    /// The tallier's RSA public signing/wrapping key, X.509 SPKI, base64.
    async fn fetch_server_public_key(&self) -> String;
    /// Out-of-band confirmation query: does the tallier's own record show
    /// `id` as durably counted? Answered from the tallier's state, not from
    /// whatever the original submission's return value was.
    async fn confirm_ballot(&self, id: Uuid) -> bool;
}

/// Transport-level failure distinct from a logical `false` acknowledgement.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The network call itself failed (connect, timeout, decode).
    #[error("transport error: {0}")]
    Network(String),
}

/// Client-side outcome of a `SubmitBallot` call, per spec §4.3's table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RpcOutcome {
    /// The tallier returned `true`: durably counted.
    Acked,
    /// The tallier returned `false`: logical reject.
    Rejected,
    /// The call never reached the wire because the breaker is open.
    BreakerOpen,
    /// A transport-level failure occurred.
    TransportError,
}

/// Station-side RPC client contract, implemented once per transport adapter.
#[async_trait]
pub trait BallotReceiverClient: Send + Sync {
    /// Call `SubmitBallot` over the wire. Returns `Err` only on a genuine
    /// transport fault; a logical reject is `Ok(false)`.
    async fn submit_ballot(&self, req: SubmitBallotRequest) -> Result<bool, TransportError>;
    /// Call `Ping`.
    async fn ping(&self) -> Result<bool, TransportError>;
    /// Call `FetchServerPublicKey`.
    async fn fetch_server_public_key(&self) -> Result<String, TransportError>;
    /// Call `ConfirmBallot`: ask the tallier, via a separate round trip,
    /// whether `id` was durably counted.
    async fn confirm_ballot(&self, id: Uuid) -> Result<bool, TransportError>;
}

/// Timestamp helper: parse back an RFC3339 wire string into [`IsoTimestamp`].
pub fn wire_timestamp(s: String) -> IsoTimestamp {
    IsoTimestamp(s)
}
