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

//! Tallier-side signature verifier and station signing-key registry.
//!
//! Per the hardening decision in SPEC_FULL.md §9, a station's public
//! signing key MUST be registered out-of-band before any of its
//! submissions verify; the key carried on the wire (`station_pubkey_b64`)
//! is never trusted as a registration source.

use dashmap::DashMap;
use rsa::RsaPublicKey;
use thiserror::Error;

use crate::core::crypto::keys::{self, KeyError};
use crate::core::types::{signing_bytes, ReceivedBallot};

/// Verification errors.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// No signing key has been registered for the claimed station.
    #[error("unknown station: {0}")]
    UnknownStation(String),
    /// The public key supplied for registration was not valid SPKI.
    #[error("invalid signing key: {0}")]
    InvalidKey(#[from] KeyError),
    /// Signature did not verify against the registered key.
    #[error("signature verification failed")]
    BadSignature,
}

/// Registry of station signing keys plus the verification operation itself.
#[derive(Default)]
pub struct Verifier {
    signing_keys: DashMap<String, RsaPublicKey>,
}

impl Verifier {
    /// Create an empty verifier (no stations registered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a station's RSA public signing key from an
    /// X.509 SPKI base64 payload. Latest registration wins.
    pub fn register_station_signing_key(&self, station_id: &str, spki_b64: &str) -> Result<(), VerifyError> {
        let pubkey = keys::parse_public_key_spki_b64(spki_b64)?;
        self.signing_keys.insert(station_id.to_string(), pubkey);
        Ok(())
    }

    /// Verify `ballot`'s signature against its claimed station's registered key.
    pub fn verify(&self, ballot: &ReceivedBallot) -> Result<(), VerifyError> {
        let pubkey = self
            .signing_keys
            .get(&ballot.station_id)
            .ok_or_else(|| VerifyError::UnknownStation(ballot.station_id.clone()))?;

        let msg = signing_bytes(&ballot.id, &ballot.station_id, &ballot.emitted_at, &ballot.sealed_payload);
        keys::verify(&pubkey, &msg, &ballot.signature).map_err(|_| VerifyError::BadSignature)
    }

    /// Whether a station has a registered signing key.
    pub fn has_station(&self, station_id: &str) -> bool {
        self.signing_keys.contains_key(station_id)
    }
}
