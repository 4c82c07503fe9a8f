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

//! Tallier-side AES-256-CBC decryptor and station symmetric-key registry.

use dashmap::DashMap;
use thiserror::Error;

use crate::core::crypto::cbc_codec::{self, CbcError};
use crate::core::crypto::keys::AesKey;
use crate::core::types::ReceivedBallot;

/// Decryption errors.
#[derive(Debug, Error)]
pub enum DecryptError {
    /// No AES key has been registered for the claimed station.
    #[error("unknown station: {0}")]
    UnknownStation(String),
    /// IV/ciphertext split or PKCS7 padding was invalid.
    #[error("malformed sealed payload")]
    Malformed(#[from] CbcError),
    /// Decrypted bytes were not valid UTF-8.
    #[error("decrypted payload was not valid utf-8")]
    InvalidUtf8,
}

/// Registry of station AES keys plus the decryption operation itself.
#[derive(Default)]
pub struct Decryptor {
    aes_keys: DashMap<String, AesKey>,
}

impl Decryptor {
    /// Create an empty decryptor (no stations registered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a station's AES-256 key, previously unwrapped
    /// from the key-delivery handshake. Latest registration wins.
    pub fn register_station_key(&self, station_id: &str, key: AesKey) {
        self.aes_keys.insert(station_id.to_string(), key);
    }

    /// Decrypt `ballot.sealed_payload` and install the plaintext.
    pub fn decrypt(&self, ballot: &mut ReceivedBallot) -> Result<(), DecryptError> {
        let key = self
            .aes_keys
            .get(&ballot.station_id)
            .ok_or_else(|| DecryptError::UnknownStation(ballot.station_id.clone()))?;

        let plaintext = cbc_codec::open(key.as_bytes(), &ballot.sealed_payload)?;
        let candidate_id = String::from_utf8(plaintext).map_err(|_| DecryptError::InvalidUtf8)?;
        ballot.decrypted_candidate_id = Some(candidate_id);
        Ok(())
    }

    /// Whether a station has a registered AES key.
    pub fn has_station(&self, station_id: &str) -> bool {
        self.aes_keys.contains_key(station_id)
    }
}
