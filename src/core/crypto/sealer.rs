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

//! Station-side sealer: turns a plaintext ballot into a sealed, signed
//! wire record, and exposes the key material the tallier needs to invert it.

use thiserror::Error;

use crate::core::crypto::cbc_codec::{self, CbcError};
use crate::core::crypto::keys::{self, AesKey, KeyError, RsaKeypair};
use crate::core::types::{signing_bytes, Ballot};

/// Sealing errors. Per spec §7, a sealing failure is fatal for the station
/// (it indicates the cryptographic provider is unavailable).
#[derive(Debug, Error)]
pub enum SealError {
    /// Underlying key error.
    #[error("crypto provider error: {0}")]
    Key(#[from] KeyError),
    /// Underlying AES-CBC codec error.
    #[error("crypto provider error: {0}")]
    Cbc(#[from] CbcError),
}

/// Owns a station's signing keypair and symmetric key, and seals ballots.
pub struct Sealer {
    signing_key: RsaKeypair,
    aes_key: AesKey,
}

impl Sealer {
    /// Generate a fresh RSA-2048 signing keypair and AES-256 symmetric key.
    pub fn generate() -> Result<Self, SealError> {
        Ok(Self {
            signing_key: RsaKeypair::generate()?,
            aes_key: AesKey::generate()?,
        })
    }

    /// Build a sealer from already-loaded key material (e.g. restored from disk).
    pub fn from_keys(signing_key: RsaKeypair, aes_key: AesKey) -> Self {
        Self { signing_key, aes_key }
    }

    /// Seal `ballot`: populate `sealed_payload` (AES-256-CBC of `candidate_id`)
    /// and `signature` (RSA-2048/SHA-256 over the canonical signing bytes).
    pub fn seal(&self, mut ballot: Ballot) -> Result<Ballot, SealError> {
        let sealed_payload = cbc_codec::seal(self.aes_key.as_bytes(), ballot.candidate_id.as_bytes())?;
        let msg = signing_bytes(&ballot.id, &ballot.station_id, &ballot.emitted_at, &sealed_payload);
        let signature = self.signing_key.sign(&msg)?;

        ballot.sealed_payload = sealed_payload;
        ballot.signature = signature;
        Ok(ballot)
    }

    /// This station's public signing key, X.509 SPKI, base64.
    pub fn public_signing_key_base64(&self) -> Result<String, SealError> {
        Ok(self.signing_key.public_key_spki_b64()?)
    }

    /// Wrap this station's AES key under the tallier's public key, base64.
    pub fn wrap_symmetric_key_for(&self, tallier_public_key_b64: &str) -> Result<String, SealError> {
        let tallier_pubkey = keys::parse_public_key_spki_b64(tallier_public_key_b64)?;
        let wrapped = keys::encrypt_for(&tallier_pubkey, self.aes_key.as_bytes())?;
        Ok(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, wrapped))
    }

    /// This station's AES key (for handing to a co-located `Decryptor` in tests
    /// and single-process demos; real deployments deliver it only via
    /// [`wrap_symmetric_key_for`] over the wire).
    pub fn aes_key(&self) -> AesKey {
        self.aes_key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::decryptor::Decryptor;
    use crate::core::crypto::verifier::Verifier;
    use crate::core::types::ReceivedBallot;

    #[test]
    fn seal_then_verify_then_decrypt_round_trips_candidate() {
        let sealer = Sealer::generate().expect("sealer");
        let ballot = Ballot::new("M01", "C3");
        let candidate = ballot.candidate_id.clone();
        let sealed = sealer.seal(ballot).expect("seal");

        let verifier = Verifier::new();
        verifier
            .register_station_signing_key("M01", &sealer.public_signing_key_base64().unwrap())
            .expect("register signing key");

        let decryptor = Decryptor::new();
        decryptor.register_station_key("M01", sealer.aes_key());

        let mut received = ReceivedBallot::from_wire(
            sealed.id,
            sealed.station_id.clone(),
            sealed.emitted_at.clone(),
            sealed.sealed_payload.clone(),
            sealed.signature.clone(),
        );
        verifier.verify(&received).expect("verify");
        received.verified = true;
        decryptor.decrypt(&mut received).expect("decrypt");

        assert_eq!(received.decrypted_candidate_id.as_deref(), Some(candidate.as_str()));
    }

    #[test]
    fn tampered_sealed_payload_fails_verification() {
        let sealer = Sealer::generate().expect("sealer");
        let ballot = Ballot::new("M01", "C3");
        let mut sealed = sealer.seal(ballot).expect("seal");
        sealed.sealed_payload[0] ^= 0x01;

        let verifier = Verifier::new();
        verifier
            .register_station_signing_key("M01", &sealer.public_signing_key_base64().unwrap())
            .expect("register");

        let received = ReceivedBallot::from_wire(
            sealed.id,
            sealed.station_id,
            sealed.emitted_at,
            sealed.sealed_payload,
            sealed.signature,
        );
        assert!(verifier.verify(&received).is_err());
    }
}
