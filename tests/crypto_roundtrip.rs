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

//! P3-P5: signature/decryption round trips using key material persisted to
//! disk and reloaded, as a real station/tallier restart would.

use ballotcast::core::crypto::decryptor::Decryptor;
use ballotcast::core::crypto::keys::{AesKey, RsaKeypair};
use ballotcast::core::crypto::sealer::Sealer;
use ballotcast::core::crypto::verifier::{VerifyError, Verifier};
use ballotcast::core::types::{Ballot, ReceivedBallot};

#[test]
fn p3_p4_p5_reloaded_station_keys_round_trip_through_a_fresh_tallier() {
    let key_dir = tempfile::tempdir().unwrap();
    let signing_path = key_dir.path().join("signing.key");
    let aes_path = key_dir.path().join("symmetric.key");

    // First "process": generate and persist the station's key material.
    let signing_key = RsaKeypair::load_or_generate(&signing_path).unwrap();
    let aes_key = AesKey::load_or_generate(&aes_path).unwrap();
    let public_spki_b64 = signing_key.public_key_spki_b64().unwrap();
    let sealer = Sealer::from_keys(signing_key, aes_key);

    let ballot = Ballot::new("M01", "C5");
    let sealed = sealer.seal(ballot).unwrap();

    // Second "process": reload the same key material from disk, as a
    // restarted station would, and confirm an independently reloaded
    // signing key still verifies (P3) and decrypts the same candidate (P4, P5).
    let reloaded_signing_key = RsaKeypair::load_or_generate(&signing_path).unwrap();
    let reloaded_aes_key = AesKey::load_or_generate(&aes_path).unwrap();
    assert_eq!(reloaded_signing_key.public_key_spki_b64().unwrap(), public_spki_b64);

    let verifier = Verifier::new();
    verifier.register_station_signing_key("M01", &public_spki_b64).unwrap();

    let decryptor = Decryptor::new();
    decryptor.register_station_key("M01", reloaded_aes_key);

    let mut received = ReceivedBallot::from_wire(
        sealed.id,
        sealed.station_id.clone(),
        sealed.emitted_at.clone(),
        sealed.sealed_payload.clone(),
        sealed.signature.clone(),
    );
    verifier.verify(&received).expect("signature verifies against reloaded key");
    received.verified = true;
    decryptor.decrypt(&mut received).expect("decrypts against reloaded key");
    assert_eq!(received.decrypted_candidate_id.as_deref(), Some("C5"));

    // Tamper with a single bit of the signature: verification must fail (P3).
    let mut tampered = received.clone();
    tampered.signature[0] ^= 0x01;
    assert!(matches!(verifier.verify(&tampered), Err(VerifyError::BadSignature)));

    // Tamper with a single bit of the sealed payload: verification must
    // fail too, since it is covered by the signing bytes (P3).
    let mut tampered_payload = ReceivedBallot::from_wire(
        sealed.id,
        sealed.station_id,
        sealed.emitted_at,
        sealed.sealed_payload,
        sealed.signature,
    );
    tampered_payload.sealed_payload[0] ^= 0x01;
    assert!(verifier.verify(&tampered_payload).is_err());
}

#[test]
fn p5_wrap_and_unwrap_symmetric_key_round_trips() {
    let tallier_keypair = RsaKeypair::generate().unwrap();
    let tallier_public_b64 = tallier_keypair.public_key_spki_b64().unwrap();

    let sealer = Sealer::generate().unwrap();
    let wrapped_b64 = sealer.wrap_symmetric_key_for(&tallier_public_b64).unwrap();

    let wrapped = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, wrapped_b64).unwrap();
    let unwrapped = tallier_keypair.decrypt(&wrapped).unwrap();
    assert_eq!(unwrapped.as_slice(), sealer.aes_key().as_bytes().as_slice());
}
