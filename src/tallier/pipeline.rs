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

//! The tallier's fixed intake pipeline: replay detector → signature
//! verifier → decryptor → aggregator → audit journal. Any stage may
//! short-circuit with a negative acknowledgement; only successful
//! aggregation yields `true`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::crypto::decryptor::Decryptor;
use crate::core::crypto::keys::{AesKey, KeyError, RsaKeypair};
use crate::core::crypto::verifier::{VerifyError, Verifier};
use crate::core::types::ReceivedBallot;
use crate::monitoring::metrics::Metrics;
use crate::tallier::aggregator::Aggregator;
use crate::tallier::audit::AuditJournal;
use crate::tallier::replay_detector::{DedupOutcome, ReplayDetector};
use crate::transport::rpc::{BallotReceiver, SubmitBallotRequest};

/// Errors from loading the out-of-band station key registry (spec §9's
/// preregistered-keys hardening decision).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry directory could not be read.
    #[error("registry io error: {0}")]
    Io(String),
    /// A `<station_id>.pub` file was not a valid SPKI signing key.
    #[error("invalid signing key for station {0}: {1}")]
    InvalidSigningKey(String, VerifyError),
    /// A `<station_id>.aes` file was missing or not exactly 32 bytes.
    #[error("invalid symmetric key for station {0}: {1}")]
    InvalidSymmetricKey(String, KeyError),
}

/// Which stage accepted or rejected a ballot; the boolean RPC ack and the
/// audit record are both derived from this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The ballot was counted.
    Counted,
    /// The replay detector rejected it as a duplicate.
    Duplicate,
    /// Signature verification failed.
    SignatureFailed,
    /// Decryption failed.
    DecryptFailed,
    /// The aggregator rejected it (missing decrypted candidate).
    AggregateFailed,
}

impl PipelineOutcome {
    /// The single boolean ack the RPC surface returns.
    pub fn is_success(self) -> bool {
        matches!(self, PipelineOutcome::Counted)
    }
}

/// The tallier's intake pipeline, composing every stage plus its own
/// RSA keypair (used to unwrap per-station AES keys delivered over RPC
/// and to answer `FetchServerPublicKey`).
pub struct Pipeline {
    keypair: Arc<RsaKeypair>,
    replay_detector: Arc<ReplayDetector>,
    verifier: Arc<Verifier>,
    decryptor: Arc<Decryptor>,
    aggregator: Arc<Aggregator>,
    journal: Arc<AuditJournal>,
    metrics: Arc<Metrics>,
    /// Ids that reached `Count()` successfully. Backs `ConfirmBallot`: an
    /// out-of-band query distinct from `SubmitBallot`'s own return value.
    counted_ids: DashMap<Uuid, ()>,
}

impl Pipeline {
    /// Construct a pipeline from its already-built components.
    pub fn new(
        keypair: Arc<RsaKeypair>,
        replay_detector: Arc<ReplayDetector>,
        verifier: Arc<Verifier>,
        decryptor: Arc<Decryptor>,
        aggregator: Arc<Aggregator>,
        journal: Arc<AuditJournal>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            keypair,
            replay_detector,
            verifier,
            decryptor,
            aggregator,
            journal,
            metrics,
            counted_ids: DashMap::new(),
        }
    }

    /// Scan `dir` for `<station_id>.pub` / `<station_id>.aes` pairs and
    /// register each with the verifier and decryptor. This is the
    /// out-of-band enrolment operation spec §9's preregistered-keys
    /// decision requires: an operator copies each station's public signing
    /// key and symmetric key into this directory before the tallier will
    /// accept its submissions. Returns the number of stations registered.
    pub fn load_station_registry(&self, dir: impl AsRef<Path>) -> Result<usize, RegistryError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| RegistryError::Io(e.to_string()))?;

        let mut registered = 0usize;
        for entry in std::fs::read_dir(dir).map_err(|e| RegistryError::Io(e.to_string()))? {
            let entry = entry.map_err(|e| RegistryError::Io(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pub") {
                continue;
            }
            let station_id = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();

            let pubkey_b64 =
                std::fs::read_to_string(&path).map_err(|e| RegistryError::Io(e.to_string()))?;
            self.verifier
                .register_station_signing_key(&station_id, pubkey_b64.trim())
                .map_err(|e| RegistryError::InvalidSigningKey(station_id.clone(), e))?;

            let aes_key = AesKey::load(&path.with_extension("aes"))
                .map_err(|e| RegistryError::InvalidSymmetricKey(station_id.clone(), e))?;
            self.decryptor.register_station_key(&station_id, aes_key);

            registered += 1;
        }
        Ok(registered)
    }

    /// Run `req` through the full pipeline, returning which stage decided
    /// its fate.
    pub fn submit(&self, req: SubmitBallotRequest) -> PipelineOutcome {
        let ballot_id = req.ballot_id.to_string();
        let station_id = req.station_id.clone();

        let mut received = ReceivedBallot::from_wire(
            req.ballot_id,
            req.station_id,
            crate::transport::rpc::wire_timestamp(req.emitted_at),
            req.sealed_payload,
            req.signature,
        );

        if self.replay_detector.check_and_register(received.id) == DedupOutcome::Duplicate {
            self.metrics.duplicate_total.inc();
            let _ = self.journal.duplicado(&ballot_id, &station_id);
            warn!(ballot_id = %ballot_id, station_id = %station_id, "duplicate ballot rejected");
            return PipelineOutcome::Duplicate;
        }

        self.aggregator.increment_received();
        self.metrics.received_total.inc();
        let _ = self.journal.recepcion(&ballot_id, &station_id, true);

        if self.verifier.verify(&received).is_err() {
            self.metrics.signature_failed_total.inc();
            let _ = self.journal.verificacion(&ballot_id, &station_id, false);
            warn!(ballot_id = %ballot_id, station_id = %station_id, "signature verification failed");
            return PipelineOutcome::SignatureFailed;
        }
        received.verified = true;
        let _ = self.journal.verificacion(&ballot_id, &station_id, true);

        if self.decryptor.decrypt(&mut received).is_err() {
            self.metrics.decrypt_failed_total.inc();
            warn!(ballot_id = %ballot_id, station_id = %station_id, "decryption failed");
            return PipelineOutcome::DecryptFailed;
        }

        if !self.aggregator.count(&mut received) {
            warn!(ballot_id = %ballot_id, station_id = %station_id, "aggregation rejected ballot: missing decrypted candidate");
            return PipelineOutcome::AggregateFailed;
        }

        self.metrics.counted_total.inc();
        let candidate_id = received.decrypted_candidate_id.clone().unwrap_or_default();
        let _ = self.journal.contabilizacion(&ballot_id, &station_id, &candidate_id);
        info!(ballot_id = %ballot_id, station_id = %station_id, candidate_id = %candidate_id, "ballot counted");
        self.counted_ids.insert(received.id, ());

        PipelineOutcome::Counted
    }

    /// Read access to the aggregator, for reporting/printing results.
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Read access to the verifier, for registering station signing keys.
    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// Read access to the decryptor, for registering station AES keys.
    pub fn decryptor(&self) -> &Decryptor {
        &self.decryptor
    }

    /// This tallier's own RSA keypair, to unwrap a station's wrapped AES key.
    pub fn keypair(&self) -> &RsaKeypair {
        &self.keypair
    }
}

#[async_trait]
impl BallotReceiver for Pipeline {
    async fn submit_ballot(&self, req: SubmitBallotRequest) -> bool {
        self.submit(req).is_success()
    }

    async fn ping(&self) -> bool {
        true
    }

    async fn fetch_server_public_key(&self) -> String {
        self.keypair.public_key_spki_b64().unwrap_or_default()
    }

    async fn confirm_ballot(&self, id: Uuid) -> bool {
        self.counted_ids.contains_key(&id)
    }
}
