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

//! Drives the outbox against the tallier RPC: submits new ballots,
//! re-sweeps pending ones, and demotes acknowledged-but-unconfirmed ones
//! back to pending. Breaks the outbox/transmitter cycle per SPEC_FULL.md
//! §9: the transmitter pulls pending entries from the outbox rather than
//! registering a callback into it.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::core::types::Ballot;
use crate::monitoring::metrics::Metrics;
use crate::station::circuit_breaker::{CircuitBreaker, Permit};
use crate::station::confirmation::ConfirmationLedger;
use crate::station::outbox::{Outbox, OutboxError};
use crate::transport::rpc::{BallotReceiverClient, RpcOutcome, SubmitBallotRequest};

/// Transmitter errors.
#[derive(Debug, Error)]
pub enum TransmitError {
    /// The outbox append failed before any RPC was attempted.
    #[error("outbox error: {0}")]
    Outbox(#[from] OutboxError),
}

/// Writer for `votos_transmitidos.log`: one line per acknowledged ballot,
/// `ISO8601|ballot_id|station_id|emitted_at`, per spec §6.
struct TransmittedLog {
    path: PathBuf,
}

impl TransmittedLog {
    fn open(dir: impl AsRef<Path>) -> Result<Self, OutboxError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| OutboxError::Io(e.to_string()))?;
        Ok(Self { path: dir.join("votos_transmitidos.log") })
    }

    fn append(&self, ballot: &Ballot) -> Result<(), OutboxError> {
        let line = format!(
            "{}|{}|{}|{}",
            crate::core::types::IsoTimestamp::now(),
            ballot.id,
            ballot.station_id,
            ballot.emitted_at
        );
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| OutboxError::Io(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| OutboxError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Composes the outbox, the circuit breaker, the confirmation ledger and
/// an RPC client into the station's end-to-end delivery loop.
pub struct Transmitter {
    outbox: Arc<Outbox>,
    breaker: CircuitBreaker,
    client: Arc<dyn BallotReceiverClient>,
    confirmations: ConfirmationLedger,
    transmitted_log: TransmittedLog,
    metrics: Arc<Metrics>,
    station_pubkey_b64: String,
}

impl Transmitter {
    /// Build a transmitter. `log_dir` is where `votos_transmitidos.log` is
    /// written; it is typically the same directory as the outbox.
    pub fn new(
        outbox: Arc<Outbox>,
        client: Arc<dyn BallotReceiverClient>,
        log_dir: impl AsRef<Path>,
        metrics: Arc<Metrics>,
        station_pubkey_b64: String,
    ) -> Result<Self, TransmitError> {
        Ok(Self {
            outbox,
            breaker: CircuitBreaker::default(),
            client,
            confirmations: ConfirmationLedger::new(),
            transmitted_log: TransmittedLog::open(log_dir)?,
            metrics,
            station_pubkey_b64,
        })
    }

    /// Append `ballot` to the outbox, then attempt immediate delivery.
    pub async fn submit(&self, ballot: Ballot) -> Result<RpcOutcome, TransmitError> {
        self.outbox.append(ballot.clone())?;
        Ok(self.transmit(&ballot).await)
    }

    async fn transmit(&self, ballot: &Ballot) -> RpcOutcome {
        if self.breaker.poll() == Permit::Denied {
            self.metrics.breaker_open.set(1);
            return RpcOutcome::BreakerOpen;
        }

        let req = SubmitBallotRequest::from_sealed(ballot, self.station_pubkey_b64.clone());
        let outcome = match self.client.submit_ballot(req).await {
            Ok(true) => {
                self.breaker.on_success();
                self.outbox.mark_acknowledged(ballot.id);
                let _ = self.transmitted_log.append(ballot);
                info!(ballot_id = %ballot.id, station_id = %ballot.station_id, "ballot acknowledged");
                RpcOutcome::Acked
            }
            Ok(false) => {
                // Reached the wire; the tallier's rejection is not a
                // transport fault, so the breaker counter is unaffected.
                self.breaker.on_success();
                warn!(ballot_id = %ballot.id, "ballot rejected by tallier");
                RpcOutcome::Rejected
            }
            Err(e) => {
                self.breaker.on_failure();
                warn!(ballot_id = %ballot.id, error = %e, "transport error submitting ballot");
                RpcOutcome::TransportError
            }
        };
        self.metrics.breaker_open.set(if self.breaker.is_open() { 1 } else { 0 });
        outcome
    }

    /// Re-submit every pending ballot. Aborts early if the breaker trips
    /// mid-sweep, per spec §4.3.
    pub async fn sweep_pending(&self) {
        for ballot in self.outbox.list_pending() {
            if self.breaker.poll() == Permit::Denied {
                break;
            }
            self.transmit(&ballot).await;
        }
    }

    /// Ask the tallier, via a separate `ConfirmBallot` round trip distinct
    /// from the original `SubmitBallot` call, whether each acknowledged
    /// ballot was genuinely counted. Demotes back to pending any ballot the
    /// tallier does not confirm, or that the confirmation call itself fails
    /// to reach.
    pub async fn audit_confirmations(&self) {
        for ballot in self.outbox.list_acknowledged() {
            if self.confirmations.is_confirmed(ballot.id) {
                continue;
            }
            match self.client.confirm_ballot(ballot.id).await {
                Ok(true) => self.confirmations.confirm(ballot.id),
                Ok(false) => {
                    warn!(ballot_id = %ballot.id, "tallier did not confirm acknowledged ballot; demoting to pending");
                    self.outbox.mark_pending(ballot.id);
                }
                Err(e) => {
                    warn!(ballot_id = %ballot.id, error = %e, "confirmation audit transport error; demoting to pending");
                    self.outbox.mark_pending(ballot.id);
                }
            }
        }
    }

    /// Access to the underlying outbox (for pruning, metrics, tests).
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Access to the circuit breaker (for metrics, tests).
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Access to the confirmation ledger (for tests exercising the
    /// auditor's demotion path directly).
    pub fn confirmations(&self) -> &ConfirmationLedger {
        &self.confirmations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Ballot;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use crate::transport::rpc::TransportError;
    use uuid::Uuid;

    struct ScriptedClient {
        online: AtomicBool,
        calls: AtomicU32,
        confirms: AtomicBool,
    }

    #[async_trait]
    impl BallotReceiverClient for ScriptedClient {
        async fn submit_ballot(&self, _req: SubmitBallotRequest) -> Result<bool, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.online.load(Ordering::SeqCst) {
                Ok(true)
            } else {
                Err(TransportError::Network("offline".into()))
            }
        }
        async fn ping(&self) -> Result<bool, TransportError> {
            Ok(self.online.load(Ordering::SeqCst))
        }
        async fn fetch_server_public_key(&self) -> Result<String, TransportError> {
            Ok(String::new())
        }
        async fn confirm_ballot(&self, _id: Uuid) -> Result<bool, TransportError> {
            Ok(self.confirms.load(Ordering::SeqCst))
        }
    }

    fn new_transmitter(online: bool) -> (Transmitter, tempfile::TempDir, Arc<ScriptedClient>) {
        let dir = tempfile::tempdir().unwrap();
        let outbox = Arc::new(Outbox::open(dir.path()).unwrap());
        let client = Arc::new(ScriptedClient {
            online: AtomicBool::new(online),
            calls: AtomicU32::new(0),
            confirms: AtomicBool::new(true),
        });
        let metrics = Arc::new(Metrics::new().unwrap());
        let transmitter =
            Transmitter::new(outbox, client.clone(), dir.path(), metrics, "pubkey".into()).unwrap();
        (transmitter, dir, client)
    }

    #[tokio::test]
    async fn acked_submission_marks_outbox_acknowledged() {
        let (transmitter, _dir, _client) = new_transmitter(true);
        let ballot = Ballot::new("M01", "C1");
        let id = ballot.id;
        let outcome = transmitter.submit(ballot).await.unwrap();
        assert_eq!(outcome, RpcOutcome::Acked);
        assert_eq!(transmitter.outbox().list_acknowledged().len(), 1);
        // No confirmation has been recorded yet: it only arrives through a
        // separate `audit_confirmations` round trip, not the ack itself.
        assert!(!transmitter.confirmations().is_confirmed(id));
    }

    #[tokio::test]
    async fn audit_confirmations_confirms_an_acknowledged_ballot_via_a_separate_round_trip() {
        let (transmitter, _dir, client) = new_transmitter(true);
        let ballot = Ballot::new("M01", "C1");
        let id = ballot.id;
        transmitter.submit(ballot).await.unwrap();
        assert!(!transmitter.confirmations().is_confirmed(id));

        client.confirms.store(true, Ordering::SeqCst);
        transmitter.audit_confirmations().await;

        assert!(transmitter.confirmations().is_confirmed(id));
        assert_eq!(transmitter.outbox().list_acknowledged().len(), 1);
    }

    #[tokio::test]
    async fn transport_failures_trip_the_breaker_and_keep_ballot_pending() {
        let (transmitter, _dir, _client) = new_transmitter(false);
        for _ in 0..3 {
            let outcome = transmitter.submit(Ballot::new("M01", "C1")).await.unwrap();
            assert_ne!(outcome, RpcOutcome::Acked);
        }
        assert!(transmitter.breaker().is_open());
        // Fourth attempt must not hit the network at all.
        let calls_before = _client.calls.load(Ordering::SeqCst);
        let outcome = transmitter.submit(Ballot::new("M01", "C1")).await.unwrap();
        assert_eq!(outcome, RpcOutcome::BreakerOpen);
        assert_eq!(_client.calls.load(Ordering::SeqCst), calls_before);
        assert_eq!(transmitter.outbox().list_pending().len(), 4);
    }

    #[tokio::test]
    async fn audit_confirmations_demotes_unconfirmed_acknowledged_entries() {
        let (transmitter, _dir, client) = new_transmitter(true);
        let ballot = Ballot::new("M01", "C1");
        let id = ballot.id;
        transmitter.outbox().append(ballot).unwrap();
        // Mark acknowledged without ever confirming: simulates an ack the
        // tallier's own counted-ballot record does not actually back.
        transmitter.outbox().mark_acknowledged(id);
        client.confirms.store(false, Ordering::SeqCst);
        transmitter.audit_confirmations().await;
        assert_eq!(transmitter.outbox().list_pending().len(), 1);
        assert!(transmitter.outbox().list_acknowledged().is_empty());
    }
}
