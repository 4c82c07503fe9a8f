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

//! Scenario 6 (circuit breaker trip and recovery), driven through
//! `Transmitter::sweep_pending` rather than single `submit` calls, so the
//! retry-sweep code path itself is exercised end to end.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use ballotcast::core::types::Ballot;
use ballotcast::monitoring::metrics::Metrics;
use ballotcast::station::outbox::Outbox;
use ballotcast::station::transmitter::Transmitter;
use ballotcast::transport::rpc::{BallotReceiverClient, RpcOutcome, SubmitBallotRequest, TransportError};
use uuid::Uuid;

struct ToggleableClient {
    online: AtomicBool,
    calls: AtomicU32,
}

#[async_trait]
impl BallotReceiverClient for ToggleableClient {
    async fn submit_ballot(&self, _req: SubmitBallotRequest) -> Result<bool, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.online.load(Ordering::SeqCst) {
            Ok(true)
        } else {
            Err(TransportError::Network("tallier offline".into()))
        }
    }
    async fn ping(&self) -> Result<bool, TransportError> {
        Ok(self.online.load(Ordering::SeqCst))
    }
    async fn fetch_server_public_key(&self) -> Result<String, TransportError> {
        Ok(String::new())
    }
    async fn confirm_ballot(&self, _id: Uuid) -> Result<bool, TransportError> {
        Ok(self.online.load(Ordering::SeqCst))
    }
}

#[tokio::test]
async fn scenario_6_breaker_trips_then_recovers_via_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let outbox = Arc::new(Outbox::open(dir.path()).unwrap());
    let client = Arc::new(ToggleableClient { online: AtomicBool::new(false), calls: AtomicU32::new(0) });
    let metrics = Arc::new(Metrics::new().unwrap());
    let transmitter = Arc::new(
        Transmitter::new(outbox, client.clone(), dir.path(), metrics, "pubkey".into()).unwrap(),
    );

    // Three calls with the tallier offline: each is a transport failure.
    for _ in 0..3 {
        let outcome = transmitter.submit(Ballot::new("M01", "C1")).await.unwrap();
        assert_eq!(outcome, RpcOutcome::TransportError);
    }
    assert!(transmitter.breaker().is_open());

    // Fourth call must not reach the network at all.
    let calls_before_trip = client.calls.load(Ordering::SeqCst);
    let outcome = transmitter.submit(Ballot::new("M01", "C1")).await.unwrap();
    assert_eq!(outcome, RpcOutcome::BreakerOpen);
    assert_eq!(client.calls.load(Ordering::SeqCst), calls_before_trip);
    assert_eq!(transmitter.outbox().list_pending().len(), 4);

    // Bring the tallier back online and wait past the breaker's initial
    // backoff (default 5s) before sweeping.
    client.online.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(5200)).await;

    transmitter.sweep_pending().await;

    assert!(!transmitter.breaker().is_open());
    assert_eq!(transmitter.outbox().list_pending().len(), 0);
    assert_eq!(transmitter.outbox().list_acknowledged().len(), 4);
}
