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

//! Scenario 4 (concurrent unique ballots) plus P1/P7/P8 as property tests.

use std::sync::Arc;
use std::thread;

use proptest::prelude::*;

use ballotcast::core::crypto::decryptor::Decryptor;
use ballotcast::core::crypto::keys::RsaKeypair;
use ballotcast::core::crypto::sealer::Sealer;
use ballotcast::core::crypto::verifier::Verifier;
use ballotcast::core::types::Ballot;
use ballotcast::monitoring::metrics::Metrics;
use ballotcast::tallier::aggregator::Aggregator;
use ballotcast::tallier::audit::AuditJournal;
use ballotcast::tallier::pipeline::{Pipeline, PipelineOutcome};
use ballotcast::tallier::replay_detector::ReplayDetector;
use ballotcast::transport::rpc::SubmitBallotRequest;

const WORKERS: usize = 20;
const PER_WORKER: usize = 250;
const STATIONS: usize = 50;

#[test]
fn scenario_4_concurrent_unique_ballots_are_each_counted_once() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(RsaKeypair::generate().unwrap()),
        Arc::new(ReplayDetector::new((WORKERS * PER_WORKER) as u64)),
        Arc::new(Verifier::new()),
        Arc::new(Decryptor::new()),
        Arc::new(Aggregator::new(100_000)),
        Arc::new(AuditJournal::open(dir.path()).unwrap()),
        Arc::new(Metrics::new().unwrap()),
    ));

    let sealers: Vec<Arc<Sealer>> = (0..STATIONS).map(|_| Arc::new(Sealer::generate().unwrap())).collect();
    for (i, sealer) in sealers.iter().enumerate() {
        let station_id = format!("M{i:02}");
        pipeline
            .verifier()
            .register_station_signing_key(&station_id, &sealer.public_signing_key_base64().unwrap())
            .unwrap();
        pipeline.decryptor().register_station_key(&station_id, sealer.aes_key());
    }

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let pipeline = pipeline.clone();
            let sealers = sealers.clone();
            thread::spawn(move || {
                let mut acks = 0usize;
                for i in 0..PER_WORKER {
                    let station_idx = (worker * PER_WORKER + i) % STATIONS;
                    let station_id = format!("M{station_idx:02}");
                    let sealer = &sealers[station_idx];
                    let sealed = sealer.seal(Ballot::new(station_id, "C1")).unwrap();
                    let req = SubmitBallotRequest::from_sealed(&sealed, sealer.public_signing_key_base64().unwrap());
                    if pipeline.submit(req) == PipelineOutcome::Counted {
                        acks += 1;
                    }
                }
                acks
            })
        })
        .collect();

    let total_acks: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total_acks, WORKERS * PER_WORKER);
    assert_eq!(pipeline.aggregator().received_total(), (WORKERS * PER_WORKER) as u64);
    assert_eq!(pipeline.aggregator().counted_total(), (WORKERS * PER_WORKER) as u64);
    let total_by_candidate: u64 = pipeline.aggregator().results_by_candidate().values().sum();
    assert_eq!(total_by_candidate, (WORKERS * PER_WORKER) as u64);
}

proptest! {
    /// P8: received_total >= counted_total >= sum(by_candidate), with
    /// equality between the latter two at quiescence (single-threaded here).
    #[test]
    fn p8_counter_ordering_holds(candidates in prop::collection::vec("[A-Z]", 1..20)) {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Arc::new(RsaKeypair::generate().unwrap()),
            Arc::new(ReplayDetector::new(100)),
            Arc::new(Verifier::new()),
            Arc::new(Decryptor::new()),
            Arc::new(Aggregator::new(1000)),
            Arc::new(AuditJournal::open(dir.path()).unwrap()),
            Arc::new(Metrics::new().unwrap()),
        );
        let sealer = Sealer::generate().unwrap();
        pipeline
            .verifier()
            .register_station_signing_key("M01", &sealer.public_signing_key_base64().unwrap())
            .unwrap();
        pipeline.decryptor().register_station_key("M01", sealer.aes_key());

        for candidate in &candidates {
            let sealed = sealer.seal(Ballot::new("M01", candidate.clone())).unwrap();
            let req = SubmitBallotRequest::from_sealed(&sealed, sealer.public_signing_key_base64().unwrap());
            pipeline.submit(req);
        }

        let received = pipeline.aggregator().received_total();
        let counted = pipeline.aggregator().counted_total();
        let by_candidate: u64 = pipeline.aggregator().results_by_candidate().values().sum();
        prop_assert!(received >= counted);
        prop_assert!(counted >= by_candidate);
        prop_assert_eq!(counted, by_candidate);
    }

    /// P7: submitting the same ballot id N>=2 times yields at most one
    /// true acknowledgement; the candidate's count advances by exactly 1.
    #[test]
    fn p7_repeated_submission_counts_once(n in 2usize..6) {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Arc::new(RsaKeypair::generate().unwrap()),
            Arc::new(ReplayDetector::new(100)),
            Arc::new(Verifier::new()),
            Arc::new(Decryptor::new()),
            Arc::new(Aggregator::new(1000)),
            Arc::new(AuditJournal::open(dir.path()).unwrap()),
            Arc::new(Metrics::new().unwrap()),
        );
        let sealer = Sealer::generate().unwrap();
        pipeline
            .verifier()
            .register_station_signing_key("M01", &sealer.public_signing_key_base64().unwrap())
            .unwrap();
        pipeline.decryptor().register_station_key("M01", sealer.aes_key());

        let sealed = sealer.seal(Ballot::new("M01", "C9")).unwrap();
        let req = SubmitBallotRequest::from_sealed(&sealed, sealer.public_signing_key_base64().unwrap());

        let mut true_acks = 0usize;
        for _ in 0..n {
            if pipeline.submit(req.clone()) == PipelineOutcome::Counted {
                true_acks += 1;
            }
        }

        prop_assert_eq!(true_acks, 1);
        prop_assert_eq!(pipeline.aggregator().results_by_candidate().get("C9").copied(), Some(1));
    }
}
