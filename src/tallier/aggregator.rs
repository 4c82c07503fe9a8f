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

//! Tallier-side vote aggregation: atomic counters plus per-candidate and
//! per-station tallies.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use dashmap::DashMap;

use crate::core::types::ReceivedBallot;

/// A point-in-time view over the aggregate state.
#[derive(Clone, Debug)]
pub struct Summary {
    /// Ballots that passed dedup and entered the pipeline.
    pub received_total: u64,
    /// Ballots successfully counted.
    pub counted_total: u64,
    /// Per-candidate counts.
    pub by_candidate: BTreeMap<String, u64>,
    /// Per-station counts.
    pub by_station: BTreeMap<String, u64>,
}

/// Aggregates counted ballots into candidate and station tallies.
pub struct Aggregator {
    by_candidate: DashMap<String, AtomicU64>,
    by_station: DashMap<String, AtomicU64>,
    received_total: AtomicU64,
    counted_total: AtomicU64,
    registered_voters: u64,
    // Readers take the read side of this lock to snapshot the three
    // counters as a consistent *set*; writers only ever hold atomic
    // increments, per spec §4.8/§5.
    snapshot_guard: RwLock<()>,
}

impl Aggregator {
    /// Create an aggregator. `registered_voters` is configured out-of-band
    /// and used only to compute turnout percentage.
    pub fn new(registered_voters: u64) -> Self {
        Self {
            by_candidate: DashMap::new(),
            by_station: DashMap::new(),
            received_total: AtomicU64::new(0),
            counted_total: AtomicU64::new(0),
            registered_voters,
            snapshot_guard: RwLock::new(()),
        }
    }

    /// Called at pipeline entry, after the dedup pass admits the ballot.
    pub fn increment_received(&self) {
        self.received_total.fetch_add(1, Ordering::SeqCst);
    }

    /// Count a decrypted ballot. Requires `decrypted_candidate_id` to be
    /// non-empty; bumps the three counters and marks the ballot `counted`.
    /// Returns `false` (no side effects) otherwise.
    pub fn count(&self, ballot: &mut ReceivedBallot) -> bool {
        let Some(candidate_id) = ballot.decrypted_candidate_id.clone() else {
            return false;
        };
        if candidate_id.is_empty() {
            return false;
        }

        self.by_candidate
            .entry(candidate_id)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst);
        self.by_station
            .entry(ballot.station_id.clone())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst);
        self.counted_total.fetch_add(1, Ordering::SeqCst);
        ballot.counted = true;
        true
    }

    /// Snapshot per-candidate tallies.
    pub fn results_by_candidate(&self) -> BTreeMap<String, u64> {
        let _guard = self.snapshot_guard.read().expect("aggregator lock poisoned");
        self.by_candidate
            .iter()
            .map(|e| (e.key().clone(), e.value().load(Ordering::SeqCst)))
            .collect()
    }

    /// Snapshot per-station tallies.
    pub fn results_by_station(&self) -> BTreeMap<String, u64> {
        let _guard = self.snapshot_guard.read().expect("aggregator lock poisoned");
        self.by_station
            .iter()
            .map(|e| (e.key().clone(), e.value().load(Ordering::SeqCst)))
            .collect()
    }

    /// Percentage of counted ballots held by each candidate.
    pub fn percentages_by_candidate(&self) -> BTreeMap<String, f64> {
        let by_candidate = self.results_by_candidate();
        let total: u64 = by_candidate.values().sum();
        by_candidate
            .into_iter()
            .map(|(candidate, count)| {
                let pct = if total == 0 { 0.0 } else { (count as f64) * 100.0 / (total as f64) };
                (candidate, pct)
            })
            .collect()
    }

    /// Turnout as a percentage of `registered_voters`.
    pub fn turnout_percent(&self) -> f64 {
        if self.registered_voters == 0 {
            return 0.0;
        }
        let counted = self.counted_total.load(Ordering::SeqCst) as f64;
        counted * 100.0 / (self.registered_voters as f64)
    }

    /// Total ballots admitted past dedup.
    pub fn received_total(&self) -> u64 {
        self.received_total.load(Ordering::SeqCst)
    }

    /// Total ballots counted.
    pub fn counted_total(&self) -> u64 {
        self.counted_total.load(Ordering::SeqCst)
    }

    /// A full snapshot suitable for printing or serving.
    pub fn summary(&self) -> Summary {
        let _guard = self.snapshot_guard.read().expect("aggregator lock poisoned");
        Summary {
            received_total: self.received_total.load(Ordering::SeqCst),
            counted_total: self.counted_total.load(Ordering::SeqCst),
            by_candidate: self
                .by_candidate
                .iter()
                .map(|e| (e.key().clone(), e.value().load(Ordering::SeqCst)))
                .collect(),
            by_station: self
                .by_station
                .iter()
                .map(|e| (e.key().clone(), e.value().load(Ordering::SeqCst)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Ballot, IsoTimestamp};
    use uuid::Uuid;

    fn received(candidate: Option<&str>, station: &str) -> ReceivedBallot {
        ReceivedBallot {
            id: Uuid::new_v4(),
            station_id: station.to_string(),
            emitted_at: IsoTimestamp::now(),
            sealed_payload: Vec::new(),
            signature: Vec::new(),
            received_at: IsoTimestamp::now(),
            decrypted_candidate_id: candidate.map(str::to_string),
            verified: true,
            counted: false,
        }
    }

    #[test]
    fn count_requires_decrypted_candidate() {
        let agg = Aggregator::new(1000);
        let mut ballot = received(None, "M01");
        assert!(!agg.count(&mut ballot));
        assert_eq!(agg.counted_total(), 0);
    }

    #[test]
    fn count_bumps_all_three_counters_and_marks_counted() {
        let agg = Aggregator::new(1000);
        let _ = Ballot::new("M01", "C3"); // candidate factory is station-side; not used here
        let mut ballot = received(Some("C3"), "M01");
        agg.increment_received();
        assert!(agg.count(&mut ballot));
        assert!(ballot.counted);
        assert_eq!(agg.counted_total(), 1);
        assert_eq!(agg.received_total(), 1);
        assert_eq!(agg.results_by_candidate().get("C3"), Some(&1));
        assert_eq!(agg.results_by_station().get("M01"), Some(&1));
    }

    #[test]
    fn repeated_count_calls_advance_candidate_by_one_each() {
        let agg = Aggregator::new(1000);
        let mut a = received(Some("C1"), "M01");
        let mut b = received(Some("C1"), "M02");
        agg.count(&mut a);
        agg.count(&mut b);
        assert_eq!(agg.results_by_candidate().get("C1"), Some(&2));
    }

    #[test]
    fn turnout_percent_uses_registered_voters() {
        let agg = Aggregator::new(10);
        for _ in 0..5 {
            let mut b = received(Some("C1"), "M01");
            agg.count(&mut b);
        }
        assert!((agg.turnout_percent() - 50.0).abs() < 1e-9);
    }
}
