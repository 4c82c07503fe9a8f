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

//! Two-stage replay/duplicate detector: a Bloom-style probabilistic
//! prefilter guarding an exact membership set, so that `CheckAndRegister`
//! admits a given ballot id exactly once under concurrent callers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use uuid::Uuid;

/// Below this expected-ballot-count the prefilter is skipped entirely and
/// only the exact set is consulted (spec §9: wasteful for small populations).
pub const SKIP_PREFILTER_BELOW: u64 = 10_000;

const DEFAULT_FALSE_POSITIVE_RATE: f64 = 1e-3;

/// Outcome of a `CheckAndRegister` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupOutcome {
    /// First time this id has been seen; it is now registered.
    New,
    /// This id was already registered.
    Duplicate,
}

struct Bloom {
    bits: Vec<AtomicU64>,
    m: u64,
    k: u32,
}

impl Bloom {
    fn new(expected: u64, false_positive_rate: f64) -> Self {
        let n = expected.max(1) as f64;
        let p = false_positive_rate;
        let m = (-(n * p.ln()) / (std::f64::consts::LN_2.powi(2))).ceil().max(64.0) as u64;
        let k = (((m as f64 / n) * std::f64::consts::LN_2).round() as u32).max(1);
        let words = (m as usize / 64) + 1;
        Self {
            bits: (0..words).map(|_| AtomicU64::new(0)).collect(),
            m,
            k,
        }
    }

    fn indices(&self, id: &Uuid) -> Vec<u64> {
        let base = base_hash(id);
        (0..self.k)
            .map(|seed| mix(base ^ (seed as u64)) % self.m)
            .collect()
    }

    /// Returns `true` if the id was (probably) already present.
    fn check_and_set(&self, id: &Uuid) -> bool {
        let mut all_set = true;
        for idx in self.indices(id) {
            let word = (idx / 64) as usize;
            let bit = idx % 64;
            let mask = 1u64 << bit;
            let prev = self.bits[word].fetch_or(mask, Ordering::SeqCst);
            if prev & mask == 0 {
                all_set = false;
            }
        }
        all_set
    }
}

fn base_hash(id: &Uuid) -> u64 {
    let bytes = id.as_bytes();
    let mut h = 0u64;
    for chunk in bytes.chunks(8) {
        let mut buf = [0u8; 8];
        buf[..chunk.len()].copy_from_slice(chunk);
        h ^= u64::from_le_bytes(buf);
    }
    h
}

/// Murmur3-style 32-bit finaliser, applied per spec §4.5's exact formula,
/// widened to mix a 64-bit seed.
fn mix(mut h: u64) -> u64 {
    let mut lo = (h & 0xFFFF_FFFF) as u32;
    h >>= 32;
    let hi = (h & 0xFFFF_FFFF) as u32;
    lo ^= hi;
    lo ^= lo >> 16;
    lo = lo.wrapping_mul(0x85ebca6b);
    lo ^= lo >> 13;
    lo = lo.wrapping_mul(0xc2b2ae35);
    lo ^= lo >> 16;
    lo as u64
}

/// The replay detector. Owns the prefilter (when enabled) and the exact set.
pub struct ReplayDetector {
    prefilter: Option<Mutex<Bloom>>,
    exact: DashMap<Uuid, ()>,
}

impl ReplayDetector {
    /// Build a detector sized for `expected_ballots`; per spec §9, the
    /// prefilter is omitted entirely below [`SKIP_PREFILTER_BELOW`].
    pub fn new(expected_ballots: u64) -> Self {
        let prefilter = if expected_ballots < SKIP_PREFILTER_BELOW {
            None
        } else {
            Some(Mutex::new(Bloom::new(expected_ballots, DEFAULT_FALSE_POSITIVE_RATE)))
        };
        Self { prefilter, exact: DashMap::new() }
    }

    /// Atomically decide whether `id` has been seen before, registering it
    /// if not. Two concurrent calls for the same id return `New` exactly once.
    pub fn check_and_register(&self, id: Uuid) -> DedupOutcome {
        if let Some(bloom) = &self.prefilter {
            let possibly_present = {
                let guard = bloom.lock().expect("bloom mutex poisoned");
                guard.check_and_set(&id)
            };
            if !possibly_present {
                // Prefilter said "definitely absent"; exact set insert still
                // races against a concurrent caller for the same id, so the
                // exact set's entry API is the true atomicity boundary.
                return self.register_exact(id);
            }
        }
        self.register_exact(id)
    }

    fn register_exact(&self, id: Uuid) -> DedupOutcome {
        match self.exact.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => DedupOutcome::Duplicate,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                DedupOutcome::New
            }
        }
    }

    /// Count of ids ever registered (for diagnostics/tests).
    pub fn registered_count(&self) -> usize {
        self.exact.len()
    }
}
