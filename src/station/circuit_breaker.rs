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

//! Station-side circuit breaker: stops calling the tallier after a streak
//! of transport failures and probes again on exponential backoff.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Consecutive-failure threshold before the breaker trips open.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
/// Initial backoff before the first reopen probe.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(5000);
/// Ceiling the backoff is capped at after repeated trips.
pub const MAX_BACKOFF: Duration = Duration::from_millis(300_000);

#[derive(Clone, Copy, Debug)]
enum Inner {
    Closed { consecutive_failures: u32 },
    Open { reopen_at: Instant, backoff: Duration },
}

/// Whether a caller is currently permitted to attempt the wire call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permit {
    /// The breaker is closed (or in its half-open probe window): attempt the call.
    Allowed,
    /// The breaker is open: fail fast without touching the network.
    Denied,
}

/// A circuit breaker guarding calls to the tallier RPC.
pub struct CircuitBreaker {
    state: Mutex<Inner>,
    failure_threshold: u32,
    initial_backoff: Duration,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_INITIAL_BACKOFF)
    }
}

impl CircuitBreaker {
    /// Build a breaker with a custom failure threshold and initial backoff.
    pub fn new(failure_threshold: u32, initial_backoff: Duration) -> Self {
        Self {
            state: Mutex::new(Inner::Closed { consecutive_failures: 0 }),
            failure_threshold,
            initial_backoff,
        }
    }

    /// Ask whether a call is currently permitted. In the `Open` state this
    /// also performs the "first call after backoff expiry is allowed
    /// through" half-open transition implicitly: callers that are denied
    /// should not attempt the network; callers that are allowed must report
    /// the outcome via [`on_success`]/[`on_failure`].
    pub fn poll(&self) -> Permit {
        let mut state = self.state.lock().expect("breaker lock poisoned");
        match *state {
            Inner::Closed { .. } => Permit::Allowed,
            Inner::Open { reopen_at, .. } => {
                if Instant::now() >= reopen_at {
                    Permit::Allowed
                } else {
                    Permit::Denied
                }
            }
        }
    }

    /// Report a successful call: resets the failure counter (or closes the
    /// breaker and resets backoff, if this was the half-open probe).
    pub fn on_success(&self) {
        let mut state = self.state.lock().expect("breaker lock poisoned");
        *state = Inner::Closed { consecutive_failures: 0 };
    }

    /// Report a failed call: increments the failure counter and trips the
    /// breaker open once the threshold is reached; if this was the
    /// half-open probe, reopens with doubled (capped) backoff.
    pub fn on_failure(&self) {
        let mut state = self.state.lock().expect("breaker lock poisoned");
        *state = match *state {
            Inner::Closed { consecutive_failures } => {
                let failures = consecutive_failures + 1;
                if failures >= self.failure_threshold {
                    Inner::Open { reopen_at: Instant::now() + self.initial_backoff, backoff: self.initial_backoff }
                } else {
                    Inner::Closed { consecutive_failures: failures }
                }
            }
            Inner::Open { backoff, .. } => {
                let next_backoff = (backoff * 2).min(MAX_BACKOFF);
                Inner::Open { reopen_at: Instant::now() + next_backoff, backoff: next_backoff }
            }
        };
    }

    /// Whether the breaker is currently open (for metrics/diagnostics).
    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock().expect("breaker lock poisoned"), Inner::Open { .. })
    }
}
