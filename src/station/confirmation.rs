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

//! The confirmation ledger backing a genuine confirmation auditor (see
//! SPEC_FULL.md §9): a cache of receipts distinct from the outbox's own
//! `acknowledged` flag, populated only by a dedicated `ConfirmBallot`
//! round trip that the auditor issues after the original `SubmitBallot`
//! ack, never by that ack's own return value.

use dashmap::DashMap;
use uuid::Uuid;

/// Tracks which acknowledged ballots have a genuine out-of-band
/// confirmation on file.
#[derive(Default)]
pub struct ConfirmationLedger {
    confirmed: DashMap<Uuid, ()>,
}

impl ConfirmationLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a genuine confirmation for `id`.
    pub fn confirm(&self, id: Uuid) {
        self.confirmed.insert(id, ());
    }

    /// Whether `id` has a confirmation on file.
    pub fn is_confirmed(&self, id: Uuid) -> bool {
        self.confirmed.contains_key(&id)
    }

    /// Drop the confirmation record for `id` (e.g. once it has been pruned
    /// from the outbox and no longer needs tracking).
    pub fn forget(&self, id: Uuid) {
        self.confirmed.remove(&id);
    }
}
