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

//! Constructs and seals ballots on behalf of the station's UI/request
//! layer. The voter-eligibility check and identity capture are external
//! collaborators outside this crate's scope; this factory assumes the
//! caller has already obtained a `candidate_id`.

use crate::core::crypto::sealer::{SealError, Sealer};
use crate::core::types::Ballot;

/// Builds a fresh ballot for `station_id` and seals it with `sealer`.
pub struct BallotFactory<'a> {
    station_id: String,
    sealer: &'a Sealer,
}

impl<'a> BallotFactory<'a> {
    /// Create a factory for `station_id`, sealing with `sealer`.
    pub fn new(station_id: impl Into<String>, sealer: &'a Sealer) -> Self {
        Self { station_id: station_id.into(), sealer }
    }

    /// Create and seal a ballot for `candidate_id`.
    pub fn cast(&self, candidate_id: impl Into<String>) -> Result<Ballot, SealError> {
        let ballot = Ballot::new(self.station_id.clone(), candidate_id);
        self.sealer.seal(ballot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_produces_a_sealed_ballot() {
        let sealer = Sealer::generate().unwrap();
        let factory = BallotFactory::new("M01", &sealer);
        let ballot = factory.cast("C1").unwrap();
        assert!(ballot.is_sealed());
        assert_eq!(ballot.station_id, "M01");
    }
}
