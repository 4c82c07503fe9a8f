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

//! An in-process `BallotReceiverClient` that calls a `BallotReceiver`
//! directly, with no network hop. Used by tests and single-process demos
//! that want the full pipeline without standing up axum/reqwest.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::transport::rpc::{BallotReceiver, BallotReceiverClient, SubmitBallotRequest, TransportError};

/// Wraps a `BallotReceiver` so it can be driven through the
/// `BallotReceiverClient` interface without a transport in between.
pub struct LoopbackClient {
    receiver: Arc<dyn BallotReceiver>,
}

impl LoopbackClient {
    /// Build a loopback client around `receiver`.
    pub fn new(receiver: Arc<dyn BallotReceiver>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl BallotReceiverClient for LoopbackClient {
    async fn submit_ballot(&self, req: SubmitBallotRequest) -> Result<bool, TransportError> {
        Ok(self.receiver.submit_ballot(req).await)
    }

    async fn ping(&self) -> Result<bool, TransportError> {
        Ok(self.receiver.ping().await)
    }

    async fn fetch_server_public_key(&self) -> Result<String, TransportError> {
        Ok(self.receiver.fetch_server_public_key().await)
    }

    async fn confirm_ballot(&self, id: Uuid) -> Result<bool, TransportError> {
        Ok(self.receiver.confirm_ballot(id).await)
    }
}
