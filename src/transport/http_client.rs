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

//! Station-side HTTP client: calls the tallier's axum routes with reqwest.

use async_trait::async_trait;
use uuid::Uuid;

use crate::transport::rpc::{
    BallotReceiverClient, ConfirmBallotResponse, PingResponse, PublicKeyResponse, SubmitBallotRequest,
    SubmitBallotResponse, TransportError,
};

/// An HTTP-backed `BallotReceiverClient`, pointed at a tallier's base URL
/// (e.g. `http://tallier.example:8080`).
pub struct HttpBallotReceiverClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpBallotReceiverClient {
    /// Build a client against `base_url` (no trailing slash required).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http: reqwest::Client::new() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[async_trait]
impl BallotReceiverClient for HttpBallotReceiverClient {
    async fn submit_ballot(&self, req: SubmitBallotRequest) -> Result<bool, TransportError> {
        let resp = self
            .http
            .post(self.url("submit-ballot"))
            .json(&req)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?
            .json::<SubmitBallotResponse>()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(resp.ok)
    }

    async fn ping(&self) -> Result<bool, TransportError> {
        let resp = self
            .http
            .get(self.url("ping"))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?
            .json::<PingResponse>()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(resp.ok)
    }

    async fn fetch_server_public_key(&self) -> Result<String, TransportError> {
        let resp = self
            .http
            .get(self.url("public-key"))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?
            .json::<PublicKeyResponse>()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(resp.public_key_b64)
    }

    async fn confirm_ballot(&self, id: Uuid) -> Result<bool, TransportError> {
        let resp = self
            .http
            .get(self.url(&format!("confirm-ballot/{id}")))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?
            .json::<ConfirmBallotResponse>()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(resp.confirmed)
    }
}
