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

//! Tallier-side HTTP transport: binds the `BallotReceiver` contract to
//! three axum routes, per SPEC_FULL.md §6.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::transport::rpc::{
    BallotReceiver, ConfirmBallotResponse, PingResponse, PublicKeyResponse, SubmitBallotRequest,
    SubmitBallotResponse,
};

/// Build the axum router serving `receiver` over HTTP.
pub fn router(receiver: Arc<dyn BallotReceiver>) -> Router {
    Router::new()
        .route("/submit-ballot", post(submit_ballot))
        .route("/ping", get(ping))
        .route("/public-key", get(public_key))
        .route("/confirm-ballot/:id", get(confirm_ballot))
        .with_state(receiver)
}

async fn submit_ballot(
    State(receiver): State<Arc<dyn BallotReceiver>>,
    Json(req): Json<SubmitBallotRequest>,
) -> Json<SubmitBallotResponse> {
    let ok = receiver.submit_ballot(req).await;
    Json(SubmitBallotResponse { ok })
}

async fn ping(State(receiver): State<Arc<dyn BallotReceiver>>) -> Json<PingResponse> {
    Json(PingResponse { ok: receiver.ping().await })
}

async fn public_key(State(receiver): State<Arc<dyn BallotReceiver>>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse { public_key_b64: receiver.fetch_server_public_key().await })
}

async fn confirm_ballot(
    State(receiver): State<Arc<dyn BallotReceiver>>,
    Path(id): Path<Uuid>,
) -> Json<ConfirmBallotResponse> {
    Json(ConfirmBallotResponse { confirmed: receiver.confirm_ballot(id).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tallier::aggregator::Aggregator;
    use crate::tallier::audit::AuditJournal;
    use crate::tallier::pipeline::Pipeline;
    use crate::tallier::replay_detector::ReplayDetector;
    use crate::core::crypto::decryptor::Decryptor;
    use crate::core::crypto::keys::RsaKeypair;
    use crate::core::crypto::verifier::Verifier;
    use crate::monitoring::metrics::Metrics;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn ping_route_returns_ok_true() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline: Arc<dyn BallotReceiver> = Arc::new(Pipeline::new(
            Arc::new(RsaKeypair::generate().unwrap()),
            Arc::new(ReplayDetector::new(10)),
            Arc::new(Verifier::new()),
            Arc::new(Decryptor::new()),
            Arc::new(Aggregator::new(10)),
            Arc::new(AuditJournal::open(dir.path()).unwrap()),
            Arc::new(Metrics::new().unwrap()),
        ));
        let app = router(pipeline);
        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
