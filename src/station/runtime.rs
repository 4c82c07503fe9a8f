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

//! Background scheduler for the station's periodic tasks: the retry
//! sweep, the confirmation auditor, and outbox pruning. Each runs as its
//! own tokio task; [`StationRuntime::shutdown`] drains them with a
//! 60-second join, per spec §5.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::station::transmitter::Transmitter;

const SWEEP_INITIAL_DELAY: Duration = Duration::from_secs(30);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const AUDIT_INITIAL_DELAY: Duration = Duration::from_secs(45);
const AUDIT_INTERVAL: Duration = Duration::from_secs(90);
const PRUNE_INTERVAL: Duration = Duration::from_secs(300);
const PRUNE_AGE: Duration = Duration::from_secs(86_400);
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Owns the station's background scheduler.
pub struct StationRuntime {
    sweep: JoinHandle<()>,
    audit: JoinHandle<()>,
    prune: JoinHandle<()>,
}

impl StationRuntime {
    /// Spawn the sweep, confirmation-audit and prune tasks against
    /// `transmitter`.
    pub fn spawn(transmitter: Arc<Transmitter>) -> Self {
        let sweep = {
            let transmitter = transmitter.clone();
            tokio::spawn(async move {
                tokio::time::sleep(SWEEP_INITIAL_DELAY).await;
                let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
                loop {
                    ticker.tick().await;
                    info!("retry sweep starting");
                    transmitter.sweep_pending().await;
                }
            })
        };

        let audit = {
            let transmitter = transmitter.clone();
            tokio::spawn(async move {
                tokio::time::sleep(AUDIT_INITIAL_DELAY).await;
                let mut ticker = tokio::time::interval(AUDIT_INTERVAL);
                loop {
                    ticker.tick().await;
                    transmitter.audit_confirmations().await;
                }
            })
        };

        let prune = tokio::spawn(async move {
            tokio::time::sleep(PRUNE_INTERVAL).await;
            let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                ticker.tick().await;
                match transmitter.outbox().prune(PRUNE_AGE) {
                    Ok(n) if n > 0 => info!(pruned = n, "pruned acknowledged ballots"),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "outbox prune failed"),
                }
            }
        });

        Self { sweep, audit, prune }
    }

    /// Abort every background task and wait up to 60 seconds for them to
    /// unwind.
    pub async fn shutdown(self) {
        self.sweep.abort();
        self.audit.abort();
        self.prune.abort();
        let _ = tokio::time::timeout(SHUTDOWN_JOIN_TIMEOUT, async {
            let _ = self.sweep.await;
            let _ = self.audit.await;
            let _ = self.prune.await;
        })
        .await;
    }
}
