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

//! Ballot-domain Prometheus metrics for stations and talliers.

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
}

/// Metrics container, shared across the intake pipeline and the outbox.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Ballots admitted past dedup (tallier).
    pub received_total: IntCounter,
    /// Ballots successfully counted (tallier).
    pub counted_total: IntCounter,
    /// Duplicate submissions rejected by the replay detector (tallier).
    pub duplicate_total: IntCounter,
    /// Signature verification failures (tallier).
    pub signature_failed_total: IntCounter,
    /// Decryption failures (tallier).
    pub decrypt_failed_total: IntCounter,

    /// Whether the station's circuit breaker is currently open (1) or not (0).
    pub breaker_open: IntGauge,
    /// Ballots currently pending in the station outbox.
    pub outbox_pending: IntGauge,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let received_total = IntCounter::new("ballotcast_received_total", "Ballots admitted past dedup")
            .map_err(|_| MetricsError::Prom)?;
        let counted_total = IntCounter::new("ballotcast_counted_total", "Ballots successfully counted")
            .map_err(|_| MetricsError::Prom)?;
        let duplicate_total = IntCounter::new("ballotcast_duplicate_total", "Duplicate submissions rejected")
            .map_err(|_| MetricsError::Prom)?;
        let signature_failed_total = IntCounter::new(
            "ballotcast_signature_failed_total",
            "Signature verification failures",
        )
        .map_err(|_| MetricsError::Prom)?;
        let decrypt_failed_total = IntCounter::new("ballotcast_decrypt_failed_total", "Decryption failures")
            .map_err(|_| MetricsError::Prom)?;

        let breaker_open = IntGauge::new("ballotcast_breaker_open", "1 if the station breaker is open")
            .map_err(|_| MetricsError::Prom)?;
        let outbox_pending = IntGauge::new("ballotcast_outbox_pending", "Ballots pending in the outbox")
            .map_err(|_| MetricsError::Prom)?;

        registry.register(Box::new(received_total.clone())).map_err(|_| MetricsError::Prom)?;
        registry.register(Box::new(counted_total.clone())).map_err(|_| MetricsError::Prom)?;
        registry.register(Box::new(duplicate_total.clone())).map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(signature_failed_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(decrypt_failed_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry.register(Box::new(breaker_open.clone())).map_err(|_| MetricsError::Prom)?;
        registry.register(Box::new(outbox_pending.clone())).map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            received_total,
            counted_total,
            duplicate_total,
            signature_failed_total,
            decrypt_failed_total,
            breaker_open,
            outbox_pending,
        })
    }
}
