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

//! ballotcast - secure vote ingestion pipeline.
//!
//! This crate provides:
//! - A hybrid RSA/AES-256-CBC sealing contract between polling stations and
//!   a central tallier (`core::crypto`).
//! - A durable station-side outbox with circuit-breaker retry delivery
//!   (`station`).
//! - A tallier-side intake pipeline: replay detection, signature
//!   verification, decryption, aggregation and an audit journal (`tallier`).
//! - Pluggable RPC transport adapters (`transport`).
//! - Monitoring via Prometheus metrics and a flat properties-style
//!   configuration loader (`monitoring`, `config`).

/// Core protocol primitives: wire/data records and the cryptographic contract.
pub mod core;
/// Flat properties-style configuration for stations and talliers.
pub mod config;
/// Observability: Prometheus metrics.
pub mod monitoring;
/// Station-side outbox, circuit breaker and retry transmitter.
pub mod station;
/// Tallier-side intake pipeline: dedup, verify, decrypt, aggregate, audit.
pub mod tallier;
/// RPC contract and transport adapters (HTTP, in-process loopback).
pub mod transport;
