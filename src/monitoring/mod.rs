#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Observability: Prometheus metrics shared by stations and talliers.

pub mod metrics;
