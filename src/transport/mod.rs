#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! The `BallotReceiver` RPC contract and its transport adapters.

pub mod http_client;
pub mod http_server;
pub mod loopback;
pub mod rpc;
