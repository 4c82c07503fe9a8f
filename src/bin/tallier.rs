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

//! Central tallier entrypoint (systemd-friendly). Composes the intake
//! pipeline and serves it over HTTP until signalled.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ballotcast::config::TallierConfig;
use ballotcast::core::crypto::decryptor::Decryptor;
use ballotcast::core::crypto::keys::RsaKeypair;
use ballotcast::core::crypto::verifier::Verifier;
use ballotcast::monitoring::metrics::Metrics;
use ballotcast::tallier::aggregator::Aggregator;
use ballotcast::tallier::audit::AuditJournal;
use ballotcast::tallier::pipeline::Pipeline;
use ballotcast::tallier::replay_detector::ReplayDetector;
use ballotcast::transport::http_server;
use ballotcast::transport::rpc::BallotReceiver;

#[derive(Parser)]
#[command(about = "Central tallier: verifies, decrypts and aggregates submitted ballots")]
struct Args {
    /// Properties file with `Tallier.BindAddr` / `Tallier.RegisteredVoters` / etc.
    #[arg(long, default_value = "tallier.properties")]
    config: String,

    /// Directory holding the tallier's own RSA keypair.
    #[arg(long, default_value = "data/keys")]
    key_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt().with_target(false).with_level(true).compact().try_init();

    let args = Args::parse();
    let config = TallierConfig::load(&args.config).context("loading tallier config")?;

    let key_dir = PathBuf::from(&args.key_dir);
    std::fs::create_dir_all(&key_dir).context("creating key directory")?;
    let keypair = Arc::new(
        RsaKeypair::load_or_generate(&key_dir.join("signing.key")).context("loading tallier keypair")?,
    );

    let pipeline = Arc::new(Pipeline::new(
        keypair,
        Arc::new(ReplayDetector::new(config.expected_ballots)),
        Arc::new(Verifier::new()),
        Arc::new(Decryptor::new()),
        Arc::new(Aggregator::new(config.registered_voters)),
        Arc::new(AuditJournal::open(&config.audit_dir).context("opening audit journal")?),
        Arc::new(Metrics::new().context("initializing metrics")?),
    ));

    let registered = pipeline
        .load_station_registry(&config.stations_dir)
        .context("loading station key registry")?;
    if registered == 0 {
        warn!(
            dir = %config.stations_dir.display(),
            "no stations registered; every submission will be rejected until keys are enrolled"
        );
    } else {
        info!(count = registered, dir = %config.stations_dir.display(), "station keys loaded");
    }

    info!(bind_addr = %config.bind_addr, "tallier starting");

    let receiver: Arc<dyn BallotReceiver> = pipeline;
    let app = http_server::router(receiver);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("serving tallier HTTP endpoint")?;

    info!("tallier stopped");
    Ok(())
}
