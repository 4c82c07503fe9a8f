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

//! Polling station entrypoint (systemd-friendly). Loads its configuration
//! and key material, spawns the background sweep/confirmation/prune
//! scheduler, and keeps the process alive until signalled.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ballotcast::config::StationConfig;
use ballotcast::core::crypto::keys::{AesKey, RsaKeypair};
use ballotcast::core::crypto::sealer::Sealer;
use ballotcast::monitoring::metrics::Metrics;
use ballotcast::station::ballot_factory::BallotFactory;
use ballotcast::station::outbox::Outbox;
use ballotcast::station::runtime::StationRuntime;
use ballotcast::station::transmitter::Transmitter;
use ballotcast::transport::http_client::HttpBallotReceiverClient;

#[derive(Parser)]
#[command(about = "Polling station: seals ballots and delivers them to a tallier")]
struct Args {
    /// Properties file with `Station.Id` / `ReceptorVotos.Endpoints` / etc.
    #[arg(long, default_value = "station.properties")]
    config: String,

    /// Directory holding this station's signing/AES key material.
    #[arg(long, default_value = "data/keys")]
    key_dir: String,

    /// If set, seal and submit one demo ballot for this candidate before
    /// entering the background scheduler. Useful for smoke-testing a
    /// freshly deployed station against a tallier.
    #[arg(long)]
    submit: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt().with_target(false).with_level(true).compact().try_init();

    let args = Args::parse();
    let config = StationConfig::load(&args.config).context("loading station config")?;

    let key_dir = PathBuf::from(&args.key_dir);
    std::fs::create_dir_all(&key_dir).context("creating key directory")?;
    let signing_key =
        RsaKeypair::load_or_generate(&key_dir.join("signing.key")).context("loading station signing key")?;
    let aes_key = AesKey::load_or_generate(&key_dir.join("symmetric.key")).context("loading station AES key")?;
    let sealer = Sealer::from_keys(signing_key, aes_key);
    let station_pubkey_b64 = sealer.public_signing_key_base64().context("encoding station public key")?;

    info!(station_id = %config.station_id, tallier = %config.tallier_base_url, "station starting");

    let outbox = Arc::new(Outbox::open(&config.outbox_dir).context("opening outbox")?);
    let client = Arc::new(HttpBallotReceiverClient::new(config.tallier_base_url.clone()));
    let metrics = Arc::new(Metrics::new().context("initializing metrics")?);

    let transmitter = Arc::new(
        Transmitter::new(outbox, client, &config.outbox_dir, metrics, station_pubkey_b64)
            .context("building transmitter")?,
    );

    if let Some(candidate_id) = args.submit {
        let factory = BallotFactory::new(config.station_id.clone(), &sealer);
        let ballot = factory.cast(candidate_id).context("sealing demo ballot")?;
        let outcome = transmitter.submit(ballot).await.context("submitting demo ballot")?;
        info!(?outcome, "demo ballot submitted");
    }

    let runtime = StationRuntime::spawn(transmitter);

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => warn!(error = %e, "failed to listen for shutdown signal"),
    }

    runtime.shutdown().await;
    info!("station stopped");
    Ok(())
}
