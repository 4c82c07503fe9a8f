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

//! Loads or generates an RSA-2048 keypair for a station or tallier and
//! prints the public half (X.509 SPKI, base64). Idempotent: running it
//! twice against the same `--out-dir` reuses the existing key.

use anyhow::{Context, Result};
use ballotcast::core::crypto::keys::RsaKeypair;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Generate (or load) an RSA-2048 keypair for a station or tallier")]
struct Args {
    /// Directory to write the PKCS#8 private key into (`signing.key`).
    #[arg(long, default_value = "data")]
    out_dir: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut key_path = PathBuf::from(&args.out_dir);
    std::fs::create_dir_all(&key_path).context("creating output directory")?;
    key_path.push("signing.key");

    let existed = key_path.exists();
    let keypair = RsaKeypair::load_or_generate(&key_path).context("loading or generating RSA-2048 keypair")?;
    let public_b64 = keypair.public_key_spki_b64().context("encoding public key")?;

    if existed {
        eprintln!("loaded existing key from {}", key_path.display());
    } else {
        eprintln!("generated new key at {}", key_path.display());
    }
    println!("{public_b64}");
    Ok(())
}
