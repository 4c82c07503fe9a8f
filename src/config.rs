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

//! Flat `KEY=VALUE` properties-style configuration, per spec §6. This is a
//! hand-rolled reader rather than a TOML/JSON parser because the legacy
//! format (`ReceptorVotos.Endpoints=tcp -h host -p 10000`) is not valid
//! syntax for either of those.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The properties file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// A required key was missing or malformed.
    #[error("missing or invalid config key: {0}")]
    InvalidKey(String),
}

fn env_first(keys: &[&str]) -> Option<String> {
    for &k in keys {
        if let Ok(v) = std::env::var(k) {
            if !v.trim().is_empty() {
                return Some(v);
            }
        }
    }
    None
}

/// Read a flat `KEY=VALUE` properties file. `#`-prefixed lines and blank
/// lines are ignored; no interpolation or escaping is performed.
pub fn load_properties(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>, ConfigError> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
    let mut props = BTreeMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else { continue };
        props.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(props)
}

/// Parse the legacy `tcp -h host -p port` endpoint syntax into an HTTP
/// base URL consumable by [`crate::transport::http_client`].
pub fn parse_endpoint_to_http_url(raw: &str) -> Result<String, ConfigError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let mut host = None;
    let mut port = None;
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "-h" if i + 1 < tokens.len() => {
                host = Some(tokens[i + 1]);
                i += 2;
            }
            "-p" if i + 1 < tokens.len() => {
                port = Some(tokens[i + 1]);
                i += 2;
            }
            _ => i += 1,
        }
    }
    let host = host.ok_or_else(|| ConfigError::InvalidKey("ReceptorVotos.Endpoints (missing -h)".into()))?;
    let port = port.ok_or_else(|| ConfigError::InvalidKey("ReceptorVotos.Endpoints (missing -p)".into()))?;
    Ok(format!("http://{host}:{port}"))
}

/// Circuit-breaker tuning, configurable per spec §6.
#[derive(Clone, Debug)]
pub struct BreakerConfig {
    /// Consecutive-failure threshold before the breaker trips open.
    pub failure_threshold: u32,
    /// Initial backoff in milliseconds.
    pub initial_backoff_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 3, initial_backoff_ms: 5000 }
    }
}

/// A polling station's configuration.
#[derive(Clone, Debug)]
pub struct StationConfig {
    /// This station's opaque identifier.
    pub station_id: String,
    /// HTTP base URL of the tallier, derived from `ReceptorVotos.Endpoints`.
    pub tallier_base_url: String,
    /// Directory for the outbox's on-disk mirror and `votos_transmitidos.log`.
    pub outbox_dir: PathBuf,
    /// Circuit-breaker tuning.
    pub breaker: BreakerConfig,
}

impl StationConfig {
    /// Build a config from already-parsed properties, applying env
    /// overrides (`BALLOTCAST_STATION_ID`, `BALLOTCAST_OUTBOX_DIR`) the
    /// way the teacher's keystore uses `env_first`.
    pub fn from_properties(props: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let station_id = env_first(&["BALLOTCAST_STATION_ID"])
            .or_else(|| props.get("Station.Id").cloned())
            .ok_or_else(|| ConfigError::InvalidKey("Station.Id".into()))?;

        let endpoint = props
            .get("ReceptorVotos.Endpoints")
            .ok_or_else(|| ConfigError::InvalidKey("ReceptorVotos.Endpoints".into()))?;
        let tallier_base_url = parse_endpoint_to_http_url(endpoint)?;

        let outbox_dir = env_first(&["BALLOTCAST_OUTBOX_DIR"])
            .or_else(|| props.get("Outbox.Directory").cloned())
            .unwrap_or_else(|| "data/outbox".to_string());

        let failure_threshold = props
            .get("Breaker.FailureThreshold")
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);
        let initial_backoff_ms = props
            .get("Breaker.InitialBackoffMs")
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);

        Ok(Self {
            station_id,
            tallier_base_url,
            outbox_dir: PathBuf::from(outbox_dir),
            breaker: BreakerConfig { failure_threshold, initial_backoff_ms },
        })
    }

    /// Load and parse a properties file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_properties(&load_properties(path)?)
    }
}

/// A tallier's configuration.
#[derive(Clone, Debug)]
pub struct TallierConfig {
    /// Socket address the HTTP server binds to, e.g. `0.0.0.0:10000`.
    pub bind_addr: String,
    /// Directory audit log files are written under.
    pub audit_dir: PathBuf,
    /// Registered voter count, used only to compute turnout percentage.
    pub registered_voters: u64,
    /// Expected ballot count, used to size (or skip) the replay detector's
    /// probabilistic prefilter.
    pub expected_ballots: u64,
    /// Directory scanned at startup for `<station_id>.pub`/`<station_id>.aes`
    /// preregistered key pairs (spec §9's preregistered-keys decision).
    pub stations_dir: PathBuf,
}

impl TallierConfig {
    /// Build a config from already-parsed properties, applying env
    /// overrides (`BALLOTCAST_BIND_ADDR`, `BALLOTCAST_AUDIT_DIR`).
    pub fn from_properties(props: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let bind_addr = env_first(&["BALLOTCAST_BIND_ADDR"])
            .or_else(|| props.get("Tallier.BindAddr").cloned())
            .unwrap_or_else(|| "0.0.0.0:10000".to_string());

        let audit_dir = env_first(&["BALLOTCAST_AUDIT_DIR"])
            .or_else(|| props.get("Audit.Directory").cloned())
            .unwrap_or_else(|| "data/audit".to_string());

        let registered_voters = props
            .get("Tallier.RegisteredVoters")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let expected_ballots = props
            .get("Tallier.ExpectedBallots")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let stations_dir = env_first(&["BALLOTCAST_STATIONS_DIR"])
            .or_else(|| props.get("Stations.Directory").cloned())
            .unwrap_or_else(|| "data/stations".to_string());

        Ok(Self {
            bind_addr,
            audit_dir: PathBuf::from(audit_dir),
            registered_voters,
            expected_ballots,
            stations_dir: PathBuf::from(stations_dir),
        })
    }

    /// Load and parse a properties file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_properties(&load_properties(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_endpoint_syntax() {
        let url = parse_endpoint_to_http_url("tcp -h tallier.example -p 10000").unwrap();
        assert_eq!(url, "http://tallier.example:10000");
    }

    #[test]
    fn load_properties_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("station.properties");
        std::fs::write(
            &path,
            "# comment\n\nStation.Id=M01\nReceptorVotos.Endpoints=tcp -h localhost -p 9000\n",
        )
        .unwrap();
        let props = load_properties(&path).unwrap();
        assert_eq!(props.get("Station.Id"), Some(&"M01".to_string()));
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn station_config_from_properties_builds_http_url() {
        let mut props = BTreeMap::new();
        props.insert("Station.Id".to_string(), "M01".to_string());
        props.insert("ReceptorVotos.Endpoints".to_string(), "tcp -h tallier -p 8080".to_string());
        let cfg = StationConfig::from_properties(&props).unwrap();
        assert_eq!(cfg.station_id, "M01");
        assert_eq!(cfg.tallier_base_url, "http://tallier:8080");
        assert_eq!(cfg.breaker.failure_threshold, 3);
    }

    #[test]
    fn missing_station_id_is_an_error() {
        let props = BTreeMap::new();
        assert!(StationConfig::from_properties(&props).is_err());
    }
}
