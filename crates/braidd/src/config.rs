//! TOML configuration for the Braid daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use braid_types::ErasureParams;
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Daemon identity and addresses.
    pub node: NodeSection,
    /// Blob storage backends.
    pub storage: StorageSection,
    /// Erasure coding parameters.
    pub erasure: ErasureSection,
    /// Orchestrator tuning.
    pub engine: EngineSection,
    /// Bearer-token settings.
    pub auth: AuthSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[node]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Directory for persistent data (metadata DB, default shard dirs).
    pub data_dir: PathBuf,
    /// Address for the HTTP file API.
    pub listen_addr: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".braid"))
            .unwrap_or_else(|| PathBuf::from(".braid"));
        Self {
            data_dir,
            listen_addr: "0.0.0.0:8471".to_string(),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Backend type: `"file"` (default) or `"memory"`.
    pub backend: String,
    /// Ordered backend locations, one directory per shard index.
    ///
    /// Must contain exactly `k + m` entries when set; the order defines
    /// the `shard_index -> location` mapping and must stay stable while
    /// files are stored. Defaults to `{data_dir}/shards/{index}`.
    pub locations: Vec<PathBuf>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            locations: Vec::new(),
        }
    }
}

/// `[erasure]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ErasureSection {
    /// Number of data shards.
    pub data_shards: Option<u8>,
    /// Number of parity shards.
    pub parity_shards: Option<u8>,
}

/// `[engine]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Deadline for each individual backend call, in milliseconds.
    pub per_call_timeout_ms: Option<u64>,
}

/// `[auth]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Shared secret for signing/validating bearer tokens.
    ///
    /// Can also be set via the `BRAID_JWT_SECRET` env var. If neither is
    /// set, a random secret is generated at startup and displayed.
    pub jwt_secret: String,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Effective erasure parameters (defaults: k=4, m=2).
    pub fn erasure_params(&self) -> ErasureParams {
        let defaults = ErasureParams::default();
        ErasureParams {
            data_shards: self.erasure.data_shards.unwrap_or(defaults.data_shards),
            parity_shards: self.erasure.parity_shards.unwrap_or(defaults.parity_shards),
        }
    }

    /// Effective per-backend-call deadline (default 10 s).
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_millis(self.engine.per_call_timeout_ms.unwrap_or(10_000))
    }

    /// Resolved backend locations, exactly `k + m` of them.
    ///
    /// An empty `[storage] locations` falls back to numbered directories
    /// under the data dir. A non-empty list of the wrong length is a
    /// configuration error.
    pub fn backend_locations(&self) -> anyhow::Result<Vec<PathBuf>> {
        let total = self.erasure_params().total();
        if self.storage.locations.is_empty() {
            return Ok((0..total)
                .map(|i| self.node.data_dir.join("shards").join(i.to_string()))
                .collect());
        }
        anyhow::ensure!(
            self.storage.locations.len() == total,
            "storage.locations must list exactly {total} directories (k + m), got {}",
            self.storage.locations.len()
        );
        Ok(self.storage.locations.clone())
    }

    /// The JWT secret from config or environment, if any.
    pub fn jwt_secret(&self) -> Option<String> {
        if let Ok(secret) = std::env::var("BRAID_JWT_SECRET")
            && !secret.is_empty()
        {
            return Some(secret);
        }
        if self.auth.jwt_secret.is_empty() {
            None
        } else {
            Some(self.auth.jwt_secret.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[node]
data_dir = "/tmp/braid-test"
listen_addr = "127.0.0.1:9999"

[storage]
backend = "file"
locations = ["/s/0", "/s/1", "/s/2", "/s/3", "/s/4", "/s/5"]

[erasure]
data_shards = 4
parity_shards = 2

[engine]
per_call_timeout_ms = 2500

[auth]
jwt_secret = "hunter2"

[log]
level = "debug"
"#;
        let config = CliConfig::from_toml(toml).unwrap();
        assert_eq!(config.node.data_dir, PathBuf::from("/tmp/braid-test"));
        assert_eq!(config.node.listen_addr, "127.0.0.1:9999");
        assert_eq!(config.storage.backend, "file");
        assert_eq!(config.backend_locations().unwrap().len(), 6);
        assert_eq!(config.erasure_params().data_shards, 4);
        assert_eq!(config.erasure_params().parity_shards, 2);
        assert_eq!(config.per_call_timeout(), Duration::from_millis(2500));
        assert_eq!(config.auth.jwt_secret, "hunter2");
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = CliConfig::from_toml("").unwrap();
        assert_eq!(config.node.listen_addr, "0.0.0.0:8471");
        assert_eq!(config.storage.backend, "file");
        assert_eq!(config.erasure_params(), ErasureParams::default());
        assert_eq!(config.per_call_timeout(), Duration::from_secs(10));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_default_locations_derived_from_data_dir() {
        let toml = r#"
[node]
data_dir = "/data"
"#;
        let config = CliConfig::from_toml(toml).unwrap();
        let locations = config.backend_locations().unwrap();
        assert_eq!(locations.len(), 6);
        assert_eq!(locations[0], PathBuf::from("/data/shards/0"));
        assert_eq!(locations[5], PathBuf::from("/data/shards/5"));
    }

    #[test]
    fn test_wrong_location_count_rejected() {
        let toml = r#"
[storage]
locations = ["/a", "/b"]
"#;
        let config = CliConfig::from_toml(toml).unwrap();
        assert!(config.backend_locations().is_err());
    }

    #[test]
    fn test_location_count_follows_erasure_params() {
        let toml = r#"
[storage]
locations = ["/a", "/b", "/c"]

[erasure]
data_shards = 2
parity_shards = 1
"#;
        let config = CliConfig::from_toml(toml).unwrap();
        assert_eq!(config.backend_locations().unwrap().len(), 3);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("braid.toml");
        std::fs::write(
            &path,
            r#"
[node]
data_dir = "/tmp/braid-from-file"
listen_addr = "127.0.0.1:4444"
"#,
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.node.data_dir, PathBuf::from("/tmp/braid-from-file"));
        assert_eq!(config.node.listen_addr, "127.0.0.1:4444");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config.erasure_params().total(), 6);
    }
}
