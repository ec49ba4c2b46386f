use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use config::{Config, File as ConfigFile};
use fintrust_gate::GateConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreMode {
    Memory,
    Sled,
}

impl StoreMode {
    fn from_value(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreMode::Memory),
            "sled" => Ok(StoreMode::Sled),
            other => Err(anyhow!(
                "Invalid STORE_MODE '{other}'; expected 'memory' or 'sled'"
            )),
        }
    }
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            StoreMode::Memory => "memory",
            StoreMode::Sled => "sled",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LedgerMode {
    Memory,
    Http,
}

impl LedgerMode {
    fn from_value(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "memory" => Ok(LedgerMode::Memory),
            "http" => Ok(LedgerMode::Http),
            other => Err(anyhow!(
                "Invalid LEDGER_MODE '{other}'; expected 'memory' or 'http'"
            )),
        }
    }
}

impl fmt::Display for LedgerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            LedgerMode::Memory => "memory",
            LedgerMode::Http => "http",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_path: Option<PathBuf>,
    pub node_id: String,

    // Network
    pub rpc_host: String,
    pub rpc_port: u16,

    // Storage
    pub data_dir: String,
    pub store_mode: StoreMode,

    // Ledger
    pub ledger_mode: LedgerMode,
    pub ledger_url: Option<String>,
    pub ledger_timeout_ms: u64,

    // Gate
    pub audit_log_path: Option<PathBuf>,
    pub content_gateway: String,

    // Logging
    pub log_level: String,
    pub log_format: String,
}

impl AppConfig {
    /// Layer the optional config file under `FINTRUST_*` environment variables.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let resolved_path = match config_path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    anyhow::bail!(
                        "Configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path)
            }
            None => None,
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        builder = builder.add_source(config::Environment::with_prefix("FINTRUST"));

        let config = builder.build()?;
        Self::from_config(&config, resolved_path)
    }

    pub fn from_config(config: &Config, config_path: Option<PathBuf>) -> Result<Self> {
        let store_mode = StoreMode::from_value(
            &get_string_value(config, &["STORE_MODE", "storage.mode"])
                .unwrap_or_else(|| "sled".to_string()),
        )?;
        let ledger_mode = LedgerMode::from_value(
            &get_string_value(config, &["LEDGER_MODE", "ledger.mode"])
                .unwrap_or_else(|| "memory".to_string()),
        )?;
        let defaults = GateConfig::default();

        Ok(Self {
            config_path,
            node_id: get_string_value(config, &["NODE_ID", "node.id"])
                .unwrap_or_else(|| "fintrust-node".to_string()),
            rpc_host: get_string_value(config, &["RPC_HOST", "rpc.host"])
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            rpc_port: get_string_value(config, &["RPC_PORT", "rpc.port"])
                .unwrap_or_else(|| "8080".to_string())
                .parse()?,
            data_dir: get_string_value(config, &["DATA_DIR", "storage.data_dir"])
                .unwrap_or_else(|| "./data".to_string()),
            store_mode,
            ledger_mode,
            ledger_url: get_string_value(config, &["LEDGER_URL", "ledger.url"]),
            ledger_timeout_ms: get_string_value(config, &["LEDGER_TIMEOUT_MS", "ledger.timeout_ms"])
                .unwrap_or_else(|| defaults.ledger_timeout_ms.to_string())
                .parse()?,
            audit_log_path: get_string_value(config, &["AUDIT_LOG_PATH", "audit.log_path"])
                .map(PathBuf::from),
            content_gateway: get_string_value(config, &["CONTENT_GATEWAY", "gate.content_gateway"])
                .unwrap_or(defaults.content_gateway),
            log_level: get_string_value(config, &["LOG_LEVEL", "logging.level"])
                .unwrap_or_else(|| "info".to_string()),
            log_format: get_string_value(config, &["LOG_FORMAT", "logging.format"])
                .unwrap_or_else(|| "pretty".to_string()),
        })
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            ledger_timeout_ms: self.ledger_timeout_ms,
            content_gateway: self.content_gateway.clone(),
        }
    }

    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_host, self.rpc_port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            anyhow::bail!("NODE_ID must not be empty");
        }
        if self.rpc_port == 0 {
            anyhow::bail!("RPC_PORT must be greater than zero");
        }
        if self.ledger_mode == LedgerMode::Http && self.ledger_url.is_none() {
            anyhow::bail!("LEDGER_MODE 'http' requires LEDGER_URL");
        }
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!(
                "Invalid LOG_FORMAT '{}'; expected 'pretty' or 'json'",
                self.log_format
            );
        }
        self.gate_config().validate().map_err(|err| anyhow!(err))?;
        Ok(())
    }
}

pub fn get_string_value(config: &Config, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        config
            .get_string(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

pub fn apply_overrides(matches: &clap::ArgMatches, config: &mut AppConfig) {
    if let Some(data_dir) = matches.get_one::<String>("data-dir") {
        config.data_dir = data_dir.clone();
    }

    if let Some(rpc_host) = matches.get_one::<String>("rpc-host") {
        config.rpc_host = rpc_host.clone();
    }

    if let Some(rpc_port) = matches.get_one::<u16>("rpc-port") {
        config.rpc_port = *rpc_port;
    }

    if let Some(store_mode) = matches.get_one::<StoreMode>("store") {
        config.store_mode = *store_mode;
    }

    if let Some(ledger_mode) = matches.get_one::<LedgerMode>("ledger") {
        config.ledger_mode = *ledger_mode;
    }

    if let Some(ledger_url) = matches.get_one::<String>("ledger-url") {
        config.ledger_url = Some(ledger_url.clone());
    }

    if let Some(timeout) = matches.get_one::<u64>("ledger-timeout-ms") {
        config.ledger_timeout_ms = *timeout;
    }

    if let Some(path) = matches.get_one::<String>("audit-log") {
        config.audit_log_path = Some(PathBuf::from(path));
    }

    if let Some(log_level) = matches.get_one::<String>("log-level") {
        config.log_level = log_level.clone();
    }

    if let Some(log_format) = matches.get_one::<String>("log-format") {
        config.log_format = log_format.clone();
    }
}
