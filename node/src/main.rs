use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use fintrust_files::{MemoryFileStore, MetadataStore, SledFileStore};
use fintrust_gate::{
    AccessGate, AuditSink, JsonlAuditSink, ThirdPartyRegistry, TracingAuditSink,
};
use fintrust_ledger::{AuthorizationLedger, HttpLedger, MemoryLedger};
use fintrust_rpc::{start_server, AppState};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod settings;
mod version;

use settings::{apply_overrides, AppConfig, LedgerMode, StoreMode};
use version::{git_commit_hash, FINTRUST_VERSION};

fn build_cli() -> Command {
    Command::new("fintrust-node")
        .version(FINTRUST_VERSION)
        .about("FinTrust per-file access gate")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .value_name("DIR")
                .help("Data directory for the sled store"),
        )
        .arg(
            Arg::new("rpc-host")
                .long("rpc-host")
                .value_name("HOST")
                .help("Override RPC bind host"),
        )
        .arg(
            Arg::new("rpc-port")
                .long("rpc-port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("Override RPC port"),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .value_name("MODE")
                .value_parser(value_parser!(StoreMode))
                .help("Metadata store backend (memory, sled)"),
        )
        .arg(
            Arg::new("ledger")
                .long("ledger")
                .value_name("MODE")
                .value_parser(value_parser!(LedgerMode))
                .help("Authorization ledger backend (memory, http)"),
        )
        .arg(
            Arg::new("ledger-url")
                .long("ledger-url")
                .value_name("URL")
                .help("Base URL of the ledger relayer"),
        )
        .arg(
            Arg::new("ledger-timeout-ms")
                .long("ledger-timeout-ms")
                .value_name("MILLIS")
                .value_parser(value_parser!(u64))
                .help("Upper bound on each ledger call"),
        )
        .arg(
            Arg::new("audit-log")
                .long("audit-log")
                .value_name("FILE")
                .help("Append audit events to this JSON-lines file"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .help("Override the log level"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .value_parser(["pretty", "json"])
                .help("Select log output format"),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .action(ArgAction::SetTrue)
                .help("Validate configuration and exit"),
        )
}

fn load_config_with_overrides(matches: &clap::ArgMatches) -> Result<AppConfig> {
    let config_path = matches
        .get_one::<String>("config")
        .map(|value| value.as_str());
    let mut config = AppConfig::load(config_path)?;
    apply_overrides(matches, &mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let config = load_config_with_overrides(&matches)?;

    if matches.get_flag("check") {
        println!(
            "Configuration OK: store={} ledger={} rpc={}",
            config.store_mode,
            config.ledger_mode,
            config.rpc_addr()
        );
        return Ok(());
    }

    init_logging(&config)?;
    info!(
        "Starting FinTrust node {} (commit {})",
        FINTRUST_VERSION,
        git_commit_hash()
    );
    if let Some(path) = &config.config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let store = build_store(&config)?;
    let ledger = build_ledger(&config)?;
    let audit = build_audit_sink(&config)?;
    info!(
        "Gate backends: store={} ledger={} timeout={}ms",
        config.store_mode, config.ledger_mode, config.ledger_timeout_ms
    );

    let gate = AccessGate::new(store, ledger, audit, config.gate_config());
    let state = AppState::new(
        Arc::new(gate),
        Arc::new(ThirdPartyRegistry::new()),
        config.node_id.clone(),
    );

    let addr = config.rpc_addr();
    tokio::select! {
        result = start_server(state, &addr) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn build_store(config: &AppConfig) -> Result<Arc<dyn MetadataStore>> {
    match config.store_mode {
        StoreMode::Memory => {
            warn!("Using in-memory metadata store; records are lost on restart");
            Ok(Arc::new(MemoryFileStore::new()))
        }
        StoreMode::Sled => {
            let path = PathBuf::from(&config.data_dir).join("files");
            std::fs::create_dir_all(&path)
                .with_context(|| format!("failed to create data directory {}", path.display()))?;
            let store = SledFileStore::open(&path)
                .with_context(|| format!("failed to open sled store at {}", path.display()))?;
            info!("Opened sled metadata store at {}", path.display());
            Ok(Arc::new(store))
        }
    }
}

fn build_ledger(config: &AppConfig) -> Result<Arc<dyn AuthorizationLedger>> {
    match config.ledger_mode {
        LedgerMode::Memory => {
            warn!("Using in-memory authorization ledger; grants are lost on restart");
            Ok(Arc::new(MemoryLedger::new()))
        }
        LedgerMode::Http => {
            let url = config
                .ledger_url
                .as_deref()
                .context("LEDGER_URL is required for the http ledger")?;
            let ledger = HttpLedger::new(url, Duration::from_millis(config.ledger_timeout_ms))
                .with_context(|| format!("failed to configure ledger relayer {url}"))?;
            info!("Using ledger relayer at {}", ledger.base_url());
            Ok(Arc::new(ledger))
        }
    }
}

fn build_audit_sink(config: &AppConfig) -> Result<Arc<dyn AuditSink>> {
    match &config.audit_log_path {
        Some(path) => {
            let sink = JsonlAuditSink::new(path)
                .with_context(|| format!("failed to open audit log {}", path.display()))?;
            info!("Writing audit events to {}", sink.path().display());
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(TracingAuditSink)),
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_take_precedence() {
        let matches = build_cli().get_matches_from([
            "fintrust-node",
            "--store",
            "memory",
            "--ledger",
            "http",
            "--ledger-url",
            "http://relayer:9000",
            "--rpc-port",
            "9999",
        ]);
        let mut config = AppConfig::load(None).unwrap();
        apply_overrides(&matches, &mut config);

        assert_eq!(config.store_mode, StoreMode::Memory);
        assert_eq!(config.ledger_mode, LedgerMode::Http);
        assert_eq!(config.ledger_url.as_deref(), Some("http://relayer:9000"));
        assert_eq!(config.rpc_port, 9999);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn backends_are_built_from_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let matches = build_cli().get_matches_from([
            "fintrust-node",
            "--data-dir",
            dir.path().to_str().unwrap(),
            "--store",
            "sled",
            "--audit-log",
            dir.path().join("audit.jsonl").to_str().unwrap(),
        ]);
        let mut config = AppConfig::load(None).unwrap();
        apply_overrides(&matches, &mut config);

        assert!(build_store(&config).is_ok());
        assert_eq!(build_ledger(&config).unwrap().name(), "memory");
        assert!(build_audit_sink(&config).is_ok());
        assert!(dir.path().join("audit.jsonl").exists());
    }
}
