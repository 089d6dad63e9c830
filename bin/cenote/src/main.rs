//! Cenote - distributed data federation server.
//!
//! # Usage
//!
//! ```bash
//! # Single server over a local database
//! cenote
//!
//! # Federation member owning the "instance1_" id slice, with one peer
//! DATABASE_URL=postgres://localhost/cenote cenote \
//!     --local-id-pattern '^instance1_' \
//!     --peer 'instance2=http://peer.example:4000/graphql=^instance2_'
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use regex::Regex;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

use async_graphql::MergedObject;
use cenote_core::catalog::{Catalog, LogicalModel};
use cenote_core::metrics::init_metrics;
use cenote_core::services::{DdmConfig, DdmService};
use cenote_graphql::{build_schema, serve_with_shutdown, CoreQuery, ServerConfig};
use cenote_models::individual;
use cenote_models::individual::{IndividualMutation, IndividualQuery};
use cenote_storage::{Database, DatabaseConfig, SqlAdapter, SqlAdapterConfig};
use cenote_webservice::{
    PeerClient, PeerClientConfig, WebserviceAdapter, WebserviceAdapterConfig,
};

/// Cenote CLI - distributed data federation server.
#[derive(Parser, Debug)]
#[command(name = "cenote")]
#[command(about = "Cenote - distributed data federation server")]
#[command(version)]
struct Cli {
    /// PostgreSQL database URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/cenote"
    )]
    database_url: String,

    /// GraphQL server port.
    #[arg(long, env = "GRAPHQL_PORT", default_value = "4000")]
    graphql_port: u16,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Name of the local SQL adapter within each model's registry.
    #[arg(long, env = "LOCAL_ADAPTER_NAME", default_value = "local")]
    local_adapter_name: String,

    /// Anchored regex of the id slice the local adapter owns.
    #[arg(long, env = "LOCAL_ID_PATTERN", default_value = ".*")]
    local_id_pattern: String,

    /// Peer federation server, as `name=url=id-pattern` with an optional
    /// trailing `=ddm` when the peer itself federates. Repeatable.
    #[arg(long = "peer", env = "PEERS", value_delimiter = ',', value_parser = parse_peer)]
    peers: Vec<PeerSpec>,

    /// Per-adapter sub-call timeout in seconds.
    #[arg(long, env = "ADAPTER_TIMEOUT", default_value = "30")]
    adapter_timeout: u64,

    /// Maximum records a single read window may request.
    #[arg(long, env = "LIMIT_RECORDS", default_value = "10000")]
    limit_records: u64,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// One remote federation member.
#[derive(Debug, Clone)]
struct PeerSpec {
    name: String,
    url: Url,
    id_pattern: Regex,
    delegating: bool,
}

/// Parse a peer spec: `name=url=id-pattern[=ddm]`.
fn parse_peer(s: &str) -> Result<PeerSpec, String> {
    let parts: Vec<&str> = s.splitn(4, '=').collect();
    let [name, url, pattern, rest @ ..] = parts.as_slice() else {
        return Err(format!(
            "Invalid peer spec '{}'. Use 'name=url=id-pattern[=ddm]'.",
            s
        ));
    };
    let delegating = match rest {
        [] => false,
        ["ddm"] => true,
        [other] => return Err(format!("Invalid peer flag '{}'. Use 'ddm'.", other)),
        _ => unreachable!(),
    };
    let url = Url::parse(url).map_err(|e| format!("Invalid peer URL '{}': {}", url, e))?;
    let id_pattern =
        Regex::new(pattern).map_err(|e| format!("Invalid peer id pattern '{}': {}", pattern, e))?;
    Ok(PeerSpec {
        name: name.to_string(),
        url,
        id_pattern,
        delegating,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled = match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>()
    {
        Ok(metrics_addr) => {
            match PrometheusBuilder::new()
                .with_http_listener(metrics_addr)
                .install()
            {
                Ok(()) => {
                    init_metrics();
                    true
                }
                Err(e) => {
                    warn!(
                        "⚠️  Failed to start metrics exporter: {}. Continuing without metrics.",
                        e
                    );
                    false
                }
            }
        }
        Err(e) => {
            warn!(
                "⚠️  Invalid metrics address: {}. Continuing without metrics.",
                e
            );
            false
        }
    };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Cenote federation server");
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");
    for peer in &cli.peers {
        debug!(peer = %peer.name, url = %peer.url, delegating = peer.delegating, "Peer");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    info!("🗄️  Connecting to database...");
    let db = Database::connect(&DatabaseConfig::for_server(&cli.database_url))
        .await
        .context("Failed to connect to database")?;

    db.migrate().await.context("Failed to run migrations")?;
    info!("🗄️  Database ready (migrations applied)");

    if cli.migrate_only {
        info!("🛑 --migrate-only flag set, exiting");
        return Ok(());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 📦 CATALOG
    // ─────────────────────────────────────────────────────────────────────────
    let local_id_pattern = Regex::new(&cli.local_id_pattern)
        .with_context(|| format!("Invalid local id pattern '{}'", cli.local_id_pattern))?;

    let mut model = LogicalModel::new(individual::definition()).register(Arc::new(SqlAdapter::new(
        &db,
        individual::definition(),
        SqlAdapterConfig {
            adapter_name: cli.local_adapter_name.clone(),
            table: "individuals".to_string(),
            id_pattern: local_id_pattern,
            limit_records: cli.limit_records,
        },
    )));

    let adapter_timeout = Duration::from_secs(cli.adapter_timeout);
    for peer in &cli.peers {
        let client = PeerClient::new(&PeerClientConfig {
            url: peer.url.clone(),
            timeout: adapter_timeout,
        })
        .with_context(|| format!("Failed to build client for peer '{}'", peer.name))?;

        model = model.register(Arc::new(WebserviceAdapter::new(
            client,
            individual::definition(),
            WebserviceAdapterConfig {
                adapter_name: peer.name.clone(),
                id_pattern: peer.id_pattern.clone(),
                delegating: peer.delegating,
            },
        )));
    }

    let mut catalog = Catalog::new();
    catalog.register_model(model);
    let catalog = Arc::new(catalog);

    let ddm = Arc::new(DdmService::new(DdmConfig {
        adapter_timeout,
        limit_records: cli.limit_records,
    }));

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ GRAPHQL
    // ─────────────────────────────────────────────────────────────────────────
    #[derive(MergedObject, Default)]
    struct Query(CoreQuery, IndividualQuery);

    #[derive(MergedObject, Default)]
    struct Mutation(IndividualMutation);

    let schema = build_schema(
        Query::default(),
        Mutation::default(),
        catalog.clone(),
        ddm.clone(),
    );

    let graphql_config = ServerConfig {
        host: "0.0.0.0".to_string(),
        port: cli.graphql_port,
        enable_playground: true,
    };

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ Cenote ready");
    info!(
        "   ⚡ GraphQL:  http://localhost:{}/graphql",
        cli.graphql_port
    );
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    serve_with_shutdown(schema, graphql_config, shutdown_signal())
        .await
        .context("GraphQL server error")?;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");
    db.close().await;
    info!("🛑 Shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peer_spec() {
        let peer = parse_peer("instance2=http://peer:4000/graphql=^instance2_").unwrap();
        assert_eq!(peer.name, "instance2");
        assert_eq!(peer.url.as_str(), "http://peer:4000/graphql");
        assert!(peer.id_pattern.is_match("instance2_ind_1"));
        assert!(!peer.delegating);

        let peer = parse_peer("hub=http://hub:4000/graphql=^hub_=ddm").unwrap();
        assert!(peer.delegating);
    }

    #[test]
    fn test_parse_peer_spec_rejects_malformed() {
        assert!(parse_peer("just-a-name").is_err());
        assert!(parse_peer("p=not a url=.*").is_err());
        assert!(parse_peer("p=http://x/graphql=.*=bogus").is_err());
    }
}
