//! Fleetline server binary — the main entry point.
//!
//! Wires the full pipeline (bus → subscriber → queue → accumulator →
//! store/scorer/alerts) to the HTTP read surface, with structured logging,
//! database initialization, and graceful shutdown on SIGTERM/SIGINT.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use fleetline_bus::TopicBus;
use fleetline_pipeline::{
    run_subscriber, Accumulator, AlertPublisher, EventQueue, LatestCell, PipelineStats,
};
use fleetline_scoring::Scorer;
use fleetline_server::sinks::{BusAlertSink, SqliteBatchSink};
use fleetline_server::{app, config, simulator, AppState};

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("FLEETLINE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Initialize database
    let pool = fleetline_db::create_pool(
        &config.database.path,
        fleetline_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool — check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied =
            fleetline_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    // Assemble the pipeline
    let bus = TopicBus::default();
    let queue = Arc::new(EventQueue::new(config.pipeline.queue_policy()));
    let latest = LatestCell::new();
    let stats = Arc::new(PipelineStats::default());

    let scorer = Arc::new(Scorer::from_model_path(
        config.scoring.model_path.as_deref().map(Path::new),
    ));

    let alert_sink = BusAlertSink::new(bus.publisher(&config.pipeline.outbound_topic));
    let alerts = AlertPublisher::new(Arc::new(alert_sink), stats.clone());
    let batch_sink = Arc::new(SqliteBatchSink::new(pool.clone()));

    let accumulator = Arc::new(Accumulator::new(
        queue.clone(),
        batch_sink,
        scorer,
        alerts,
        latest.clone(),
        stats.clone(),
        Duration::from_secs(config.pipeline.flush_interval_secs.max(1)),
    ));

    tokio::spawn(run_subscriber(
        bus.subscribe(&config.pipeline.inbound_topic),
        queue,
        stats.clone(),
    ));
    tokio::spawn(accumulator.run());

    if config.simulator.enabled {
        tokio::spawn(simulator::run_simulator(
            bus.publisher(&config.pipeline.inbound_topic),
            config.simulator.clone(),
        ));
    }

    // Build application
    let state = AppState {
        pool,
        latest,
        stats,
        bus,
        alert_topic: config.pipeline.outbound_topic.clone(),
    };
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting fleetline server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("fleetline server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
