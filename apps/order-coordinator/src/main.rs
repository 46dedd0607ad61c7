//! Order Coordinator Binary
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-coordinator
//! ```
//!
//! # Environment Variables
//!
//! ## Required (unless set in the config file)
//! - `FUTU_TRADE_ENV`: SIMULATE | REAL
//! - `COORDINATOR_RECONCILE_GRACE_SECS`: seconds an order may be missing before it is flagged
//! - `COORDINATOR_RECONCILE_MISSED_REPORTS`: consecutive missing reports before it is flagged
//!
//! ## Optional
//! - `COORDINATOR_CONFIG`: config file path (default: config.yaml)
//! - `FUTU_HOST` / `FUTU_PORT`: gateway address (default: 127.0.0.1:11111)
//! - `FUTU_TRADE_PASSWORD`: trade unlock password for REAL
//! - `RUST_LOG`: log level (default: info)
//!
//! # Exit codes
//!
//! - `0`: clean shutdown
//! - `2`: gateway unreachable and the operator declined to continue
//! - `3`: configuration error
//! - `4`: HTTP server failed to bind or serve
//! - `5`: a dependency of the selected environment is missing (REAL without a trade password)

use std::io::{BufRead, IsTerminal, Write};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use order_coordinator::application::services::{
    EventRouter, ReconciliationLoop, SessionCloseSweeper,
};
use order_coordinator::config::{CONFIG_PATH_ENV, Config, load_config};
use order_coordinator::domain::market_data::MarketDataCache;
use order_coordinator::infrastructure::gateway::{
    ConnectionManager, FutuGateway, PROBE_TIMEOUT, probe_gateway,
};
use order_coordinator::infrastructure::http::{AppState, create_router};
use order_coordinator::observability::{MetricsConfig, init_metrics};
use order_coordinator::{CoordinatorSettings, EnvironmentGuard, OrderCoordinator};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Graceful shutdown timeout for background tasks.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the session-close sweeper checks trading hours.
const SESSION_CLOSE_INTERVAL: Duration = Duration::from_secs(30);

/// Queue depth between the gateway reader and the event router.
const PUSH_QUEUE: usize = 1024;

const EXIT_GATEWAY_DECLINED: u8 = 2;
const EXIT_CONFIG: u8 = 3;
const EXIT_HTTP: u8 = 4;
const EXIT_DEPENDENCY_MISSING: u8 = 5;

type Coordinator = OrderCoordinator<FutuGateway>;

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    init_tracing();

    tracing::info!("Starting order coordinator");

    let (config, guard, settings) = match load_startup_config() {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "Configuration error");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    log_config(&config, &guard, &settings);

    if let Err(e) = config.check_dependencies(guard.current()) {
        tracing::error!(error = %e, "Missing runtime dependency");
        return ExitCode::from(EXIT_DEPENDENCY_MISSING);
    }

    if !probe_or_confirm(&config.gateway.address()).await {
        tracing::error!("Gateway unreachable and startup declined");
        return ExitCode::from(EXIT_GATEWAY_DECLINED);
    }

    if config.server.metrics_port != 0 {
        start_metrics(&config);
    }

    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();

    let (push_tx, push_rx) = mpsc::channel(PUSH_QUEUE);
    let manager = ConnectionManager::new(
        config.gateway.clone(),
        guard.current(),
        settings.enabled_markets.clone(),
        push_tx,
    );
    let session = manager.subscribe();
    let markets = settings.enabled_markets.clone();
    let coordinator = create_coordinator(&manager, guard, settings);

    tracker.spawn(Arc::clone(&manager).run_supervisor(shutdown.clone()));
    tracker.spawn(EventRouter::new(Arc::clone(&coordinator)).run(push_rx, shutdown.clone()));
    tracker.spawn(
        ReconciliationLoop::new(
            Arc::clone(&coordinator),
            Duration::from_secs(config.reconciliation.interval_secs),
            session,
        )
        .run(shutdown.clone()),
    );
    tracker.spawn(
        SessionCloseSweeper::new(Arc::clone(&coordinator), markets, SESSION_CLOSE_INTERVAL)
            .run(shutdown.clone()),
    );
    tracker.close();

    tokio::spawn(shutdown_signal(shutdown.clone()));

    let served = serve_http(&config, Arc::clone(&coordinator), shutdown.clone()).await;

    shutdown.cancel();
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, tracker.wait())
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Background tasks did not stop in time"
        );
    }
    let open = coordinator.shutdown().await;
    tracing::info!(open_orders = open.len(), "Order coordinator stopped");

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "HTTP server failed");
            ExitCode::from(EXIT_HTTP)
        }
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Initialize the tracing subscriber with environment filter.
///
/// Uses a static directive string that is guaranteed to parse.
#[allow(clippy::expect_used)]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "order_coordinator=info"
                    .parse()
                    .expect("static directive 'order_coordinator=info' is valid"),
            ),
        )
        .init();
}

fn load_startup_config() -> anyhow::Result<(Config, EnvironmentGuard, CoordinatorSettings)> {
    let path = std::env::var(CONFIG_PATH_ENV).ok();
    let config = load_config(path.as_deref()).context("loading configuration")?;
    let guard = config
        .environment_guard()
        .context("resolving trade environment")?;
    let settings = config
        .coordinator_settings()
        .context("resolving coordinator settings")?;
    Ok((config, guard, settings))
}

fn log_config(config: &Config, guard: &EnvironmentGuard, settings: &CoordinatorSettings) {
    tracing::info!(
        environment = %guard.current(),
        gateway = %config.gateway.address(),
        default_market = %settings.default_market,
        markets = ?settings.enabled_markets,
        http_port = config.server.http_port,
        trade_password_set = config.gateway.trade_password.is_some(),
        "Configuration loaded"
    );
    if guard.current().is_real() {
        tracing::warn!("Running against the REAL environment - orders trade real money");
    }
}

/// Probe the gateway. On failure, ask the operator when a terminal is
/// attached; otherwise continue and let the supervisor keep retrying.
async fn probe_or_confirm(address: &str) -> bool {
    let Err(e) = probe_gateway(address, PROBE_TIMEOUT).await else {
        return true;
    };
    tracing::warn!(address, error = %e, "Gateway probe failed");

    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        tracing::warn!("No terminal attached, continuing; the supervisor will keep reconnecting");
        return true;
    }

    let address = address.to_string();
    tokio::task::spawn_blocking(move || {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "Gateway at {address} is unreachable. Continue anyway? [y/N] ");
        let _ = stderr.flush();
        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes" | "YES")
    })
    .await
    .unwrap_or(false)
}

fn start_metrics(config: &Config) {
    let addr = format!("{}:{}", config.server.bind_address, config.server.metrics_port);
    match addr.parse::<SocketAddr>() {
        Ok(addr) => match init_metrics(&MetricsConfig::with_addr(addr)) {
            Ok(()) => tracing::info!(%addr, "Prometheus exporter listening"),
            Err(e) => tracing::warn!(error = %e, "Metrics disabled"),
        },
        Err(e) => tracing::warn!(addr, error = %e, "Invalid metrics address, metrics disabled"),
    }
}

fn create_coordinator(
    manager: &Arc<ConnectionManager>,
    guard: EnvironmentGuard,
    settings: CoordinatorSettings,
) -> Arc<Coordinator> {
    let gateway = Arc::new(FutuGateway::new(Arc::clone(manager)));
    let market_data = Arc::new(MarketDataCache::new(settings.staleness_threshold));
    Arc::new(OrderCoordinator::new(gateway, guard, market_data, settings))
}

/// Serve the agent API until `shutdown` fires.
async fn serve_http(
    config: &Config,
    coordinator: Arc<Coordinator>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.http_port)
        .parse()
        .context("parsing HTTP bind address")?;
    let app = create_router(AppState {
        coordinator,
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(%addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /api/v1/orders");
    tracing::info!("  GET  /api/v1/orders");
    tracing::info!("  GET  /api/v1/orders/{{id}}");
    tracing::info!("  POST /api/v1/orders/{{id}}/cancel");
    tracing::info!("  POST /api/v1/orders/{{id}}/resolve");
    tracing::info!("  GET  /api/v1/quotes/{{instrument}}");
    tracing::info!("  GET  /api/v1/quotes/{{instrument}}/book");
    tracing::info!("  GET  /api/v1/markets/{{market}}/status");
    tracing::info!("  GET  /api/v1/account");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("serving HTTP")
}

/// Wait for SIGINT or SIGTERM, then cancel `shutdown`.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
#[allow(clippy::expect_used)]
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown.cancelled() => return,
    }

    shutdown.cancel();
    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
