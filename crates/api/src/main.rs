use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voyage_core::templates::TemplateCatalog;
use voyage_db::Stores;
use voyage_events::{
    EmailConfig, HttpPushTransport, Mailer, NotificationRouter, RetentionSweeper, SmtpMailer,
};

use voyage_api::config::{ServerConfig, StoreBackend};
use voyage_api::router::build_app_router;
use voyage_api::services::{build_state, Transports};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        store_backend = ?config.store_backend,
        "Loaded server configuration"
    );

    // --- Stores ---
    let (pool, stores) = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            (None, Stores::in_memory())
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .clone()
                .expect("DATABASE_URL must be set when STORE_BACKEND=postgres");

            let pool = voyage_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            voyage_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            voyage_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            (Some(pool.clone()), Stores::postgres(pool))
        }
    };

    // --- Transports ---
    let push = HttpPushTransport::from_env().expect("Failed to build push HTTP client");
    if !push.fcm_enabled() {
        tracing::warn!("FCM not configured; Android and web push disabled");
    }
    if !push.apns_enabled() {
        tracing::warn!("APNs not configured; iOS push disabled");
    }

    let mailer: Option<Arc<dyn Mailer>> = match EmailConfig::from_env() {
        Some(email_config) => {
            let mailer = SmtpMailer::new(&email_config).expect("Invalid SMTP configuration");
            tracing::info!(host = %email_config.smtp_host, "SMTP mailer configured");
            Some(Arc::new(mailer))
        }
        None => {
            tracing::warn!("SMTP_HOST not set; email delivery disabled");
            None
        }
    };

    // --- App state ---
    let retention_days = config.retention_days;
    let state = build_state(
        config.clone(),
        pool,
        stores,
        Transports {
            push: Arc::new(push),
            mailer,
        },
        TemplateCatalog::default(),
    );

    // --- Background services ---
    let router_handle = tokio::spawn(
        NotificationRouter::new(Arc::clone(&state.dispatcher)).run(state.event_bus.subscribe()),
    );

    let cancel = CancellationToken::new();
    let sweeper = RetentionSweeper::new(Arc::clone(&state.stores.notifications), retention_days)
        .expect("RETENTION_DAYS was validated at startup");
    let sweeper_cancel = cancel.clone();
    let sweeper_handle = tokio::spawn(async move {
        sweeper.run(sweeper_cancel).await;
    });
    tracing::info!("Background services started (notification router, retention sweep)");

    let event_bus = Arc::clone(&state.event_bus);
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweeper_handle).await;

    // The router exits once the last sender is gone. The app state held a
    // clone of the bus and was dropped with the server.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), router_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "voyage_api=debug,voyage_events=debug,voyage_db=info,tower_http=debug".into()
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
