use anyhow::Context;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use zyntic_backend::config::Config;
use zyntic_backend::db::{
    self, postgres_subscription_repository::PostgresSubscriptionRepository,
    postgres_user_repository::PostgresUserRepository,
    postgres_webhook_event_log_repository::PostgresWebhookEventLogRepository,
};
use zyntic_backend::responses::JsonResponse;
use zyntic_backend::routes;
use zyntic_backend::services::clerk::{ClerkWebhookVerifier, LiveClerkClient, SessionVerifier};
use zyntic_backend::services::mailer::ResendMailer;
use zyntic_backend::services::razorpay::LiveRazorpayService;
use zyntic_backend::state::AppState;
use zyntic_backend::utils::keyed_lock::KeyedLocks;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(Config::from_env().context("failed to load configuration")?);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.rate_limit.per_millisecond)
            .burst_size(config.rate_limit.burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid rate limiter settings")?,
    );

    // Background task to cleanup old IPs
    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let pool = db::connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;
    info!("✅ Successfully connected to the database");
    db::run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;

    let http_client = Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let clerk_webhooks = ClerkWebhookVerifier::new(&config.clerk.webhook_secret)
        .context("CLERK_WEBHOOK_SECRET is not a valid signing secret")?;
    let sessions = SessionVerifier::from_rsa_pem(
        &config.clerk.jwt_public_key,
        config.clerk.jwt_issuer.as_deref(),
    )
    .context("CLERK_JWT_KEY is not a valid RSA public key")?;

    let customer_locks = Arc::new(KeyedLocks::new());
    let state = AppState {
        users: Arc::new(PostgresUserRepository { pool: pool.clone() }),
        subscriptions: Arc::new(PostgresSubscriptionRepository { pool: pool.clone() }),
        webhook_events: Arc::new(PostgresWebhookEventLogRepository { pool: pool.clone() }),
        razorpay: Arc::new(LiveRazorpayService::from_settings(
            http_client.clone(),
            &config.razorpay,
        )),
        clerk: Arc::new(LiveClerkClient::new(
            http_client.clone(),
            config.clerk.secret_key.clone(),
        )),
        clerk_webhooks: Arc::new(clerk_webhooks),
        sessions: Arc::new(sessions),
        mailer: Arc::new(ResendMailer::new(&http_client, &config.email)),
        customer_locks: customer_locks.clone(),
        config: config.clone(),
    };

    // Idle per-user locks are cheap but unbounded; sweep them periodically.
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            ticker.tick().await;
            customer_locks.prune();
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid header value")?,
        )
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .layer(cors);

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("BIND_ADDR {} is not a socket address", config.bind_addr))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    Ok(())
}

/// `RUST_LOG` filtering (default `info`); `LOG_FORMAT=json` switches to
/// structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
