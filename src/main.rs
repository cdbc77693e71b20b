use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod error;
mod handlers;
mod i18n;
mod models;
mod notify;
mod reminder;
mod store;

use auth::rate_limit::RateLimitState;
use config::Config;
use notify::{ChannelNotifier, Notifier};
use reminder::engine::ReminderEngine;
use store::{tokens::TokenStore, users::UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: UserStore,
    pub tokens: TokenStore,
    pub engine: ReminderEngine,
    pub notifier: Arc<ChannelNotifier>,
    pub ws_tx: Option<broadcast::Sender<String>>,
    pub rate_limiter: RateLimitState,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fharma_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    let config = Arc::new(config);

    // Reminder/notification delivery channel
    let (ws_tx, _) = broadcast::channel::<String>(256);

    let notifier = Arc::new(ChannelNotifier::new(ws_tx.clone()));
    let engine = ReminderEngine::new(
        notifier.clone() as Arc<dyn Notifier>,
        Some(ws_tx.clone()),
    );

    let state = AppState {
        config: config.clone(),
        users: UserStore::new(),
        tokens: TokenStore::new(),
        engine: engine.clone(),
        notifier,
        ws_tx: Some(ws_tx),
        rate_limiter: RateLimitState::new(),
    };

    // Auth routes with rate limiting
    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/api/i18n/:lang", get(handlers::i18n::get_dictionary))
        .route("/api/i18n/:lang/:key", get(handlers::i18n::get_translation))
        .route("/ws", get(handlers::ws::ws_handler))
        .merge(auth_routes);

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::auth::me))
        // Medicine schedules
        .route("/api/schedules", get(handlers::schedules::list_schedules))
        .route("/api/schedules", post(handlers::schedules::create_schedule))
        .route("/api/schedules/:id", get(handlers::schedules::get_schedule))
        .route(
            "/api/schedules/:id/ack",
            post(handlers::schedules::acknowledge_schedule),
        )
        .route("/api/prompts", get(handlers::schedules::list_prompts))
        // Notification permission
        .route(
            "/api/notifications/permission",
            get(handlers::notifications::query_permission)
                .post(handlers::notifications::request_permission)
                .put(handlers::notifications::report_permission),
        )
        // Doc Chat relay (per-user rate limited on top of auth)
        .route(
            "/api/chat",
            post(handlers::chat::chat).layer(middleware::from_fn_with_state(
                state.clone(),
                auth::rate_limit::rate_limit_chat,
            )),
        )
        // Auth actions requiring a session
        .route("/api/auth/logout", post(handlers::auth::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    // Start the reminder scan loop
    reminder::worker::spawn_reminder_worker(engine, config.reminder_tick_secs);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    // Use into_make_service_with_connect_info to provide client IP for rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .unwrap();
}
