//! GemLedger Server
//!
//! Hosts the Gems economy: two polled request channels (economy and
//! accounts) plus the read-only HTTP API, all over one blob-backed ledger.

mod handlers;
mod services;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use gems_adapters::{CloudChannel, GitHubStore, SiteClient};
use gems_core::{Dispatcher, Ledger, TransferEngine};
use services::{Accounts, Economy};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub docs_url: String,
    pub docs_path: String,
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting GemLedger Server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    info!("Loading configuration...");
    let config = load_config().context("Failed to load configuration")?;
    info!(
        "Config loaded: bind={}, store={}/{}@{}",
        config.bind_address, config.store_owner, config.store_repo, config.store_branch
    );

    // Open the ledger against the remote blob store
    let store = Arc::new(GitHubStore::new(
        config.store_owner.clone(),
        config.store_repo.clone(),
        config.store_branch.clone(),
        config.store_token.clone(),
    ));
    let ledger = Arc::new(Ledger::open(store).await);
    info!("Ledger loaded: {} known users", ledger.user_count().await);

    // Log the service account into the site; transfers post comments
    // through this session
    let site = Arc::new(
        SiteClient::login(
            config.site_url.clone(),
            config.service_username.clone(),
            config.service_password.clone(),
        )
        .await
        .context("Failed to log the service account into the site")?,
    );

    let engine = TransferEngine::new(
        ledger.clone(),
        site,
        config.project_name.clone(),
        config.project_link.clone(),
    );
    let economy = Arc::new(Economy::new(ledger.clone(), engine));
    let accounts = Arc::new(Accounts::new(ledger.clone()));

    // Economy operations on the main channel, signup/login on their own
    let mut economy_dispatcher = Dispatcher::new("economy");
    economy.register(&mut economy_dispatcher);
    spawn_channel(economy_dispatcher, &config, config.main_project_id);

    let mut accounts_dispatcher = Dispatcher::new("accounts");
    accounts.register(&mut accounts_dispatcher);
    spawn_channel(accounts_dispatcher, &config, config.auth_project_id);

    // HTTP read API
    let state = AppState {
        ledger,
        docs_url: config.docs_url.clone(),
        docs_path: config.docs_path.clone(),
    };
    let app = build_router(state);

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::meta::home))
        .route("/users", get(handlers::users::list))
        .route("/balances", get(handlers::users::balances))
        .route("/users/:username", get(handlers::users::get_user))
        .route("/verify", get(handlers::meta::verify))
        .route("/transactions", get(handlers::transactions::list))
        .route(
            "/transactions/:username",
            get(handlers::transactions::for_user),
        )
        .route(
            "/notifications/:username",
            get(handlers::notifications::for_user),
        )
        .route("/docs", get(handlers::meta::docs))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run one polling connection forever, reconnecting with capped backoff.
fn spawn_channel(dispatcher: Dispatcher, config: &Config, project_id: u64) {
    let ws_url = config.cloud_ws_url.clone();
    let username = config.service_username.clone();
    let request_var = config.request_var.clone();
    let response_var = config.response_var.clone();

    tokio::spawn(async move {
        let mut backoff = 1;
        loop {
            match CloudChannel::connect(&ws_url, &username, project_id, &request_var, &response_var)
                .await
            {
                Ok(channel) => {
                    backoff = 1;
                    match dispatcher.run(channel).await {
                        Ok(()) => info!("Channel to project {} closed, reconnecting", project_id),
                        Err(e) => error!("Channel to project {} failed: {}", project_id, e),
                    }
                }
                Err(e) => error!("Failed to connect to project {}: {}", project_id, e),
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(backoff)).await;
            backoff = std::cmp::min(backoff * 2, 30);
        }
    });
}

#[derive(Debug, Clone)]
struct Config {
    bind_address: String,
    store_token: String,
    store_owner: String,
    store_repo: String,
    store_branch: String,
    service_username: String,
    service_password: String,
    site_url: String,
    cloud_ws_url: String,
    main_project_id: u64,
    auth_project_id: u64,
    request_var: String,
    response_var: String,
    project_name: String,
    project_link: String,
    docs_url: String,
    docs_path: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn load_config() -> Result<Config> {
    // The blob store token and the service-account password have no sane
    // defaults; everything else does.
    let store_token = std::env::var("STORE_TOKEN").context("STORE_TOKEN must be set")?;
    let service_password =
        std::env::var("SERVICE_PASSWORD").context("SERVICE_PASSWORD must be set")?;

    let main_project_id: u64 = env_or("MAIN_PROJECT_ID", "1134723891")
        .parse()
        .context("MAIN_PROJECT_ID must be numeric")?;
    let auth_project_id: u64 = env_or("AUTH_PROJECT_ID", "1169132014")
        .parse()
        .context("AUTH_PROJECT_ID must be numeric")?;

    let site_url = env_or("SITE_URL", "https://scratch.mit.edu");
    let project_link = env_or(
        "PROJECT_LINK",
        &format!("{}/projects/{}", site_url, main_project_id),
    );

    Ok(Config {
        bind_address: env_or("BIND_ADDRESS", "0.0.0.0:5000"),
        store_token,
        store_owner: env_or("STORE_OWNER", "gemledger"),
        store_repo: env_or("STORE_REPO", "gemledger-db"),
        store_branch: env_or("STORE_BRANCH", "main"),
        service_username: env_or("SERVICE_USERNAME", "Dev-Server"),
        service_password,
        site_url,
        cloud_ws_url: env_or("CLOUD_WS_URL", "wss://clouddata.scratch.mit.edu"),
        main_project_id,
        auth_project_id,
        request_var: env_or("REQUEST_VAR", "REQUEST"),
        response_var: env_or("RESPONSE_VAR", "RESPONSE"),
        project_name: env_or("PROJECT_NAME", "GemLedger"),
        project_link,
        docs_url: env_or("DOCS_URL", "/docs"),
        docs_path: env_or("DOCS_PATH", "docs.html"),
    })
}
