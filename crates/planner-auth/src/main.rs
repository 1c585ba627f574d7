use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use planner_auth::auth::{AuthScheme, Authenticator};
use planner_auth::config;
use planner_auth::observability::init_observability;
use planner_auth::store::{InMemoryKeyStore, InMemoryShareTokenStore, InMemorySourceStore};
use planner_auth::{AppState, SourceService, agent_router, api, user_router};
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "planner-auth")]
#[command(about = "Migration planner API with source-scoped agent authentication", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Authentication scheme for the user API (rhsso, local, none)
    #[arg(long)]
    auth: Option<String>,

    /// JWKS URL of the identity provider (rhsso scheme)
    #[arg(long)]
    jwk_url: Option<String>,

    /// User API bind address
    #[arg(long)]
    address: Option<SocketAddr>,

    /// Agent API bind address
    #[arg(long)]
    agent_address: Option<SocketAddr>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // CLI arguments first, then env/file on top: env > file > CLI > defaults
    let mut builder = config::ConfigBuilder::new();
    if let Some(ref scheme) = args.auth {
        builder = builder.auth_scheme(AuthScheme::parse_lenient(scheme));
    }
    if let Some(ref url_str) = args.jwk_url {
        let url = Url::parse(url_str).map_err(|e| anyhow::anyhow!("Invalid JWKS URL: {e}"))?;
        builder = builder.jwks_url(url);
    }
    if let Some(addr) = args.address {
        builder = builder.user_addr(addr);
    }
    if let Some(addr) = args.agent_address {
        builder = builder.agent_addr(addr);
    }
    if args.verbose {
        builder = builder.log_level("debug".to_string());
    }
    builder = builder.json_logs(args.json_logs);

    let builder = if let Some(ref path) = args.config {
        config::load_config_from_path_with(path, builder)?
    } else {
        config::load_config_with(builder)?
    };
    let config = builder.build()?;

    init_observability(&config.telemetry)?;
    tracing::info!(
        scheme = %config.auth.scheme,
        user_addr = %config.http.user_addr,
        agent_addr = %config.http.agent_addr,
        "Starting planner-auth"
    );

    let key_store = Arc::new(InMemoryKeyStore::new());
    let service = SourceService::new(
        Arc::new(InMemorySourceStore::new()),
        key_store.clone(),
        Arc::new(InMemoryShareTokenStore::new()),
    );
    let state = AppState::new(service);

    let user_auth = Authenticator::from_config(&config.auth, key_store.clone()).await?;
    let agent_auth = Authenticator::agent(key_store);

    let shutdown = CancellationToken::new();
    let refresh = config
        .auth
        .jwks_refresh_interval
        .and_then(|interval| user_auth.spawn_jwks_refresh(interval, shutdown.clone()));

    let timeout = config.http.request_timeout;
    let user_api = api::serve(
        "user",
        user_router(state.clone(), user_auth, timeout),
        config.http.user_addr,
        shutdown.clone().cancelled_owned(),
    );
    let agent_api = api::serve(
        "agent",
        agent_router(state, agent_auth, timeout),
        config.http.agent_addr,
        shutdown.clone().cancelled_owned(),
    );

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        signal.cancel();
    });

    let result = tokio::try_join!(user_api, agent_api);
    shutdown.cancel();
    if let Some(handle) = refresh {
        handle.await.ok();
    }
    result?;

    tracing::info!("planner-auth stopped");
    Ok(())
}
