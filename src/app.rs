/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (token gates / CORS / HTTP layers)
 * - chat API と admin API を別々の listener で axum::serve()
 */
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::{panic, process};

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::{ApiConfig, Config};
use crate::middleware;
use crate::services::auth::{IdentityResolver, build_identity_resolver};
use crate::services::upstream::Upstream;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "chat-gateway", about = "Token gateway for the chat and admin APIs")]
struct Args {
    /// YAML configuration file; a missing file means defaults + env only.
    #[arg(long, short, default_value = "config/gateway.yml")]
    config: PathBuf,
}

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,chat_gateway=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched
        tracing::error!(?info, "panic");

        // development: crash the whole process so we notice immediately
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting gateway in {:?} mode (chat {}, admin {})",
        config.app_env,
        config.chat_api.addr,
        config.admin_api.addr
    );

    let resolver = build_identity_resolver(&config)?;

    let chat_state = build_state(resolver.clone(), &config.chat_api)?;
    let chat = build_router(api::chat::routes(&chat_state), chat_state, &config);

    let admin_state = build_state(resolver, &config.admin_api)?;
    let admin = build_router(api::admin::routes(&admin_state), admin_state, &config);

    tokio::try_join!(
        serve("chat", config.chat_api.addr, chat),
        serve("admin", config.admin_api.addr, admin),
    )?;

    tracing::info!("gateway stopped");
    Ok(())
}

fn build_state(resolver: Arc<dyn IdentityResolver>, api: &ApiConfig) -> Result<AppState> {
    let upstream = Upstream::new(&api.upstream_url)
        .with_context(|| format!("invalid upstream url {}", api.upstream_url))?;
    tracing::info!(addr = %api.addr, upstream = upstream.base(), "relay configured");

    Ok(AppState::new(resolver, upstream))
}

fn build_router(routes: Router<AppState>, state: AppState, config: &Config) -> Router {
    let router = routes.with_state(state);
    let router = middleware::http::apply(router, &config.http);
    middleware::cors::apply(router, config)
}

async fn serve(name: &'static str, addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {name} api on {addr}"))?;
    tracing::info!(api = name, %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(name))
        .await?;
    Ok(())
}

async fn shutdown_signal(name: &'static str) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?err, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    tracing::info!(api = name, "shutting down");
}
