//! # Routeway
//!
//! A small synchronous request-dispatch core hosted on axum, featuring:
//! - `:param` and `*wildcard` path patterns with first-match-wins ordering
//! - Route groups whose middleware is baked in at registration
//! - Global middleware composed on every dispatch
//! - Panic recovery with opaque correlation ids
//! - Bearer token and session cookie authentication
//! - Multipart uploads validated by content sniffing
//! - Static file mounts and route introspection

pub mod app;
pub mod config;
pub mod constants;
pub mod context;
pub mod errors;
pub mod features;
pub mod middleware;
pub mod routing;
pub mod utils;

use std::future::Future;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{error, info};

pub use context::{Context, UploadedFile};
pub use errors::{AppError, ErrorBody};
pub use middleware::{compose, from_fn, handler_fn, Handler, Middleware};
pub use routing::{FrozenRouter, RouteGroup, RouteInfo, Router};

use crate::{config::AppConfig, utils::logging::log_startup};

/// Binds `config.server.addr` and serves `router` until Ctrl+C.
pub async fn run(config: &AppConfig, router: FrozenRouter) -> Result<()> {
    log_startup("listener", "binding", Some(&config.server.addr));
    let listener = TcpListener::bind(&config.server.addr).await?;
    serve(listener, router, config.server.max_body_size, shutdown_signal()).await
}

/// Serves `router` on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    router: FrozenRouter,
    max_body_size: usize,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(address = %addr, routes = router.routes().len(), "Router listening");

    let app = app::create_app(router, max_body_size);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
