mod demo;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use dotenvy::dotenv;
use routeway::{
    config::{AppConfig, SecretsConfig},
    features::auth::SessionStore,
    run,
    utils::logging::{self, log_startup},
};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(version, about = "Demo API served by the routeway dispatcher")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "router.yaml")]
    config: PathBuf,

    /// Print the route table and exit
    #[arg(long)]
    print_routes: bool,

    /// Write the route table as JSON to this file
    #[arg(long)]
    export_routes: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();
    let args = Args::parse();

    let config = if args.config.exists() {
        AppConfig::load(&args.config)
            .with_context(|| format!("failed to load {}", args.config.display()))?
    } else {
        AppConfig::default()
    };
    logging::init(&config.logging.level);
    if !args.config.exists() {
        warn!(path = %args.config.display(), "config file not found, using defaults");
    }
    log_startup("configuration", "loaded", None);

    log_startup("secrets", "loading", None);
    let secrets = SecretsConfig::from_env()?;
    log_startup("secrets", "loaded", None);

    let demo = demo::build(&config, &secrets)?;
    let router = demo.router.freeze();

    if args.print_routes {
        for route in router.routes() {
            println!("{:<7} {}", route.method, route.path);
        }
        return Ok(());
    }
    router.log_routes();
    if let Some(path) = args.export_routes.or_else(|| config.routes_export.clone()) {
        router.export_routes(&path)?;
    }

    spawn_session_sweeper(demo.sessions);
    run(&config, router).await
}

fn spawn_session_sweeper(sessions: Arc<SessionStore>) {
    let period = sessions.ttl().clamp(Duration::from_secs(60), Duration::from_secs(3600));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            sessions.purge_expired();
        }
    });
}
