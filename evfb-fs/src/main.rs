//! evfb-fs (Feedback Submission) - multi-step event feedback service

use anyhow::Result;
use clap::Parser;
use evfb_common::config::{
    RootFolderInitializer, RootFolderResolver, TomlConfig, DEFAULT_BIND_ADDRESS, DEFAULT_PORT,
};
use evfb_common::db::init_database;
use std::path::PathBuf;
use tracing::{error, info};

use evfb_fs::forms::seed_demo_form;
use evfb_fs::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "evfb-fs", version, about = "Event feedback form submission service")]
struct Args {
    /// Root folder holding evfb.db
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, env = "EVFB_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "EVFB_BIND")]
    bind: Option<String>,

    /// Create a published demo form when the database has no forms
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification before any database work
    info!(
        "Starting Event Feedback Submission (evfb-fs) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let toml_config = TomlConfig::load_or_default();

    let bind = args
        .bind
        .or_else(|| toml_config.bind_address.clone())
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);

    let root_folder = RootFolderResolver::new("feedback-submission")
        .with_cli_arg(args.root_folder)
        .with_toml(toml_config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::with_sqlite(pool);

    if args.seed_demo {
        match seed_demo_form(&state.editor).await? {
            Some(form) => info!("Demo form available at /api/forms/{}", form.id),
            None => info!("Forms already present, demo seed skipped"),
        }
    }

    let app = build_router(state);

    let addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("evfb-fs listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
