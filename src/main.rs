// ABOUTME: Entry point for the demo panel server and its helper commands
// ABOUTME: Initializes logging and config, mounts the authenticated panel, and serves it with axum

use anyhow::{Context, Result};
use axum::{response::Redirect, routing::get, Router};
use clap::{Parser, Subcommand};
use panel_mount::{
    auth::{hash_password, AuthOptions, AuthenticatedRouter, PasswordAuthenticator},
    config::Config,
    demo::{demo_panel, RecordStore},
    AdminPanel,
};
use rand::{distributions::Alphanumeric, Rng};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "panel-mount")]
#[command(about = "Serve an admin panel behind session authentication", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the demo panel
    Serve {
        /// Config file (defaults to PANEL_CONFIG_PATH or ./config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print an Argon2 hash for an [[admins]] entry
    HashPassword { password: String },
    /// Print a random cookie secret
    GenerateSecret,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(config).await,
        Commands::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
            Ok(())
        }
        Commands::GenerateSecret => {
            let secret: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(64)
                .map(char::from)
                .collect();
            println!("{}", secret);
            Ok(())
        }
    }
}

async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    tracing::info!(
        root = %config.panel.root_path,
        admins = config.admins.len(),
        secure_cookie = config.session.secure,
        "Configuration loaded"
    );

    let panel = Arc::new(demo_panel(
        &config.panel.root_path,
        &config.panel.branding,
        &config.panel.assets_dir,
        RecordStore::seeded(),
    ));
    let root_path = panel.paths().root_path.clone();

    let mut options = AuthOptions::new(
        Arc::new(PasswordAuthenticator::new(config.admins.clone())),
        config.session.cookie_secret.clone().unwrap_or_default(),
    );
    if let Some(name) = &config.session.cookie_name {
        options = options.with_cookie_name(name.clone());
    }

    let panel_router = AuthenticatedRouter::new(panel, options)
        .memory_store()
        .secure_cookie(config.session.secure)
        .build(None)
        .context("Failed to build panel router")?;

    let app = if root_path == "/" {
        panel_router
    } else {
        let redirect_target = root_path.clone();
        Router::new()
            .route(
                "/",
                get(move || async move { Redirect::permanent(&redirect_target) }),
            )
            .nest(&root_path, panel_router)
    }
    .layer(TraceLayer::new_for_http());

    let addr = config.bind_address();
    tracing::info!(addr = %addr, root = %root_path, "Starting panel server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Panel server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
