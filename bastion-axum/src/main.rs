use std::{net::SocketAddr, sync::Arc};

use bastion::{BastionBuilder, DEFAULT_MAINTENANCE_INTERVAL, JwtConfig, SecurityConfig};
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// HTTP server for the bastion account security layer
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "BASTION_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Database connection string
    #[arg(long, env = "BASTION_DATABASE_URL", default_value = "sqlite://bastion.db?mode=rwc")]
    database_url: String,

    /// Deliver codes and reset links by email, configured from BASTION_MAILER_* variables
    #[arg(long, env = "BASTION_MAILER_ENABLED")]
    mailer: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut builder = BastionBuilder::new()
        .with_config(SecurityConfig::from_env()?)
        .with_sqlite(&cli.database_url)
        .await?
        .with_jwt(JwtConfig::from_env()?)
        .apply_migrations(true);
    if cli.mailer {
        builder = builder.with_mailer_from_env()?;
    }
    let bastion = Arc::new(builder.build().await?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let maintenance = bastion
        .maintenance()
        .start(DEFAULT_MAINTENANCE_INTERVAL, shutdown_rx);

    let app = bastion_axum::routes(bastion);
    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    tracing::info!(address = %cli.bind, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await?;

    let _ = shutdown_tx.send(true);
    maintenance.await?;
    Ok(())
}
