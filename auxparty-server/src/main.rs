use std::sync::Arc;

use colored::Colorize;
use log::{error, info};
use thiserror::Error;

use auxparty_collab::{Collab, PgDatabase};
use auxparty_server::{
    config::{Config, ConfigError},
    logging, run_server, ServerContext,
};
use auxparty_spotify::{AppCredentials, SpotifyClient};

#[derive(Debug, Error)]
enum BootError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not connect to database: {0}")]
    Database(String),

    #[error("Could not create the player client: {0}")]
    Player(String),
}

impl BootError {
    fn hint(&self) -> String {
        match self {
            BootError::Config(_) => {
                "Set the missing variable in the environment, then try again.".to_string()
            }
            BootError::Database(_) => {
                "Make sure the Postgres instance is running and DATABASE_URL points at it, then try again."
                    .to_string()
            }
            BootError::Player(_) => {
                "Check SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET, then try again.".to_string()
            }
        }
    }
}

async fn boot() -> Result<(), BootError> {
    let config = Config::from_env()?;

    info!("Connecting to database...");
    let database = PgDatabase::new(&config.database_url)
        .await
        .map_err(|e| BootError::Database(e.to_string()))?;

    let player = SpotifyClient::new(AppCredentials {
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
    })
    .map_err(|e| BootError::Player(e.to_string()))?;

    let collab = Collab::new(player, database);

    info!("Initialized successfully.");

    run_server(
        ServerContext {
            collab: Arc::new(collab),
        },
        config.port,
    )
    .await;

    Ok(())
}

#[tokio::main]
async fn main() {
    logging::init_logger();

    if let Err(error) = boot().await {
        error!(
            "{} Read the error below to troubleshoot the issue.",
            "auxparty failed to start!".bold().red()
        );
        error!("{}", error);
        error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
    }
}
