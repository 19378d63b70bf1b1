use std::env;

use thiserror::Error;

use crate::DEFAULT_PORT;

/// Everything the server reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{0} must be a number")]
    NotANumber(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("AUXPARTY_SERVER_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::NotANumber("AUXPARTY_SERVER_PORT"))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            database_url: require("DATABASE_URL")?,
            client_id: require("SPOTIFY_CLIENT_ID")?,
            client_secret: require("SPOTIFY_CLIENT_SECRET")?,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_env_reads_and_defaults() {
        env::set_var("DATABASE_URL", "postgres://localhost/auxparty");
        env::set_var("SPOTIFY_CLIENT_ID", "id");
        env::set_var("SPOTIFY_CLIENT_SECRET", "secret");
        env::remove_var("AUXPARTY_SERVER_PORT");

        let config = Config::from_env().expect("config is complete");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_url, "postgres://localhost/auxparty");

        env::set_var("AUXPARTY_SERVER_PORT", "nine thousand");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::NotANumber("AUXPARTY_SERVER_PORT"))
        ));

        env::set_var("AUXPARTY_SERVER_PORT", "9051");
        let config = Config::from_env().expect("config is complete");
        assert_eq!(config.port, 9051);

        env::remove_var("SPOTIFY_CLIENT_SECRET");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("SPOTIFY_CLIENT_SECRET"))
        ));
    }
}
