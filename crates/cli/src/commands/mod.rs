//! Command implementations.
//!
//! Every command acts as a backend superuser; [`Superuser::connect`] reads
//! the credentials from the environment and signs in once.

pub mod rules;
pub mod seed;
pub mod setup;
pub mod users;

use madio_storefront::backend::{BackendClient, BackendError};
use madio_storefront::config::{BackendConfig, ConfigError};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Backend settings in the environment are malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Backend request failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Seed file could not be read.
    #[error("Cannot read seed file: {0}")]
    Io(#[from] std::io::Error),

    /// Seed file is not valid YAML for a catalog.
    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Seed file parsed but its content is unusable.
    #[error("Invalid seed file: {0}")]
    InvalidSeed(String),

    /// Not a usable email address.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] madio_core::EmailError),

    /// No user has the given email.
    #[error("No user with email {0}")]
    UnknownUser(String),
}

/// A backend client signed in as superuser.
pub struct Superuser {
    pub client: BackendClient,
    pub token: SecretString,
}

impl Superuser {
    /// Read `BACKEND_URL` and the superuser credentials, then sign in.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is missing or the credentials are
    /// rejected.
    pub async fn connect() -> Result<Self, CliError> {
        dotenvy::dotenv().ok();

        let config = BackendConfig::from_env()?;
        let email = std::env::var("BACKEND_SUPERUSER_EMAIL")
            .map_err(|_| CliError::MissingEnvVar("BACKEND_SUPERUSER_EMAIL"))?;
        let password = std::env::var("BACKEND_SUPERUSER_PASSWORD")
            .map(SecretString::from)
            .map_err(|_| CliError::MissingEnvVar("BACKEND_SUPERUSER_PASSWORD"))?;

        let client = BackendClient::new(&config)?;

        tracing::info!(backend = %config.url, "Authenticating as superuser...");
        let token = client.authenticate_superuser(&email, &password).await?;
        tracing::info!("Superuser authenticated");

        Ok(Self { client, token })
    }
}
