use thiserror::Error;

use crate::cluster::credentials::CredentialError;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No endpoint found for selector: {0}")]
    NotFound(String),

    #[error("No eligible surface on endpoint: {0}")]
    NoEligibleSurface(String),

    #[error("Endpoint listing failed: {0}")]
    Upstream(String),

    #[error("Exec stream could not be established: {0}")]
    Connect(String),

    #[error("Exec stream failed: {0}")]
    Stream(String),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
