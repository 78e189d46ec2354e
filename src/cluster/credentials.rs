//! Credential loading for the cluster API handle.
//!
//! Two strategies, selected at startup: a JSON credentials file (operator
//! workstations, CI), or the ambient identity mounted into a workload running
//! inside the cluster.

use std::path::PathBuf;

use serde::Deserialize;
use tokio::fs;

/// Environment variables announcing the in-cluster API address.
const API_HOST_ENV: &str = "CLUSTER_API_HOST";
const API_PORT_ENV: &str = "CLUSTER_API_PORT";

/// Mounted in-cluster identity paths.
const IN_CLUSTER_TOKEN_PATH: &str = "/var/run/cluster/token";
const IN_CLUSTER_CA_PATH: &str = "/var/run/cluster/ca.crt";

/// Error type for credential loading issues.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Credentials file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Credentials file is not valid JSON: {0}")]
    Malformed(String),

    #[error("Not running in-cluster: {0} is not set")]
    MissingEnv(&'static str),

    #[error("CA certificate not found: {0}")]
    CaCertNotFound(PathBuf),

    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),
}

/// How the API handle obtains its identity.
#[derive(Debug, Clone)]
pub enum CredentialConfig {
    /// Read server address, token and optional CA bundle from a JSON file.
    File(PathBuf),
    /// Use the ambient identity mounted into the workload.
    InCluster,
}

#[derive(Deserialize)]
struct CredentialFile {
    server: String,
    token: String,
    ca_cert_path: Option<PathBuf>,
}

/// Loaded API credentials ready to build a client from.
#[derive(Clone)]
pub struct ApiCredentials {
    /// Base URL of the orchestrator API, e.g. `https://10.0.0.1:6443`.
    pub server: String,
    /// Bearer token presented on every request.
    pub token: String,
    /// PEM-encoded CA bundle for verifying the API server, if any.
    pub ca_cert: Option<Vec<u8>>,
}

impl ApiCredentials {
    /// Load credentials according to the configured strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials file is missing or malformed, a
    /// referenced CA bundle does not exist, or (in-cluster) the ambient
    /// identity environment/mounts are absent.
    pub async fn load(config: &CredentialConfig) -> Result<Self, CredentialError> {
        match config {
            CredentialConfig::File(path) => Self::from_file(path).await,
            CredentialConfig::InCluster => Self::in_cluster().await,
        }
    }

    async fn from_file(path: &PathBuf) -> Result<Self, CredentialError> {
        if !path.exists() {
            return Err(CredentialError::FileNotFound(path.clone()));
        }

        let raw = fs::read(path).await?;
        let file: CredentialFile =
            serde_json::from_slice(&raw).map_err(|e| CredentialError::Malformed(e.to_string()))?;

        let ca_cert = match file.ca_cert_path {
            Some(ca_path) => {
                if !ca_path.exists() {
                    return Err(CredentialError::CaCertNotFound(ca_path));
                }
                Some(fs::read(ca_path).await?)
            }
            None => None,
        };

        Ok(Self {
            server: file.server,
            token: file.token,
            ca_cert,
        })
    }

    async fn in_cluster() -> Result<Self, CredentialError> {
        let host = std::env::var(API_HOST_ENV)
            .map_err(|_| CredentialError::MissingEnv(API_HOST_ENV))?;
        let port = std::env::var(API_PORT_ENV)
            .map_err(|_| CredentialError::MissingEnv(API_PORT_ENV))?;

        let token = fs::read_to_string(IN_CLUSTER_TOKEN_PATH).await?;
        let ca_path = PathBuf::from(IN_CLUSTER_CA_PATH);
        if !ca_path.exists() {
            return Err(CredentialError::CaCertNotFound(ca_path));
        }
        let ca_cert = fs::read(&ca_path).await?;

        Ok(Self {
            server: format!("https://{}:{}", host, port),
            token: token.trim().to_string(),
            ca_cert: Some(ca_cert),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let config = CredentialConfig::File(PathBuf::from("/nonexistent/credentials.json"));
        let result = ApiCredentials::load(&config).await;
        assert!(matches!(result, Err(CredentialError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let config = CredentialConfig::File(file.path().to_path_buf());
        let result = ApiCredentials::load(&config).await;
        assert!(matches!(result, Err(CredentialError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_load_valid_file_without_ca() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": "https://api.example.com:6443", "token": "secret-token"}}"#
        )
        .unwrap();

        let config = CredentialConfig::File(file.path().to_path_buf());
        let creds = ApiCredentials::load(&config).await.unwrap();
        assert_eq!(creds.server, "https://api.example.com:6443");
        assert_eq!(creds.token, "secret-token");
        assert!(creds.ca_cert.is_none());
    }

    #[tokio::test]
    async fn test_load_file_with_missing_ca() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": "https://api.example.com:6443", "token": "t", "ca_cert_path": "/nonexistent/ca.crt"}}"#
        )
        .unwrap();

        let config = CredentialConfig::File(file.path().to_path_buf());
        let result = ApiCredentials::load(&config).await;
        assert!(matches!(result, Err(CredentialError::CaCertNotFound(_))));
    }
}
