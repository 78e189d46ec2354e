//! HTTP implementation of the cluster API.
//!
//! Endpoint listings are plain JSON GETs; exec requests are upgraded to a raw
//! duplex byte stream on `101 Switching Protocols`.

use reqwest::header::{CONNECTION, UPGRADE};
use reqwest::{Certificate, StatusCode};
use serde::Deserialize;

use crate::cluster::credentials::ApiCredentials;
use crate::cluster::{ClusterApi, Endpoint, ExecStream, Selector, Surface};
use crate::error::{BridgeError, Result};

/// Protocol name offered in the `Upgrade` header of exec requests.
const EXEC_PROTOCOL: &str = "execstream.bridge/v1";

/// Wire shape of one endpoint in a listing response.
#[derive(Deserialize)]
struct EndpointRecord {
    name: String,
    #[serde(default)]
    surfaces: Vec<SurfaceRecord>,
}

#[derive(Deserialize)]
struct SurfaceRecord {
    name: String,
}

/// Cluster API handle backed by the orchestrator's HTTP API.
///
/// Cheap to share: holds a connection pool and a bearer token, no mutable
/// state. Built once at startup.
pub struct ApiClient {
    http: reqwest::Client,
    server: String,
    token: String,
}

impl ApiClient {
    /// Build a client from loaded credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the CA bundle cannot be parsed or the underlying
    /// HTTP client cannot be constructed.
    pub fn new(credentials: &ApiCredentials) -> Result<Self> {
        let mut builder = reqwest::Client::builder();

        if let Some(ca_pem) = &credentials.ca_cert {
            let ca = Certificate::from_pem(ca_pem)
                .map_err(|e| BridgeError::Config(format!("invalid CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(ca);
        }

        let http = builder
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            server: credentials.server.trim_end_matches('/').to_string(),
            token: credentials.token.clone(),
        })
    }

    fn endpoints_url(&self, scope: &str) -> String {
        format!("{}/api/v1/scopes/{}/endpoints", self.server, scope)
    }

    fn exec_url(&self, scope: &str, endpoint: &str) -> String {
        format!(
            "{}/api/v1/scopes/{}/endpoints/{}/exec",
            self.server, scope, endpoint
        )
    }
}

#[async_trait::async_trait]
impl ClusterApi for ApiClient {
    async fn list_endpoints(&self, selector: &Selector) -> Result<Vec<Endpoint>> {
        let response = self
            .http
            .get(self.endpoints_url(&selector.scope))
            .query(&[("selector", selector.expression.as_str())])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| BridgeError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BridgeError::Upstream(format!(
                "endpoint listing returned {}",
                response.status()
            )));
        }

        let records: Vec<EndpointRecord> = response
            .json()
            .await
            .map_err(|e| BridgeError::Upstream(format!("malformed listing response: {}", e)))?;

        Ok(records
            .into_iter()
            .map(|record| Endpoint {
                name: record.name,
                scope: selector.scope.clone(),
                surfaces: record
                    .surfaces
                    .into_iter()
                    .map(|s| Surface::new(s.name))
                    .collect(),
            })
            .collect())
    }

    async fn open_exec_stream(
        &self,
        endpoint: &Endpoint,
        surface: &str,
        argv: &[String],
    ) -> Result<ExecStream> {
        let mut request = self
            .http
            .post(self.exec_url(&endpoint.scope, &endpoint.name))
            .query(&[
                ("surface", surface),
                ("stdout", "true"),
                ("stderr", "true"),
                ("stdin", "false"),
                ("tty", "false"),
            ])
            .bearer_auth(&self.token)
            .header(CONNECTION, "Upgrade")
            .header(UPGRADE, EXEC_PROTOCOL);

        // Each argv element is a separate query parameter; the remote end
        // receives them as discrete arguments with no shell in between.
        for arg in argv {
            request = request.query(&[("command", arg.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BridgeError::Connect(e.to_string()))?;

        if response.status() != StatusCode::SWITCHING_PROTOCOLS {
            return Err(BridgeError::Connect(format!(
                "exec request to {}/{} returned {}",
                endpoint.name,
                surface,
                response.status()
            )));
        }

        let upgraded = response
            .upgrade()
            .await
            .map_err(|e| BridgeError::Connect(format!("upgrade failed: {}", e)))?;

        Ok(Box::new(upgraded))
    }
}
