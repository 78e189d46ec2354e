//! Service assembly: credentials → cluster handle → pipeline → triggers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cluster::client::ApiClient;
use crate::cluster::credentials::ApiCredentials;
use crate::cluster::ClusterApi;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::pipeline::Bridge;
use crate::trigger;

/// The assembled bridge service.
///
/// Owns the configuration and the shared pipeline; `run` wires up the
/// triggers and blocks until shutdown.
pub struct BridgeService {
    config: BridgeConfig,
    bridge: Arc<Bridge>,
}

impl BridgeService {
    /// Build the service with a real cluster handle loaded from the
    /// configured credential strategy.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid, credentials
    /// cannot be loaded, or the API client cannot be built.
    pub async fn new(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let credentials = ApiCredentials::load(&config.credentials).await?;
        let client = ApiClient::new(&credentials)?;
        Ok(Self::with_cluster(config, Arc::new(client)))
    }

    /// Build the service around an existing cluster handle.
    pub fn with_cluster(config: BridgeConfig, cluster: Arc<dyn ClusterApi>) -> Self {
        let bridge = Arc::new(Bridge::new(cluster, &config));
        Self { config, bridge }
    }

    pub fn bridge(&self) -> Arc<Bridge> {
        self.bridge.clone()
    }

    /// Run the service until the shutdown token fires.
    ///
    /// Spawns the queue trigger when configured, then serves the HTTP
    /// trigger on the current task. The queue trigger logs its own setup
    /// failures rather than taking the HTTP trigger down with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP trigger fails to bind or serve.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        if let Some(queue_config) = self.config.queue.clone() {
            let bridge = self.bridge.clone();
            let token = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = trigger::queue::run_consumer(bridge, &queue_config, token).await {
                    tracing::error!(error = %e, "Queue trigger stopped");
                }
            });
        }

        trigger::http::serve(self.config.http_addr, self.bridge, shutdown).await
    }
}
