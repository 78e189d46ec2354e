use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use crate::cluster::credentials::CredentialConfig;
use crate::error::{BridgeError, Result};

/// Configuration for the queue trigger.
///
/// Messages are consumed from a durable named subscription; the durable name
/// pins redelivery state across restarts.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Broker URL, e.g. "nats://127.0.0.1:4222"
    pub url: String,
    /// Stream that retains the trigger subject
    pub stream: String,
    /// Subject the trigger payloads are published on
    pub subject: String,
    /// Durable consumer name
    pub durable_name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            stream: "EXECBRIDGE".to_string(),
            subject: "execbridge.create-user".to_string(),
            durable_name: "execbridge-worker".to_string(),
        }
    }
}

/// Top-level bridge configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the HTTP trigger listens on
    pub http_addr: SocketAddr,
    /// Scope (namespace) endpoints are resolved in
    pub scope: String,
    /// Selector expression matched against endpoint metadata
    pub selector: String,
    /// Surface names that never receive commands (known sidecars)
    pub excluded_surfaces: HashSet<String>,
    /// Fixed argv prefix of the remote command; caller fields are appended
    /// as discrete elements
    pub command_prefix: Vec<String>,
    /// Deadline covering exec stream establishment and the full output read
    pub exec_timeout: Duration,
    /// Credential loading strategy for the cluster API handle
    pub credentials: CredentialConfig,
    /// Queue trigger; the bridge runs HTTP-only when absent
    pub queue: Option<QueueConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            http_addr: "127.0.0.1:8080"
                .parse()
                .expect("default listen address is valid"),
            scope: "default".to_string(),
            selector: "component=useradm".to_string(),
            excluded_surfaces: ["istio-proxy", "linkerd-proxy"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            command_prefix: vec!["useradm".to_string(), "create-user".to_string()],
            exec_timeout: Duration::from_secs(60),
            credentials: CredentialConfig::InCluster,
            queue: None,
        }
    }
}

impl BridgeConfig {
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_exclusion(mut self, surface: impl Into<String>) -> Self {
        self.excluded_surfaces.insert(surface.into());
        self
    }

    /// Check the invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns `Config` when the selector, scope or command prefix is empty,
    /// or the exec deadline is zero.
    pub fn validate(&self) -> Result<()> {
        if self.selector.trim().is_empty() {
            return Err(BridgeError::Config("selector must not be empty".into()));
        }
        if self.scope.trim().is_empty() {
            return Err(BridgeError::Config("scope must not be empty".into()));
        }
        if self.command_prefix.is_empty() {
            return Err(BridgeError::Config(
                "command prefix must not be empty".into(),
            ));
        }
        if self.exec_timeout.is_zero() {
            return Err(BridgeError::Config("exec timeout must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_config_default() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.http_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.scope, "default");
        assert_eq!(cfg.selector, "component=useradm");
        assert!(cfg.excluded_surfaces.contains("istio-proxy"));
        assert_eq!(cfg.command_prefix, vec!["useradm", "create-user"]);
        assert!(cfg.queue.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn queue_config_default() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.url, "nats://127.0.0.1:4222");
        assert_eq!(cfg.stream, "EXECBRIDGE");
        assert_eq!(cfg.subject, "execbridge.create-user");
        assert_eq!(cfg.durable_name, "execbridge-worker");
    }

    #[test]
    fn with_queue_enables_queue_trigger() {
        let cfg = BridgeConfig::default().with_queue(QueueConfig::default());
        assert!(cfg.queue.is_some());
    }

    #[test]
    fn with_exclusion_adds_surface() {
        let cfg = BridgeConfig::default().with_exclusion("envoy");
        assert!(cfg.excluded_surfaces.contains("envoy"));
    }

    #[test]
    fn validate_rejects_empty_selector() {
        let cfg = BridgeConfig {
            selector: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(BridgeError::Config(_))));
    }

    #[test]
    fn validate_rejects_empty_command_prefix() {
        let cfg = BridgeConfig {
            command_prefix: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(BridgeError::Config(_))));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = BridgeConfig {
            exec_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(BridgeError::Config(_))));
    }
}
