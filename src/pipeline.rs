//! The shared trigger-to-exec pipeline: validate the payload, resolve an
//! endpoint, pick a surface, run the command, hand the captured output back
//! to whichever adapter asked.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::cluster::{ClusterApi, CommandInvocation, ExecutionResult, Selector};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::exec::CommandExecutor;
use crate::{resolver, surface};

/// Credential payload carried by both triggers.
///
/// Untrusted input: both adapters run it through [`CommandRequest::validate`]
/// before anything touches the cluster.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    pub username: String,
    pub password: String,
}

impl CommandRequest {
    /// Require both identity fields to be present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns `Validation` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(BridgeError::Validation("username must not be empty".into()));
        }
        if self.password.is_empty() {
            return Err(BridgeError::Validation("password must not be empty".into()));
        }
        Ok(())
    }
}

/// Assemble the remote argv: fixed prefix, then caller fields as discrete
/// elements. Values pass through untouched; there is no shell between the
/// bridge and the remote process, so metacharacters stay inert.
pub fn build_argv(prefix: &[String], request: &CommandRequest) -> Vec<String> {
    let mut argv = Vec::with_capacity(prefix.len() + 4);
    argv.extend(prefix.iter().cloned());
    argv.push("--username".to_string());
    argv.push(request.username.clone());
    argv.push("--password".to_string());
    argv.push(request.password.clone());
    argv
}

/// The resolve → select → execute pipeline, shared by both trigger adapters.
///
/// Holds the long-lived cluster handle and the target configuration; no
/// per-invocation state, safe to call concurrently.
pub struct Bridge {
    cluster: Arc<dyn ClusterApi>,
    selector: Selector,
    exclusions: HashSet<String>,
    command_prefix: Vec<String>,
    executor: CommandExecutor,
}

impl Bridge {
    pub fn new(cluster: Arc<dyn ClusterApi>, config: &BridgeConfig) -> Self {
        Self {
            cluster,
            selector: Selector::new(config.scope.clone(), config.selector.clone()),
            exclusions: config.excluded_surfaces.clone(),
            command_prefix: config.command_prefix.clone(),
            executor: CommandExecutor::new(config.exec_timeout),
        }
    }

    /// Run one invocation end to end.
    ///
    /// # Errors
    ///
    /// `Validation` before any cluster call; otherwise whatever the
    /// resolver, surface selector or executor reports.
    pub async fn run(&self, request: &CommandRequest) -> Result<ExecutionResult> {
        request.validate()?;

        let invocation_id = Uuid::new_v4();
        tracing::info!(
            invocation_id = %invocation_id,
            username = %request.username,
            "Dispatching remote command"
        );

        let endpoint = resolver::resolve(self.cluster.as_ref(), &self.selector).await?;
        let surface = surface::select_surface(&endpoint, &self.exclusions)?.to_string();

        tracing::debug!(
            invocation_id = %invocation_id,
            endpoint = %endpoint.name,
            surface = %surface,
            "Resolved execution target"
        );

        let argv = build_argv(&self.command_prefix, request);
        let invocation = CommandInvocation::new(endpoint, surface, argv);
        let result = self
            .executor
            .execute(self.cluster.as_ref(), &invocation)
            .await?;

        tracing::info!(
            invocation_id = %invocation_id,
            status = %result.status,
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "Remote command finished"
        );

        Ok(result)
    }
}
