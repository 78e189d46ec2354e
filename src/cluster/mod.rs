//! Cluster access layer: the data model for addressable workloads and the
//! narrow interface the bridge needs from the orchestrator's API.
//!
//! The bridge never caches or mutates cluster state. Every invocation fetches
//! a fresh endpoint snapshot, picks a surface, and opens one exec stream.

pub mod client;
pub mod credentials;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// Declarative match expression used to find endpoints by metadata, plus the
/// scope (namespace) the lookup applies in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub scope: String,
    /// Comma-separated `key=value` expression matched against endpoint
    /// metadata only, never endpoint content.
    pub expression: String,
}

impl Selector {
    pub fn new(scope: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            expression: expression.into(),
        }
    }
}

/// A named execution context within an endpoint. One workload instance may
/// expose several (application process, sidecar proxies, init helpers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub name: String,
}

impl Surface {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A running workload instance addressable for command execution.
///
/// Read-only snapshot taken at resolution time. Surface names are unique
/// within one endpoint; their order is the declaration order reported by the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub scope: String,
    pub surfaces: Vec<Surface>,
}

/// One command to run against a concrete (endpoint, surface) target.
///
/// The argv is a sequence of discrete elements handed to the remote process
/// directly. Caller-supplied values are never folded into a shell string.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub target: Endpoint,
    pub surface: String,
    pub argv: Vec<String>,
}

impl CommandInvocation {
    pub fn new(target: Endpoint, surface: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            target,
            surface: surface.into(),
            argv,
        }
    }
}

/// Terminal status of one remote command.
///
/// The exec protocol carries no exit code, so `RemoteCommandError` is
/// inferred from stderr content at clean stream close. Callers branch on this
/// enum only; swapping in an exit-code-bearing protocol changes nothing
/// upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Success,
    RemoteCommandError,
}

impl std::fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecStatus::Success => write!(f, "success"),
            ExecStatus::RemoteCommandError => write!(f, "remote-command-error"),
        }
    }
}

/// Captured output of one remote command. Constructed exactly once per
/// invocation and owned by the trigger adapter that requested it.
#[derive(Debug)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: ExecStatus,
}

impl ExecutionResult {
    pub fn stdout_utf8(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_utf8(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Bidirectional byte stream obtained by upgrading an exec request.
pub trait UpgradedStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> UpgradedStream for T {}

pub type ExecStream = Box<dyn UpgradedStream>;

/// The two operations the bridge requires from the orchestrator.
///
/// Implementations must be safe for concurrent read-only use; a single handle
/// is built at startup and shared across all in-flight invocations.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List the endpoints in the selector's scope whose metadata matches the
    /// selector expression, in the order reported by the orchestrator.
    async fn list_endpoints(&self, selector: &Selector) -> Result<Vec<Endpoint>>;

    /// Open an upgraded duplex stream running `argv` in the named surface of
    /// the endpoint. The returned stream carries channel-framed stdout and
    /// stderr; no stdin is forwarded.
    async fn open_exec_stream(
        &self,
        endpoint: &Endpoint,
        surface: &str,
        argv: &[String],
    ) -> Result<ExecStream>;
}
