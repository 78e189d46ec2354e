use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use execbridge::cluster::credentials::CredentialConfig;
use execbridge::cluster::ExecStatus;
use execbridge::config::{BridgeConfig, QueueConfig};
use execbridge::pipeline::CommandRequest;
use execbridge::service::BridgeService;
use execbridge::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "execbridge")]
#[command(version)]
#[command(about = "Bridges HTTP and queue triggers to remote command execution in cluster workloads")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the bridge service (HTTP trigger, optional queue trigger)
    Serve(ServeArgs),

    /// Run the pipeline once from the command line and print the output
    Exec(ExecArgs),
}

// =============================================================================
// Shared Target Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct TargetArgs {
    /// Scope (namespace) endpoints are resolved in
    #[arg(long, default_value = "default")]
    scope: String,

    /// Selector expression matched against endpoint metadata
    #[arg(long, default_value = "component=useradm")]
    selector: String,

    /// Surface name that never receives commands (repeatable)
    #[arg(long = "exclude-surface")]
    exclude_surfaces: Vec<String>,

    /// Element of the fixed remote command prefix (repeatable, in order)
    #[arg(long = "command-prefix")]
    command_prefix: Vec<String>,

    /// Path to a JSON credentials file; uses the ambient in-cluster
    /// identity when omitted
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Deadline in seconds for one remote command
    #[arg(long, default_value = "60")]
    exec_timeout_secs: u64,
}

impl TargetArgs {
    fn into_config(self, http_addr: SocketAddr) -> BridgeConfig {
        let defaults = BridgeConfig::default();
        BridgeConfig {
            http_addr,
            scope: self.scope,
            selector: self.selector,
            excluded_surfaces: if self.exclude_surfaces.is_empty() {
                defaults.excluded_surfaces
            } else {
                self.exclude_surfaces.into_iter().collect()
            },
            command_prefix: if self.command_prefix.is_empty() {
                defaults.command_prefix
            } else {
                self.command_prefix
            },
            exec_timeout: Duration::from_secs(self.exec_timeout_secs),
            credentials: match self.credentials {
                Some(path) => CredentialConfig::File(path),
                None => CredentialConfig::InCluster,
            },
            queue: None,
        }
    }
}

// =============================================================================
// Serve Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address the HTTP trigger listens on
    #[arg(long, default_value = "127.0.0.1:8080")]
    http_addr: SocketAddr,

    #[command(flatten)]
    target: TargetArgs,

    /// Queue broker URL; the queue trigger is disabled when omitted
    #[arg(long)]
    queue_url: Option<String>,

    /// Queue stream that retains the trigger subject
    #[arg(long, default_value = "EXECBRIDGE")]
    queue_stream: String,

    /// Subject the trigger payloads are published on
    #[arg(long, default_value = "execbridge.create-user")]
    queue_subject: String,

    /// Durable consumer name
    #[arg(long, default_value = "execbridge-worker")]
    queue_durable: String,
}

// =============================================================================
// Exec Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ExecArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Identity to create
    #[arg(long)]
    username: String,

    /// Secret for the identity
    #[arg(long)]
    password: String,
}

async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = args.target.into_config(args.http_addr);

    if let Some(url) = args.queue_url {
        config = config.with_queue(QueueConfig {
            url,
            stream: args.queue_stream,
            subject: args.queue_subject,
            durable_name: args.queue_durable,
        });
    }

    let service = BridgeService::new(config).await?;
    let shutdown = install_shutdown_handler();
    service.run(shutdown).await?;
    Ok(())
}

async fn run_exec(args: ExecArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args
        .target
        .into_config("127.0.0.1:0".parse().expect("fixed address is valid"));

    let service = BridgeService::new(config).await?;
    let request = CommandRequest {
        username: args.username,
        password: args.password,
    };

    let result = service.bridge().run(&request).await?;

    print!("{}", result.stdout_utf8());
    match result.status {
        ExecStatus::Success => Ok(()),
        ExecStatus::RemoteCommandError => {
            eprint!("{}", result.stderr_utf8());
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Serve(serve_args) => run_serve(serve_args).await,
        Commands::Exec(exec_args) => run_exec(exec_args).await,
    }
}
