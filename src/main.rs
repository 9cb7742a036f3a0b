use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;
use tokio::net::TcpListener;

use netops::api::{self, AppState, BatchExecuteRequest, BasicCommandsRequest, ExecuteRequest};
use netops::config::{self, ServerConfig};
use netops::device::{ConnectionType, DeviceCredentials, DeviceType};
use netops::executor::Executor;
use netops::session::{ConnectionSecurityOptions, SecurityLevel, TransportFactory};

#[derive(Parser)]
#[command(
    name = "netops-server",
    version,
    about = "Run show commands on network devices over SSH or Telnet"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the REST API
    Serve {
        #[arg(long, env = "NETOPS_BIND", default_value = config::DEFAULT_BIND)]
        bind: String,
        #[arg(long, env = "NETOPS_PORT", default_value_t = config::DEFAULT_HTTP_PORT)]
        port: u16,
        /// Devices worked on at once during a batch
        #[arg(
            long,
            env = "NETOPS_BATCH_PARALLEL",
            default_value_t = config::DEFAULT_BATCH_PARALLEL
        )]
        batch_parallel: usize,
        /// Wait after each command before reading its output
        #[arg(long, env = "NETOPS_SETTLE_DELAY_MS", default_value_t = 1000)]
        settle_delay_ms: u64,
        #[command(flatten)]
        ssh: SshArgs,
    },
    /// Run commands on one device and print the output
    Exec {
        #[arg(long)]
        ip: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "NETOPS_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        device_type: String,
        /// Use Telnet instead of SSH
        #[arg(long, default_value_t = false)]
        telnet: bool,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        enable_password: Option<String>,
        /// Connect timeout in seconds
        #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
        /// Run the built-in commands for the device type
        #[arg(long, default_value_t = false)]
        basic: bool,
        #[arg(short = 'c', long = "command")]
        commands: Vec<String>,
        #[arg(long, default_value_t = 1000)]
        settle_delay_ms: u64,
        /// Save the results as JSON
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        ssh: SshArgs,
    },
    /// Print the JSON schemas of the request bodies
    Schema,
}

#[derive(clap::Args)]
struct SshArgs {
    /// SSH algorithm profile: legacy, balanced or secure
    #[arg(long, default_value = "legacy", value_parser = parse_security_level)]
    security: SecurityLevel,
    /// Check host keys against ~/.ssh/known_hosts
    #[arg(long, default_value_t = false)]
    verify_host_keys: bool,
}

fn parse_security_level(s: &str) -> Result<SecurityLevel, String> {
    s.parse().map_err(|e: netops::error::ExecError| e.to_string())
}

impl SshArgs {
    fn options(&self) -> ConnectionSecurityOptions {
        ConnectionSecurityOptions::with_level(self.security, self.verify_host_keys)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            port,
            batch_parallel,
            settle_delay_ms,
            ssh,
        } => {
            let server = ServerConfig {
                bind,
                port,
                batch_parallel,
                settle_delay: Duration::from_millis(settle_delay_ms),
                security: ssh.options(),
            };
            serve(server).await
        }
        Commands::Exec {
            ip,
            username,
            password,
            device_type,
            telnet,
            port,
            enable_password,
            timeout,
            basic,
            commands,
            settle_delay_ms,
            output,
            ssh,
        } => {
            let device_type: DeviceType = device_type.parse()?;
            let connection_type = if telnet {
                ConnectionType::Telnet
            } else {
                ConnectionType::Ssh
            };
            let credentials = DeviceCredentials::new(ip, username, password, device_type)
                .with_enable_password(enable_password)
                .with_port(port)
                .with_connection_type(connection_type)
                .with_timeout_secs(timeout);
            if commands.is_empty() && !basic {
                bail!("pass --basic or at least one -c/--command");
            }

            let executor = Executor::new(TransportFactory::new(ssh.options()))
                .with_settle_delay(Duration::from_millis(settle_delay_ms));
            let explicit = (!commands.is_empty()).then_some(commands);
            let results = executor.execute(&credentials, explicit, basic).await?;

            for (command, output) in results.iter() {
                println!("==> {command}");
                println!("{output}");
            }
            if let Some(path) = output {
                let json = serde_json::to_vec_pretty(&results)?;
                tokio::fs::write(&path, json)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                info!("Results saved to {}", path.display());
            }
            Ok(())
        }
        Commands::Schema => {
            let schemas = serde_json::json!({
                "execute": schemars::schema_for!(ExecuteRequest),
                "batch_execute": schemars::schema_for!(BatchExecuteRequest),
                "basic_commands": schemars::schema_for!(BasicCommandsRequest),
            });
            println!("{}", serde_json::to_string_pretty(&schemas)?);
            Ok(())
        }
    }
}

async fn serve(server: ServerConfig) -> Result<()> {
    let executor = Executor::new(TransportFactory::new(server.security.clone()))
        .with_settle_delay(server.settle_delay)
        .with_batch_parallel(server.batch_parallel);

    let addr = server.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(
        "Starting server: batch parallelism {}, settle delay {:?}",
        executor.batch_parallel(),
        executor.settle_delay()
    );
    api::serve(listener, AppState::new(executor)).await?;
    Ok(())
}
