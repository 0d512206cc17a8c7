use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mockgen::config::DocumentFormat;
use mockgen::pipeline;
use mockgen::server::{DEFAULT_HOST, DEFAULT_MAX_ATTEMPTS, DEFAULT_PORT};
use mockgen::{MockServer, ProjectLayout, ServerOptions};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// MockGen - discover API calls in a project and serve mocks for them
#[derive(Parser, Debug)]
#[command(name = "mockgen")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Override the log filter")]
struct Cli {
    /// Project root to scan and write `.mockgen/` into
    #[arg(short, long, global = true, default_value = ".", env = "MOCKGEN_ROOT")]
    root: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info", env = "MOCKGEN_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the project for endpoints and write endpoints.json
    Scan,

    /// Generate mock.json from the discovered endpoints
    Generate,

    /// Generate an OpenAPI 3.0 document
    Openapi {
        /// Write swagger.yaml instead of swagger.json
        #[arg(long)]
        yaml: bool,
    },

    /// Serve mock.json on a local HTTP server
    Serve {
        /// First port to try
        #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MOCKGEN_PORT")]
        port: u16,

        /// Interface to bind
        #[arg(long, default_value = DEFAULT_HOST, env = "MOCKGEN_HOST")]
        host: String,

        /// Consecutive ports to try while the address is in use
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        max_attempts: u16,

        /// First id handed out by `{{auto}}`
        #[arg(long, default_value_t = 1)]
        first_id: u64,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let layout = ProjectLayout::new(&cli.root);

    match cli.command {
        Commands::Scan => {
            let endpoints = pipeline::scan(&layout).context("scan failed")?;
            println!(
                "Found {} endpoints, written to {}",
                endpoints.len(),
                layout.endpoints_path().display()
            );
        }
        Commands::Generate => {
            let generated = pipeline::generate(&layout).context("mock generation failed")?;
            println!(
                "Generated {} mock routes in {}",
                generated.output.len(),
                generated.path.display()
            );
        }
        Commands::Openapi { yaml } => {
            let format = if yaml {
                DocumentFormat::Yaml
            } else {
                DocumentFormat::Json
            };
            let generated =
                pipeline::openapi(&layout, format).context("OpenAPI generation failed")?;
            println!(
                "Documented {} paths in {}",
                generated.output,
                generated.path.display()
            );
        }
        Commands::Serve {
            port,
            host,
            max_attempts,
            first_id,
        } => {
            let options = ServerOptions {
                host,
                port,
                max_attempts,
                first_id,
                ..ServerOptions::new(layout.mock_bundle_path())
            };
            let server = match MockServer::start(options).await {
                Ok(server) => server,
                Err(e) => {
                    error!("Failed to start mock server: {}", e);
                    return Err(e.into());
                }
            };
            println!("Mock server listening on http://{}", server.local_addr());

            serve_until_shutdown(&server).await?;
            server.stop().await;
        }
    }

    Ok(())
}

/// Run until Ctrl-C, reloading the bundle on SIGHUP.
#[cfg(unix)]
async fn serve_until_shutdown(server: &MockServer) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for Ctrl-C")?;
                info!("Shutting down");
                return Ok(());
            }
            _ = hangup.recv() => {
                if let Err(e) = server.reload() {
                    warn!("Reload failed, keeping current mocks: {}", e);
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn serve_until_shutdown(_server: &MockServer) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutting down");
    Ok(())
}
