//! Greeting server daemon.

use clap::Parser;
use holler::{init_logging, GreetingServer, ServerConfig};
use tokio::signal;
use tracing::warn;

#[derive(Parser)]
#[command(name = "hollerd", version)]
#[command(about = "Serve WebSocket greetings: one name in, one greeting out")]
struct Cli {
    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Endpoint path accepted during the handshake
    #[arg(long)]
    path: Option<String>,

    /// Greeting prepended to each received name
    #[arg(long)]
    greeting: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(bind) = cli.bind {
        config = config.with_bind_addr(bind);
    }
    if let Some(path) = cli.path {
        config = config.with_endpoint_path(path);
    }
    if let Some(greeting) = cli.greeting {
        config = config.with_greeting(greeting);
    }
    config.validate()?;

    let server = GreetingServer::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = shutdown_signal() => {}
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("📡 Received Ctrl+C, shutting down"),
        _ = terminate => warn!("📡 Received terminate signal, shutting down"),
    }
}
