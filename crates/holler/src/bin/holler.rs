//! Command line client: send one name, print the greeting.

use clap::Parser;
use holler::{init_logging, ClientConfig, RequestTask, TaskOutcome};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "holler", version)]
#[command(about = "Send one name to a greeting endpoint and print the reply")]
struct Cli {
    /// Name to send
    name: String,

    /// Base WebSocket address of the server
    #[arg(long)]
    address: Option<String>,

    /// Request path appended to the address
    #[arg(long)]
    path: Option<String>,

    /// Bound on waiting for the reply, in milliseconds
    #[arg(long)]
    response_timeout_ms: Option<u64>,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let mut config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(address) = cli.address {
        config = config.with_server_address(address);
    }
    if let Some(path) = cli.path {
        config = config.with_request_path(path);
    }
    if let Some(millis) = cli.response_timeout_ms {
        config = config.with_response_timeout(Duration::from_millis(millis));
    }
    if let Err(err) = config.validate() {
        eprintln!("configuration error: {err}");
        return ExitCode::FAILURE;
    }

    let handle = RequestTask::with_config(cli.name, config).start();
    match handle.wait() {
        Ok(TaskOutcome::Response(reply)) => {
            println!("{reply}");
            ExitCode::SUCCESS
        }
        Ok(TaskOutcome::Cancelled) => {
            eprintln!("request cancelled before a reply arrived");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("request failed: {err}");
            ExitCode::FAILURE
        }
    }
}
