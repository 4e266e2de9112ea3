//! # holler - one-shot WebSocket request/reply
//!
//! Send a short text request over a WebSocket connection and receive a
//! single text reply, without ever blocking the calling thread. Each
//! request gets a dedicated worker thread and a dedicated connection; the
//! result comes back through a future-style handle.
//!
//! ## Features
//!
//! - **Dedicated resources**: one worker thread and one connection per request
//! - **Future-style results**: `await` the handle, or block with `wait()`
//! - **Bounded waits**: connect and response timeouts with explicit errors
//! - **Explicit cancellation**: silent or strict, chosen by [`CancelPolicy`]
//! - **Bundled server**: a greeting endpoint for demos and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use holler::{RequestTask, TaskOutcome};
//!
//! # tokio_test::block_on(async {
//! let handle = RequestTask::new("Alice").start();
//! match handle.await {
//!     Ok(TaskOutcome::Response(reply)) => println!("{reply}"),
//!     Ok(TaskOutcome::Cancelled) => println!("cancelled before a reply"),
//!     Err(err) => eprintln!("request failed: {err}"),
//! }
//! # });
//! ```
//!
//! Synchronous callers configure the target and block on the handle:
//!
//! ```rust,no_run
//! use holler::{ClientConfig, RequestTask};
//! use std::time::Duration;
//!
//! let config = ClientConfig::default()
//!     .with_server_address("ws://127.0.0.1:9100/ws")
//!     .with_request_path("/greet")
//!     .with_response_timeout(Duration::from_secs(2));
//!
//! let handle = RequestTask::with_config("Bob", config).start();
//! println!("{:?}", handle.wait()?);
//! # Ok::<(), holler::RequestError>(())
//! ```
//!
//! Nothing is pooled or reused between requests, which keeps the lifecycle
//! simple but makes the crate a poor fit for high-traffic use.

pub mod config;
pub mod endpoint;
pub mod errors;
pub mod logging;
pub mod server;
pub mod task;

pub use config::{CancelPolicy, ClientConfig, ClientDefaults, ServerConfig, ServerDefaults};
pub use endpoint::{EndpointState, ResponseEndpoint, ResponseSlot};
pub use errors::{ConfigError, RequestError, RequestResult, ServerError};
pub use logging::init_logging;
pub use server::GreetingServer;
pub use task::{RequestTask, TaskHandle, TaskOutcome, WORKER_THREAD_PREFIX};
