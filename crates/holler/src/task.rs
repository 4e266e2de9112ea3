//! One-shot request tasks and their worker threads.
//!
//! Every [`RequestTask`] gets a dedicated worker thread and a dedicated
//! connection for a single request/reply round trip; nothing is shared or
//! reused between tasks. That keeps the lifecycle trivial to reason about
//! and is intended for low-traffic use. High-traffic callers should pool
//! connections instead of using this crate.

use crate::config::{CancelPolicy, ClientConfig};
use crate::endpoint::ResponseEndpoint;
use crate::errors::{RequestError, RequestResult};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::thread;
use tokio::sync::oneshot;
use tokio::time;
use tokio_tungstenite::connect_async;
use tracing::{debug, error, info};
use url::Url;

/// Prefix of worker thread names; the connection id is appended.
pub const WORKER_THREAD_PREFIX: &str = "holler-connection";

// Process-wide so concurrently started tasks never share an id.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_connection_id() -> u64 {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::SeqCst)
}

/// What a finished task produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The server replied with this text.
    Response(String),
    /// The task was cancelled before a reply arrived.
    Cancelled,
}

impl TaskOutcome {
    pub fn response(&self) -> Option<&str> {
        match self {
            Self::Response(text) => Some(text),
            Self::Cancelled => None,
        }
    }

    pub fn into_response(self) -> Option<String> {
        match self {
            Self::Response(text) => Some(text),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A single outbound request, executed on its own worker thread.
///
/// [`start`](Self::start) draws a fresh connection id, spawns a worker named
/// `holler-connection-{id}`, and returns immediately; the calling thread is
/// never blocked. The returned [`TaskHandle`] delivers the result.
#[derive(Debug)]
pub struct RequestTask {
    payload: String,
    config: ClientConfig,
}

impl RequestTask {
    /// Task carrying `payload`, targeting the default server address.
    pub fn new(payload: impl Into<String>) -> Self {
        Self::with_config(payload, ClientConfig::default())
    }

    pub fn with_config(payload: impl Into<String>, config: ClientConfig) -> Self {
        Self {
            payload: payload.into(),
            config,
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Spawns the worker thread and returns the handle to the result.
    pub fn start(self) -> TaskHandle {
        let connection_id = next_connection_id();
        let thread_name = format!("{WORKER_THREAD_PREFIX}-{connection_id}");
        let (result_tx, result_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let RequestTask { payload, config } = self;
        debug!(
            "starting worker {} for a {}-byte request",
            thread_name,
            payload.len()
        );

        let spawned = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run_worker(connection_id, payload, config, result_tx, cancel_rx));
        if let Err(err) = spawned {
            // result_tx died with the unspawned closure; the handle sees it
            error!("failed to spawn worker thread {}: {}", thread_name, err);
        }

        TaskHandle {
            connection_id,
            thread_name,
            result_rx,
            cancel_tx: Some(cancel_tx),
        }
    }
}

/// Handle to a running [`RequestTask`].
///
/// The handle is a future resolving to the task's result; synchronous
/// callers can use [`wait`](Self::wait) instead. Dropping the handle
/// detaches the task: the worker runs to its natural end unobserved.
#[derive(Debug)]
pub struct TaskHandle {
    connection_id: u64,
    thread_name: String,
    result_rx: oneshot::Receiver<RequestResult<TaskOutcome>>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl TaskHandle {
    /// Id of the connection this task drew at start.
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Name of the worker thread serving this task.
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Requests cancellation.
    ///
    /// Idempotent, and a no-op once the result is already determined. How a
    /// cancelled task reports its ending is decided by the configured
    /// [`CancelPolicy`].
    pub fn cancel(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }

    /// Blocks the calling thread until the result is available.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async runtime; `await` the handle
    /// there instead.
    pub fn wait(self) -> RequestResult<TaskOutcome> {
        match self.result_rx.blocking_recv() {
            Ok(result) => result,
            Err(_) => Err(lost_worker()),
        }
    }
}

impl Future for TaskHandle {
    type Output = RequestResult<TaskOutcome>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.result_rx)
            .poll(cx)
            .map(|received| match received {
                Ok(result) => result,
                Err(_) => Err(lost_worker()),
            })
    }
}

fn lost_worker() -> RequestError {
    RequestError::Worker("worker thread ended before delivering a result".to_string())
}

fn run_worker(
    connection_id: u64,
    payload: String,
    config: ClientConfig,
    result_tx: oneshot::Sender<RequestResult<TaskOutcome>>,
    cancel_rx: oneshot::Receiver<()>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = result_tx.send(Err(RequestError::Worker(format!(
                "failed to build worker runtime: {err}"
            ))));
            return;
        }
    };

    let result = runtime.block_on(execute(connection_id, payload, &config, cancel_rx));
    if result_tx.send(result).is_err() {
        debug!(
            "connection {} finished but its handle was already dropped",
            connection_id
        );
    }
}

/// Runs one request/reply exchange on the worker's runtime.
async fn execute(
    connection_id: u64,
    payload: String,
    config: &ClientConfig,
    cancel_rx: oneshot::Receiver<()>,
) -> RequestResult<TaskOutcome> {
    let url = config.endpoint_url();
    check_endpoint_url(&url)?;

    let (mut endpoint, slot) = ResponseEndpoint::new(payload);

    // A dropped handle must detach the task, not cancel it.
    let cancel = async move {
        if cancel_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(cancel);

    debug!("connection {} dialing {}", connection_id, url);

    let connect = time::timeout(config.connect_timeout, connect_async(url.clone()));
    tokio::pin!(connect);

    let (ws_stream, _handshake) = tokio::select! {
        connected = &mut connect => match connected {
            Ok(Ok(connected)) => connected,
            Ok(Err(err)) => return Err(RequestError::connect_failure(&url, err)),
            Err(_) => {
                return Err(RequestError::ConnectTimeout {
                    url,
                    timeout: config.connect_timeout,
                })
            }
        },
        _ = &mut cancel => {
            debug!("connection {} cancelled while connecting", connection_id);
            return cancelled_result(config.cancel_policy);
        }
    };

    debug!("connection {} established", connection_id);

    let (mut sink, mut stream) = ws_stream.split();
    endpoint.on_open(&mut sink).await?;
    endpoint.mark_awaiting();

    let recv = slot.recv(config.response_timeout);
    tokio::pin!(recv);
    let mut stream_open = true;

    loop {
        tokio::select! {
            // a reply already in the slot outranks later stream trouble
            biased;

            reply = &mut recv => {
                return match reply {
                    Ok(text) => {
                        info!(
                            "connection {} received a {}-byte reply",
                            connection_id,
                            text.len()
                        );
                        let _ = sink.close().await;
                        Ok(TaskOutcome::Response(text))
                    }
                    Err(err) => Err(err),
                };
            }
            _ = &mut cancel => {
                debug!("connection {} cancelled while awaiting the reply", connection_id);
                let _ = sink.close().await;
                return cancelled_result(config.cancel_policy);
            }
            frame = stream.next(), if stream_open => match frame {
                Some(Ok(message)) => endpoint.on_frame(message),
                Some(Err(err)) => return Err(RequestError::from(err)),
                None => {
                    stream_open = false;
                    endpoint.on_close();
                }
            }
        }
    }
}

fn cancelled_result(policy: CancelPolicy) -> RequestResult<TaskOutcome> {
    match policy {
        CancelPolicy::Silent => Ok(TaskOutcome::Cancelled),
        CancelPolicy::Strict => Err(RequestError::Cancelled),
    }
}

/// Rejects addresses that cannot name a WebSocket endpoint before any
/// network activity, so reachability never decides how an unusable
/// address is classified.
fn check_endpoint_url(url: &str) -> Result<(), RequestError> {
    let parsed =
        Url::parse(url).map_err(|err| RequestError::InvalidAddress(format!("`{url}`: {err}")))?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(RequestError::InvalidAddress(format!(
            "unsupported scheme `{}` in `{url}`",
            parsed.scheme()
        )));
    }
    Ok(())
}
