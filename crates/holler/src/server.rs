//! Bundled greeting server.
//!
//! Accepts WebSocket connections on a single endpoint path, reads one text
//! frame carrying a name, and replies once with the configured greeting.
//! Handshakes for any other path are rejected with `404`. One connection
//! carries exactly one request/reply pair.

use crate::config::{ClientConfig, ServerConfig};
use crate::errors::ServerError;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// WebSocket server answering each name with a greeting.
pub struct GreetingServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: ServerConfig,
}

impl GreetingServer {
    /// Binds the listener. A bind address with port 0 picks an ephemeral
    /// port, which [`local_addr`](Self::local_addr) then reports.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })?;

        info!(
            "✅ Greeting endpoint listening on ws://{}{}",
            local_addr, config.endpoint_path
        );

        Ok(Self {
            listener,
            local_addr,
            config,
        })
    }

    /// Address the listener actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Client settings pointed at this instance. Handy for tests that bind
    /// to an ephemeral port.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_server_address(format!("ws://{}", self.local_addr))
            .with_request_path(self.config.endpoint_path.clone())
    }

    /// Serves connections until accepting fails or the future is dropped.
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            let (stream, peer) = self.listener.accept().await.map_err(ServerError::Accept)?;
            let config = self.config.clone();
            tokio::spawn(async move {
                if let Err(err) = serve_connection(stream, peer, config).await {
                    warn!("connection from {} failed: {}", peer, err);
                }
            });
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    config: ServerConfig,
) -> Result<(), ServerError> {
    let expected_path = config.endpoint_path.clone();
    let check_path = |request: &Request, response: Response| {
        if request.uri().path() == expected_path {
            Ok(response)
        } else {
            debug!(
                "rejecting {} for unknown path {}",
                peer,
                request.uri().path()
            );
            let mut rejection = ErrorResponse::new(Some("unknown endpoint".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };

    let mut ws_stream = accept_hdr_async(stream, check_path)
        .await
        .map_err(|err| ServerError::Handshake(err.to_string()))?;
    debug!("client {} connected", peer);

    while let Some(frame) = ws_stream.next().await {
        match frame {
            Ok(Message::Text(name)) => {
                let reply = format!("{} {}", config.greeting, name);
                debug!("greeting {} as `{}`", peer, name);
                ws_stream
                    .send(Message::Text(reply))
                    .await
                    .map_err(|err| ServerError::Connection(err.to_string()))?;

                let _ = ws_stream.close(None).await;
                // drain until the close handshake finishes
                while let Some(frame) = ws_stream.next().await {
                    if frame.is_err() {
                        break;
                    }
                }
                break;
            }
            Ok(Message::Close(_)) => {
                debug!("client {} closed before sending a name", peer);
                break;
            }
            Ok(_) => {}
            Err(err) => return Err(ServerError::Connection(err.to_string())),
        }
    }

    Ok(())
}
