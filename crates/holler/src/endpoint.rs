//! Connection-scoped handling of a single request/reply exchange.
//!
//! A [`ResponseEndpoint`] lives on the worker that owns the connection. It
//! sends the payload when the connection opens, watches incoming frames, and
//! resolves its paired [`ResponseSlot`] with the first text reply. The slot
//! is a one-shot channel, so the waiter needs no lock and cannot miss a
//! reply that arrives before it starts waiting.

use crate::errors::RequestError;
use futures_util::{Sink, SinkExt};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, warn};

/// Lifecycle of a [`ResponseEndpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Created, payload not sent yet.
    Created,
    /// Payload handed to the transport.
    Sent,
    /// Waiting for the reply.
    AwaitingResponse,
    /// Reply delivered to the slot.
    Completed,
    /// Connection ended without a reply.
    Closed,
}

impl EndpointState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Closed)
    }
}

/// Sends one payload and captures one reply for a single connection.
pub struct ResponseEndpoint {
    payload: Option<String>,
    reply_tx: Option<oneshot::Sender<String>>,
    state: EndpointState,
}

/// Receiving half of an endpoint: yields the reply exactly once.
pub struct ResponseSlot {
    reply_rx: oneshot::Receiver<String>,
}

impl ResponseEndpoint {
    /// Creates an endpoint for `payload` together with its reply slot.
    pub fn new(payload: impl Into<String>) -> (Self, ResponseSlot) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let endpoint = Self {
            payload: Some(payload.into()),
            reply_tx: Some(reply_tx),
            state: EndpointState::Created,
        };
        (endpoint, ResponseSlot { reply_rx })
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Sends the payload over a freshly opened connection.
    pub async fn on_open<S>(&mut self, sink: &mut S) -> Result<(), RequestError>
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let Some(payload) = self.payload.take() else {
            debug!("payload already sent, ignoring repeated open");
            return Ok(());
        };

        sink.send(Message::Text(payload)).await?;
        self.state = EndpointState::Sent;
        Ok(())
    }

    /// Records that the worker started waiting for the reply.
    pub fn mark_awaiting(&mut self) {
        if self.state == EndpointState::Sent {
            self.state = EndpointState::AwaitingResponse;
        }
    }

    /// Routes one incoming frame.
    pub fn on_frame(&mut self, message: Message) {
        match message {
            Message::Text(text) => self.on_message(text),
            Message::Close(frame) => {
                debug!("peer closed the connection: {:?}", frame);
                self.on_close();
            }
            Message::Binary(data) => {
                warn!("ignoring unexpected {}-byte binary frame", data.len());
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }

    /// Resolves the slot with the first text message; later ones are dropped.
    pub fn on_message(&mut self, text: String) {
        match self.reply_tx.take() {
            Some(reply_tx) => {
                // send only fails when the waiter is already gone
                let _ = reply_tx.send(text);
                self.state = EndpointState::Completed;
            }
            None => debug!("reply already delivered, dropping extra message"),
        }
    }

    /// Marks the connection as ended. A waiter that has no reply yet
    /// observes [`RequestError::ConnectionClosed`].
    pub fn on_close(&mut self) {
        self.reply_tx.take();
        if self.state != EndpointState::Completed {
            self.state = EndpointState::Closed;
        }
    }
}

impl ResponseSlot {
    /// Awaits the reply, giving up after `bound`.
    ///
    /// A reply that arrived before this call is returned immediately.
    pub async fn recv(self, bound: Duration) -> Result<String, RequestError> {
        match time::timeout(bound, self.reply_rx).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(_)) => Err(RequestError::ConnectionClosed),
            Err(_) => Err(RequestError::ResponseTimeout { timeout: bound }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn starts_in_created_state() {
        let (endpoint, _slot) = ResponseEndpoint::new("Alice");
        assert_eq!(endpoint.state(), EndpointState::Created);
        assert!(!endpoint.state().is_terminal());
    }

    #[test]
    fn first_message_wins() {
        tokio_test::block_on(async {
            let (mut endpoint, slot) = ResponseEndpoint::new("Alice");

            endpoint.on_message("Hello Alice".to_string());
            endpoint.on_message("Hello again".to_string());
            assert_eq!(endpoint.state(), EndpointState::Completed);

            let reply = slot.recv(Duration::from_secs(1)).await.unwrap();
            assert_eq!(reply, "Hello Alice");
        });
    }

    #[test]
    fn reply_arrives_while_waiting() {
        tokio_test::block_on(async {
            let (mut endpoint, slot) = ResponseEndpoint::new("Alice");
            let delay = Duration::from_millis(150);

            tokio::spawn(async move {
                time::sleep(delay).await;
                endpoint.on_message("Hello Alice".to_string());
            });

            let started = Instant::now();
            let reply = slot.recv(Duration::from_secs(2)).await.unwrap();
            assert_eq!(reply, "Hello Alice");
            assert!(started.elapsed() >= delay);
        });
    }

    #[test]
    fn close_without_reply_reports_connection_closed() {
        tokio_test::block_on(async {
            let (mut endpoint, slot) = ResponseEndpoint::new("Alice");

            endpoint.on_close();
            assert_eq!(endpoint.state(), EndpointState::Closed);

            let err = slot.recv(Duration::from_millis(100)).await.unwrap_err();
            assert!(matches!(err, RequestError::ConnectionClosed));
        });
    }

    #[test]
    fn recv_gives_up_after_the_bound() {
        tokio_test::block_on(async {
            let (_endpoint, slot) = ResponseEndpoint::new("Alice");
            let bound = Duration::from_millis(120);

            let started = Instant::now();
            let err = slot.recv(bound).await.unwrap_err();
            assert!(matches!(err, RequestError::ResponseTimeout { .. }));
            assert!(started.elapsed() >= bound);
        });
    }

    #[test]
    fn awaiting_starts_only_after_the_payload_is_sent() {
        tokio_test::block_on(async {
            let (mut endpoint, _slot) = ResponseEndpoint::new("Alice");

            endpoint.mark_awaiting();
            assert_eq!(endpoint.state(), EndpointState::Created);

            let mut sink =
                futures_util::sink::drain().sink_map_err(|_| tungstenite::Error::ConnectionClosed);
            endpoint.on_open(&mut sink).await.unwrap();
            assert_eq!(endpoint.state(), EndpointState::Sent);

            endpoint.mark_awaiting();
            assert_eq!(endpoint.state(), EndpointState::AwaitingResponse);

            endpoint.mark_awaiting();
            assert_eq!(endpoint.state(), EndpointState::AwaitingResponse);
        });
    }

    #[test]
    fn close_frame_routes_to_close() {
        let (mut endpoint, _slot) = ResponseEndpoint::new("Alice");
        endpoint.on_frame(Message::Close(None));
        assert_eq!(endpoint.state(), EndpointState::Closed);
        assert!(endpoint.state().is_terminal());
    }

    #[test]
    fn completion_survives_a_later_close() {
        let (mut endpoint, _slot) = ResponseEndpoint::new("Alice");
        endpoint.on_message("Hello Alice".to_string());
        endpoint.on_close();
        assert_eq!(endpoint.state(), EndpointState::Completed);
    }

    #[test]
    fn binary_frames_are_ignored() {
        let (mut endpoint, _slot) = ResponseEndpoint::new("Alice");
        endpoint.on_frame(Message::Binary(vec![1, 2, 3]));
        assert_eq!(endpoint.state(), EndpointState::Created);
    }
}
