//! Transport seam towards the HTSP wire library.
//!
//! The socket, framing and binary codec live outside this crate. A
//! [`Connector`] opens a socket and hands back a [`Transport`]; from then on
//! the transport pushes everything it receives into the
//! [`TransportSignal`] channel given to [`Connector::open`], and correlates
//! replies to the [`ResponseHandler`] passed with each outgoing message.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use super::message::HtspMessage;
use crate::error::BridgeError;

/// What a transport delivers on its inbound channel.
#[derive(Debug, Clone)]
pub enum TransportSignal {
    /// A pushed event or an uncorrelated message.
    Message(HtspMessage),
    /// The connection failed; the transport is unusable afterwards.
    Error(BridgeError),
}

/// Sender half of the inbound channel handed to [`Connector::open`].
pub type SignalSender = mpsc::UnboundedSender<TransportSignal>;

/// Identification reported by the backend during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Server software name.
    pub name: String,
    /// Server software version.
    pub version: String,
    /// Negotiated HTSP protocol version.
    pub protocol_version: u32,
}

/// Recording storage usage reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiskSpace {
    /// Free bytes.
    pub free: u64,
    /// Total bytes.
    pub total: u64,
}

/// A live backend connection.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Performs the HTSP hello/authenticate exchange.
    ///
    /// Returns `Ok(false)` when the backend rejects the credentials.
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, BridgeError>;

    /// Queues a message; the reply, if any, is delivered to `reply`.
    ///
    /// Dropping `reply` without answering resolves the waiting side with
    /// [`BridgeError::Connection`].
    fn send_message(&self, message: HtspMessage, reply: ResponseHandler)
    -> Result<(), BridgeError>;

    /// Returns `true` once the transport has failed and must be replaced.
    fn needs_restart(&self) -> bool;

    /// Server identification captured during the handshake.
    fn server_info(&self) -> ServerInfo;

    /// Queries the backend's recording storage.
    async fn disk_space(&self) -> Result<DiskSpace, BridgeError>;
}

/// Opens transports. One connector is shared for the process lifetime.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    /// Opens a socket to `host:port` and returns the transport that will
    /// push inbound traffic into `signals`.
    async fn open(
        &self,
        host: &str,
        port: u16,
        signals: SignalSender,
    ) -> Result<Box<dyn Transport>, BridgeError>;
}

/// One-shot reply slot handed to the transport with an outgoing message.
#[derive(Debug)]
pub struct ResponseHandler {
    method: String,
    tx: oneshot::Sender<Result<HtspMessage, BridgeError>>,
}

impl ResponseHandler {
    /// Method name of the message this handler answers.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Delivers the reply. A caller that already gave up is not an error.
    pub fn respond(self, reply: HtspMessage) {
        let _ = self.tx.send(Ok(reply));
    }

    /// Delivers a failure instead of a reply.
    pub fn fail(self, err: BridgeError) {
        let _ = self.tx.send(Err(err));
    }
}

/// Waiting side of a [`ResponseHandler`].
#[derive(Debug)]
pub struct PendingResponse {
    method: String,
    rx: oneshot::Receiver<Result<HtspMessage, BridgeError>>,
}

impl PendingResponse {
    /// Waits for the reply without a deadline; wrap it in
    /// [`crate::session::run_with_timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connection`] if the transport dropped the
    /// handler, or whatever error the transport reported.
    pub async fn response(self) -> Result<HtspMessage, BridgeError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Connection(format!(
                "connection closed before reply to {}",
                self.method
            ))),
        }
    }
}

/// Creates a correlated handler/pending pair for one outgoing message.
#[must_use]
pub fn response_channel(method: &str) -> (ResponseHandler, PendingResponse) {
    let (tx, rx) = oneshot::channel();
    (
        ResponseHandler {
            method: method.to_string(),
            tx,
        },
        PendingResponse {
            method: method.to_string(),
            rx,
        },
    )
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reply_reaches_pending_side() {
        let (handler, pending) = response_channel("getTicket");
        assert_eq!(handler.method(), "getTicket");
        handler.respond(HtspMessage::map().with("ticket", "abc"));

        let Ok(reply) = pending.response().await else {
            panic!("expected reply");
        };
        assert_eq!(reply.str("ticket"), Ok(Some("abc")));
    }

    #[tokio::test]
    async fn dropped_handler_is_connection_error() {
        let (handler, pending) = response_channel("addDvrEntry");
        drop(handler);
        let result = pending.response().await;
        assert!(matches!(result, Err(BridgeError::Connection(_))));
    }

    #[tokio::test]
    async fn failed_handler_forwards_error() {
        let (handler, pending) = response_channel("getEvents");
        handler.fail(BridgeError::Connection("reset".to_string()));
        assert_eq!(
            pending.response().await,
            Err(BridgeError::Connection("reset".to_string()))
        );
    }

    #[test]
    fn late_reply_after_caller_left_is_harmless() {
        let (handler, pending) = response_channel("deleteDvrEntry");
        drop(pending);
        handler.respond(HtspMessage::map().with("success", 1_i64));
    }
}
