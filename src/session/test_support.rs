//! Scripted in-memory backend for unit tests.
//!
//! [`ScriptedBackend`] plays the server side of the transport seam: it
//! counts opened connections, replays a dump after authentication, answers
//! requests from canned replies, and can inject pushed messages or a
//! connection failure at any time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::protocol::{
    Connector, DiskSpace, HtspMessage, ResponseHandler, ServerInfo, SignalSender, Transport,
    TransportSignal,
};

/// Configuration accepted by [`crate::session::ConnectionSession::new`]
/// with short gate timings.
pub(crate) fn test_config() -> BridgeConfig {
    BridgeConfig {
        server: "tvh.test".to_string(),
        username: "user".to_string(),
        password: "pass".to_string(),
        command_timeout: Duration::from_millis(200),
        epg_timeout: Duration::from_millis(200),
        initial_load_poll: Duration::from_millis(5),
        initial_load_ceiling: Duration::from_secs(2),
        ..BridgeConfig::default()
    }
}

#[derive(Debug, Default)]
struct State {
    opens: usize,
    refuse_open: bool,
    reject_auth: bool,
    hold_replies: bool,
    signals: Option<SignalSender>,
    restart: Option<Arc<AtomicBool>>,
    dump: Vec<HtspMessage>,
    replies: HashMap<String, HtspMessage>,
    held: Vec<ResponseHandler>,
    sent: Vec<HtspMessage>,
}

/// Shared state behind the mock connector and its transports.
#[derive(Debug, Default)]
pub(crate) struct ScriptedBackend {
    state: Mutex<State>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn connector(self: &Arc<Self>) -> Arc<dyn Connector> {
        Arc::new(ScriptedConnector {
            backend: Arc::clone(self),
        })
    }

    /// Messages replayed after every successful authentication.
    pub(crate) fn set_dump(&self, dump: Vec<HtspMessage>) {
        self.state().dump = dump;
    }

    /// Canned reply for every request with `method`.
    pub(crate) fn reply_to(&self, method: &str, reply: HtspMessage) {
        let _ = self.state().replies.insert(method.to_string(), reply);
    }

    /// Keeps handlers of unanswered requests instead of dropping them.
    pub(crate) fn hold_replies(&self) {
        self.state().hold_replies = true;
    }

    pub(crate) fn reject_auth(&self) {
        self.state().reject_auth = true;
    }

    pub(crate) fn refuse_connections(&self) {
        self.state().refuse_open = true;
    }

    pub(crate) fn open_count(&self) -> usize {
        self.state().opens
    }

    pub(crate) fn sent(&self) -> Vec<HtspMessage> {
        self.state().sent.clone()
    }

    pub(crate) fn sent_methods(&self) -> Vec<String> {
        self.state()
            .sent
            .iter()
            .filter_map(|m| m.method().map(str::to_string))
            .collect()
    }

    /// Pushes a message on the newest transport.
    pub(crate) fn push(&self, message: HtspMessage) {
        if let Some(signals) = self.state().signals.as_ref() {
            let _ = signals.send(TransportSignal::Message(message));
        }
    }

    /// Fails the newest transport: held replies are dropped and the error
    /// is signalled.
    pub(crate) fn fail(&self, err: BridgeError) {
        let mut state = self.state();
        state.held.clear();
        if let Some(restart) = state.restart.as_ref() {
            restart.store(true, Ordering::SeqCst);
        }
        if let Some(signals) = state.signals.as_ref() {
            let _ = signals.send(TransportSignal::Error(err));
        }
    }

    pub(crate) fn mark_needs_restart(&self) {
        if let Some(restart) = self.state().restart.as_ref() {
            restart.store(true, Ordering::SeqCst);
        }
    }
}

#[derive(Debug)]
struct ScriptedConnector {
    backend: Arc<ScriptedBackend>,
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(
        &self,
        _host: &str,
        _port: u16,
        signals: SignalSender,
    ) -> Result<Box<dyn Transport>, BridgeError> {
        let mut state = self.backend.state();
        if state.refuse_open {
            return Err(BridgeError::Connection("connection refused".to_string()));
        }
        state.opens += 1;
        let restart = Arc::new(AtomicBool::new(false));
        state.signals = Some(signals.clone());
        state.restart = Some(Arc::clone(&restart));
        Ok(Box::new(ScriptedTransport {
            backend: Arc::clone(&self.backend),
            signals,
            restart,
        }))
    }
}

#[derive(Debug)]
struct ScriptedTransport {
    backend: Arc<ScriptedBackend>,
    signals: SignalSender,
    restart: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn authenticate(&self, _username: &str, _password: &str) -> Result<bool, BridgeError> {
        let state = self.backend.state();
        if state.reject_auth {
            return Ok(false);
        }
        for message in &state.dump {
            let _ = self.signals.send(TransportSignal::Message(message.clone()));
        }
        Ok(true)
    }

    fn send_message(
        &self,
        message: HtspMessage,
        reply: ResponseHandler,
    ) -> Result<(), BridgeError> {
        if self.restart.load(Ordering::SeqCst) {
            return Err(BridgeError::Connection("transport closed".to_string()));
        }
        let mut state = self.backend.state();
        state.sent.push(message);
        if let Some(canned) = state.replies.get(reply.method()).cloned() {
            reply.respond(canned);
        } else if state.hold_replies {
            state.held.push(reply);
        }
        Ok(())
    }

    fn needs_restart(&self) -> bool {
        self.restart.load(Ordering::SeqCst)
    }

    fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: "Tvheadend".to_string(),
            version: "4.3".to_string(),
            protocol_version: 35,
        }
    }

    async fn disk_space(&self) -> Result<DiskSpace, BridgeError> {
        Ok(DiskSpace {
            free: 400,
            total: 1_000,
        })
    }
}
