//! The single backend connection and the tables it feeds.
//!
//! [`ConnectionSession`] is constructed once at startup and shared by
//! `Arc`. It opens and authenticates the transport lazily, drains the
//! transport's inbound channel on a pump task that routes events into the
//! synchronizers, and tears everything down and reconnects when the
//! transport fails.
//!
//! ```text
//! Unconnected ──open+auth──▶ SyncPending ──initialSyncCompleted──▶ Ready
//!      ▲                          │                                  │
//!      └──────── transport error ─┴──────────────────────────────────┘
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;
use uuid::Uuid;

use super::timeout::Outcome;
use crate::config::BridgeConfig;
use crate::domain::{
    ChannelInfo, EventBus, RecordingInfo, SeriesTimerInfo, SessionEvent, TimerInfo, TunerInfo,
};
use crate::error::BridgeError;
use crate::protocol::{
    BackendEvent, Connector, DiskSpace, HtspMessage, PendingResponse, ResponseHandler, ServerInfo,
    Transport, TransportSignal, response_channel,
};
use crate::sync::{ChannelSync, RecordingSync, SeriesRuleSync, TunerSync};

/// Session-scoped settings captured when a connection is established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Default recording priority.
    pub priority: u32,
    /// Default recording profile; empty for the backend default.
    pub profile: String,
    /// Base URL of the backend HTTP interface.
    pub http_base_url: Url,
    /// Whether icon tokens are resolved against the backend image cache.
    pub picon_data: bool,
    /// Whether streams request subtitles and all audio tracks.
    pub enable_subs_maudios: bool,
    /// Whether stream URLs embed credentials instead of tickets.
    pub http_basic_auth: bool,
}

impl SessionSettings {
    fn capture(config: &BridgeConfig) -> Result<Self, BridgeError> {
        Ok(Self {
            priority: config.priority,
            profile: config.profile.clone(),
            http_base_url: config.http_base_url()?,
            picon_data: config.picon_data,
            enable_subs_maudios: config.enable_subs_maudios,
            http_basic_auth: config.http_basic_auth,
        })
    }
}

/// Backend identification plus storage usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStatus {
    /// Handshake identification.
    pub server: ServerInfo,
    /// Recording storage usage.
    pub disk_space: DiskSpace,
    /// Whether the initial dump has completed.
    pub ready: bool,
}

#[derive(Debug)]
struct ActiveConnection {
    session_id: Uuid,
    generation: u64,
    transport: Arc<dyn Transport>,
}

type PumpFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Process-wide owner of the backend connection and the entity tables.
#[derive(Debug)]
pub struct ConnectionSession {
    config: BridgeConfig,
    connector: Arc<dyn Connector>,
    connection: Mutex<Option<ActiveConnection>>,
    settings: RwLock<SessionSettings>,
    /// Held shared while an event is applied, exclusively while tables are
    /// cleaned for a new generation.
    apply_gate: RwLock<()>,
    generation: AtomicU64,
    ready: AtomicBool,
    channels: ChannelSync,
    recordings: RecordingSync,
    series_rules: SeriesRuleSync,
    tuners: TunerSync,
    events: EventBus,
}

impl ConnectionSession {
    /// Creates the session. Nothing is opened until first use.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] if the configuration lacks a
    /// server name or credentials.
    pub fn new(config: BridgeConfig, connector: Arc<dyn Connector>) -> Result<Arc<Self>, BridgeError> {
        config.validate()?;
        let channels = ChannelSync::new(config.other_channel_type);
        let settings = SessionSettings::capture(&config)?;
        Ok(Arc::new(Self {
            config,
            connector,
            connection: Mutex::new(None),
            settings: RwLock::new(settings),
            apply_gate: RwLock::new(()),
            generation: AtomicU64::new(0),
            ready: AtomicBool::new(false),
            channels,
            recordings: RecordingSync::new(),
            series_rules: SeriesRuleSync::new(),
            tuners: TunerSync::new(),
            events: EventBus::default(),
        }))
    }

    /// Opens and authenticates the transport unless a healthy one exists.
    ///
    /// Concurrent callers serialize on the connection lock, so at most one
    /// transport is ever opened at a time. Every table is cleared before a
    /// new transport opens because the backend re-sends a full dump.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] for missing settings,
    /// [`BridgeError::Connection`] if the socket cannot be opened, or
    /// [`BridgeError::Authentication`] if the credentials are refused.
    pub async fn ensure_connection(self: &Arc<Self>) -> Result<(), BridgeError> {
        self.config.validate()?;

        let mut guard = self.connection.lock().await;
        if let Some(active) = guard.as_ref() {
            if !active.transport.needs_restart() {
                return Ok(());
            }
            info!(session_id = %active.session_id, "transport needs restart, reconnecting");
        }
        *guard = None;

        // Retire the previous pump before wiping, so none of its queued
        // events can land in the fresh tables.
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        {
            let _exclusive = self.apply_gate.write().await;
            self.ready.store(false, Ordering::Release);
            self.clean_tables().await;
        }

        let session_id = Uuid::new_v4();
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();

        debug!(
            %session_id,
            server = %self.config.server,
            port = self.config.htsp_port,
            "opening backend connection"
        );
        let transport: Arc<dyn Transport> = Arc::from(
            self.connector
                .open(&self.config.server, self.config.htsp_port, signals_tx)
                .await?,
        );
        self.spawn_pump(generation, session_id, signals_rx);

        if !transport
            .authenticate(&self.config.username, &self.config.password)
            .await?
        {
            warn!(%session_id, user = %self.config.username, "backend rejected credentials");
            return Err(BridgeError::Authentication(self.config.username.clone()));
        }

        let settings = SessionSettings::capture(&self.config)?;
        *self.settings.write().await = settings;

        let server = transport.server_info();
        info!(
            %session_id,
            server = %server.name,
            version = %server.version,
            protocol = server.protocol_version,
            "backend session established"
        );
        *guard = Some(ActiveConnection {
            session_id,
            generation,
            transport,
        });
        drop(guard);

        let _ = self.events.publish(SessionEvent::Connected {
            session_id,
            server,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Waits until the initial dump has completed.
    ///
    /// Polls the ready flag on the configured interval up to the configured
    /// ceiling. Returns [`Outcome::TimedOut`] when the ceiling elapses or
    /// the token is cancelled before the flag is set; reconnects in between
    /// do not reset the ceiling.
    pub async fn wait_for_initial_load(&self, cancel: &CancellationToken) -> Outcome<()> {
        let started = Instant::now();
        loop {
            if self.ready.load(Ordering::Acquire) {
                return Outcome::Completed(());
            }
            if cancel.is_cancelled() {
                debug!("initial load wait cancelled");
                return Outcome::TimedOut;
            }
            if started.elapsed() >= self.config.initial_load_ceiling {
                warn!(
                    ceiling_secs = self.config.initial_load_ceiling.as_secs(),
                    "initial load did not complete in time"
                );
                return Outcome::TimedOut;
            }
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(self.config.initial_load_poll) => {}
            }
        }
    }

    /// Hands a message to the current transport; the reply goes to
    /// `reply`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connection`] if no transport is connected or
    /// the transport refuses the message. In both cases `reply` is dropped,
    /// so its pending side resolves with the same failure.
    pub async fn send_message(
        &self,
        message: HtspMessage,
        reply: ResponseHandler,
    ) -> Result<(), BridgeError> {
        let transport = self.transport().await?;
        trace!(method = message.method().unwrap_or("-"), "sending message");
        transport.send_message(message, reply)
    }

    /// Sends a message and returns the pending reply.
    ///
    /// # Errors
    ///
    /// See [`ConnectionSession::send_message`].
    pub async fn request(&self, message: HtspMessage) -> Result<PendingResponse, BridgeError> {
        let method = message.method().unwrap_or("-").to_string();
        let (handler, pending) = response_channel(&method);
        self.send_message(message, handler).await?;
        Ok(pending)
    }

    /// Drops the transport without reconnecting, e.g. on host shutdown.
    ///
    /// Events still queued from the dropped transport are discarded. The
    /// next [`ConnectionSession::ensure_connection`] starts a new session.
    pub async fn disconnect(&self) {
        let mut guard = self.connection.lock().await;
        let _ = self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(active) = guard.take() {
            info!(session_id = %active.session_id, "disconnecting from backend");
        }
        self.ready.store(false, Ordering::Release);
    }

    /// Backend identification and storage usage.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connection`] if no transport is connected, or
    /// the transport's error for the disk-space query.
    pub async fn server_status(&self) -> Result<ServerStatus, BridgeError> {
        let transport = self.transport().await?;
        let disk_space = transport.disk_space().await?;
        Ok(ServerStatus {
            server: transport.server_info(),
            disk_space,
            ready: self.is_ready(),
        })
    }

    /// Settings captured by the last successful connect, or derived from
    /// the configuration if none happened yet.
    ///
    /// Does not wait for a handshake in progress.
    pub async fn settings(&self) -> SessionSettings {
        self.settings.read().await.clone()
    }

    /// Default recording priority.
    pub async fn priority(&self) -> u32 {
        self.settings().await.priority
    }

    /// Default recording profile.
    pub async fn profile(&self) -> String {
        self.settings().await.profile
    }

    /// Base URL of the backend HTTP interface.
    pub async fn http_base_url(&self) -> Url {
        self.settings().await.http_base_url
    }

    /// Whether icon tokens are resolved against the backend.
    pub async fn picon_data(&self) -> bool {
        self.settings().await.picon_data
    }

    /// Whether streams request subtitles and all audio tracks.
    pub async fn enable_subs_maudios(&self) -> bool {
        self.settings().await.enable_subs_maudios
    }

    /// Channel projection, gated on the initial load.
    pub async fn build_channel_infos(&self, cancel: &CancellationToken) -> Outcome<Vec<ChannelInfo>> {
        if self.wait_for_initial_load(cancel).await.is_timed_out() {
            return Outcome::TimedOut;
        }
        Outcome::Completed(self.channels.build(cancel).await)
    }

    /// Recordings projection, gated on the initial load.
    pub async fn build_dvr_infos(&self, cancel: &CancellationToken) -> Outcome<Vec<RecordingInfo>> {
        if self.wait_for_initial_load(cancel).await.is_timed_out() {
            return Outcome::TimedOut;
        }
        Outcome::Completed(self.recordings.build_recordings(cancel).await)
    }

    /// Pending-timers projection, gated on the initial load.
    pub async fn build_pending_timers_infos(
        &self,
        cancel: &CancellationToken,
    ) -> Outcome<Vec<TimerInfo>> {
        if self.wait_for_initial_load(cancel).await.is_timed_out() {
            return Outcome::TimedOut;
        }
        Outcome::Completed(self.recordings.build_timers(cancel).await)
    }

    /// Series rule projection, gated on the initial load.
    pub async fn build_autorec_infos(
        &self,
        cancel: &CancellationToken,
    ) -> Outcome<Vec<SeriesTimerInfo>> {
        if self.wait_for_initial_load(cancel).await.is_timed_out() {
            return Outcome::TimedOut;
        }
        Outcome::Completed(self.series_rules.build(cancel).await)
    }

    /// Tuner projection, gated on the initial load.
    pub async fn build_tuner_infos(&self, cancel: &CancellationToken) -> Outcome<Vec<TunerInfo>> {
        if self.wait_for_initial_load(cancel).await.is_timed_out() {
            return Outcome::TimedOut;
        }
        Outcome::Completed(self.tuners.build(cancel).await)
    }

    /// Channel synchronizer.
    #[must_use]
    pub fn channels(&self) -> &ChannelSync {
        &self.channels
    }

    /// DVR entry synchronizer.
    #[must_use]
    pub fn recordings(&self) -> &RecordingSync {
        &self.recordings
    }

    /// Series rule synchronizer.
    #[must_use]
    pub fn series_rules(&self) -> &SeriesRuleSync {
        &self.series_rules
    }

    /// Session event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Bridge configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns `true` once the initial dump of the current session is in.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Id of the current session, if connected.
    pub async fn session_id(&self) -> Option<Uuid> {
        self.connection.lock().await.as_ref().map(|a| a.session_id)
    }

    async fn transport(&self) -> Result<Arc<dyn Transport>, BridgeError> {
        self.connection
            .lock()
            .await
            .as_ref()
            .map(|active| Arc::clone(&active.transport))
            .ok_or_else(|| BridgeError::Connection("not connected".to_string()))
    }

    async fn clean_tables(&self) {
        self.channels.clean().await;
        self.recordings.clean().await;
        self.series_rules.clean().await;
        self.tuners.clean().await;
    }

    fn spawn_pump(
        self: &Arc<Self>,
        generation: u64,
        session_id: Uuid,
        signals: mpsc::UnboundedReceiver<TransportSignal>,
    ) {
        let _ = tokio::spawn(Self::pump(Arc::downgrade(self), generation, session_id, signals));
    }

    /// Drains one transport's inbound channel until it closes or the
    /// session is gone. Boxed so the reconnect path can spawn a new pump.
    fn pump(
        session: Weak<Self>,
        generation: u64,
        session_id: Uuid,
        mut signals: mpsc::UnboundedReceiver<TransportSignal>,
    ) -> PumpFuture {
        Box::pin(async move {
            while let Some(signal) = signals.recv().await {
                let Some(session) = session.upgrade() else {
                    break;
                };
                match signal {
                    TransportSignal::Message(message) => {
                        session.on_message(generation, session_id, &message).await;
                    }
                    TransportSignal::Error(err) => {
                        session.on_error(generation, session_id, err).await;
                    }
                }
            }
            trace!(%session_id, "transport pump finished");
        })
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Routes one inbound message to its synchronizer.
    ///
    /// The generation is checked under the apply gate, so an event from a
    /// replaced transport can never land after the tables were cleaned.
    async fn on_message(&self, generation: u64, session_id: Uuid, message: &HtspMessage) {
        let _shared = self.apply_gate.read().await;
        if !self.is_current(generation) {
            trace!(%session_id, "message from replaced transport dropped");
            return;
        }
        let Some(event) = BackendEvent::decode(message) else {
            return;
        };
        trace!(%session_id, kind = event.kind(), "applying backend event");
        self.apply(session_id, event).await;
    }

    async fn apply(&self, session_id: Uuid, event: BackendEvent) {
        match event {
            BackendEvent::ChannelAdd(fields) => self.channels.add(&fields).await,
            BackendEvent::ChannelUpdate(fields) => self.channels.update(&fields).await,
            BackendEvent::ChannelDelete(id) => self.channels.delete(id).await,
            BackendEvent::DvrEntryAdd(fields) => self.recordings.add(&fields).await,
            BackendEvent::DvrEntryUpdate(fields) => self.recordings.update(&fields).await,
            BackendEvent::DvrEntryDelete(id) => self.recordings.delete(id).await,
            BackendEvent::AutorecEntryAdd(fields) => self.series_rules.add(&fields).await,
            BackendEvent::AutorecEntryUpdate(fields) => self.series_rules.update(&fields).await,
            BackendEvent::AutorecEntryDelete(id) => self.series_rules.delete(&id).await,
            BackendEvent::TunerInfo(lines) => self.tuners.replace(lines).await,
            BackendEvent::InitialSyncCompleted => {
                self.ready.store(true, Ordering::Release);
                let channels = self.channels.len().await;
                let dvr_entries = self.recordings.len().await;
                let series_rules = self.series_rules.len().await;
                info!(
                    %session_id,
                    channels,
                    dvr_entries,
                    series_rules,
                    "initial sync completed"
                );
                let _ = self.events.publish(SessionEvent::InitialSyncCompleted {
                    session_id,
                    timestamp: Utc::now(),
                });
            }
            BackendEvent::Ignored(kind) => trace!(%kind, "ignoring event kind"),
        }
    }

    /// Tears down a failed transport and reconnects eagerly.
    ///
    /// Callers waiting on replies from the failed transport observe
    /// [`BridgeError::Connection`] once the transport drops their handlers.
    async fn on_error(self: &Arc<Self>, generation: u64, session_id: Uuid, err: BridgeError) {
        if !self.is_current(generation) {
            trace!(%session_id, %err, "error from replaced transport dropped");
            return;
        }
        error!(%session_id, %err, "backend connection failed");

        {
            let mut guard = self.connection.lock().await;
            if guard.as_ref().is_some_and(|a| a.generation == generation) {
                *guard = None;
            }
        }
        self.ready.store(false, Ordering::Release);

        let _ = self.events.publish(SessionEvent::ConnectionLost {
            session_id,
            reason: err.to_string(),
            timestamp: Utc::now(),
        });
        let _ = self.events.publish(SessionEvent::DataSourceChanged {
            timestamp: Utc::now(),
        });

        if let Err(reconnect_err) = self.ensure_connection().await {
            warn!(%reconnect_err, "reconnect failed, retrying on next use");
        }
    }
}
