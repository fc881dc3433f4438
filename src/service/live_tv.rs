//! Live-TV service: the operations a media-server host calls.
//!
//! Every call makes sure a connection exists, waits for the initial load,
//! and bounds the backend round trip with [`run_with_timeout`]. Reads
//! degrade to an empty list; commands report [`CommandOutcome::Unknown`]
//! when the backend did not answer in time, because the command may still
//! have been applied.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc, Weekday};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::{
    ChannelInfo, IconRef, ProgramInfo, RecordingInfo, SeriesTimerInfo, TimerInfo, TunerInfo, days,
};
use crate::error::BridgeError;
use crate::protocol::commands::{
    self, AddAutorecEntry, AddDvrEntry, CommandReply, Ticket, TicketTarget, UpdateDvrEntry,
};
use crate::protocol::HtspMessage;
use crate::session::{ConnectionSession, Outcome, ServerStatus, run_with_timeout};

/// Result of a command sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The backend confirmed the command; carries the created id, if any.
    Applied(Option<String>),
    /// No reply before the deadline. The command may or may not have taken
    /// effect; the next push events will tell.
    Unknown,
}

/// A one-off timer to create.
///
/// With `event_id` set the backend records that guide event and uses its
/// times; otherwise the channel/start/end triple defines the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTimer {
    /// Channel to record.
    pub channel_id: u32,
    /// Guide event to record.
    pub event_id: Option<u32>,
    /// Start (UTC).
    pub start: DateTime<Utc>,
    /// End (UTC).
    pub end: DateTime<Utc>,
    /// Title.
    pub name: String,
    /// Description.
    pub overview: Option<String>,
    /// Pre-padding in seconds.
    pub pre_padding_seconds: i64,
    /// Post-padding in seconds.
    pub post_padding_seconds: i64,
    /// Priority; the session default when `None`.
    pub priority: Option<u32>,
}

/// Changes to an existing timer. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerUpdate {
    /// Timer to change.
    pub id: u32,
    /// New start.
    pub start: Option<DateTime<Utc>>,
    /// New end.
    pub end: Option<DateTime<Utc>>,
    /// New title.
    pub name: Option<String>,
    /// New pre-padding in seconds.
    pub pre_padding_seconds: Option<i64>,
    /// New post-padding in seconds.
    pub post_padding_seconds: Option<i64>,
    /// New priority.
    pub priority: Option<u32>,
}

/// A series rule to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSeriesTimer {
    /// Title match expression.
    pub title: String,
    /// Display name; defaults to the title on the backend.
    pub name: Option<String>,
    /// Channel restriction; `None` records on any channel.
    pub channel_id: Option<u32>,
    /// Days the rule fires on; empty means every day.
    pub days: Vec<Weekday>,
    /// Earliest start, minutes after midnight.
    pub start_minutes: Option<i64>,
    /// Pre-padding in seconds.
    pub pre_padding_seconds: i64,
    /// Post-padding in seconds.
    pub post_padding_seconds: i64,
    /// Priority; the session default when `None`.
    pub priority: Option<u32>,
}

/// Where a host player should fetch a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSource {
    /// Absolute HTTP URL.
    pub url: String,
    /// Whether the player should expose subtitles and every audio track.
    pub all_tracks: bool,
}

/// Host-facing Live-TV operations over one [`ConnectionSession`].
#[derive(Debug, Clone)]
pub struct LiveTvService {
    session: Arc<ConnectionSession>,
}

impl LiveTvService {
    /// Creates a service over `session`.
    #[must_use]
    pub fn new(session: Arc<ConnectionSession>) -> Self {
        Self { session }
    }

    /// Returns the underlying session.
    #[must_use]
    pub fn session(&self) -> &Arc<ConnectionSession> {
        &self.session
    }

    /// All exposed channels.
    pub async fn channels(&self, cancel: &CancellationToken) -> Vec<ChannelInfo> {
        self.bounded_read("channels", cancel, |session, token| async move {
            session.build_channel_infos(&token).await
        })
        .await
    }

    /// Recordings that have started, finished or failed.
    pub async fn recordings(&self, cancel: &CancellationToken) -> Vec<RecordingInfo> {
        self.bounded_read("recordings", cancel, |session, token| async move {
            session.build_dvr_infos(&token).await
        })
        .await
    }

    /// Scheduled timers that have not started yet.
    pub async fn timers(&self, cancel: &CancellationToken) -> Vec<TimerInfo> {
        self.bounded_read("timers", cancel, |session, token| async move {
            session.build_pending_timers_infos(&token).await
        })
        .await
    }

    /// Series rules.
    pub async fn series_timers(&self, cancel: &CancellationToken) -> Vec<SeriesTimerInfo> {
        self.bounded_read("series_timers", cancel, |session, token| async move {
            session.build_autorec_infos(&token).await
        })
        .await
    }

    /// Tuner status lines.
    pub async fn tuners(&self, cancel: &CancellationToken) -> Vec<TunerInfo> {
        self.bounded_read("tuners", cancel, |session, token| async move {
            session.build_tuner_infos(&token).await
        })
        .await
    }

    /// Creates a one-off timer.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the backend is unreachable,
    /// [`BridgeError::Timeout`] if the initial load never completed, or
    /// [`BridgeError::CommandRejected`] if the backend refused the timer.
    pub async fn create_timer(
        &self,
        timer: &NewTimer,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, BridgeError> {
        let settings = self.session.settings().await;
        let manual = timer.event_id.is_none();
        let request = AddDvrEntry {
            event_id: timer.event_id,
            channel_id: Some(timer.channel_id),
            start: manual.then(|| timer.start.timestamp()),
            stop: manual.then(|| timer.end.timestamp()),
            title: manual.then(|| timer.name.clone()),
            description: timer.overview.clone().filter(|_| manual),
            priority: timer.priority.unwrap_or(settings.priority),
            start_extra: padding_minutes(timer.pre_padding_seconds),
            stop_extra: padding_minutes(timer.post_padding_seconds),
            config_name: Some(settings.profile),
        };
        self.command(commands::add_dvr_entry(&request), cancel).await
    }

    /// Changes an existing timer.
    ///
    /// # Errors
    ///
    /// See [`LiveTvService::create_timer`].
    pub async fn update_timer(
        &self,
        update: &TimerUpdate,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, BridgeError> {
        let request = UpdateDvrEntry {
            id: update.id,
            start: update.start.map(|t| t.timestamp()),
            stop: update.end.map(|t| t.timestamp()),
            title: update.name.clone(),
            priority: update.priority,
            start_extra: update.pre_padding_seconds.map(padding_minutes),
            stop_extra: update.post_padding_seconds.map(padding_minutes),
        };
        self.command(commands::update_dvr_entry(&request), cancel)
            .await
    }

    /// Removes a scheduled timer, or stops it if it is recording.
    ///
    /// # Errors
    ///
    /// See [`LiveTvService::create_timer`].
    pub async fn cancel_timer(
        &self,
        id: u32,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, BridgeError> {
        self.command(commands::cancel_dvr_entry(id), cancel).await
    }

    /// Deletes a recording and its file.
    ///
    /// # Errors
    ///
    /// See [`LiveTvService::create_timer`].
    pub async fn delete_recording(
        &self,
        id: u32,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, BridgeError> {
        self.command(commands::delete_dvr_entry(id), cancel).await
    }

    /// Creates a series rule.
    ///
    /// # Errors
    ///
    /// See [`LiveTvService::create_timer`].
    pub async fn create_series_timer(
        &self,
        rule: &NewSeriesTimer,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, BridgeError> {
        let settings = self.session.settings().await;
        let days_of_week = if rule.days.is_empty() {
            days::ALL_DAYS
        } else {
            days::encode(&rule.days)
        };
        let request = AddAutorecEntry {
            title: rule.title.clone(),
            name: rule.name.clone(),
            channel_id: rule.channel_id,
            days_of_week,
            start: rule.start_minutes.filter(|m| *m >= 0),
            start_extra: padding_minutes(rule.pre_padding_seconds),
            stop_extra: padding_minutes(rule.post_padding_seconds),
            priority: rule.priority.unwrap_or(settings.priority),
            config_name: Some(settings.profile),
        };
        self.command(commands::add_autorec_entry(&request), cancel)
            .await
    }

    /// Replaces a series rule.
    ///
    /// The backend cannot edit autorec entries, so the old rule is deleted
    /// and a new one created. If the delete is not confirmed the create is
    /// skipped and the outcome is [`CommandOutcome::Unknown`].
    ///
    /// # Errors
    ///
    /// See [`LiveTvService::create_timer`].
    pub async fn update_series_timer(
        &self,
        id: &str,
        rule: &NewSeriesTimer,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, BridgeError> {
        match self.cancel_series_timer(id, cancel).await? {
            CommandOutcome::Applied(_) => self.create_series_timer(rule, cancel).await,
            CommandOutcome::Unknown => {
                warn!(series_timer_id = id, "delete not confirmed, replacement skipped");
                Ok(CommandOutcome::Unknown)
            }
        }
    }

    /// Deletes a series rule.
    ///
    /// # Errors
    ///
    /// See [`LiveTvService::create_timer`].
    pub async fn cancel_series_timer(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, BridgeError> {
        self.command(commands::delete_autorec_entry(id), cancel)
            .await
    }

    /// Guide entries of one channel overlapping `[start, end)`.
    ///
    /// Bounded by the EPG deadline; any failure yields an empty guide.
    pub async fn program_guide(
        &self,
        channel_id: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Vec<ProgramInfo> {
        if let Err(err) = self.ready(cancel).await {
            warn!(channel_id, %err, "program guide unavailable");
            return Vec::new();
        }
        let pending = match self
            .session
            .request(commands::get_events(channel_id, end.timestamp()))
            .await
        {
            Ok(pending) => pending,
            Err(err) => {
                warn!(channel_id, %err, "getEvents not sent");
                return Vec::new();
            }
        };

        let reply = match run_with_timeout(pending.response(), self.session.config().epg_timeout)
            .await
        {
            Outcome::Completed(Ok(reply)) => reply,
            Outcome::Completed(Err(err)) => {
                warn!(channel_id, %err, "getEvents failed");
                return Vec::new();
            }
            Outcome::TimedOut => {
                warn!(channel_id, "getEvents timed out");
                return Vec::new();
            }
        };

        match commands::parse_events(&reply) {
            Ok(events) => events
                .into_iter()
                .map(ProgramInfo::from)
                .filter(|program| program.overlaps(start, end))
                .collect(),
            Err(err) => {
                warn!(channel_id, %err, "getEvents rejected");
                Vec::new()
            }
        }
    }

    /// Stream location of a live channel.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] for an unknown channel, a
    /// connection error, [`BridgeError::Timeout`] if no ticket arrived in
    /// time, or the backend's rejection of the ticket request.
    pub async fn channel_stream_url(
        &self,
        channel_id: u32,
        cancel: &CancellationToken,
    ) -> Result<StreamSource, BridgeError> {
        self.ready(cancel).await?;
        if self.session.channels().get(channel_id).await.is_none() {
            return Err(BridgeError::NotFound(format!("channel {channel_id}")));
        }
        self.stream_source(
            TicketTarget::Channel(channel_id),
            &format!("/stream/channelid/{channel_id}"),
        )
        .await
    }

    /// Stream location of a recording.
    ///
    /// # Errors
    ///
    /// See [`LiveTvService::channel_stream_url`].
    pub async fn recording_stream_url(
        &self,
        recording_id: u32,
        cancel: &CancellationToken,
    ) -> Result<StreamSource, BridgeError> {
        self.ready(cancel).await?;
        if self.session.recordings().get(recording_id).await.is_none() {
            return Err(BridgeError::NotFound(format!("recording {recording_id}")));
        }
        self.stream_source(
            TicketTarget::Recording(recording_id),
            &format!("/dvrfile/{recording_id}"),
        )
        .await
    }

    /// Absolute image URL of a channel, if it has one.
    ///
    /// Backend image-cache tokens resolve against the HTTP base URL only
    /// when picon data is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] for an unknown channel, or the
    /// error of the connection or initial-load wait.
    pub async fn channel_image(
        &self,
        channel_id: u32,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, BridgeError> {
        self.ready(cancel).await?;
        if self.session.channels().get(channel_id).await.is_none() {
            return Err(BridgeError::NotFound(format!("channel {channel_id}")));
        }
        let settings = self.session.settings().await;
        Ok(match self.session.channels().icon(channel_id).await {
            Some(IconRef::Url(url)) => Some(url),
            Some(IconRef::Token(token)) if settings.picon_data => {
                Some(backend_url(&settings.http_base_url, &token).into())
            }
            Some(IconRef::Token(_)) | None => None,
        })
    }

    /// Backend identification and storage usage.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the backend is unreachable.
    pub async fn server_status(&self) -> Result<ServerStatus, BridgeError> {
        self.session.ensure_connection().await?;
        self.session.server_status().await
    }

    async fn ready(&self, cancel: &CancellationToken) -> Result<(), BridgeError> {
        self.session.ensure_connection().await?;
        match self.session.wait_for_initial_load(cancel).await {
            Outcome::Completed(()) => Ok(()),
            Outcome::TimedOut => Err(BridgeError::Timeout(millis(
                self.session.config().initial_load_ceiling,
            ))),
        }
    }

    async fn bounded_read<T, F, Fut>(
        &self,
        what: &'static str,
        cancel: &CancellationToken,
        build: F,
    ) -> Vec<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<ConnectionSession>, CancellationToken) -> Fut,
        Fut: Future<Output = Outcome<Vec<T>>> + Send + 'static,
    {
        if let Err(err) = self.session.ensure_connection().await {
            warn!(what, %err, "backend unavailable, returning empty list");
            return Vec::new();
        }
        let token = cancel.child_token();
        let work = build(Arc::clone(&self.session), token.clone());
        match run_with_timeout(work, self.session.config().command_timeout).await {
            Outcome::Completed(Outcome::Completed(items)) => {
                debug!(what, count = items.len(), "read completed");
                items
            }
            Outcome::Completed(Outcome::TimedOut) => {
                warn!(what, "initial load incomplete, returning empty list");
                Vec::new()
            }
            Outcome::TimedOut => {
                token.cancel();
                warn!(what, "read timed out, returning empty list");
                Vec::new()
            }
        }
    }

    async fn command(
        &self,
        message: HtspMessage,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, BridgeError> {
        self.ready(cancel).await?;
        let method = message.method().unwrap_or("-").to_string();
        let pending = self.session.request(message).await?;
        match run_with_timeout(pending.response(), self.session.config().command_timeout).await {
            Outcome::Completed(reply) => {
                let reply = CommandReply::parse(&method, &reply?)?;
                info!(%method, id = reply.id.as_deref().unwrap_or("-"), "command applied");
                Ok(CommandOutcome::Applied(reply.id))
            }
            Outcome::TimedOut => {
                warn!(%method, "no reply before deadline, outcome unknown");
                Ok(CommandOutcome::Unknown)
            }
        }
    }

    async fn stream_source(
        &self,
        target: TicketTarget,
        direct_path: &str,
    ) -> Result<StreamSource, BridgeError> {
        let settings = self.session.settings().await;
        let profile = (!settings.profile.is_empty()).then(|| settings.profile.clone());

        let mut url = if settings.http_basic_auth {
            backend_url(&settings.http_base_url, direct_path)
        } else {
            let pending = self.session.request(commands::get_ticket(target)).await?;
            let timeout = self.session.config().command_timeout;
            let reply = match run_with_timeout(pending.response(), timeout).await {
                Outcome::Completed(reply) => reply?,
                Outcome::TimedOut => return Err(BridgeError::Timeout(millis(timeout))),
            };
            let ticket = Ticket::parse(&reply)?;
            let mut url = backend_url(&settings.http_base_url, &ticket.path);
            let _ = url.query_pairs_mut().append_pair("ticket", &ticket.ticket);
            url
        };
        if let Some(profile) = &profile {
            let _ = url.query_pairs_mut().append_pair("profile", profile);
        }

        Ok(StreamSource {
            url: url.into(),
            all_tracks: settings.enable_subs_maudios,
        })
    }
}

/// Converts seconds of padding to the backend's whole minutes, rounding
/// up. Negative padding is treated as none.
fn padding_minutes(seconds: i64) -> i64 {
    seconds.max(0).saturating_add(59) / 60
}

/// Appends a backend path to the HTTP base URL, segment by segment.
fn backend_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        let _ = segments
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
    }
    url
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
