//! Bridge configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Server name and credentials have no defaults; every other
//! key falls back to the value the backend ships with.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::BridgeError;

/// Highest recording priority the backend accepts (0 = important).
pub const MAX_PRIORITY: u32 = 4;

/// How channels whose service type is reported as `"other"` are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtherChannelType {
    /// Expose as a TV channel.
    Tv,
    /// Expose as a radio channel.
    Radio,
    /// Drop the channel from every projection.
    #[default]
    Ignore,
}

impl FromStr for OtherChannelType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tv" => Ok(Self::Tv),
            "radio" => Ok(Self::Radio),
            "ignore" => Ok(Self::Ignore),
            other => Err(BridgeError::Configuration(format!(
                "unknown channel type for 'other' services: {other}"
            ))),
        }
    }
}

/// Top-level bridge configuration.
///
/// Loaded once at startup via [`BridgeConfig::from_env`] and validated by
/// [`BridgeConfig::validate`] before a session is constructed.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Backend host name or address.
    pub server: String,

    /// Backend HTTP port (streams, images).
    pub http_port: u16,

    /// Backend HTSP port (RPC connection).
    pub htsp_port: u16,

    /// Optional HTTP web root, e.g. `/tvh`.
    pub webroot: String,

    /// Backend user name.
    pub username: String,

    /// Backend password.
    pub password: String,

    /// Default recording priority (0–4).
    pub priority: u32,

    /// Default recording profile name (empty = backend default).
    pub profile: String,

    /// Mapping applied to the backend's `"other"` service type.
    pub other_channel_type: OtherChannelType,

    /// Embed basic-auth credentials in stream URLs instead of tickets.
    pub http_basic_auth: bool,

    /// Resolve opaque channel icon tokens against the backend image cache.
    pub picon_data: bool,

    /// Ask the backend for subtitles and all audio tracks when streaming.
    pub enable_subs_maudios: bool,

    /// Deadline for commands and bulk reads.
    pub command_timeout: Duration,

    /// Deadline for program-guide accumulation.
    pub epg_timeout: Duration,

    /// Poll interval of the initial-load gate.
    pub initial_load_poll: Duration,

    /// Ceiling of the initial-load gate.
    pub initial_load_ceiling: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            http_port: 9981,
            htsp_port: 9982,
            webroot: String::new(),
            username: String::new(),
            password: String::new(),
            priority: 2,
            profile: String::new(),
            other_channel_type: OtherChannelType::Ignore,
            http_basic_auth: false,
            picon_data: true,
            enable_subs_maudios: false,
            command_timeout: Duration::from_secs(300),
            epg_timeout: Duration::from_secs(30),
            initial_load_poll: Duration::from_millis(500),
            initial_load_ceiling: Duration::from_secs(15 * 60),
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from environment variables and validates it.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] if the server name or
    /// credentials are unset, a port is zero, or `TVH_OTHER_CHANNEL_TYPE`
    /// is not one of `tv`, `radio`, `ignore`.
    pub fn from_env() -> Result<Self, BridgeError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let other_channel_type = match std::env::var("TVH_OTHER_CHANNEL_TYPE") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.other_channel_type,
        };

        let config = Self {
            server: std::env::var("TVH_SERVER").unwrap_or_default(),
            http_port: parse_env("TVH_HTTP_PORT", defaults.http_port),
            htsp_port: parse_env("TVH_HTSP_PORT", defaults.htsp_port),
            webroot: std::env::var("TVH_WEBROOT").unwrap_or_default(),
            username: std::env::var("TVH_USERNAME").unwrap_or_default(),
            password: std::env::var("TVH_PASSWORD").unwrap_or_default(),
            priority: parse_env("TVH_PRIORITY", defaults.priority).min(MAX_PRIORITY),
            profile: std::env::var("TVH_PROFILE").unwrap_or_default(),
            other_channel_type,
            http_basic_auth: parse_env_bool("TVH_HTTP_BASIC_AUTH", defaults.http_basic_auth),
            picon_data: parse_env_bool("TVH_PICON_DATA", defaults.picon_data),
            enable_subs_maudios: parse_env_bool(
                "TVH_ENABLE_SUBS_MAUDIOS",
                defaults.enable_subs_maudios,
            ),
            command_timeout: Duration::from_secs(parse_env("TVH_COMMAND_TIMEOUT_SECS", 300)),
            epg_timeout: Duration::from_secs(parse_env("TVH_EPG_TIMEOUT_SECS", 30)),
            initial_load_poll: Duration::from_millis(parse_env("TVH_INITIAL_LOAD_POLL_MS", 500)),
            initial_load_ceiling: Duration::from_secs(parse_env(
                "TVH_INITIAL_LOAD_CEILING_SECS",
                15 * 60,
            )),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that everything needed to open and authenticate a
    /// connection is present.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] naming the first missing
    /// setting.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.server.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "backend server name is not set".to_string(),
            ));
        }
        if self.username.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "backend username is not set".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(BridgeError::Configuration(
                "backend password is not set".to_string(),
            ));
        }
        if self.http_port == 0 || self.htsp_port == 0 {
            return Err(BridgeError::Configuration(
                "backend ports must be non-zero".to_string(),
            ));
        }
        if self.priority > MAX_PRIORITY {
            return Err(BridgeError::Configuration(format!(
                "priority {} is outside 0..={MAX_PRIORITY}",
                self.priority
            )));
        }
        self.http_base_url()?;
        Ok(())
    }

    /// Base URL of the backend's HTTP interface, web root included.
    ///
    /// Credentials are set as URL userinfo when
    /// [`BridgeConfig::http_basic_auth`] is enabled, so the URL can be
    /// handed to a player as-is. Every component is percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] if the server is not a valid
    /// host or the credentials cannot be carried in a URL.
    pub fn http_base_url(&self) -> Result<Url, BridgeError> {
        let invalid = |what: &str| BridgeError::Configuration(format!("invalid backend {what}"));

        let mut url = Url::parse("http://localhost/")
            .map_err(|err| BridgeError::Configuration(err.to_string()))?;
        url.set_host(Some(self.server.trim()))
            .map_err(|err| BridgeError::Configuration(format!("invalid backend host: {err}")))?;
        url.set_port(Some(self.http_port))
            .map_err(|()| invalid("port"))?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(self.webroot.split('/').filter(|s| !s.is_empty()));
        }
        if self.http_basic_auth {
            url.set_username(&self.username)
                .map_err(|()| invalid("username"))?;
            url.set_password(Some(&self.password))
                .map_err(|()| invalid("password"))?;
        }
        Ok(url)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}
