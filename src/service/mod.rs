//! Service layer: Live-TV operations over the connection session.
//!
//! [`LiveTvService`] gates every call on the initial load, bounds backend
//! round trips, and turns commands into [`CommandOutcome`]s.

pub mod live_tv;

pub use live_tv::{CommandOutcome, LiveTvService, NewSeriesTimer, NewTimer, StreamSource, TimerUpdate};
