//! Domain layer: entities, host-facing projections, and session events.
//!
//! Stored entities mirror the wire fields and units so that merging a
//! partial update is a plain field overwrite; unit conversion (minutes to
//! seconds, bitmask to weekdays, epoch to UTC) happens only when projecting.

pub mod channel;
pub mod days;
pub mod event_bus;
pub mod program;
pub mod recording;
pub mod series_rule;
pub mod session_event;
pub mod tuner;

pub use channel::{ChannelEntry, ChannelInfo, ChannelType, IconRef};
pub use event_bus::{EventBus, next_event};
pub use program::{Genre, ProgramInfo};
pub use recording::{RecordingEntry, RecordingInfo, RecordingStatus, TimerInfo};
pub use series_rule::{SeriesRuleEntry, SeriesTimerInfo};
pub use session_event::SessionEvent;
pub use tuner::{TunerEntry, TunerInfo, TunerKey, TunerStatus};
