//! Entity synchronizers fed by the backend's push events.
//!
//! Each synchronizer owns one or more [`SnapshotTable`]s, applies
//! add/update/delete events with field-level merge, and produces
//! host-facing projections on demand.

pub mod channels;
pub mod recordings;
pub mod series_rules;
pub mod table;
pub mod tuners;

pub use channels::ChannelSync;
pub use recordings::RecordingSync;
pub use series_rules::SeriesRuleSync;
pub use table::SnapshotTable;
pub use tuners::TunerSync;
