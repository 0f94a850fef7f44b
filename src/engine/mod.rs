//! The playback engine.
//!
//! - `transport` owns playback state and the device handle
//! - `scheduler` turns a score into device-clock triggers at each start
//! - `position` maps the device clock back to logical time every frame

pub mod position;
pub mod scheduler;
pub mod transport;

pub use position::{Anchor, FrameOutcome, PositionLoop};
pub use scheduler::{schedule_from, ScheduleReport, ScheduledTrigger};
pub use transport::{PlaybackState, Transport};
