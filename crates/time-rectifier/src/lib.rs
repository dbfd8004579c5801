//! The TimeRectifier (spec §4.3): a clock-driven multi-stream reframer.
//!
//! Given asynchronously-arriving decoded frames on several inputs, emits a
//! clean, gap-free, synchronized output stream at a fixed frame rate by
//! selecting the closest reference frame per video tick and the matching
//! audio range per tick. Grounded on original_source's
//! `lib_media/transform/time_rectifier.{hpp,cpp}`, re-expressed with an
//! injected [`Clock`]/[`Scheduler`] pair instead of a process-wide clock
//! singleton.

mod buffer;
mod clock;
mod error;
mod rectifier;
mod scheduler;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use error::TimeRectifierError;
pub use rectifier::{FrameRate, TimeRectifier};
pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};
