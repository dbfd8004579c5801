//! MPEG-DASH/HLS adaptive segmenter (spec §4.2).
//!
//! Consumes already-segmented, already-muxed representation inputs and
//! produces a Segment artifact stream plus a Manifest artifact stream,
//! tracking per-representation accumulation, timeshift garbage collection,
//! and multi-period rollover the way the teacher's `dash` crate tracks its
//! own per-representation fragment bookkeeping.

mod clock;
mod config;
mod dasher;
mod error;
mod hls;
mod mpd;
mod quality;

pub use clock::{FixedUtcClock, SystemUtcClock, UtcClock};
pub use config::{DasherConfig, ManifestFormat, TileInfo};
pub use dasher::{Dasher, MANIFEST_OUTPUT, SEGMENT_OUTPUT};
pub use error::DasherConfigError;
pub use hls::{build_master_playlist, is_video, render_master_playlist, render_media_playlist, HlsRepresentation};
pub use mpd::{
    build_mpd, coalesce_timeline, iso8601_duration, MpdInfo, PeriodInfo, RepresentationInfo,
    SegmentTiming, SegmentTimelineEntry, Tag,
};
