use std::collections::VecDeque;

use media_types::{Resolution, StreamKind};

/// One pending deletion-accounting entry (spec §4.2 "pending timeshift list").
#[derive(Debug, Clone)]
pub(crate) struct PendingSegment {
    pub duration_in_180k: u64,
    pub filename: String,
}

/// Per-representation state (spec §4.2 "Per-representation state (Quality)").
#[derive(Debug, Clone)]
pub(crate) struct Quality {
    pub prefix: String,
    pub kind: Option<StreamKind>,
    pub resolution: Option<Resolution>,
    pub sample_rate: Option<u32>,
    pub codec_name: String,
    pub language: Option<String>,
    pub accumulated_duration_180k: u64,
    pub lifetime_bytes: u64,
    pub lifetime_duration_180k: u64,
    pub segment_index: u64,
    pub complete: bool,
    pub tail_is_eos: bool,
    pub starts_with_rap: bool,
    pub pending_timeshift: VecDeque<PendingSegment>,
    /// Filename of the init segment posted for this representation, if any
    /// (spec §6 HLS `#EXT-X-MAP`: needs the init segment's URI).
    pub init_filename: Option<String>,
}

impl Quality {
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            kind: None,
            resolution: None,
            sample_rate: None,
            codec_name: String::new(),
            language: None,
            accumulated_duration_180k: 0,
            lifetime_bytes: 0,
            lifetime_duration_180k: 0,
            segment_index: 0,
            complete: false,
            tail_is_eos: false,
            starts_with_rap: true,
            pending_timeshift: VecDeque::new(),
            init_filename: None,
        }
    }

    /// Average bitrate in bits/second over all segments seen so far (spec
    /// §4.2 "Representation ... bandwidth (average bps computed over prior
    /// segments)").
    pub fn avg_bitrate_bps(&self) -> u64 {
        if self.lifetime_duration_180k == 0 {
            return 0;
        }
        (self.lifetime_bytes * 8 * media_types::CLOCK_RATE) / self.lifetime_duration_180k
    }

    /// Representation index is folded into the prefix so that two video
    /// representations at different resolutions don't collide (spec §4.2
    /// "Update quality prefix from stream kind and geometry").
    pub fn resolve_prefix(kind: StreamKind, repr_idx: usize, resolution: Option<Resolution>) -> String {
        let kind_tag = match kind {
            StreamKind::VideoPkt | StreamKind::VideoRaw => "v",
            StreamKind::AudioPkt | StreamKind::AudioRaw => "a",
            StreamKind::SubtitlePkt | StreamKind::SubtitleRaw => "s",
            StreamKind::Playlist | StreamKind::Segment => "m",
        };
        match resolution {
            Some(r) => format!("{kind_tag}_{repr_idx}_{}x{}", r.width, r.height),
            None => format!("{kind_tag}_{repr_idx}"),
        }
    }
}
