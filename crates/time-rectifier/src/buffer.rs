use std::collections::VecDeque;

use frame::Frame;
use media_types::StreamKind;

/// One buffered frame, paired with the clock time it arrived at (spec §4.3
/// "Per-stream buffer: ... each with both a media time and a clock time").
///
/// Media time lives on `frame.attributes().presentation_time`; clock time
/// is recorded here rather than on the [`Frame`] itself, since arrival
/// instant is a property of this module's ingestion, not of the data.
pub(crate) struct Buffered {
    pub frame: Frame,
    pub clock_time_180k: i64,
}

/// Per-input accumulation state (spec §4.3 "Stream": "a list of Data").
pub(crate) struct StreamState {
    pub kind: Option<StreamKind>,
    /// Fixed sample count per raw audio frame on this input. Our `Frame`
    /// model carries no embedded PCM format descriptor (unlike
    /// original_source's `DataPcm::getPlaneSize`/`getBytesPerSample`), so
    /// each audio input declares its per-frame sample count up front.
    pub samples_per_frame: Option<u32>,
    pub sample_rate: Option<u32>,
    pub data: VecDeque<Buffered>,
    pub num_ticks: u64,
    pub samples_emitted: u64,
    pub last_selected_index: Option<usize>,
}

impl StreamState {
    pub fn new(samples_per_frame: Option<u32>) -> Self {
        Self {
            kind: None,
            samples_per_frame,
            sample_rate: None,
            data: VecDeque::new(),
            num_ticks: 0,
            samples_emitted: 0,
            last_selected_index: None,
        }
    }

    pub fn push(&mut self, frame: Frame, clock_time_180k: i64) {
        self.data.push_back(Buffered {
            frame,
            clock_time_180k,
        });
    }

    /// Evict everything older than `cutoff_180k`, keeping at least one
    /// entry unless `force` (used only by the flush-time final pass; spec
    /// §4.3 original_source: "if streams[i].data.size() <= 1 ... only
    /// remove when flushing").
    pub fn evict_before(&mut self, cutoff_180k: i64, force: bool) {
        while let Some(front) = self.data.front() {
            if front.clock_time_180k >= cutoff_180k {
                break;
            }
            if self.data.len() <= 1 && !force {
                break;
            }
            self.data.pop_front();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Find the buffered entry minimizing `|clockTime - t|`, preferring a past
/// frame unless the closest past candidate is older than one frame period
/// (spec §4.3 step 2).
pub(crate) fn select_video_reference(
    data: &VecDeque<Buffered>,
    t_180k: i64,
    frame_period_180k: i64,
) -> Option<usize> {
    let mut best_index = None;
    let mut best_distance = i64::MAX;
    for (idx, entry) in data.iter().enumerate() {
        let delta = entry.clock_time_180k - t_180k;
        let distance = delta.abs();
        if distance < best_distance && (delta <= 0 || best_distance > frame_period_180k) {
            best_distance = distance;
            best_index = Some(idx);
        }
    }
    best_index
}

/// Classify the front of an audio buffer against the video reference's
/// (original, unreliable) media time (spec §4.3 step 3: "greedily select
/// buffered frames whose media time falls within
/// `[refMediaTime, refMediaTime + frame_period)`").
///
/// `None` — buffer empty, or the front frame is still in the future
/// relative to the reference; stop draining this tick.
/// `Some(Err(()))` — the front frame is older than one frame period before
/// the reference: stale, the caller should drop it and keep scanning.
/// `Some(Ok(()))` — the front frame is in-window: the caller should emit
/// and pop it, then keep scanning.
pub(crate) fn select_audio_range_front(
    data: &VecDeque<Buffered>,
    ref_media_time_180k: i64,
    frame_period_180k: i64,
) -> Option<Result<(), ()>> {
    let front = data.front()?;
    let media_time = front.frame.attributes().presentation_time?;
    let delta = ref_media_time_180k - media_time;
    if delta < 0 {
        return None;
    }
    if delta >= frame_period_180k {
        return Some(Err(()));
    }
    Some(Ok(()))
}
