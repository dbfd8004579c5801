use std::sync::Arc;

use frame::{FileMetadata, Frame, Metadata};
use media_types::StreamKind;
use pipeline_graph::{Filter, FilterError, FilterHost, Input, LogLevel, Output};

use time::format_description::well_known::Rfc3339;

use crate::clock::UtcClock;
use crate::config::{DasherConfig, ManifestFormat};
use crate::hls::{self, HlsRepresentation};
use crate::mpd::{self, MpdInfo, PeriodInfo, RepresentationInfo, SegmentTiming};
use crate::quality::{PendingSegment, Quality};

pub const SEGMENT_OUTPUT: usize = 0;
pub const MANIFEST_OUTPUT: usize = 1;

const OUTPUT_POOL_SIZE: usize = 16;
const DELETE_SENTINEL: i64 = i64::MAX;

struct PeriodRecord {
    start_180k: u64,
    duration_180k: u64,
}

/// The Dasher adaptive segmenter (spec §4.2).
///
/// Consumes N already-segmented representation inputs and produces a
/// Segment artifact stream plus a Manifest artifact stream. Single-threaded
/// within `process()` (spec §5: "needs no external locking").
pub struct Dasher {
    config: DasherConfig,
    inputs: Vec<Arc<Input>>,
    outputs: Vec<Output>,
    qualities: Vec<Quality>,
    utc_clock: Arc<dyn UtcClock>,
    validated: bool,
    total_duration_180k: u64,
    current_period_start_180k: u64,
    closed_periods: Vec<PeriodRecord>,
    manifest_posted_since_last_flush_check: bool,
}

impl Dasher {
    pub fn new(config: DasherConfig, num_inputs: usize, utc_clock: Arc<dyn UtcClock>) -> Self {
        let inputs = (0..num_inputs).map(|_| Input::new(4)).collect();
        let outputs = vec![Output::new(OUTPUT_POOL_SIZE), Output::new(OUTPUT_POOL_SIZE)];
        let qualities = (0..num_inputs).map(|_| Quality::new()).collect();
        Self {
            config,
            inputs,
            outputs,
            qualities,
            utc_clock,
            validated: false,
            total_duration_180k: 0,
            current_period_start_180k: 0,
            closed_periods: Vec::new(),
            manifest_posted_since_last_flush_check: false,
        }
    }

    fn nominal_duration(&self) -> u64 {
        self.config.seg_duration_in_180k
    }

    fn contract_error(&self, message: impl Into<String>) -> FilterError {
        FilterError::Contract {
            filter: "Dasher".to_string(),
            message: message.into(),
        }
    }

    fn period_folder(&self) -> Option<String> {
        if self.config.multi_period_folders_in_180k == 0 {
            return None;
        }
        let period_index = self.current_period_start_180k / self.config.multi_period_folders_in_180k;
        Some(format!("{}_{period_index}", self.utc_clock.folder_stamp()))
    }

    fn segment_filename(&self, repr_idx: usize, tag: impl std::fmt::Display, ext: &str) -> String {
        let prefix = &self.qualities[repr_idx].prefix;
        match self.period_folder() {
            Some(folder) => format!("{folder}/{prefix}/{prefix}-{tag}{ext}"),
            None => format!("{prefix}/{prefix}-{tag}{ext}"),
        }
    }

    fn init_segment_filename(&self, repr_idx: usize) -> String {
        self.segment_filename(repr_idx, "init", ".mp4")
    }

    fn media_segment_filename(&self, repr_idx: usize) -> String {
        let q = &self.qualities[repr_idx];
        let tag = if self.config.is_timeline_mode() {
            self.total_duration_180k * 1000 / media_types::CLOCK_RATE
        } else {
            q.segment_index
        };
        self.segment_filename(repr_idx, tag, ".m4s")
    }

    fn post_segment(
        &mut self,
        repr_idx: usize,
        frame: Frame,
        filename: String,
        host: &dyn FilterHost,
    ) -> Result<(), FilterError> {
        let mut updated_meta = match frame.metadata() {
            Some(Metadata::File(m)) => m.clone(),
            _ => FileMetadata::new(StreamKind::Segment, filename.clone()),
        };
        updated_meta.filename = filename;
        let frame = frame.with_metadata(Arc::new(Metadata::File(updated_meta)));
        self.outputs[SEGMENT_OUTPUT].post(frame)?;
        let _ = repr_idx;
        let _ = host;
        Ok(())
    }

    fn handle_frame(
        &mut self,
        repr_idx: usize,
        frame: Frame,
        host: &dyn FilterHost,
    ) -> Result<(), FilterError> {
        let meta = match frame.metadata() {
            Some(Metadata::File(m)) => m.clone(),
            _ => {
                return Err(self.contract_error(format!(
                    "representation {repr_idx} input must carry Segment metadata"
                )))
            }
        };

        if meta.is_delete() {
            return Ok(());
        }

        let q = &mut self.qualities[repr_idx];
        if q.prefix.is_empty() {
            q.prefix = Quality::resolve_prefix(meta.kind, repr_idx, meta.resolution);
            q.kind = Some(meta.kind);
            q.resolution = meta.resolution;
            q.sample_rate = meta.sample_rate;
            q.codec_name = meta.codec_name.clone();
            q.language = meta.language.clone();
        }

        let is_init_segment = meta.duration_in_180k == 0 && q.accumulated_duration_180k == 0 && q.segment_index == 0;
        if is_init_segment {
            let filename = self.init_segment_filename(repr_idx);
            self.qualities[repr_idx].init_filename = Some(filename.clone());
            host.log(LogLevel::Debug, &format!("[{repr_idx}] init segment -> {filename}"));
            return self.post_segment(repr_idx, frame, filename, host);
        }

        let duration = if self.config.force_real_durations {
            meta.duration_in_180k
        } else {
            self.nominal_duration()
        };

        let q = &mut self.qualities[repr_idx];
        q.lifetime_bytes += frame.len() as u64;
        q.lifetime_duration_180k += duration;
        q.accumulated_duration_180k += duration;
        q.starts_with_rap = meta.starts_with_rap;
        q.tail_is_eos = meta.eos;

        if !meta.eos {
            let filename = self.media_segment_filename(repr_idx);
            self.post_segment(repr_idx, frame, filename, host)
        } else {
            let filename = self.media_segment_filename(repr_idx);
            self.post_segment(repr_idx, frame, filename, host)?;
            self.maybe_cross_segment_boundary(host)
        }
    }

    /// spec §4.2 step 4: every active representation has accumulated at
    /// least one segment duration and its tail frame was EOS-marked.
    fn maybe_cross_segment_boundary(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        let seg_duration = self.nominal_duration();
        let ready = self
            .qualities
            .iter()
            .filter(|q| !q.complete)
            .all(|q| q.tail_is_eos && q.accumulated_duration_180k >= seg_duration.max(1));
        if !ready || self.qualities.iter().all(|q| q.complete) {
            return Ok(());
        }

        for q in &mut self.qualities {
            if q.complete {
                continue;
            }
            q.accumulated_duration_180k = q.accumulated_duration_180k.saturating_sub(seg_duration);
            let filename = format!("{}/{}-{}.m4s", q.prefix, q.prefix, q.segment_index);
            q.pending_timeshift.push_back(PendingSegment {
                duration_in_180k: seg_duration,
                filename,
            });
            q.segment_index += 1;
            q.tail_is_eos = false;
        }
        self.total_duration_180k += seg_duration;

        if self.config.presignal_next_segment {
            self.presignal_next_segments(host)?;
        }

        self.maybe_roll_period(seg_duration);
        self.on_new_segment(host)
    }

    /// spec §4.2 "Emit a zero-length Segment with next filename to enable
    /// player prefetch": for every still-active representation, post a
    /// zero-length, zero-duration Segment artifact carrying the filename the
    /// *next* media segment will use, so a player can start fetching it
    /// ahead of encode completion. `DasherConfig::validate` rejects this in
    /// segment-timeline mode, where there's no fixed next filename to
    /// pre-announce.
    fn presignal_next_segments(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        for repr_idx in 0..self.qualities.len() {
            if self.qualities[repr_idx].complete {
                continue;
            }
            let filename = self.media_segment_filename(repr_idx);
            let kind = self.qualities[repr_idx].kind.unwrap_or(StreamKind::Segment);
            host.log(
                LogLevel::Debug,
                &format!("[{repr_idx}] presignal next segment -> {filename}"),
            );
            let meta = FileMetadata {
                duration_in_180k: 0,
                eos: false,
                starts_with_rap: false,
                size: 0,
                ..FileMetadata::new(kind, filename)
            };
            let frame = Frame::new(Vec::new(), Arc::new(Metadata::File(meta)));
            self.outputs[SEGMENT_OUTPUT].post(frame)?;
        }
        Ok(())
    }

    fn maybe_roll_period(&mut self, seg_duration: u64) {
        let boundary = self.config.multi_period_folders_in_180k;
        if boundary == 0 {
            return;
        }
        if self.total_duration_180k % boundary == 0 {
            self.closed_periods.push(PeriodRecord {
                start_180k: self.current_period_start_180k,
                duration_180k: self.total_duration_180k - self.current_period_start_180k,
            });
            self.current_period_start_180k = self.total_duration_180k;
        }
        let _ = seg_duration;
    }

    /// spec §4.2 step 5: regenerate the manifest, post it in live mode, run
    /// timeshift garbage collection.
    fn on_new_segment(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        if self.config.live {
            if let Err(err) = self.post_manifest(host) {
                host.log(LogLevel::Warning, &format!("manifest post failed: {err}"));
            }
            self.run_timeshift_gc(host);
        }
        Ok(())
    }

    /// spec §4.2 "Timeshift / garbage collection": walk the pending list
    /// newest-first summing durations; any segment whose cumulative duration
    /// exceeds the timeshift depth is deleted.
    fn run_timeshift_gc(&mut self, host: &dyn FilterHost) {
        let Some(depth) = self.config.time_shift_buffer_depth_in_180k else {
            return;
        };
        for q in &mut self.qualities {
            let mut cumulative = 0u64;
            let mut delete_count = 0usize;
            for entry in q.pending_timeshift.iter().rev() {
                cumulative += entry.duration_in_180k;
                if cumulative > depth {
                    delete_count += 1;
                }
            }
            let to_delete: Vec<String> = (0..delete_count)
                .filter_map(|_| q.pending_timeshift.pop_front().map(|e| e.filename))
                .collect();
            for filename in to_delete {
                host.log(LogLevel::Debug, &format!("timeshift delete {filename}"));
                let meta = FileMetadata {
                    size: DELETE_SENTINEL,
                    ..FileMetadata::new(StreamKind::Segment, filename)
                };
                let frame = Frame::new(Vec::new(), Arc::new(Metadata::File(meta)));
                if let Err(err) = self.outputs[SEGMENT_OUTPUT].post(frame) {
                    host.log(LogLevel::Warning, &format!("delete post failed: {err}"));
                }
            }
        }
    }

    /// spec §6 "Manifest artifact format": dispatches on the configured
    /// format instead of always emitting DASH XML.
    fn post_manifest(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        match self.config.manifest_format {
            ManifestFormat::Dash => self.post_dash_manifest(host),
            ManifestFormat::Hls => self.post_hls_manifest(host),
        }
    }

    fn post_dash_manifest(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        let info = self.build_mpd_info();
        let xml = mpd::build_mpd(&info).to_string();
        host.log(LogLevel::Debug, "dash manifest regenerated");
        let meta = FileMetadata {
            mime_type: "application/dash+xml".to_string(),
            ..FileMetadata::new(StreamKind::Playlist, "manifest.mpd")
        };
        let frame = Frame::new(xml.into_bytes(), Arc::new(Metadata::File(meta)));
        self.outputs[MANIFEST_OUTPUT].post(frame)
    }

    /// spec §6: one media playlist per representation plus a master
    /// playlist, in place of the MPD XML, when `manifest_format == Hls`.
    fn post_hls_manifest(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        let target_duration = (self.nominal_duration() as f64 / media_types::CLOCK_RATE as f64)
            .ceil()
            .max(1.0) as f32;
        let program_date_time = self.config.live.then(|| self.utc_clock.now_rfc3339());

        let representations: Vec<HlsRepresentation> = self
            .qualities
            .iter()
            .enumerate()
            .filter(|(_, q)| q.kind.is_some())
            .map(|(idx, q)| HlsRepresentation {
                repr: self.representation_info(idx, q),
                segments: q
                    .pending_timeshift
                    .iter()
                    .map(|entry| {
                        (
                            entry.filename.clone(),
                            entry.duration_in_180k as f32 / media_types::CLOCK_RATE as f32,
                        )
                    })
                    .collect(),
                vod: !self.config.live,
                init_uri: q.init_filename.clone(),
                first_segment_program_date_time: program_date_time.clone(),
            })
            .collect();

        let (video_reprs, audio_reprs): (Vec<_>, Vec<_>) = representations
            .into_iter()
            .partition(|r| r.repr.kind.is_video());

        for repr in video_reprs.iter().chain(audio_reprs.iter()) {
            let rendered = hls::render_media_playlist(repr, target_duration);
            let filename = format!("{}/playlist.m3u8", repr.repr.id);
            let meta = FileMetadata {
                mime_type: "application/vnd.apple.mpegurl".to_string(),
                ..FileMetadata::new(StreamKind::Playlist, filename)
            };
            let frame = Frame::new(rendered.into_bytes(), Arc::new(Metadata::File(meta)));
            self.outputs[MANIFEST_OUTPUT].post(frame)?;
        }

        let master = hls::build_master_playlist(&video_reprs, &audio_reprs, |id| {
            format!("{id}/playlist.m3u8")
        });
        let rendered = hls::render_master_playlist(&master);
        let meta = FileMetadata {
            mime_type: "application/vnd.apple.mpegurl".to_string(),
            ..FileMetadata::new(StreamKind::Playlist, "master.m3u8")
        };
        let frame = Frame::new(rendered.into_bytes(), Arc::new(Metadata::File(meta)));
        self.outputs[MANIFEST_OUTPUT].post(frame)?;

        host.log(LogLevel::Debug, "hls manifest regenerated");
        Ok(())
    }

    fn representation_info(&self, idx: usize, q: &Quality) -> RepresentationInfo {
        RepresentationInfo {
            id: q.prefix.clone(),
            kind: q.kind.unwrap(),
            bandwidth_bps: q.avg_bitrate_bps(),
            mime_type: if q.kind.unwrap().is_audio() {
                "audio/mp4".to_string()
            } else {
                "video/mp4".to_string()
            },
            codec_name: q.codec_name.clone(),
            start_with_sap: q.starts_with_rap,
            resolution: q.resolution,
            sample_rate: q.sample_rate,
            language: q.language.clone(),
            tile: self.config.tile_info.get(idx).copied(),
            init_pattern: format!("{}/{}-init.mp4", q.prefix, q.prefix),
            media_pattern: format!("{}/{}-$Number$.m4s", q.prefix, q.prefix),
            timing: if self.config.is_timeline_mode() {
                SegmentTiming::Timeline {
                    entries: mpd::coalesce_timeline(
                        &q.pending_timeshift
                            .iter()
                            .scan(0u64, |t, entry| {
                                let start = *t;
                                *t += entry.duration_in_180k;
                                Some((start, entry.duration_in_180k))
                            })
                            .collect::<Vec<_>>(),
                    ),
                    start_number: 1,
                }
            } else {
                SegmentTiming::Template {
                    duration_180k: self.config.seg_duration_in_180k,
                    start_number: 1,
                }
            },
        }
    }

    fn build_mpd_info(&self) -> MpdInfo {
        let mut periods: Vec<PeriodInfo> = self
            .closed_periods
            .iter()
            .map(|p| PeriodInfo {
                start_180k: p.start_180k,
                duration_180k: Some(p.duration_180k),
                base_urls: self.config.base_url_prefixes.clone(),
                representations: Vec::new(),
            })
            .collect();

        let live_representations: Vec<RepresentationInfo> = self
            .qualities
            .iter()
            .enumerate()
            .filter(|(_, q)| q.kind.is_some())
            .map(|(idx, q)| self.representation_info(idx, q))
            .collect();

        periods.push(PeriodInfo {
            start_180k: self.current_period_start_180k,
            duration_180k: if self.config.live {
                None
            } else {
                Some(self.total_duration_180k - self.current_period_start_180k)
            },
            base_urls: self.config.base_url_prefixes.clone(),
            representations: live_representations,
        });

        MpdInfo {
            live: self.config.live,
            availability_start_time: self.config.live.then(|| self.shifted_availability_start_time()),
            publish_time: self.utc_clock.now_rfc3339(),
            min_buffer_time_180k: self
                .config
                .min_buffer_time_in_180k
                .unwrap_or(self.config.seg_duration_in_180k),
            min_update_period_180k: self
                .config
                .min_update_period_in_180k
                .or(Some(self.config.seg_duration_in_180k)),
            media_presentation_duration_180k: (!self.config.live).then_some(self.total_duration_180k),
            periods,
        }
    }

    /// spec §4.2 "added to availabilityStartTime": shifts the clock's
    /// current instant by `initial_offset_in_180k` ticks, so a live session
    /// can pin its timeline to a point other than "now".
    fn shifted_availability_start_time(&self) -> String {
        let now = self.utc_clock.now_rfc3339();
        if self.config.initial_offset_in_180k == 0 {
            return now;
        }
        let Ok(parsed) = time::OffsetDateTime::parse(&now, &Rfc3339) else {
            return now;
        };
        let offset_seconds =
            self.config.initial_offset_in_180k as f64 / media_types::CLOCK_RATE as f64;
        let shifted = parsed + time::Duration::seconds_f64(offset_seconds);
        shifted.format(&Rfc3339).unwrap_or(now)
    }
}

impl Filter for Dasher {
    fn name(&self) -> &str {
        "Dasher"
    }

    fn inputs(&self) -> &[Arc<Input>] {
        &self.inputs
    }

    fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    fn process(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        if !self.validated {
            self.config
                .validate(self.inputs.len())
                .map_err(|e| self.contract_error(e.to_string()))?;
            self.validated = true;
        }

        loop {
            let mut progressed = false;
            for repr_idx in 0..self.inputs.len() {
                if self.qualities[repr_idx].complete {
                    continue;
                }
                match self.inputs[repr_idx].try_pop() {
                    Some(frame) => {
                        progressed = true;
                        self.handle_frame(repr_idx, frame, host)?;
                    }
                    None => {
                        if !self.inputs[repr_idx].is_connected() {
                            self.qualities[repr_idx].complete = true;
                            progressed = true;
                        }
                    }
                }
            }
            if !progressed {
                break;
            }
        }
        Ok(())
    }

    fn flush(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        if !self.config.live && !self.manifest_posted_since_last_flush_check {
            self.post_manifest(host)?;
            self.manifest_posted_since_last_flush_check = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::Resolution;

    struct TestHost;
    impl FilterHost for TestHost {
        fn log(&self, _level: LogLevel, _message: &str) {}
        fn activate(&self, _active: bool) {}
        fn is_active(&self) -> bool {
            true
        }
    }

    fn test_clock() -> Arc<dyn UtcClock> {
        Arc::new(crate::clock::FixedUtcClock {
            rfc3339: "2026-01-01T00:00:00Z".to_string(),
            folder_stamp: "20260101".to_string(),
        })
    }

    fn segment_frame(duration_180k: u64, eos: bool, size: usize) -> Frame {
        let meta = FileMetadata {
            duration_in_180k: duration_180k,
            eos,
            starts_with_rap: true,
            size: size as i64,
            resolution: Some(Resolution::new(1280, 720)),
            ..FileMetadata::new(StreamKind::Segment, String::new())
        };
        Frame::new(vec![0u8; size], Arc::new(Metadata::File(meta)))
    }

    fn init_frame() -> Frame {
        let meta = FileMetadata::new(StreamKind::Segment, String::new());
        Frame::new(vec![0u8; 16], Arc::new(Metadata::File(meta)))
    }

    #[test]
    fn single_representation_live_emits_segment_per_boundary() {
        let config = DasherConfig {
            live: true,
            seg_duration_in_180k: 3 * media_types::CLOCK_RATE,
            ..Default::default()
        };
        let mut dasher = Dasher::new(config, 1, test_clock());
        dasher.outputs[SEGMENT_OUTPUT].connect(Input::new(64));
        dasher.outputs[MANIFEST_OUTPUT].connect(Input::new(64));
        let host = TestHost;

        dasher.inputs[0].connect();
        dasher.inputs[0].push(init_frame()).unwrap();
        dasher.process(&host).unwrap();

        for _ in 0..5 {
            dasher
                .inputs[0]
                .push(segment_frame(3 * media_types::CLOCK_RATE, true, 1000))
                .unwrap();
            dasher.process(&host).unwrap();
        }

        assert_eq!(dasher.qualities[0].segment_index, 5);
        assert_eq!(dasher.total_duration_180k, 15 * media_types::CLOCK_RATE);
    }

    /// spec §8 scenario 2: one representation, timeshift depth = 3 segments,
    /// 40 pushed segments -> 40 "add" artifacts and 37 "delete" artifacts.
    #[test]
    fn timeshift_gc_matches_forty_segment_scenario() {
        let config = DasherConfig {
            live: true,
            seg_duration_in_180k: 3 * media_types::CLOCK_RATE,
            time_shift_buffer_depth_in_180k: Some(9 * media_types::CLOCK_RATE),
            ..Default::default()
        };
        let mut dasher = Dasher::new(config, 1, test_clock());
        let segment_sink = Input::new(256);
        dasher.outputs[SEGMENT_OUTPUT].connect(segment_sink.clone());
        dasher.outputs[MANIFEST_OUTPUT].connect(Input::new(256));
        let host = TestHost;
        dasher.inputs[0].connect();

        for _ in 0..40 {
            dasher
                .inputs[0]
                .push(segment_frame(3 * media_types::CLOCK_RATE, true, 100))
                .unwrap();
            dasher.process(&host).unwrap();
        }

        let mut add_count = 0;
        let mut delete_count = 0;
        while let Some(frame) = segment_sink.try_pop() {
            match frame.metadata() {
                Some(Metadata::File(m)) if m.is_delete() => delete_count += 1,
                _ => add_count += 1,
            }
        }
        assert_eq!(add_count, 40);
        assert_eq!(delete_count, 37);
    }

    #[test]
    fn flush_is_idempotent_in_vod_mode() {
        let config = DasherConfig {
            live: false,
            seg_duration_in_180k: 3 * media_types::CLOCK_RATE,
            ..Default::default()
        };
        let mut dasher = Dasher::new(config, 1, test_clock());
        dasher.outputs[SEGMENT_OUTPUT].connect(Input::new(8));
        dasher.outputs[MANIFEST_OUTPUT].connect(Input::new(8));
        let host = TestHost;
        dasher.flush(&host).unwrap();
        dasher.flush(&host).unwrap();
    }

    #[test]
    fn hls_manifest_format_emits_m3u8_playlists_instead_of_mpd() {
        let config = DasherConfig {
            live: false,
            seg_duration_in_180k: 3 * media_types::CLOCK_RATE,
            manifest_format: ManifestFormat::Hls,
            ..Default::default()
        };
        let mut dasher = Dasher::new(config, 1, test_clock());
        dasher.outputs[SEGMENT_OUTPUT].connect(Input::new(64));
        let manifest_sink = Input::new(64);
        dasher.outputs[MANIFEST_OUTPUT].connect(manifest_sink.clone());
        let host = TestHost;
        dasher.inputs[0].connect();

        dasher.inputs[0].push(init_frame()).unwrap();
        dasher.process(&host).unwrap();
        for _ in 0..2 {
            dasher
                .inputs[0]
                .push(segment_frame(3 * media_types::CLOCK_RATE, true, 1000))
                .unwrap();
            dasher.process(&host).unwrap();
        }
        dasher.flush(&host).unwrap();

        let mut playlists = Vec::new();
        while let Some(frame) = manifest_sink.try_pop() {
            if let Some(Metadata::File(m)) = frame.metadata() {
                playlists.push((m.filename.clone(), String::from_utf8(frame.data().to_vec()).unwrap()));
            }
        }
        assert!(playlists.iter().any(|(name, _)| name == "master.m3u8"));
        let (_, media) = playlists
            .iter()
            .find(|(name, _)| name.ends_with("playlist.m3u8") && name != "master.m3u8")
            .expect("one media playlist per representation");
        assert!(media.contains("#EXT-X-MAP"));
        assert!(media.contains("#EXT-X-ENDLIST"));
    }

    #[test]
    fn presignal_next_segment_emits_zero_length_artifact_at_boundary() {
        let config = DasherConfig {
            live: true,
            seg_duration_in_180k: 3 * media_types::CLOCK_RATE,
            presignal_next_segment: true,
            ..Default::default()
        };
        let mut dasher = Dasher::new(config, 1, test_clock());
        let segment_sink = Input::new(64);
        dasher.outputs[SEGMENT_OUTPUT].connect(segment_sink.clone());
        dasher.outputs[MANIFEST_OUTPUT].connect(Input::new(64));
        let host = TestHost;
        dasher.inputs[0].connect();

        dasher
            .inputs[0]
            .push(segment_frame(3 * media_types::CLOCK_RATE, true, 1000))
            .unwrap();
        dasher.process(&host).unwrap();

        let mut saw_presignal = false;
        while let Some(frame) = segment_sink.try_pop() {
            if let Some(Metadata::File(m)) = frame.metadata() {
                if m.duration_in_180k == 0 && m.size == 0 && !m.is_delete() {
                    saw_presignal = true;
                    assert!(m.filename.contains("-1.m4s"));
                }
            }
        }
        assert!(saw_presignal, "expected a zero-length presignal artifact");
    }

    #[test]
    fn initial_offset_shifts_availability_start_time() {
        let config = DasherConfig {
            live: true,
            seg_duration_in_180k: 3 * media_types::CLOCK_RATE,
            initial_offset_in_180k: -(media_types::CLOCK_RATE as i64) * 3600,
            ..Default::default()
        };
        let dasher = Dasher::new(config, 1, test_clock());
        let shifted = dasher.shifted_availability_start_time();
        assert_eq!(shifted, "2025-12-31T23:00:00Z");
    }
}
