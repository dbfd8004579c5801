use std::sync::Arc;

use frame::{FileMetadata, Metadata};
use media_types::{Resolution, StreamKind};
use pipeline_graph::{CancellationToken, Filter, FilterError, FilterHost, Input, LogLevel, Output};

/// Stands in for a real muxer feeding one Dasher representation input with
/// already-packaged segments (spec §4.2 expects "already-segmented,
/// already-muxed representation inputs"; producing those for real is out of
/// scope, see `mediarun::config` module doc comment).
///
/// Emits one zero-duration init segment, then `segment_count` media segments
/// each `seg_duration_in_180k` long and `eos`-marked (one Dasher segment
/// boundary per emitted frame), then self-cancels like
/// `filters_io::SourceGenerator`.
pub struct SegmentGenerator {
    output: Output,
    kind: StreamKind,
    codec_name: String,
    resolution: Option<Resolution>,
    sample_rate: Option<u32>,
    seg_duration_in_180k: u64,
    segment_bytes: usize,
    segment_count: u64,
    segments_emitted: u64,
    init_sent: bool,
    cancellation: CancellationToken,
}

#[allow(clippy::too_many_arguments)]
impl SegmentGenerator {
    pub fn new(
        kind: StreamKind,
        codec_name: String,
        resolution: Option<Resolution>,
        sample_rate: Option<u32>,
        seg_duration_in_180k: u64,
        segment_bytes: usize,
        segment_count: u64,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            output: Output::new(16),
            kind,
            codec_name,
            resolution,
            sample_rate,
            seg_duration_in_180k,
            segment_bytes,
            segment_count,
            segments_emitted: 0,
            init_sent: false,
            cancellation,
        }
    }

    fn exhausted(&self) -> bool {
        self.init_sent && self.segments_emitted >= self.segment_count
    }

    fn file_metadata(&self, filename: &str, duration_in_180k: u64, eos: bool) -> FileMetadata {
        FileMetadata {
            resolution: self.resolution,
            sample_rate: self.sample_rate,
            codec_name: self.codec_name.clone(),
            duration_in_180k,
            eos,
            starts_with_rap: true,
            size: self.segment_bytes as i64,
            ..FileMetadata::new(self.kind, filename.to_string())
        }
    }
}

impl Filter for SegmentGenerator {
    fn name(&self) -> &str {
        "SegmentGenerator"
    }

    fn inputs(&self) -> &[Arc<Input>] {
        &[]
    }

    fn outputs(&self) -> &[Output] {
        std::slice::from_ref(&self.output)
    }

    fn process(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        if self.exhausted() {
            self.cancellation.cancel();
            std::thread::sleep(std::time::Duration::from_millis(5));
            return Ok(());
        }

        if !self.init_sent {
            let frame = self.output.alloc_data(0)?;
            let meta = self.file_metadata("init", 0, false);
            let frame = frame.with_metadata(Arc::new(Metadata::File(meta)));
            self.init_sent = true;
            if let Err(err) = self.output.post(frame) {
                host.log(LogLevel::Warning, &format!("post failed: {err}"));
            }
            return Ok(());
        }

        let frame = self.output.alloc_data(self.segment_bytes)?;
        let filename = format!("chunk-{}", self.segments_emitted);
        let meta = self.file_metadata(&filename, self.seg_duration_in_180k, true);
        let frame = frame.with_metadata(Arc::new(Metadata::File(meta)));
        self.segments_emitted += 1;
        if let Err(err) = self.output.post(frame) {
            host.log(LogLevel::Warning, &format!("post failed: {err}"));
        }
        Ok(())
    }

    fn flush(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        host.log(
            LogLevel::Debug,
            &format!("generated {} segments total", self.segments_emitted),
        );
        Ok(())
    }
}
