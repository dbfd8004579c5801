use std::sync::Arc;
use std::time::Duration;

use frame::{Attributes, Metadata, StreamMetadata};
use media_types::{Resolution, StreamKind, CLOCK_RATE};
use pipeline_graph::{CancellationToken, Filter, FilterError, FilterHost, Input, LogLevel, Output};

/// Synthetic source configuration: a stand-in for the ffmpeg/GPAC capture
/// front-ends spec.md's §1 treats as external collaborators (§6, §9
/// "synthetic source").
#[derive(Debug, Clone)]
pub struct SourceGeneratorConfig {
    pub kind: StreamKind,
    pub codec_name: String,
    pub resolution: Option<Resolution>,
    pub sample_rate: Option<u32>,
    /// Frame cadence, `num/den` frames per second.
    pub frame_rate: (u64, u64),
    pub frame_size_bytes: usize,
    /// `None` generates frames until the pipeline is cancelled externally;
    /// `Some(n)` stops after `n` frames and self-cancels (see
    /// `with_cancellation`).
    pub frame_count: Option<u64>,
}

impl SourceGeneratorConfig {
    pub fn video(frame_rate: (u64, u64), resolution: Resolution, frame_size_bytes: usize) -> Self {
        Self {
            kind: StreamKind::VideoRaw,
            codec_name: "raw".to_string(),
            resolution: Some(resolution),
            sample_rate: None,
            frame_rate,
            frame_size_bytes,
            frame_count: None,
        }
    }

    pub fn audio(sample_rate: u32, samples_per_frame: u64, frame_size_bytes: usize) -> Self {
        Self {
            kind: StreamKind::AudioRaw,
            codec_name: "pcm_s16le".to_string(),
            resolution: None,
            sample_rate: Some(sample_rate),
            frame_rate: (sample_rate as u64, samples_per_frame),
            frame_size_bytes,
            frame_count: None,
        }
    }

    pub fn with_frame_count(mut self, frame_count: u64) -> Self {
        self.frame_count = Some(frame_count);
        self
    }
}

/// Emits zero-filled frames at a fixed cadence (spec §6/§9 "synthetic
/// source"). Useful for exercising the TimeRectifier/Dasher without a real
/// decoder front-end.
pub struct SourceGenerator {
    output: Output,
    config: SourceGeneratorConfig,
    period: Duration,
    period_180k: i64,
    frames_emitted: u64,
    cancellation: Option<CancellationToken>,
}

impl SourceGenerator {
    pub fn new(config: SourceGeneratorConfig) -> Self {
        let (num, den) = config.frame_rate;
        let period_secs = den as f64 / num.max(1) as f64;
        Self {
            output: Output::new(16),
            period: Duration::from_secs_f64(period_secs.max(0.0)),
            period_180k: (den * CLOCK_RATE / num.max(1)) as i64,
            config,
            frames_emitted: 0,
            cancellation: None,
        }
    }

    /// When set, the generator cancels the pipeline itself once
    /// `frame_count` frames have been emitted, cascading the normal
    /// EOS/flush path instead of running forever.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn exhausted(&self) -> bool {
        matches!(self.config.frame_count, Some(n) if self.frames_emitted >= n)
    }
}

impl Filter for SourceGenerator {
    fn name(&self) -> &str {
        "SourceGenerator"
    }

    fn inputs(&self) -> &[Arc<Input>] {
        &[]
    }

    fn outputs(&self) -> &[Output] {
        std::slice::from_ref(&self.output)
    }

    fn process(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        if self.exhausted() {
            if let Some(token) = &self.cancellation {
                token.cancel();
            }
            std::thread::sleep(Duration::from_millis(5));
            return Ok(());
        }

        let frame = self.output.alloc_data(self.config.frame_size_bytes)?;
        let mut metadata = StreamMetadata::new(self.config.kind, self.config.codec_name.clone());
        metadata.resolution = self.config.resolution;
        metadata.sample_rate = self.config.sample_rate;
        let presentation_time = self.frames_emitted as i64 * self.period_180k;
        let frame = frame
            .with_metadata(Arc::new(Metadata::Stream(metadata)))
            .with_attributes(Attributes::default().with_presentation_time(presentation_time));

        self.frames_emitted += 1;
        if let Err(err) = self.output.post(frame) {
            host.log(LogLevel::Warning, &format!("post failed: {err}"));
        }
        std::thread::sleep(self.period);
        Ok(())
    }

    fn flush(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        host.log(
            LogLevel::Debug,
            &format!("generated {} frames total", self.frames_emitted),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestHost;
    impl FilterHost for TestHost {
        fn log(&self, _level: LogLevel, _message: &str) {}
        fn activate(&self, _active: bool) {}
        fn is_active(&self) -> bool {
            true
        }
    }

    #[test]
    fn emits_configured_frame_count_then_self_cancels() {
        let config = SourceGeneratorConfig::video((25, 1), Resolution::new(640, 480), 16)
            .with_frame_count(3);
        let token = CancellationToken::new();
        let mut generator = SourceGenerator::new(config).with_cancellation(token.clone());
        let consumer = Input::new(8);
        generator.outputs()[0].connect(consumer.clone());

        let host = TestHost;
        for _ in 0..3 {
            generator.process(&host).unwrap();
        }
        assert!(!token.is_cancelled());
        generator.process(&host).unwrap();
        assert!(token.is_cancelled());

        let mut times = Vec::new();
        while let Some(frame) = consumer.try_pop() {
            times.push(frame.attributes().presentation_time.unwrap());
        }
        assert_eq!(times, vec![0, 7_200, 14_400]);
    }
}
