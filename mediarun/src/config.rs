//! `RuntimeConfig`: the on-disk description of one `mediarun` invocation,
//! loaded via `serde_json` (spec §9 "Configuration": "`mediarun` loads a
//! `RuntimeConfig` via `serde` + `serde_json`/`clap`").
//!
//! Library-crate configs (`dasher::DasherConfig`, `ts_demux::TsDemuxConfig`,
//! ...) intentionally don't derive `serde` themselves — they're the
//! low-level domain types the original Signals framework passes as opaque
//! `void*` plugin configs, not wire formats. `RuntimeConfig` is the
//! serializable DTO this binary owns, translated into those domain types at
//! startup via the `to_*_config` methods below.
//!
//! A run exercises up to two independent stages (see DESIGN.md for why they
//! aren't joined into one chain): `demux` drives a real MPEG-TS file through
//! the demuxer and, optionally, the TimeRectifier; `dasher_demo` exercises
//! the Dasher against synthetic, already-segmented representation sources,
//! since the muxer that would produce real segments from rectified packets
//! is out of scope. At least one of the two must be configured.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use dasher::{DasherConfig, ManifestFormat};
use media_types::{Resolution, StreamKind};
use pipeline_graph::ExecutorPolicy;
use ts_demux::{PidSelector, TsDemuxConfig};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

impl TrackKind {
    pub fn raw_kind(self) -> StreamKind {
        match self {
            TrackKind::Video => StreamKind::VideoPkt,
            TrackKind::Audio => StreamKind::AudioPkt,
            TrackKind::Subtitle => StreamKind::SubtitlePkt,
        }
    }
}

/// One demuxed elementary stream to route to its own output pin.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackConfig {
    pub kind: TrackKind,
    /// `Some(pid)` pins this track to a fixed PID; `None` picks the first
    /// elementary stream of `kind` the PMT advertises (spec §6
    /// `PidSelector::Any`).
    #[serde(default)]
    pub pid: Option<u16>,
}

/// Destination for one pin's worth of output frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkConfig {
    File,
    Null,
    Http { endpoint: String },
}

/// Width/height pair as it appears on the wire; `media_types::Resolution`
/// itself doesn't derive `serde` (see module doc comment).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ResolutionConfig {
    pub width: u32,
    pub height: u32,
}

impl From<ResolutionConfig> for Resolution {
    fn from(value: ResolutionConfig) -> Self {
        Resolution::new(value.width, value.height)
    }
}

/// Synchronizes `tracks` to a fixed frame rate via the TimeRectifier before
/// they reach `demux.sink` (spec §4.3).
#[derive(Debug, Clone, Deserialize)]
pub struct RectifierConfig {
    pub frame_rate_num: u64,
    pub frame_rate_den: u64,
    #[serde(default = "default_analyze_window_ms")]
    pub analyze_window_ms: u64,
}

fn default_analyze_window_ms() -> u64 {
    500
}

/// Demuxes a real MPEG-TS file and routes each configured track to `sink`,
/// optionally resynchronized through the TimeRectifier first.
#[derive(Debug, Clone, Deserialize)]
pub struct DemuxStageConfig {
    pub input_ts_file: PathBuf,
    pub tracks: Vec<TrackConfig>,
    #[serde(default)]
    pub rectifier: Option<RectifierConfig>,
    pub sink: SinkConfig,
    #[serde(default)]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DasherSettings {
    pub live: bool,
    pub segment_duration_ms: u64,
    #[serde(default)]
    pub time_shift_buffer_depth_ms: Option<u64>,
    #[serde(default)]
    pub multi_period_folders_ms: u64,
    #[serde(default)]
    pub base_url_prefixes: Vec<String>,
    #[serde(default)]
    pub segments_not_owned: bool,
    #[serde(default)]
    pub manifest_format: ManifestFormatConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestFormatConfig {
    #[default]
    Dash,
    Hls,
}

impl From<ManifestFormatConfig> for ManifestFormat {
    fn from(value: ManifestFormatConfig) -> Self {
        match value {
            ManifestFormatConfig::Dash => ManifestFormat::Dash,
            ManifestFormatConfig::Hls => ManifestFormat::Hls,
        }
    }
}

impl DasherSettings {
    pub fn to_dasher_config(&self) -> DasherConfig {
        let ms_to_180k = |ms: u64| ms * media_types::CLOCK_RATE / 1000;
        DasherConfig {
            live: self.live,
            seg_duration_in_180k: ms_to_180k(self.segment_duration_ms),
            time_shift_buffer_depth_in_180k: self.time_shift_buffer_depth_ms.map(ms_to_180k),
            multi_period_folders_in_180k: ms_to_180k(self.multi_period_folders_ms),
            base_url_prefixes: self.base_url_prefixes.clone(),
            segments_not_owned: self.segments_not_owned,
            manifest_format: self.manifest_format.clone().into(),
            ..DasherConfig::default()
        }
    }
}

/// One synthetic, already-segmented representation source feeding the
/// Dasher demo stage (see module doc comment for why this stands in for a
/// real muxer).
#[derive(Debug, Clone, Deserialize)]
pub struct RepresentationDemoConfig {
    pub kind: TrackKind,
    #[serde(default = "default_codec_name")]
    pub codec_name: String,
    #[serde(default)]
    pub resolution: Option<ResolutionConfig>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    pub segment_bytes: usize,
    pub segment_count: u64,
}

fn default_codec_name() -> String {
    "avc1.640028".to_string()
}

/// Exercises the Dasher against `representations.len()` synthetic segment
/// sources, posting its Segment/Manifest outputs to `segment_sink`/
/// `manifest_sink`.
#[derive(Debug, Clone, Deserialize)]
pub struct DasherDemoConfig {
    pub dasher: DasherSettings,
    pub representations: Vec<RepresentationDemoConfig>,
    #[serde(default)]
    pub output_dir: PathBuf,
    pub segment_sink: SinkConfig,
    pub manifest_sink: SinkConfig,
}

/// Top-level configuration for one `mediarun` invocation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub demux: Option<DemuxStageConfig>,
    #[serde(default)]
    pub dasher_demo: Option<DasherDemoConfig>,
    #[serde(default)]
    pub policy: ExecutorPolicyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorPolicyConfig {
    Mono,
    OnePerModule,
    SharedPool { max_concurrency: usize },
}

impl Default for ExecutorPolicyConfig {
    fn default() -> Self {
        ExecutorPolicyConfig::OnePerModule
    }
}

impl From<ExecutorPolicyConfig> for ExecutorPolicy {
    fn from(value: ExecutorPolicyConfig) -> Self {
        match value {
            ExecutorPolicyConfig::Mono => ExecutorPolicy::Mono,
            ExecutorPolicyConfig::OnePerModule => ExecutorPolicy::OnePerModule,
            ExecutorPolicyConfig::SharedPool { max_concurrency } => {
                ExecutorPolicy::SharedPool { max_concurrency }
            }
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: RuntimeConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.demux.is_none() && self.dasher_demo.is_none() {
            bail!("configuration must set at least one of `demux` or `dasher_demo`");
        }
        if let Some(demux) = &self.demux {
            if demux.tracks.is_empty() {
                bail!("demux.tracks must not be empty");
            }
            if demux.rectifier.is_some()
                && !demux.tracks.iter().any(|t| matches!(t.kind, TrackKind::Video))
            {
                bail!("demux.rectifier requires at least one video track");
            }
            // The demux stage only ever produces Metadata::Stream frames
            // (elementary-stream packets, never already-muxed segments), and
            // FileSink/HttpSink both reject anything but Metadata::File at
            // the first frame. Null is the only terminus that fits.
            if !matches!(demux.sink, SinkConfig::Null) {
                bail!("demux.sink must be \"null\": the demux stage never produces segment-tagged frames");
            }
        }
        if let Some(demo) = &self.dasher_demo {
            if demo.representations.is_empty() {
                bail!("dasher_demo.representations must not be empty");
            }
        }
        Ok(())
    }
}

impl DemuxStageConfig {
    pub fn to_ts_demux_config(&self) -> TsDemuxConfig {
        TsDemuxConfig {
            outputs: self
                .tracks
                .iter()
                .map(|t| match t.pid {
                    Some(pid) => PidSelector::Fixed(pid),
                    None => PidSelector::Any(t.kind.raw_kind()),
                })
                .collect(),
        }
    }
}
