//! `mediarun`: plugin registry, pipeline wiring, and CLI for the media
//! pipeline runtime (spec §6, §9).

mod cli;
mod config;
mod logging;
mod registry;
mod segment_source;
mod ts_file_source;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use cli::CliArgs;
use config::{DasherDemoConfig, DemuxStageConfig, RuntimeConfig, SinkConfig};
use dasher::SystemUtcClock;
use filters_io::{FileSink, HttpSink, HttpSinkConfig, NullSink};
use pipeline_graph::{Filter, FilterRegistry, OutputPin, InputPin, Pipeline};
use registry::{DasherFactoryConfig, FileSinkFactoryConfig, TimeRectifierFactoryConfig};
use time_rectifier::{FrameRate, SystemClock, TokioScheduler};
use ts_file_source::TsFileSource;

/// Audio frames generated by an unknown front-end declare a fixed sample
/// count per raw frame (AAC's common 1024-sample frame); see DESIGN.md for
/// why `RuntimeConfig` doesn't expose this per-track instead.
const DEFAULT_AUDIO_SAMPLES_PER_FRAME: u32 = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    logging::init(args.verbose);

    info!("mediarun starting");

    let config = RuntimeConfig::load(&args.config)?;
    let registry = registry::build_registry().context("building filter registry")?;

    let mut pipeline = Pipeline::new(config.policy.clone().into());
    let token = pipeline.cancellation_token();

    if let Some(demux) = &config.demux {
        wire_demux_stage(&mut pipeline, &registry, demux, token.clone())?;
    }
    if let Some(demo) = &config.dasher_demo {
        wire_dasher_demo_stage(&mut pipeline, &registry, demo, token.clone())?;
    }

    pipeline.start();
    let result = pipeline.wait_for_end_of_stream().await;
    pipeline.join().await?;
    result.context("pipeline run failed")?;

    info!("mediarun finished");
    Ok(())
}

fn wire_demux_stage(
    pipeline: &mut Pipeline,
    registry: &FilterRegistry,
    demux: &DemuxStageConfig,
    token: pipeline_graph::CancellationToken,
) -> Result<()> {
    let ts_demux_config = demux.to_ts_demux_config();
    let demuxer = registry
        .build("TS_DEMUX", &ts_demux_config)
        .context("building TS demuxer")?;
    let demuxer_id = pipeline.add("TsDemuxer", demuxer);

    let source = TsFileSource::open(&demux.input_ts_file, token)
        .with_context(|| format!("opening {}", demux.input_ts_file.display()))?;
    let source_id = pipeline.add("TsFileSource", Box::new(source) as Box<dyn Filter>);
    pipeline.connect(
        OutputPin { filter: source_id, index: 0 },
        InputPin { filter: demuxer_id, index: 0 },
        false,
    )?;

    let num_tracks = demux.tracks.len();

    let rectifier_id = match &demux.rectifier {
        Some(rect) => {
            let samples_per_frame = demux
                .tracks
                .iter()
                .map(|t| match t.kind {
                    config::TrackKind::Audio => Some(DEFAULT_AUDIO_SAMPLES_PER_FRAME),
                    _ => None,
                })
                .collect();
            let clock = Arc::new(SystemClock::new());
            let scheduler = Arc::new(TokioScheduler::new(clock.clone()));
            let bundle = TimeRectifierFactoryConfig {
                frame_rate: FrameRate::new(rect.frame_rate_num, rect.frame_rate_den),
                analyze_window_180k: rect.analyze_window_ms * media_types::CLOCK_RATE / 1000,
                samples_per_frame,
                clock,
                scheduler,
            };
            let rectifier = registry
                .build("TIME_RECTIFIER", &bundle)
                .context("building TimeRectifier")?;
            let rectifier_id = pipeline.add("TimeRectifier", rectifier);
            for i in 0..num_tracks {
                pipeline.connect(
                    OutputPin { filter: demuxer_id, index: i },
                    InputPin { filter: rectifier_id, index: i },
                    false,
                )?;
            }
            Some(rectifier_id)
        }
        None => None,
    };

    for i in 0..num_tracks {
        let sink = NullSink::new();
        let sink_id = pipeline.add(format!("NullSink[{i}]"), Box::new(sink));
        let upstream = rectifier_id.unwrap_or(demuxer_id);
        pipeline.connect(
            OutputPin { filter: upstream, index: i },
            InputPin { filter: sink_id, index: 0 },
            false,
        )?;
    }

    Ok(())
}

fn wire_dasher_demo_stage(
    pipeline: &mut Pipeline,
    registry: &FilterRegistry,
    demo: &DasherDemoConfig,
    token: pipeline_graph::CancellationToken,
) -> Result<()> {
    let dasher_config = demo.dasher.to_dasher_config();
    let num_inputs = demo.representations.len();
    let bundle = DasherFactoryConfig {
        config: dasher_config.clone(),
        num_inputs,
        utc_clock: Arc::new(SystemUtcClock),
    };
    let dasher = registry.build("MPEG_DASH", &bundle).context("building Dasher")?;
    let dasher_id = pipeline.add("Dasher", dasher);

    for (i, repr) in demo.representations.iter().enumerate() {
        let source = segment_source::SegmentGenerator::new(
            repr.kind.raw_kind(),
            repr.codec_name.clone(),
            repr.resolution.map(Into::into),
            repr.sample_rate,
            dasher_config.seg_duration_in_180k,
            repr.segment_bytes,
            repr.segment_count,
            token.clone(),
        );
        let source_id = pipeline.add(format!("SegmentGenerator[{i}]"), Box::new(source));
        pipeline.connect(
            OutputPin { filter: source_id, index: 0 },
            InputPin { filter: dasher_id, index: i },
            false,
        )?;
    }

    let segment_sink_id = pipeline.add(
        "SegmentSink",
        build_sink(&demo.segment_sink, &demo.output_dir)?,
    );
    pipeline.connect(
        OutputPin { filter: dasher_id, index: dasher::SEGMENT_OUTPUT },
        InputPin { filter: segment_sink_id, index: 0 },
        false,
    )?;

    let manifest_sink_id = pipeline.add(
        "ManifestSink",
        build_sink(&demo.manifest_sink, &demo.output_dir)?,
    );
    pipeline.connect(
        OutputPin { filter: dasher_id, index: dasher::MANIFEST_OUTPUT },
        InputPin { filter: manifest_sink_id, index: 0 },
        false,
    )?;

    Ok(())
}

fn build_sink(kind: &SinkConfig, output_dir: &Path) -> Result<Box<dyn Filter>> {
    Ok(match kind {
        SinkConfig::Null => Box::new(NullSink::new()),
        SinkConfig::File => {
            let bundle = FileSinkFactoryConfig {
                output_dir: output_dir.to_path_buf(),
                segments_not_owned: false,
            };
            Box::new(FileSink::new(bundle.output_dir).with_segments_not_owned(bundle.segments_not_owned))
        }
        SinkConfig::Http { endpoint } => {
            let config = HttpSinkConfig::new(endpoint.clone())?;
            Box::new(HttpSink::new(config))
        }
    })
}
