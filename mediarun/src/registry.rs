use std::sync::Arc;

use dasher::{Dasher, DasherConfig, UtcClock};
use filters_io::{FileSink, HttpSink, HttpSinkConfig, NullSink, SourceGenerator, SourceGeneratorConfig};
use pipeline_graph::{Filter, FilterRegistry, GraphError};
use time_rectifier::{Clock, FrameRate, Scheduler, TimeRectifier};
use ts_demux::{TsDemuxConfig, TsDemuxer};

/// Config bundle for the `"MPEG_DASH"` factory: `Dasher::new` needs the
/// representation count and an injected clock alongside its `DasherConfig`,
/// neither of which fit through a bare `DasherConfig` downcast.
pub struct DasherFactoryConfig {
    pub config: DasherConfig,
    pub num_inputs: usize,
    pub utc_clock: Arc<dyn UtcClock>,
}

/// Config bundle for the `"TIME_RECTIFIER"` factory, mirroring
/// `TimeRectifier::new`'s signature.
pub struct TimeRectifierFactoryConfig {
    pub frame_rate: FrameRate,
    pub analyze_window_180k: u64,
    pub samples_per_frame: Vec<Option<u32>>,
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<dyn Scheduler>,
}

/// Config bundle for the `"FILE_SINK"` factory.
pub struct FileSinkFactoryConfig {
    pub output_dir: std::path::PathBuf,
    pub segments_not_owned: bool,
}

/// Builds the `FilterRegistry` `mediarun` registers at startup (spec §6:
/// "`mediarun`'s `main` registers `"TS_DEMUX"`, `"MPEG_DASH"`,
/// `"TIME_RECTIFIER"`, `"FILE_SINK"`, `"NULL_SINK"`, `"HTTP_SINK"`,
/// `"SOURCE_GEN"`").
pub fn build_registry() -> Result<FilterRegistry, GraphError> {
    let mut registry = FilterRegistry::new();

    registry.register(
        "TS_DEMUX",
        Box::new(|config| {
            let config = downcast::<TsDemuxConfig>(config, "TS_DEMUX")?;
            Ok(Box::new(TsDemuxer::new(config.clone())) as Box<dyn Filter>)
        }),
    )?;

    registry.register(
        "MPEG_DASH",
        Box::new(|config| {
            let bundle = downcast::<DasherFactoryConfig>(config, "MPEG_DASH")?;
            Ok(Box::new(Dasher::new(
                bundle.config.clone(),
                bundle.num_inputs,
                bundle.utc_clock.clone(),
            )) as Box<dyn Filter>)
        }),
    )?;

    registry.register(
        "TIME_RECTIFIER",
        Box::new(|config| {
            let bundle = downcast::<TimeRectifierFactoryConfig>(config, "TIME_RECTIFIER")?;
            Ok(Box::new(TimeRectifier::new(
                bundle.frame_rate,
                bundle.analyze_window_180k,
                bundle.samples_per_frame.clone(),
                bundle.clock.clone(),
                bundle.scheduler.clone(),
            )) as Box<dyn Filter>)
        }),
    )?;

    registry.register(
        "FILE_SINK",
        Box::new(|config| {
            let bundle = downcast::<FileSinkFactoryConfig>(config, "FILE_SINK")?;
            let sink = FileSink::new(bundle.output_dir.clone())
                .with_segments_not_owned(bundle.segments_not_owned);
            Ok(Box::new(sink) as Box<dyn Filter>)
        }),
    )?;

    registry.register(
        "NULL_SINK",
        Box::new(|_config| Ok(Box::new(NullSink::new()) as Box<dyn Filter>)),
    )?;

    registry.register(
        "HTTP_SINK",
        Box::new(|config| {
            let config = downcast::<HttpSinkConfig>(config, "HTTP_SINK")?;
            Ok(Box::new(HttpSink::new(config.clone())) as Box<dyn Filter>)
        }),
    )?;

    registry.register(
        "SOURCE_GEN",
        Box::new(|config| {
            let config = downcast::<SourceGeneratorConfig>(config, "SOURCE_GEN")?;
            Ok(Box::new(SourceGenerator::new(config.clone())) as Box<dyn Filter>)
        }),
    )?;

    Ok(registry)
}

fn downcast<'a, T: 'static>(
    config: &'a dyn std::any::Any,
    name: &'static str,
) -> Result<&'a T, GraphError> {
    config
        .downcast_ref::<T>()
        .ok_or_else(|| GraphError::UnknownFilter(format!("{name}: config type mismatch")))
}
