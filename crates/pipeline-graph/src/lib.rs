//! The dataflow graph and its execution model (spec §4.1, §5).
//!
//! Grounded on `lib_pipeline/pipeline.hpp` and `lib_modules/core/module.hpp`
//! of the original Signals framework for the Filter/Pin/Pipeline contract,
//! and on `pipeline-common::ChannelPipeline` for the Tokio-based executor
//! model (`spawn_blocking`-per-stage, `tracing` spans, `thiserror` error
//! taxonomy).

mod cancellation;
mod error;
mod executor;
mod filter;
mod pin;
mod pipeline;
mod registry;

pub use cancellation::CancellationToken;
pub use error::{FilterError, GraphError, PipelineError};
pub use executor::ExecutorPolicy;
pub use filter::{Filter, FilterHost, LogLevel};
pub use pin::{Input, Output};
pub use pipeline::{FilterId, InputPin, OutputPin, Pipeline};
pub use registry::{FilterFactory, FilterRegistry};
