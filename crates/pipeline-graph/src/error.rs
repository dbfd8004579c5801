use thiserror::Error;

/// Configuration-class errors (spec §7): raised at filter construction or
/// graph-build time, never seen by a running pipeline.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("no filter registered under name {0:?}")]
    UnknownFilter(String),

    #[error("filter {0:?} already registered")]
    DuplicateFilter(String),

    #[error("input index {index} out of range for filter {filter:?} ({num_inputs} inputs)")]
    InputOutOfRange {
        filter: String,
        index: usize,
        num_inputs: usize,
    },

    #[error("output index {index} out of range for filter {filter:?} ({num_outputs} outputs)")]
    OutputOutOfRange {
        filter: String,
        index: usize,
        num_outputs: usize,
    },

    #[error("input {index} of filter {filter:?} already has an incoming connection")]
    InputAlreadyConnected { filter: String, index: usize },

    #[error("filter {0:?} is still connected; disconnect before removing")]
    StillConnected(String),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Contract-violation and other propagating errors raised from within a
/// filter's `process`/`flush` (spec §7 "Contract violation"). Malformed
/// input data is handled internally by the filter (logged and dropped) and
/// never reaches this type.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("incompatible metadata on pin: {0}")]
    Metadata(#[from] frame::MetadataError),

    #[error("allocator exhausted: {0}")]
    Allocator(#[from] frame::AllocatorError),

    #[error("{filter}: {message}")]
    Contract { filter: String, message: String },

    #[error("{filter}: transient I/O error: {source}")]
    TransientIo {
        filter: String,
        #[source]
        source: std::io::Error,
    },
}

/// Error surfaced from `Pipeline::wait_for_end_of_stream` (spec §4.1 step 5:
/// "a polling loop at the waiting thread periodically rethrows").
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("filter {filter:?} raised an exception: {source}")]
    FilterException {
        filter: String,
        #[source]
        source: FilterError,
    },

    #[error("pipeline build error: {0}")]
    Build(#[from] GraphError),

    #[error("pipeline executor task panicked: {0}")]
    ExecutorPanic(String),
}
