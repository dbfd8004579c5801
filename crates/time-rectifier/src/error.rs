use thiserror::Error;

/// Configuration/contract errors raised by [`crate::TimeRectifier`] (spec
/// §4.3 "Failure semantics").
#[derive(Debug, Error)]
pub enum TimeRectifierError {
    #[error("TimeRectifier requires at least one video input, none was found")]
    NoVideoInput,
    #[error("unhandled stream kind on input {index}: {kind:?}")]
    UnhandledStreamKind {
        index: usize,
        kind: media_types::StreamKind,
    },
}
