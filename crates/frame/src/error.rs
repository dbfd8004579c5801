use thiserror::Error;

/// Resource-exhaustion errors raised by [`crate::Allocator`].
///
/// Per spec §7, allocator exhaustion normally blocks the caller rather than
/// erroring; the only error case is a pool that has been shut down.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocatorError {
    #[error("allocator was shut down")]
    ShuttingDown,
}

/// Contract-violation errors raised when ingesting [`crate::Metadata`] onto a pin.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("incompatible stream kind change: pin carries {existing:?}, frame carries {incoming:?}")]
    IncompatibleStreamKind {
        existing: media_types::StreamKind,
        incoming: media_types::StreamKind,
    },
}
