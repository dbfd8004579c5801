use thiserror::Error;

/// Malformed-data errors (spec §7): every variant here is logged and the
/// offending packet/section dropped by [`crate::demuxer::TsDemuxer`] — none
/// of these propagate as a [`pipeline_graph::FilterError`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TsError {
    #[error("expected a 188-byte TS packet, got {0}")]
    InvalidPacketSize(usize),

    #[error("sync byte was 0x{0:02x}, expected 0x47")]
    InvalidSyncByte(u8),

    #[error("insufficient data: expected at least {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("PES start code prefix mismatch")]
    InvalidPesStartCode,

    #[error("reserved PTS_DTS_flags value 0b01")]
    InvalidPtsDtsFlags(u8),

    #[error("truncated PSI section header")]
    TruncatedPsiHeader,

    #[error("PSI section_length overruns the buffer")]
    InvalidSectionLength,
}
