use thiserror::Error;

/// Configuration-class errors validated at construction (spec §4.2
/// "Constraints").
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DasherConfigError {
    #[error("segment timeline mode cannot be combined with presignalNextSegment")]
    TimelineWithPresignal,

    #[error("segment timeline mode cannot be combined with segmentsNotOwned")]
    TimelineWithSegmentsNotOwned,

    #[error("timeShiftBufferDepthInMs cannot be set when multiPeriodFoldersInMs is active")]
    TimeshiftWithMultiPeriod,

    #[error("tileInfo has {tiles} entries but the Dasher has {inputs} inputs")]
    TileInfoCountMismatch { tiles: usize, inputs: usize },
}
