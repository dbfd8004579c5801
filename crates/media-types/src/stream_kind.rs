/// The closed set of stream kinds a [`Metadata`](../frame/struct.Metadata.html)
/// or pin may carry.
///
/// Mirrors the `StreamType` enum of the original Signals framework
/// (`lib_modules/core/metadata.hpp`): compressed and raw audio/video are
/// distinct kinds so that a pin connection between, say, a raw decoder
/// output and a muxer's compressed input is rejected rather than silently
/// misinterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    AudioRaw,
    VideoRaw,
    SubtitleRaw,
    AudioPkt,
    VideoPkt,
    SubtitlePkt,
    Playlist,
    Segment,
}

impl StreamKind {
    pub fn is_video(self) -> bool {
        matches!(self, StreamKind::VideoRaw | StreamKind::VideoPkt)
    }

    pub fn is_audio(self) -> bool {
        matches!(self, StreamKind::AudioRaw | StreamKind::AudioPkt)
    }

    pub fn is_subtitle(self) -> bool {
        matches!(self, StreamKind::SubtitleRaw | StreamKind::SubtitlePkt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(StreamKind::VideoPkt.is_video());
        assert!(StreamKind::AudioRaw.is_audio());
        assert!(StreamKind::SubtitlePkt.is_subtitle());
        assert!(!StreamKind::Playlist.is_video());
    }
}
