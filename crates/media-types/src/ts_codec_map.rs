use crate::StreamKind;

/// Codec identification resolved from an MPEG-TS PMT stream_type (and, for
/// the AC-3/E-AC-3-over-0x06 cases, a registration/AC-3 descriptor tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecInfo {
    pub codec_name: &'static str,
    pub kind: StreamKind,
}

/// Resolve the internal codec name for a PMT `stream_type`, following the
/// authoritative subset table of spec §6.
///
/// `descriptor_tag` disambiguates `stream_type == 0x06` (private/PES
/// packets with descriptors), where an AC-3 registration descriptor (tag
/// `0x6A`) or enhanced AC-3 descriptor (tag `0x7A`) determines the codec.
/// Pass `None` when no such descriptor is present on the ES.
pub fn stream_type_to_codec(stream_type: u8, descriptor_tag: Option<u8>) -> Option<CodecInfo> {
    use StreamKind::*;
    let info = match stream_type {
        0x01 | 0x02 => CodecInfo {
            codec_name: "mpeg2video",
            kind: VideoPkt,
        },
        0x03 => CodecInfo {
            codec_name: "mp1",
            kind: AudioPkt,
        },
        0x04 => CodecInfo {
            codec_name: "mp2",
            kind: AudioPkt,
        },
        0x0F => CodecInfo {
            codec_name: "aac_adts",
            kind: AudioPkt,
        },
        0x11 => CodecInfo {
            codec_name: "aac_latm",
            kind: AudioPkt,
        },
        0x1B => CodecInfo {
            codec_name: "h264_annexb",
            kind: VideoPkt,
        },
        0x24 => CodecInfo {
            codec_name: "hevc_annexb",
            kind: VideoPkt,
        },
        0x81 => CodecInfo {
            codec_name: "ac3",
            kind: AudioPkt,
        },
        0x84 => CodecInfo {
            codec_name: "eac3",
            kind: AudioPkt,
        },
        0x06 => match descriptor_tag {
            Some(0x6A) => CodecInfo {
                codec_name: "ac3",
                kind: AudioPkt,
            },
            Some(0x7A) => CodecInfo {
                codec_name: "eac3",
                kind: AudioPkt,
            },
            _ => return None,
        },
        _ => return None,
    };
    Some(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn h264_annexb_is_video() {
        let info = stream_type_to_codec(0x1B, None).unwrap();
        assert_eq!(info.codec_name, "h264_annexb");
        assert_eq!(info.kind, StreamKind::VideoPkt);
    }

    #[test]
    fn private_stream_needs_descriptor() {
        assert!(stream_type_to_codec(0x06, None).is_none());
        assert_eq!(
            stream_type_to_codec(0x06, Some(0x6A)).unwrap().codec_name,
            "ac3"
        );
        assert_eq!(
            stream_type_to_codec(0x06, Some(0x7A)).unwrap().codec_name,
            "eac3"
        );
    }

    #[test]
    fn unknown_stream_type_is_none() {
        assert!(stream_type_to_codec(0xFE, None).is_none());
    }
}
