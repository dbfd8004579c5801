//! HLS manifest variant, additive to the MPD output (spec §4.2 "HLS manifest
//! variant"; spec §6 "Manifest artifact format").
//!
//! Built with `m3u8-rs` rather than hand-rolled string formatting, the way
//! the teacher's own `hls`/`hls-fix` crates depend on it for HLS playlist
//! handling.
//!
//! `MediaSegment::map`/`program_date_time` and `m3u8_rs::Map`/the
//! re-exported `m3u8_rs::chrono` are used per `m3u8-rs`'s public surface as
//! best understood without crate source on hand; see DESIGN.md.

use m3u8_rs::{MasterPlaylist, MediaPlaylist, MediaPlaylistType, MediaSegment, VariantStream};
use media_types::StreamKind;

use crate::mpd::RepresentationInfo;

/// One representation's media playlist, paired with the bandwidth/codec info
/// that belongs in the master playlist's `#EXT-X-STREAM-INF` line.
#[derive(Debug, Clone)]
pub struct HlsRepresentation {
    pub repr: RepresentationInfo,
    /// Segment (filename, duration-in-seconds) pairs emitted so far, oldest first.
    pub segments: Vec<(String, f32)>,
    pub vod: bool,
    /// URI of this representation's init segment, if one was posted
    /// (spec §6: media playlists carry `#EXT-X-MAP` for fragmented-MP4 segments).
    pub init_uri: Option<String>,
    /// RFC3339 timestamp of the first segment in this playlist, in live mode
    /// (spec §6: `#EXT-X-PROGRAM-DATE-TIME`).
    pub first_segment_program_date_time: Option<String>,
}

fn media_playlist(repr: &HlsRepresentation, target_duration: f32) -> MediaPlaylist {
    let map = repr.init_uri.as_ref().map(|uri| m3u8_rs::Map {
        uri: uri.clone(),
        byte_range: None,
    });
    let program_date_time = repr
        .first_segment_program_date_time
        .as_ref()
        .and_then(|ts| m3u8_rs::chrono::DateTime::parse_from_rfc3339(ts).ok());

    let segments = repr
        .segments
        .iter()
        .enumerate()
        .map(|(idx, (filename, duration))| MediaSegment {
            uri: filename.clone(),
            duration: *duration,
            map: if idx == 0 { map.clone() } else { None },
            program_date_time: if idx == 0 { program_date_time } else { None },
            ..Default::default()
        })
        .collect();

    MediaPlaylist {
        version: Some(6),
        target_duration,
        media_sequence: 0,
        discontinuity_sequence: 0,
        end_list: repr.vod,
        playlist_type: if repr.vod {
            Some(MediaPlaylistType::Vod)
        } else {
            Some(MediaPlaylistType::Event)
        },
        segments,
        ..Default::default()
    }
}

fn codec_string(representations: &[HlsRepresentation]) -> String {
    representations
        .iter()
        .map(|r| r.repr.codec_name.clone())
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the master playlist naming one variant per video representation
/// (spec §6: "master playlists with `#EXT-X-STREAM-INF`").
pub fn build_master_playlist(
    video_reprs: &[HlsRepresentation],
    audio_reprs: &[HlsRepresentation],
    playlist_path: impl Fn(&str) -> String,
) -> MasterPlaylist {
    let variants = video_reprs
        .iter()
        .map(|r| VariantStream {
            uri: playlist_path(&r.repr.id),
            bandwidth: r.repr.bandwidth_bps,
            codecs: Some(codec_string(std::slice::from_ref(r))),
            resolution: r.repr.resolution.map(|res| m3u8_rs::Resolution {
                width: res.width as u64,
                height: res.height as u64,
            }),
            audio: if audio_reprs.is_empty() {
                None
            } else {
                Some("audio".to_string())
            },
            ..Default::default()
        })
        .collect();

    let alternatives = audio_reprs
        .iter()
        .map(|r| m3u8_rs::AlternativeMedia {
            media_type: m3u8_rs::AlternativeMediaType::Audio,
            uri: Some(playlist_path(&r.repr.id)),
            group_id: "audio".to_string(),
            language: r.repr.language.clone(),
            name: r.repr.id.clone(),
            autoselect: true,
            ..Default::default()
        })
        .collect();

    MasterPlaylist {
        version: Some(6),
        variants,
        alternatives,
        independent_segments: true,
        ..Default::default()
    }
}

/// Serialize a media playlist for one representation to the `#EXTM3U` text
/// format (spec §6: "media playlists with `#EXTINF`, optional `#EXT-X-MAP`,
/// `#EXT-X-PROGRAM-DATE-TIME`, and terminating `#EXT-X-ENDLIST` for VOD").
pub fn render_media_playlist(repr: &HlsRepresentation, target_duration: f32) -> String {
    let playlist = media_playlist(repr, target_duration);
    let mut buffer = Vec::new();
    playlist
        .write_to(&mut buffer)
        .expect("writing to an in-memory Vec<u8> cannot fail");
    String::from_utf8(buffer).expect("m3u8-rs always emits UTF-8")
}

pub fn render_master_playlist(master: &MasterPlaylist) -> String {
    let mut buffer = Vec::new();
    master
        .write_to(&mut buffer)
        .expect("writing to an in-memory Vec<u8> cannot fail");
    String::from_utf8(buffer).expect("m3u8-rs always emits UTF-8")
}

pub fn is_video(kind: StreamKind) -> bool {
    kind.is_video()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpd::SegmentTiming;

    fn sample_repr() -> HlsRepresentation {
        HlsRepresentation {
            repr: RepresentationInfo {
                id: "v_0".into(),
                kind: StreamKind::VideoPkt,
                bandwidth_bps: 500_000,
                mime_type: "video/mp4".into(),
                codec_name: "avc1.640028".into(),
                start_with_sap: true,
                resolution: None,
                sample_rate: None,
                language: None,
                tile: None,
                init_pattern: "v_0/v_0-init.mp4".into(),
                media_pattern: "v_0/v_0-$Number$.m4s".into(),
                timing: SegmentTiming::Template {
                    duration_180k: 3 * media_types::CLOCK_RATE,
                    start_number: 1,
                },
            },
            segments: vec![("v_0-1.m4s".into(), 3.0), ("v_0-2.m4s".into(), 3.0)],
            vod: true,
            init_uri: Some("v_0/v_0-init.mp4".into()),
            first_segment_program_date_time: None,
        }
    }

    #[test]
    fn media_playlist_contains_segments_and_endlist() {
        let rendered = render_media_playlist(&sample_repr(), 3.0);
        assert!(rendered.contains("#EXTM3U"));
        assert!(rendered.contains("v_0-1.m4s"));
        assert!(rendered.contains("v_0-2.m4s"));
        assert!(rendered.contains("#EXT-X-ENDLIST"));
    }

    #[test]
    fn media_playlist_carries_map_and_program_date_time_on_first_segment_only() {
        let mut repr = sample_repr();
        repr.vod = false;
        repr.first_segment_program_date_time = Some("2026-01-01T00:00:00Z".to_string());
        let rendered = render_media_playlist(&repr, 3.0);
        assert_eq!(rendered.matches("#EXT-X-MAP").count(), 1);
        assert_eq!(rendered.matches("#EXT-X-PROGRAM-DATE-TIME").count(), 1);
        assert!(rendered.contains("v_0/v_0-init.mp4"));
    }

    #[test]
    fn master_playlist_lists_variant_bandwidth() {
        let master = build_master_playlist(&[sample_repr()], &[], |id| format!("{id}/playlist.m3u8"));
        let rendered = render_master_playlist(&master);
        assert!(rendered.contains("BANDWIDTH=500000"));
        assert!(rendered.contains("v_0/playlist.m3u8"));
    }
}
