//! Hand-rolled MPD (Media Presentation Description) XML assembly.
//!
//! Translated from the shape of the original Signals framework's `mpd.cpp`
//! tag tree, not its text: a `Tag` is a name, an ordered list of attributes,
//! and either child tags or a text body, rendered by a `Display` impl rather
//! than pulled in from an XML-writer crate (none of the pack's example repos
//! use one for hand-assembled documents of this size).

use std::fmt;

/// One XML element. Attribute order and child order are preserved exactly
/// as pushed, since the MPD schema is order-sensitive in several places
/// (e.g. `SegmentTimeline`'s `<S>` entries).
#[derive(Debug, Clone)]
pub struct Tag {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Tag>,
    text: Option<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn attr_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.attr(key, v),
            None => self,
        }
    }

    pub fn child(mut self, child: Tag) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Tag>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(f, "{indent}<{}", self.name)?;
        for (key, value) in &self.attrs {
            write!(f, " {key}=\"{}\"", escape_attr(value))?;
        }
        if self.children.is_empty() && self.text.is_none() {
            return writeln!(f, "/>");
        }
        write!(f, ">")?;
        if let Some(text) = &self.text {
            write!(f, "{}", escape_text(text))?;
        } else {
            writeln!(f)?;
            for child in &self.children {
                child.write(f, depth + 1)?;
            }
            write!(f, "{indent}")?;
        }
        writeln!(f, "</{}>", self.name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        self.write(f, 0)
    }
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Render an ISO 8601 duration string from CR (180_000 Hz) units, e.g.
/// `PT3S` for an exact 3-second duration (spec §8 scenario 3).
pub fn iso8601_duration(duration_180k: u64) -> String {
    let total_millis = (duration_180k * 1000) / media_types::CLOCK_RATE;
    let whole_seconds = total_millis / 1000;
    let remainder_millis = total_millis % 1000;
    if remainder_millis == 0 {
        format!("PT{whole_seconds}S")
    } else {
        format!("PT{whole_seconds}.{remainder_millis:03}S")
    }
}

use media_types::{Resolution, StreamKind};

/// `<S t d r>` entry of a `SegmentTimeline` (spec §4.2 "Manifest construction":
/// "consecutive same-duration samples are coalesced by incrementing `r`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentTimelineEntry {
    pub t: u64,
    pub d: u64,
    pub r: u64,
}

/// Build (or extend) a `SegmentTimeline`'s `<S>` entries from a flat sequence
/// of (start, duration) pairs, coalescing consecutive equal durations.
pub fn coalesce_timeline(points: &[(u64, u64)]) -> Vec<SegmentTimelineEntry> {
    let mut entries: Vec<SegmentTimelineEntry> = Vec::new();
    for &(t, d) in points {
        if let Some(last) = entries.last_mut() {
            if last.d == d {
                last.r += 1;
                continue;
            }
        }
        entries.push(SegmentTimelineEntry { t, d, r: 0 });
    }
    entries
}

#[derive(Debug, Clone)]
pub enum SegmentTiming {
    Template {
        duration_180k: u64,
        start_number: u64,
    },
    Timeline {
        entries: Vec<SegmentTimelineEntry>,
        start_number: u64,
    },
}

#[derive(Debug, Clone)]
pub struct RepresentationInfo {
    pub id: String,
    pub kind: StreamKind,
    pub bandwidth_bps: u64,
    pub mime_type: String,
    pub codec_name: String,
    pub start_with_sap: bool,
    pub resolution: Option<Resolution>,
    pub sample_rate: Option<u32>,
    pub language: Option<String>,
    pub tile: Option<crate::config::TileInfo>,
    pub init_pattern: String,
    pub media_pattern: String,
    pub timing: SegmentTiming,
}

#[derive(Debug, Clone)]
pub struct PeriodInfo {
    pub start_180k: u64,
    pub duration_180k: Option<u64>,
    pub base_urls: Vec<String>,
    pub representations: Vec<RepresentationInfo>,
}

#[derive(Debug, Clone)]
pub struct MpdInfo {
    pub live: bool,
    pub availability_start_time: Option<String>,
    pub publish_time: String,
    pub min_buffer_time_180k: u64,
    pub min_update_period_180k: Option<u64>,
    pub media_presentation_duration_180k: Option<u64>,
    pub periods: Vec<PeriodInfo>,
}

fn mime_for_kind(kind: StreamKind) -> &'static str {
    match kind {
        StreamKind::VideoPkt | StreamKind::VideoRaw => "video/mp4",
        StreamKind::AudioPkt | StreamKind::AudioRaw => "audio/mp4",
        StreamKind::SubtitlePkt | StreamKind::SubtitleRaw => "application/mp4",
        StreamKind::Playlist | StreamKind::Segment => "application/mp4",
    }
}

/// Key that two representations must share to land in the same
/// AdaptationSet (spec §4.2: "grouped by {stream kind, language, SRD tile
/// tuple}"; spec §9: "representations sharing all seven [tile] values share
/// an AdaptationSet").
#[derive(Debug, Clone, PartialEq)]
struct AdaptationSetKey {
    kind: StreamKind,
    language: Option<String>,
    tile: Option<crate::config::TileInfo>,
}

fn segment_timing_tag(timing: &SegmentTiming, init_pattern: &str, media_pattern: &str) -> Tag {
    match timing {
        SegmentTiming::Template {
            duration_180k,
            start_number,
        } => Tag::new("SegmentTemplate")
            .attr("timescale", "1000")
            .attr(
                "duration",
                (duration_180k * 1000 / media_types::CLOCK_RATE).to_string(),
            )
            .attr("startNumber", start_number.to_string())
            .attr("initialization", init_pattern)
            .attr("media", media_pattern),
        SegmentTiming::Timeline {
            entries,
            start_number,
        } => {
            let timeline = Tag::new("SegmentTimeline").children(entries.iter().map(|e| {
                let mut tag = Tag::new("S").attr("t", e.t.to_string()).attr("d", e.d.to_string());
                if e.r > 0 {
                    tag = tag.attr("r", e.r.to_string());
                }
                tag
            }));
            Tag::new("SegmentTemplate")
                .attr("timescale", "1000")
                .attr("startNumber", start_number.to_string())
                .attr("initialization", init_pattern)
                .attr("media", media_pattern)
                .child(timeline)
        }
    }
}

fn representation_tag(repr: &RepresentationInfo) -> Tag {
    let mut tag = Tag::new("Representation")
        .attr("id", repr.id.clone())
        .attr("bandwidth", repr.bandwidth_bps.to_string())
        .attr("mimeType", repr.mime_type.clone())
        .attr("codecs", repr.codec_name.clone());
    if !repr.start_with_sap {
        tag = tag.attr("startWithSAP", "0");
    }
    if let Some(resolution) = repr.resolution {
        tag = tag
            .attr("width", resolution.width.to_string())
            .attr("height", resolution.height.to_string());
    }
    if let Some(sample_rate) = repr.sample_rate {
        tag = tag.attr("audioSamplingRate", sample_rate.to_string());
    }
    tag.child(segment_timing_tag(&repr.timing, &repr.init_pattern, &repr.media_pattern))
}

fn adaptation_set_tag(key: &AdaptationSetKey, members: &[&RepresentationInfo]) -> Tag {
    let mut tag = Tag::new("AdaptationSet")
        .attr("segmentAlignment", "true")
        .attr("bitstreamSwitching", "true")
        .attr("mimeType", mime_for_kind(key.kind));
    if let Some(language) = &key.language {
        tag = tag.attr("lang", language.clone());
    }
    if let Some(tile) = &key.tile {
        tag = tag.child(
            Tag::new("SupplementalProperty")
                .attr("schemeIdUri", "urn:mpeg:dash:srd:2014")
                .attr(
                    "value",
                    format!(
                        "{},{},{},{},{},{},{}",
                        tile.source_id, tile.x, tile.y, tile.w, tile.h, tile.total_w, tile.total_h
                    ),
                ),
        );
    }
    tag.children(members.iter().map(|r| representation_tag(r)))
}

fn period_tag(period: &PeriodInfo, period_index: usize) -> Tag {
    let mut tag = Tag::new("Period")
        .attr("id", period_index.to_string())
        .attr("start", iso8601_duration(period.start_180k));
    if let Some(duration) = period.duration_180k {
        tag = tag.attr("duration", iso8601_duration(duration));
    }
    let base_urls = if period.base_urls.is_empty() {
        vec![String::new()]
    } else {
        period.base_urls.clone()
    };
    tag = tag.children(base_urls.into_iter().map(|url| Tag::new("BaseURL").text(url)));

    let mut keys: Vec<AdaptationSetKey> = Vec::new();
    let mut groups: Vec<Vec<&RepresentationInfo>> = Vec::new();
    for repr in &period.representations {
        let key = AdaptationSetKey {
            kind: repr.kind,
            language: repr.language.clone(),
            tile: repr.tile.clone(),
        };
        if let Some(idx) = keys.iter().position(|k| *k == key) {
            groups[idx].push(repr);
        } else {
            keys.push(key);
            groups.push(vec![repr]);
        }
    }
    for (key, members) in keys.iter().zip(groups.iter()) {
        tag = tag.child(adaptation_set_tag(key, members));
    }
    tag
}

/// Assemble the full MPD document (spec §4.2 "Manifest construction").
pub fn build_mpd(info: &MpdInfo) -> Tag {
    let mut mpd = Tag::new("MPD")
        .attr("xmlns", "urn:mpeg:dash:schema:mpd:2011")
        .attr("profiles", "urn:mpeg:dash:profile:isoff-live:2011")
        .attr("type", if info.live { "dynamic" } else { "static" })
        .attr("publishTime", info.publish_time.clone())
        .attr(
            "minBufferTime",
            iso8601_duration(info.min_buffer_time_180k),
        );

    if info.live {
        if let Some(availability_start_time) = &info.availability_start_time {
            mpd = mpd.attr("availabilityStartTime", availability_start_time.clone());
        }
        if let Some(min_update_period) = info.min_update_period_180k {
            mpd = mpd.attr("minimumUpdatePeriod", iso8601_duration(min_update_period));
        }
    } else if let Some(duration) = info.media_presentation_duration_180k {
        mpd = mpd.attr("mediaPresentationDuration", iso8601_duration(duration));
    }

    for (index, period) in info.periods.iter().enumerate() {
        mpd = mpd.child(period_tag(period, index));
    }
    mpd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_self_closing_tag_with_attrs() {
        let tag = Tag::new("BaseURL").text("https://cdn.example/");
        let rendered = tag.to_string();
        assert!(rendered.contains("<BaseURL>https://cdn.example/</BaseURL>"));
    }

    #[test]
    fn renders_nested_children_in_order() {
        let tag = Tag::new("MPD")
            .attr("profiles", "urn:mpeg:dash:profile:isoff-live:2011")
            .child(Tag::new("Period").attr("start", "PT0S"));
        let rendered = tag.to_string();
        let period_pos = rendered.find("<Period").unwrap();
        let mpd_pos = rendered.find("<MPD").unwrap();
        assert!(mpd_pos < period_pos);
    }

    #[test]
    fn duration_rounds_to_exact_seconds() {
        assert_eq!(iso8601_duration(3 * media_types::CLOCK_RATE), "PT3S");
    }

    fn one_representation(kind: StreamKind) -> RepresentationInfo {
        RepresentationInfo {
            id: "v_0".into(),
            kind,
            bandwidth_bps: 500_000,
            mime_type: "video/mp4".into(),
            codec_name: "avc1.640028".into(),
            start_with_sap: true,
            resolution: Some(Resolution::new(1280, 720)),
            sample_rate: None,
            language: None,
            tile: None,
            init_pattern: "v_0/v_0-init.mp4".into(),
            media_pattern: "v_0/v_0-$Number$.m4s".into(),
            timing: SegmentTiming::Template {
                duration_180k: 3 * media_types::CLOCK_RATE,
                start_number: 1,
            },
        }
    }

    #[test]
    fn two_multi_period_windows_render_two_periods_with_expected_bounds() {
        let cr = media_types::CLOCK_RATE;
        let info = MpdInfo {
            live: false,
            availability_start_time: None,
            publish_time: "2026-01-01T00:00:00Z".into(),
            min_buffer_time_180k: cr,
            min_update_period_180k: None,
            media_presentation_duration_180k: Some(6 * cr),
            periods: vec![
                PeriodInfo {
                    start_180k: 0,
                    duration_180k: Some(3 * cr),
                    base_urls: vec![],
                    representations: vec![one_representation(StreamKind::VideoPkt)],
                },
                PeriodInfo {
                    start_180k: 3 * cr,
                    duration_180k: Some(3 * cr),
                    base_urls: vec![],
                    representations: vec![one_representation(StreamKind::VideoPkt)],
                },
            ],
        };
        let rendered = build_mpd(&info).to_string();
        assert_eq!(rendered.matches("<Period").count(), 2);
        assert!(rendered.contains(r#"start="PT0S""#));
        assert!(rendered.contains(r#"start="PT3S""#));
        assert_eq!(rendered.matches(r#"duration="PT3S""#).count(), 2);
    }
}
