use crate::error::MetadataError;
use bytes::Bytes;
use media_types::{Resolution, StreamKind};

/// Immutable descriptor attached to a pin and/or a [`crate::Frame`].
///
/// Compared by structural equality for pin compatibility (spec §3). Two
/// variants exist: a plain stream descriptor (codec/packet streams) and
/// [`FileMetadata`], the segment-descriptor variant consumed by the Dasher.
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Stream(StreamMetadata),
    File(FileMetadata),
}

/// Descriptor for an audio/video/subtitle packet or raw-sample stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMetadata {
    pub kind: StreamKind,
    pub codec_name: String,
    pub resolution: Option<Resolution>,
    pub sample_rate: Option<u32>,
    pub init_bytes: Option<Bytes>,
    pub language: Option<String>,
}

impl StreamMetadata {
    pub fn new(kind: StreamKind, codec_name: impl Into<String>) -> Self {
        Self {
            kind,
            codec_name: codec_name.into(),
            resolution: None,
            sample_rate: None,
            init_bytes: None,
            language: None,
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// The segment descriptor variant (spec §3 "Segment descriptor (MetadataFile)").
///
/// Carried on every frame the Dasher's inputs produce, and on every frame the
/// Dasher itself emits on its Segment/Manifest outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub kind: StreamKind,
    pub filename: String,
    pub mime_type: String,
    /// RFC 6381 codec string, e.g. `"avc1.640028"`.
    pub codec_name: String,
    pub language: Option<String>,
    /// Duration in CR (180_000 Hz) units.
    pub duration_in_180k: u64,
    /// File size in bytes. `i64::MAX` is the DELETE sentinel (spec §6).
    pub size: i64,
    /// Encode/packaging latency in CR units.
    pub latency_in_180k: u64,
    pub starts_with_rap: bool,
    pub eos: bool,
    pub resolution: Option<Resolution>,
    pub sample_rate: Option<u32>,
}

impl FileMetadata {
    pub fn new(kind: StreamKind, filename: impl Into<String>) -> Self {
        Self {
            kind,
            filename: filename.into(),
            mime_type: String::new(),
            codec_name: String::new(),
            language: None,
            duration_in_180k: 0,
            size: 0,
            latency_in_180k: 0,
            starts_with_rap: false,
            eos: false,
            resolution: None,
            sample_rate: None,
        }
    }

    /// `true` when this descriptor's `size` is the DELETE sentinel.
    pub fn is_delete(&self) -> bool {
        self.size == i64::MAX
    }
}

/// Result of attempting to ingest a new [`Metadata`] value onto a pin that
/// may already carry one (spec §3 pin-ingestion rules).
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataUpdate {
    /// The pin had no metadata; it should adopt this one.
    Adopt,
    /// The incoming metadata is identical to what the pin already has.
    NoOp,
    /// The incoming metadata is semantically compatible (same variant, same
    /// stream kind) but differs in value; the pin should update to it.
    Replace,
}

impl Metadata {
    pub fn stream_kind(&self) -> StreamKind {
        match self {
            Metadata::Stream(m) => m.kind,
            Metadata::File(m) => m.kind,
        }
    }

    /// Apply the pin-ingestion rules of spec §3 to decide what a pin
    /// currently holding `existing` (if any) should do upon receiving `self`.
    pub fn resolve_update(
        incoming: &Metadata,
        existing: Option<&Metadata>,
    ) -> Result<MetadataUpdate, MetadataError> {
        let Some(existing) = existing else {
            return Ok(MetadataUpdate::Adopt);
        };
        if existing == incoming {
            return Ok(MetadataUpdate::NoOp);
        }
        if existing.stream_kind() == incoming.stream_kind()
            && std::mem::discriminant(existing) == std::mem::discriminant(incoming)
        {
            return Ok(MetadataUpdate::Replace);
        }
        Err(MetadataError::IncompatibleStreamKind {
            existing: existing.stream_kind(),
            incoming: incoming.stream_kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adopts_when_pin_empty() {
        let m = Metadata::Stream(StreamMetadata::new(StreamKind::VideoPkt, "h264_annexb"));
        assert_eq!(
            Metadata::resolve_update(&m, None).unwrap(),
            MetadataUpdate::Adopt
        );
    }

    #[test]
    fn identical_metadata_is_noop() {
        let m = Metadata::Stream(StreamMetadata::new(StreamKind::VideoPkt, "h264_annexb"));
        assert_eq!(
            Metadata::resolve_update(&m, Some(&m)).unwrap(),
            MetadataUpdate::NoOp
        );
    }

    #[test]
    fn compatible_change_replaces() {
        let a = Metadata::Stream(StreamMetadata::new(StreamKind::VideoPkt, "h264_annexb"));
        let b = Metadata::Stream(
            StreamMetadata::new(StreamKind::VideoPkt, "h264_annexb")
                .with_resolution(Resolution::new(1280, 720)),
        );
        assert_eq!(
            Metadata::resolve_update(&b, Some(&a)).unwrap(),
            MetadataUpdate::Replace
        );
    }

    #[test]
    fn incompatible_kind_change_errors() {
        let a = Metadata::Stream(StreamMetadata::new(StreamKind::VideoPkt, "h264_annexb"));
        let b = Metadata::Stream(StreamMetadata::new(StreamKind::AudioPkt, "aac_adts"));
        assert!(Metadata::resolve_update(&b, Some(&a)).is_err());
    }
}
