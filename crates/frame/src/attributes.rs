/// Cue-point flags carried on a frame (spec §3: `CueFlags`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CueFlags {
    pub keyframe: bool,
    pub discontinuity: bool,
    pub end_of_slice: bool,
}

/// Optional codec-level flags that don't warrant a named field of their own
/// (spec §3: "plus optional codec-level flags").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecFlags {
    pub bits: u32,
}

/// The typed attribute map carried by every [`crate::Frame`].
///
/// Spec §3 defines a closed set of attribute kinds
/// (`PresentationTime`, `DecodingTime`, `CueFlags`, plus optional codec-level
/// flags); rather than a dynamically-keyed map we express that closed set as
/// plain `Option` fields, which is both cheaper and makes "no RTTI
/// dependency" (spec §9) trivially true.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    /// Presentation time in CR (180_000 Hz) units.
    pub presentation_time: Option<i64>,
    /// Decoding time in CR units.
    pub decoding_time: Option<i64>,
    pub cue_flags: Option<CueFlags>,
    pub codec_flags: Option<CodecFlags>,
}

impl Attributes {
    pub fn with_presentation_time(mut self, time: i64) -> Self {
        self.presentation_time = Some(time);
        self
    }

    pub fn with_decoding_time(mut self, time: i64) -> Self {
        self.decoding_time = Some(time);
        self
    }

    pub fn with_cue_flags(mut self, flags: CueFlags) -> Self {
        self.cue_flags = Some(flags);
        self
    }
}
