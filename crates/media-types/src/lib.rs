//! Shared media domain vocabulary.
//!
//! This crate has no dependencies on the rest of the workspace: it exists so
//! that `frame`, `ts-demux` and `dasher` can agree on stream kinds, codec
//! names and the MPEG-TS `stream_type` mapping without each re-declaring it.

mod resolution;
mod stream_kind;
mod ts_codec_map;

pub use resolution::Resolution;
pub use stream_kind::StreamKind;
pub use ts_codec_map::{CodecInfo, stream_type_to_codec};

/// The common clock rate used for every inter-module timestamp: 180,000 Hz.
pub const CLOCK_RATE: u64 = 180_000;

/// Convert a duration expressed in `src_scale` ticks/second into `dst_scale`
/// ticks/second, rounding up.
///
/// This is the `divUp(time * dstScale, srcScale)` conversion named in
/// spec §6 ("Time base").
pub fn div_up_scale(time: i64, dst_scale: u64, src_scale: u64) -> i64 {
    let num = time as i128 * dst_scale as i128;
    let den = src_scale as i128;
    (num.div_euclid(den) + if num.rem_euclid(den) != 0 { 1 } else { 0 }) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_up_scale_rounds_up() {
        assert_eq!(div_up_scale(1, CLOCK_RATE as u64, 1_000), 180);
        assert_eq!(div_up_scale(3, 2, 1), 6);
        assert_eq!(div_up_scale(1, 3, 2), 2); // 1.5 rounds up to 2
    }
}
