use crate::error::TsError;

fn has_optional_pes_header(stream_id: u8) -> bool {
    !matches!(
        stream_id,
        0xBC | 0xBE | 0xBF | 0xF0 | 0xF1 | 0xFF | 0xF2 | 0xF8
    )
}

/// Parse a 33-bit PTS/DTS timestamp (90 kHz units) from 5 bytes, per
/// ISO/IEC 13818-1 §2.4.3.6.
fn parse_timestamp(data: &[u8]) -> Option<u64> {
    if data.len() < 5 {
        return None;
    }
    let ts = (((data[0] as u64 >> 1) & 0x07) << 30)
        | ((data[1] as u64) << 22)
        | (((data[2] as u64 >> 1) & 0x7F) << 15)
        | ((data[3] as u64) << 7)
        | ((data[4] as u64 >> 1) & 0x7F);
    Some(ts)
}

/// Owned PES header, adapted from the teacher's `ts::pes::PesHeader`.
#[derive(Debug, Clone)]
pub struct PesHeader {
    pub stream_id: u8,
    /// Presentation time in 90 kHz units, if present.
    pub pts_90k: Option<u64>,
    /// Decoding time in 90 kHz units, if present.
    pub dts_90k: Option<u64>,
    /// Offset into the PES packet where elementary-stream data begins.
    pub payload_offset: usize,
}

impl PesHeader {
    pub fn parse(data: &[u8]) -> Result<Self, TsError> {
        if data.len() < 6 {
            return Err(TsError::InsufficientData {
                expected: 6,
                actual: data.len(),
            });
        }
        if data[0] != 0x00 || data[1] != 0x00 || data[2] != 0x01 {
            return Err(TsError::InvalidPesStartCode);
        }

        let stream_id = data[3];

        if !has_optional_pes_header(stream_id) {
            return Ok(PesHeader {
                stream_id,
                pts_90k: None,
                dts_90k: None,
                payload_offset: 6,
            });
        }

        if data.len() < 9 {
            return Err(TsError::InsufficientData {
                expected: 9,
                actual: data.len(),
            });
        }

        let pts_dts_flags = (data[7] >> 6) & 0x03;
        let pes_header_data_length = data[8];
        let payload_offset = 9 + pes_header_data_length as usize;

        let (pts_90k, dts_90k) = match pts_dts_flags {
            0b00 => (None, None),
            0b01 => return Err(TsError::InvalidPtsDtsFlags(pts_dts_flags)),
            0b10 => {
                if data.len() < 14 {
                    return Err(TsError::InsufficientData {
                        expected: 14,
                        actual: data.len(),
                    });
                }
                (parse_timestamp(&data[9..14]), None)
            }
            0b11 => {
                if data.len() < 19 {
                    return Err(TsError::InsufficientData {
                        expected: 19,
                        actual: data.len(),
                    });
                }
                (
                    parse_timestamp(&data[9..14]),
                    parse_timestamp(&data[14..19]),
                )
            }
            _ => unreachable!(),
        };

        Ok(PesHeader {
            stream_id,
            pts_90k,
            dts_90k,
            payload_offset,
        })
    }
}

/// Convert a 90 kHz MPEG timestamp to CR (180_000 Hz) units (spec §6
/// "Time base").
pub fn pts_90k_to_cr(value: u64) -> i64 {
    media_types::div_up_scale(value as i64, media_types::CLOCK_RATE, 90_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pes(pts_dts_flags: u8, pts: Option<u64>, dts: Option<u64>) -> Vec<u8> {
        let mut data = vec![0x00, 0x00, 0x01, 0xE0, 0x00, 0x00];
        data.push(0x80);
        data.push(pts_dts_flags << 6);
        let header_len = match pts_dts_flags {
            0b10 => 5,
            0b11 => 10,
            _ => 0,
        };
        data.push(header_len);

        fn encode_ts(marker: u8, ts: u64) -> [u8; 5] {
            [
                (marker << 4) | (((ts >> 30) as u8 & 0x07) << 1) | 1,
                (ts >> 22) as u8,
                (((ts >> 15) as u8 & 0x7F) << 1) | 1,
                (ts >> 7) as u8,
                (((ts as u8) & 0x7F) << 1) | 1,
            ]
        }

        if let Some(pts) = pts {
            data.extend_from_slice(&encode_ts(0b0010, pts));
        }
        if let Some(dts) = dts {
            data.extend_from_slice(&encode_ts(0b0001, dts));
        }
        data
    }

    #[test]
    fn rejects_bad_start_code() {
        let data = [0x00, 0x00, 0x00, 0xE0, 0x00, 0x00];
        assert_eq!(PesHeader::parse(&data), Err(TsError::InvalidPesStartCode));
    }

    #[test]
    fn parses_pts_only() {
        let data = minimal_pes(0b10, Some(90_000), None);
        let header = PesHeader::parse(&data).unwrap();
        assert_eq!(header.pts_90k, Some(90_000));
        assert_eq!(header.dts_90k, None);
    }

    #[test]
    fn parses_pts_and_dts() {
        let data = minimal_pes(0b11, Some(180_000), Some(179_100));
        let header = PesHeader::parse(&data).unwrap();
        assert_eq!(header.pts_90k, Some(180_000));
        assert_eq!(header.dts_90k, Some(179_100));
    }

    #[test]
    fn cr_conversion_doubles_90k() {
        assert_eq!(pts_90k_to_cr(90_000), 180_000);
    }
}
