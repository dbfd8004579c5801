use bytes::Bytes;

use crate::error::TsError;

const TABLE_ID_PAT: u8 = 0x00;
const TABLE_ID_PMT: u8 = 0x02;
const PSI_HEADER_LEN: usize = 8;

/// One elementary-stream entry from a parsed PMT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EsInfo {
    pub pid: u16,
    pub stream_type: u8,
    /// Tag of the first AC-3 (`0x6A`) or enhanced AC-3 (`0x7A`) registration
    /// descriptor found in this ES's descriptor loop, if any. Disambiguates
    /// `stream_type == 0x06` (spec §6 rows "`0x06` + descriptor `0x6A` ->
    /// ac3" / "`0x06` + `0x7A` -> eac3").
    pub descriptor_tag: Option<u8>,
}

/// Walk an ES's descriptor loop (`[tag, length, data...]` entries) looking
/// for an AC-3/E-AC-3 registration descriptor.
fn find_registration_descriptor_tag(data: &[u8], start: usize, len: usize) -> Option<u8> {
    let end = (start + len).min(data.len());
    let mut offset = start;
    while offset + 2 <= end {
        let tag = data[offset];
        let descriptor_len = data[offset + 1] as usize;
        if tag == 0x6A || tag == 0x7A {
            return Some(tag);
        }
        offset += 2 + descriptor_len;
    }
    None
}

/// A parsed PSI section: either a PAT (naming the PMT PIDs to subscribe to
/// next) or a PMT (naming the elementary streams of one program).
///
/// Grounded on `original_source`'s `psi_stream.hpp`, re-expressed without
/// its bit-reader in favor of direct byte indexing in the style of the
/// teacher's `ts::packet`/`ts::pes` parsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PsiSection {
    Pat { pmt_pids: Vec<u16> },
    Pmt { streams: Vec<EsInfo> },
    Other,
}

impl PsiSection {
    pub fn parse(data: &Bytes) -> Result<Self, TsError> {
        if data.len() < PSI_HEADER_LEN {
            return Err(TsError::TruncatedPsiHeader);
        }

        let table_id = data[0];
        let section_length = (((data[1] as usize) & 0x0F) << 8) | data[2] as usize;
        let section_start = 3;
        if data.len() < section_start + section_length {
            return Err(TsError::InvalidSectionLength);
        }
        let section_end = section_start + section_length;
        // The CRC32 trailer occupies the last 4 bytes of the section and is
        // not part of the PAT/PMT entry list.
        let body_end = section_end.saturating_sub(4);

        match table_id {
            TABLE_ID_PAT => {
                let mut offset = PSI_HEADER_LEN;
                let mut pmt_pids = Vec::new();
                while offset + 4 <= body_end {
                    let program_number = ((data[offset] as u16) << 8) | data[offset + 1] as u16;
                    let pid = (((data[offset + 2] as u16) & 0x1F) << 8) | data[offset + 3] as u16;
                    if program_number != 0 {
                        pmt_pids.push(pid);
                    }
                    offset += 4;
                }
                Ok(PsiSection::Pat { pmt_pids })
            }
            TABLE_ID_PMT => {
                if data.len() < PSI_HEADER_LEN + 4 {
                    return Err(TsError::TruncatedPsiHeader);
                }
                let program_info_length =
                    (((data[PSI_HEADER_LEN + 2] as usize) & 0x0F) << 8)
                        | data[PSI_HEADER_LEN + 3] as usize;
                let mut offset = PSI_HEADER_LEN + 4 + program_info_length;

                let mut streams = Vec::new();
                while offset + 5 <= body_end {
                    let stream_type = data[offset];
                    let pid = (((data[offset + 1] as u16) & 0x1F) << 8) | data[offset + 2] as u16;
                    let es_info_length =
                        (((data[offset + 3] as usize) & 0x0F) << 8) | data[offset + 4] as usize;
                    let descriptor_tag =
                        find_registration_descriptor_tag(data, offset + 5, es_info_length);
                    offset += 5 + es_info_length;
                    streams.push(EsInfo {
                        pid,
                        stream_type,
                        descriptor_tag,
                    });
                }
                Ok(PsiSection::Pmt { streams })
            }
            _ => Ok(PsiSection::Other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pat_section(programs: &[(u16, u16)]) -> Vec<u8> {
        let mut data = vec![
            TABLE_ID_PAT,
            0x00,
            0x00, // section_length placeholder, patched below
            0x00,
            0x01, // transport_stream_id
            0xC1, // version/current_next
            0x00,
            0x00,
        ];
        for (program_number, pid) in programs {
            data.push((program_number >> 8) as u8);
            data.push(*program_number as u8);
            data.push(0xE0 | ((pid >> 8) as u8 & 0x1F));
            data.push(*pid as u8);
        }
        data.extend_from_slice(&[0, 0, 0, 0]); // CRC32 placeholder
        let section_length = data.len() - 3;
        data[1] = 0xB0 | ((section_length >> 8) as u8 & 0x0F);
        data[2] = section_length as u8;
        data
    }

    #[test]
    fn parses_pat_with_one_program() {
        let data = Bytes::from(pat_section(&[(1, 666)]));
        let section = PsiSection::parse(&data).unwrap();
        assert_eq!(
            section,
            PsiSection::Pat {
                pmt_pids: vec![666]
            }
        );
    }

    fn pmt_section(streams: &[(u8, u16)]) -> Vec<u8> {
        pmt_section_with_descriptors(
            &streams
                .iter()
                .map(|&(stream_type, pid)| (stream_type, pid, Vec::new()))
                .collect::<Vec<_>>(),
        )
    }

    /// Builds a PMT section with one entry per `(stream_type, pid,
    /// descriptors)`, where each descriptor is `(tag, data)`.
    fn pmt_section_with_descriptors(streams: &[(u8, u16, Vec<(u8, Vec<u8>)>)]) -> Vec<u8> {
        let mut data = vec![
            TABLE_ID_PMT,
            0x00,
            0x00, // section_length placeholder, patched below
            0x00,
            0x01,
            0xC1,
            0x00,
            0x00,
            0xE1,
            0x00, // PCR PID
            0xF0,
            0x00, // program_info_length = 0
        ];
        for (stream_type, pid, descriptors) in streams {
            let es_info: Vec<u8> = descriptors
                .iter()
                .flat_map(|(tag, desc_data)| {
                    let mut bytes = vec![*tag, desc_data.len() as u8];
                    bytes.extend_from_slice(desc_data);
                    bytes
                })
                .collect();
            data.push(*stream_type);
            data.push(0xE0 | ((pid >> 8) as u8 & 0x1F));
            data.push(*pid as u8);
            data.push(0xF0 | ((es_info.len() >> 8) as u8 & 0x0F));
            data.push(es_info.len() as u8);
            data.extend_from_slice(&es_info);
        }
        data.extend_from_slice(&[0, 0, 0, 0]);
        let section_length = data.len() - 3;
        data[1] = 0xB0 | ((section_length >> 8) as u8 & 0x0F);
        data[2] = section_length as u8;
        data
    }

    #[test]
    fn parses_pmt_with_h264_stream() {
        let data = Bytes::from(pmt_section(&[(0x1B, 666)]));
        let section = PsiSection::parse(&data).unwrap();
        assert_eq!(
            section,
            PsiSection::Pmt {
                streams: vec![EsInfo {
                    pid: 666,
                    stream_type: 0x1B,
                    descriptor_tag: None,
                }]
            }
        );
    }

    #[test]
    fn private_stream_with_ac3_registration_descriptor_captures_tag() {
        let data = Bytes::from(pmt_section_with_descriptors(&[(
            0x06,
            777,
            vec![(0x6A, vec![])],
        )]));
        let section = PsiSection::parse(&data).unwrap();
        assert_eq!(
            section,
            PsiSection::Pmt {
                streams: vec![EsInfo {
                    pid: 777,
                    stream_type: 0x06,
                    descriptor_tag: Some(0x6A),
                }]
            }
        );
    }

    #[test]
    fn private_stream_with_eac3_registration_descriptor_captures_tag() {
        let data = Bytes::from(pmt_section_with_descriptors(&[(
            0x06,
            778,
            vec![(0x05, vec![1, 2, 3]), (0x7A, vec![])],
        )]));
        let section = PsiSection::parse(&data).unwrap();
        assert_eq!(
            section,
            PsiSection::Pmt {
                streams: vec![EsInfo {
                    pid: 778,
                    stream_type: 0x06,
                    descriptor_tag: Some(0x7A),
                }]
            }
        );
    }
}
