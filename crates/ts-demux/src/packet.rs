use bytes::Bytes;

use crate::error::TsError;

pub const PID_PAT: u16 = 0x0000;
pub const PID_NULL: u16 = 0x1FFF;

pub const TS_PACKET_LEN: usize = 188;

/// A parsed 188-byte Transport Stream packet (spec §6 "TS demuxer output").
///
/// Adapted from the teacher's `ts::packet::TsPacket`; field layout and
/// parsing order match ISO/IEC 13818-1 §2.4.3.2 exactly.
#[derive(Debug, Clone)]
pub struct TsPacket {
    pub transport_error_indicator: bool,
    pub payload_unit_start_indicator: bool,
    pub pid: u16,
    pub transport_scrambling_control: u8,
    pub adaptation_field_control: u8,
    pub continuity_counter: u8,
    pub adaptation_field: Option<Bytes>,
    pub payload: Option<Bytes>,
}

impl TsPacket {
    pub fn parse(data: Bytes) -> Result<Self, TsError> {
        if data.len() != TS_PACKET_LEN {
            return Err(TsError::InvalidPacketSize(data.len()));
        }

        let sync_byte = data[0];
        if sync_byte != 0x47 {
            return Err(TsError::InvalidSyncByte(sync_byte));
        }

        let byte1 = data[1];
        let byte2 = data[2];
        let byte3 = data[3];

        let transport_error_indicator = (byte1 & 0x80) != 0;
        let payload_unit_start_indicator = (byte1 & 0x40) != 0;
        let pid = ((byte1 as u16 & 0x1F) << 8) | byte2 as u16;

        let transport_scrambling_control = (byte3 >> 6) & 0x03;
        let adaptation_field_control = (byte3 >> 4) & 0x03;
        let continuity_counter = byte3 & 0x0F;

        let mut offset = 4;
        let mut adaptation_field = None;
        let mut payload = None;

        if adaptation_field_control == 0x02 || adaptation_field_control == 0x03 {
            if offset >= data.len() {
                return Err(TsError::InsufficientData {
                    expected: offset + 1,
                    actual: data.len(),
                });
            }
            let adaptation_field_length = data[offset] as usize;
            offset += 1;
            if adaptation_field_length > 0 {
                if offset + adaptation_field_length > data.len() {
                    return Err(TsError::InsufficientData {
                        expected: offset + adaptation_field_length,
                        actual: data.len(),
                    });
                }
                adaptation_field = Some(data.slice(offset..offset + adaptation_field_length));
                offset += adaptation_field_length;
            }
        }

        if (adaptation_field_control == 0x01 || adaptation_field_control == 0x03)
            && offset < data.len()
        {
            payload = Some(data.slice(offset..));
        }

        Ok(TsPacket {
            transport_error_indicator,
            payload_unit_start_indicator,
            pid,
            transport_scrambling_control,
            adaptation_field_control,
            continuity_counter,
            adaptation_field,
            payload,
        })
    }

    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control == 0x01 || self.adaptation_field_control == 0x03
    }

    /// Removes the PSI `pointer_field` when this packet starts a new section.
    pub fn get_psi_payload(&self) -> Option<Bytes> {
        let payload = self.payload.as_ref()?;
        if self.payload_unit_start_indicator {
            if payload.is_empty() {
                return None;
            }
            let pointer_field = payload[0] as usize;
            if 1 + pointer_field < payload.len() {
                return Some(payload.slice(1 + pointer_field..));
            }
            None
        } else {
            Some(payload.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_packet(pid: u16, cc: u8, pusi: bool) -> Vec<u8> {
        let mut data = vec![0u8; TS_PACKET_LEN];
        data[0] = 0x47;
        data[1] = if pusi { 0x40 } else { 0x00 } | ((pid >> 8) as u8 & 0x1F);
        data[2] = (pid & 0xFF) as u8;
        data[3] = 0x10 | (cc & 0x0F); // payload-only, given continuity counter
        data
    }

    #[test]
    fn rejects_wrong_sync_byte() {
        let mut data = vec![0u8; TS_PACKET_LEN];
        data[0] = 0x46;
        assert_eq!(
            TsPacket::parse(data.into()),
            Err(TsError::InvalidSyncByte(0x46))
        );
    }

    #[test]
    fn rejects_wrong_size() {
        assert_eq!(
            TsPacket::parse(Bytes::from_static(&[0x47; 10])),
            Err(TsError::InvalidPacketSize(10))
        );
    }

    #[test]
    fn parses_pid_and_payload_only_packet() {
        let data = minimal_packet(120, 3, true);
        let packet = TsPacket::parse(data.into()).unwrap();
        assert_eq!(packet.pid, 120);
        assert_eq!(packet.continuity_counter, 3);
        assert!(packet.has_payload());
        assert!(packet.payload.is_some());
    }
}
