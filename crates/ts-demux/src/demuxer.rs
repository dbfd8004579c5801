use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use frame::{Attributes, CueFlags, Frame, Metadata, StreamMetadata};
use media_types::StreamKind;
use pipeline_graph::{Filter, FilterError, FilterHost, Input, LogLevel, Output};

use crate::packet::{TsPacket, PID_PAT, TS_PACKET_LEN};
use crate::pes::{pts_90k_to_cr, PesHeader};
use crate::psi::PsiSection;

/// How an output pin picks its elementary stream (spec §6 "One output pin
/// per configured PID or per stream kind wildcard").
#[derive(Debug, Clone, Copy)]
pub enum PidSelector {
    Fixed(u16),
    Any(StreamKind),
}

/// Static configuration for a [`TsDemuxer`], one entry per output pin.
#[derive(Debug, Clone)]
pub struct TsDemuxConfig {
    pub outputs: Vec<PidSelector>,
}

struct EsState {
    output_index: usize,
    buffer: Vec<u8>,
    last_cc: Option<u8>,
    saw_rai: bool,
}

const OUTPUT_POOL_SIZE: usize = 32;

/// MPEG-TS demuxer filter (spec §6 "TS demuxer output").
///
/// One Input carries raw TS bytes (arbitrary-length, ideally a multiple of
/// 188 bytes); one Output per configured PID/wildcard carries demuxed
/// access units tagged with `PresentationTime`/`DecodingTime`/`CueFlags`
/// attributes and a `StreamMetadata` resolved from the PMT.
///
/// Grounded on the teacher's `ts::packet`/`ts::pes` parsers for wire-format
/// parsing and `original_source`'s `TsDemuxer`/`PsiStream` for the
/// PAT/PMT-driven pin-binding state machine.
pub struct TsDemuxer {
    input: Arc<Input>,
    outputs: Vec<Output>,
    selectors: Vec<PidSelector>,
    es_by_pid: HashMap<u16, EsState>,
    waiting_pmt_pids: HashSet<u16>,
    assigned_outputs: HashSet<usize>,
    seen_pat: bool,
}

impl TsDemuxer {
    pub fn new(config: TsDemuxConfig) -> Self {
        let outputs = config
            .outputs
            .iter()
            .map(|_| Output::new(OUTPUT_POOL_SIZE))
            .collect();
        let mut es_by_pid = HashMap::new();
        for (index, selector) in config.outputs.iter().enumerate() {
            if let PidSelector::Fixed(pid) = selector {
                es_by_pid.insert(
                    *pid,
                    EsState {
                        output_index: index,
                        buffer: Vec::new(),
                        last_cc: None,
                        saw_rai: false,
                    },
                );
            }
        }
        Self {
            input: Input::new(256),
            outputs,
            selectors: config.outputs,
            es_by_pid,
            waiting_pmt_pids: HashSet::new(),
            assigned_outputs: HashSet::new(),
            seen_pat: false,
        }
    }

    fn process_ts_packet(&mut self, data: bytes::Bytes, host: &dyn FilterHost) -> Result<(), FilterError> {
        let packet = match TsPacket::parse(data) {
            Ok(p) => p,
            Err(err) => {
                host.log(LogLevel::Warning, &format!("dropping malformed TS packet: {err}"));
                return Ok(());
            }
        };

        if packet.transport_error_indicator {
            host.log(LogLevel::Warning, "discarding TS packet with TEI=1");
            return Ok(());
        }

        if packet.pid == PID_PAT {
            self.handle_psi_packet(&packet, true, host)?;
            return Ok(());
        }
        if self.waiting_pmt_pids.contains(&packet.pid) {
            self.handle_psi_packet(&packet, false, host)?;
            return Ok(());
        }

        self.handle_es_packet(&packet, host)
    }

    fn handle_psi_packet(
        &mut self,
        packet: &TsPacket,
        is_pat: bool,
        host: &dyn FilterHost,
    ) -> Result<(), FilterError> {
        let Some(payload) = packet.get_psi_payload() else {
            return Ok(());
        };
        let section = match PsiSection::parse(&payload) {
            Ok(s) => s,
            Err(err) => {
                host.log(LogLevel::Warning, &format!("malformed PSI section: {err}"));
                return Ok(());
            }
        };

        match section {
            PsiSection::Pat { pmt_pids } => {
                self.seen_pat = true;
                host.log(
                    LogLevel::Debug,
                    &format!("found PAT ({} program(s))", pmt_pids.len()),
                );
                for pid in pmt_pids {
                    self.waiting_pmt_pids.insert(pid);
                }
            }
            PsiSection::Pmt { streams } => {
                host.log(
                    LogLevel::Debug,
                    &format!("found PMT ({} stream(s))", streams.len()),
                );
                for es in streams {
                    self.bind_es(es.pid, es.stream_type, es.descriptor_tag, host)?;
                }
            }
            PsiSection::Other => {}
        }
        let _ = is_pat;
        Ok(())
    }

    fn bind_es(
        &mut self,
        pid: u16,
        stream_type: u8,
        descriptor_tag: Option<u8>,
        host: &dyn FilterHost,
    ) -> Result<(), FilterError> {
        if self.es_by_pid.contains_key(&pid) {
            return Ok(());
        }
        let Some(codec) = media_types::stream_type_to_codec(stream_type, descriptor_tag) else {
            host.log(
                LogLevel::Warning,
                &format!("[{pid}] unknown MPEG stream type: 0x{stream_type:02x}"),
            );
            return Ok(());
        };

        let output_index = self.selectors.iter().enumerate().find_map(|(index, selector)| {
            if self.assigned_outputs.contains(&index) {
                return None;
            }
            match selector {
                PidSelector::Fixed(p) if *p == pid => Some(index),
                PidSelector::Any(kind) if *kind == codec.kind => Some(index),
                _ => None,
            }
        });

        let Some(output_index) = output_index else {
            return Ok(());
        };

        self.assigned_outputs.insert(output_index);
        self.es_by_pid.insert(
            pid,
            EsState {
                output_index,
                buffer: Vec::new(),
                last_cc: None,
                saw_rai: false,
            },
        );
        self.outputs[output_index].set_metadata(Metadata::Stream(StreamMetadata::new(
            codec.kind,
            codec.codec_name,
        )));
        host.log(
            LogLevel::Debug,
            &format!("[{pid}] MPEG stream type 0x{stream_type:02x} -> {}", codec.codec_name),
        );
        Ok(())
    }

    fn handle_es_packet(&mut self, packet: &TsPacket, host: &dyn FilterHost) -> Result<(), FilterError> {
        let pid = packet.pid;
        let Some(state) = self.es_by_pid.get_mut(&pid) else {
            return Ok(());
        };

        if let Some(last_cc) = state.last_cc {
            if last_cc == packet.continuity_counter {
                return Ok(());
            }
        }
        state.last_cc = Some(packet.continuity_counter);

        let rai = packet
            .adaptation_field
            .as_ref()
            .map(|af| !af.is_empty() && (af[0] & 0x40) != 0)
            .unwrap_or(false);

        if packet.payload_unit_start_indicator {
            Self::finish_pes(
                &mut self.es_by_pid,
                pid,
                &self.outputs,
                host,
            )?;
            let state = self.es_by_pid.get_mut(&pid).unwrap();
            state.saw_rai = rai;
        }

        if let Some(payload) = &packet.payload {
            let state = self.es_by_pid.get_mut(&pid).unwrap();
            state.buffer.extend_from_slice(payload);
        }

        Ok(())
    }

    fn finish_pes(
        es_by_pid: &mut HashMap<u16, EsState>,
        pid: u16,
        outputs: &[Output],
        host: &dyn FilterHost,
    ) -> Result<(), FilterError> {
        let state = es_by_pid.get_mut(&pid).unwrap();
        if state.buffer.is_empty() {
            return Ok(());
        }
        let buffer = std::mem::take(&mut state.buffer);
        let output_index = state.output_index;
        let saw_rai = state.saw_rai;

        let header = match PesHeader::parse(&buffer) {
            Ok(h) => h,
            Err(err) => {
                host.log(LogLevel::Warning, &format!("[{pid}] malformed PES header: {err}"));
                return Ok(());
            }
        };

        let payload = buffer[header.payload_offset.min(buffer.len())..].to_vec();
        let pts = header.pts_90k.map(pts_90k_to_cr);
        let dts = header.dts_90k.map(pts_90k_to_cr).or(pts);

        let mut attributes = Attributes::default();
        if let Some(pts) = pts {
            attributes = attributes.with_presentation_time(pts);
        }
        if let Some(dts) = dts {
            attributes = attributes.with_decoding_time(dts);
        }
        attributes = attributes.with_cue_flags(CueFlags {
            keyframe: saw_rai,
            discontinuity: false,
            end_of_slice: true,
        });

        let metadata = outputs[output_index]
            .get_metadata()
            .map(Arc::new)
            .unwrap_or_else(|| {
                Arc::new(Metadata::Stream(StreamMetadata::new(
                    StreamKind::VideoPkt,
                    "unknown",
                )))
            });
        let frame = Frame::new(payload, metadata).with_attributes(attributes);
        outputs[output_index].post(frame)?;
        Ok(())
    }
}

impl Filter for TsDemuxer {
    fn name(&self) -> &str {
        "TsDemuxer"
    }

    fn inputs(&self) -> &[Arc<Input>] {
        std::slice::from_ref(&self.input)
    }

    fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    fn process(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        let Some(frame) = self.input.pop() else {
            return Ok(());
        };
        let data = bytes::Bytes::copy_from_slice(frame.data());
        let mut offset = 0;
        while offset + TS_PACKET_LEN <= data.len() {
            let packet = data.slice(offset..offset + TS_PACKET_LEN);
            self.process_ts_packet(packet, host)?;
            offset += TS_PACKET_LEN;
        }
        if offset != data.len() {
            host.log(LogLevel::Warning, "truncated trailing TS packet discarded");
        }
        Ok(())
    }

    fn flush(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        let pids: Vec<u16> = self.es_by_pid.keys().copied().collect();
        for pid in pids {
            Self::finish_pes(&mut self.es_by_pid, pid, &self.outputs, host)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_graph::FilterHost as _;

    struct TestHost;
    impl FilterHost for TestHost {
        fn log(&self, _level: LogLevel, _message: &str) {}
        fn activate(&self, _active: bool) {}
        fn is_active(&self) -> bool {
            true
        }
    }

    fn pat_bytes(pmt_pid: u16) -> Vec<u8> {
        let mut data = vec![0x00, 0x00, 0x00, 0x00, 0x01, 0xC1, 0x00, 0x00];
        data.push(0x00);
        data.push(0x01);
        data.push(0xE0 | ((pmt_pid >> 8) as u8 & 0x1F));
        data.push(pmt_pid as u8);
        data.extend_from_slice(&[0, 0, 0, 0]);
        let len = data.len() - 3;
        data[1] = 0xB0 | ((len >> 8) as u8 & 0x0F);
        data[2] = len as u8;
        data
    }

    fn pmt_bytes(stream_type: u8, es_pid: u16) -> Vec<u8> {
        let mut data = vec![
            0x02, 0x00, 0x00, 0x00, 0x01, 0xC1, 0x00, 0x00, 0xE1, 0x00, 0xF0, 0x00,
        ];
        data.push(stream_type);
        data.push(0xE0 | ((es_pid >> 8) as u8 & 0x1F));
        data.push(es_pid as u8);
        data.push(0xF0);
        data.push(0x00);
        data.extend_from_slice(&[0, 0, 0, 0]);
        let len = data.len() - 3;
        data[1] = 0xB0 | ((len >> 8) as u8 & 0x0F);
        data[2] = len as u8;
        data
    }

    fn pmt_bytes_with_ac3_descriptor(stream_type: u8, es_pid: u16, descriptor_tag: u8) -> Vec<u8> {
        let mut data = vec![
            0x02, 0x00, 0x00, 0x00, 0x01, 0xC1, 0x00, 0x00, 0xE1, 0x00, 0xF0, 0x00,
        ];
        data.push(stream_type);
        data.push(0xE0 | ((es_pid >> 8) as u8 & 0x1F));
        data.push(es_pid as u8);
        data.push(0xF0);
        data.push(0x02); // es_info_length = 2 (one descriptor, no payload)
        data.push(descriptor_tag);
        data.push(0x00); // descriptor length = 0
        data.extend_from_slice(&[0, 0, 0, 0]);
        let len = data.len() - 3;
        data[1] = 0xB0 | ((len >> 8) as u8 & 0x0F);
        data[2] = len as u8;
        data
    }

    fn wrap_psi(pid: u16, cc: u8, section: Vec<u8>) -> bytes::Bytes {
        let mut data = vec![0u8; TS_PACKET_LEN];
        data[0] = 0x47;
        data[1] = 0x40 | ((pid >> 8) as u8 & 0x1F);
        data[2] = (pid & 0xFF) as u8;
        data[3] = 0x10 | (cc & 0x0F);
        data[4] = 0x00; // pointer_field
        data[5..5 + section.len()].copy_from_slice(&section);
        data.into()
    }

    #[test]
    fn pat_pmt_binds_codec_to_wildcard_output() {
        let mut demuxer = TsDemuxer::new(TsDemuxConfig {
            outputs: vec![PidSelector::Any(StreamKind::VideoPkt)],
        });
        let host = TestHost;

        demuxer
            .process_ts_packet(wrap_psi(PID_PAT, 0, pat_bytes(666)), &host)
            .unwrap();
        assert!(demuxer.waiting_pmt_pids.contains(&666));

        demuxer
            .process_ts_packet(wrap_psi(666, 0, pmt_bytes(0x1B, 120)), &host)
            .unwrap();

        let metadata = demuxer.outputs[0].get_metadata().unwrap();
        match metadata {
            Metadata::Stream(s) => {
                assert_eq!(s.codec_name, "h264_annexb");
                assert_eq!(s.kind, StreamKind::VideoPkt);
            }
            _ => panic!("expected stream metadata"),
        }
    }

    #[test]
    fn ac3_over_private_stream_binds_via_registration_descriptor() {
        let mut demuxer = TsDemuxer::new(TsDemuxConfig {
            outputs: vec![PidSelector::Any(StreamKind::AudioPkt)],
        });
        let host = TestHost;

        demuxer
            .process_ts_packet(wrap_psi(PID_PAT, 0, pat_bytes(666)), &host)
            .unwrap();
        demuxer
            .process_ts_packet(
                wrap_psi(666, 0, pmt_bytes_with_ac3_descriptor(0x06, 120, 0x6A)),
                &host,
            )
            .unwrap();

        let metadata = demuxer.outputs[0].get_metadata().unwrap();
        match metadata {
            Metadata::Stream(s) => {
                assert_eq!(s.codec_name, "ac3");
                assert_eq!(s.kind, StreamKind::AudioPkt);
            }
            _ => panic!("expected stream metadata"),
        }
    }

    #[test]
    fn duplicate_continuity_counter_is_dropped() {
        let mut demuxer = TsDemuxer::new(TsDemuxConfig {
            outputs: vec![PidSelector::Fixed(120)],
        });
        let host = TestHost;
        demuxer.outputs[0].set_metadata(Metadata::Stream(StreamMetadata::new(
            StreamKind::VideoPkt,
            "h264_annexb",
        )));

        let mut packet_bytes = vec![0u8; TS_PACKET_LEN];
        packet_bytes[0] = 0x47;
        packet_bytes[1] = 0x40;
        packet_bytes[2] = 120;
        packet_bytes[3] = 0x10; // cc = 0, payload only
        packet_bytes[4] = 0x00;
        packet_bytes[5] = 0x00;
        packet_bytes[6] = 0x01;
        packet_bytes[7] = 0xE0;
        packet_bytes[8] = 0x00;
        packet_bytes[9] = 0x00;
        packet_bytes[10] = 0x80;
        packet_bytes[11] = 0x00;
        packet_bytes[12] = 0x00;

        demuxer
            .process_ts_packet(packet_bytes.clone().into(), &host)
            .unwrap();
        let cc_after_first = demuxer.es_by_pid.get(&120).unwrap().last_cc;
        demuxer
            .process_ts_packet(packet_bytes.into(), &host)
            .unwrap();
        assert_eq!(demuxer.es_by_pid.get(&120).unwrap().last_cc, cc_after_first);
    }
}
