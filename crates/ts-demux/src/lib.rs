//! MPEG-TS demuxing filter (spec §6 "TS demuxer output").
//!
//! Grounded on the teacher's `ts::packet`/`ts::pes` wire-format parsers and
//! on `original_source`'s `TsDemuxer`/`PsiStream` for the PAT/PMT-driven
//! pin-binding state machine.

mod demuxer;
mod error;
mod packet;
mod pes;
mod psi;

pub use demuxer::{PidSelector, TsDemuxConfig, TsDemuxer};
pub use error::TsError;
pub use packet::{TsPacket, PID_NULL, PID_PAT, TS_PACKET_LEN};
pub use pes::PesHeader;
pub use psi::{EsInfo, PsiSection};
