use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use pipeline_graph::{CancellationToken, Filter, FilterError, FilterHost, Input, LogLevel, Output};
use ts_demux::TS_PACKET_LEN;

/// Chunk size handed to the demuxer per `process()` call: a round number of
/// TS packets, matching typical UDP/TS payload sizes (7 packets = 1316 bytes).
const PACKETS_PER_CHUNK: usize = 7;

/// Reads a local MPEG-TS file and posts it to the TS demuxer in fixed-size
/// chunks, a multiple of `TS_PACKET_LEN` bytes (spec §6 "raw TS bytes,
/// arbitrary-length, ideally a multiple of 188 bytes").
///
/// This is `mediarun`'s own glue, not a `filters-io` collaborator: reading a
/// file from disk into the pipeline is binary-level wiring, not a
/// general-purpose filter the spec registers by name.
pub struct TsFileSource {
    output: Output,
    file: File,
    chunk_size: usize,
    cancellation: CancellationToken,
    bytes_emitted: u64,
    done: bool,
}

impl TsFileSource {
    pub fn open(path: &Path, cancellation: CancellationToken) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            output: Output::new(32),
            file,
            chunk_size: PACKETS_PER_CHUNK * TS_PACKET_LEN,
            cancellation,
            bytes_emitted: 0,
            done: false,
        })
    }
}

impl Filter for TsFileSource {
    fn name(&self) -> &str {
        "TsFileSource"
    }

    fn inputs(&self) -> &[Arc<Input>] {
        &[]
    }

    fn outputs(&self) -> &[Output] {
        std::slice::from_ref(&self.output)
    }

    fn process(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        if self.done {
            self.cancellation.cancel();
            std::thread::sleep(std::time::Duration::from_millis(5));
            return Ok(());
        }

        let mut frame = self.output.alloc_data(self.chunk_size)?;
        let read = {
            let buf = frame
                .data_mut()
                .expect("freshly allocated frame has no other owner");
            read_fully(&mut self.file, buf)?
        };

        if read == 0 {
            self.done = true;
            host.log(
                LogLevel::Info,
                &format!("end of input reached, {} bytes total", self.bytes_emitted),
            );
            return Ok(());
        }

        self.bytes_emitted += read as u64;
        if read < self.chunk_size {
            self.done = true;
        }

        if let Err(err) = self.output.post(frame) {
            host.log(LogLevel::Warning, &format!("post failed: {err}"));
        }
        Ok(())
    }

    fn flush(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        host.log(
            LogLevel::Debug,
            &format!("TsFileSource drained, {} bytes emitted", self.bytes_emitted),
        );
        Ok(())
    }
}

/// Reads until `buf` is full or EOF, returning the number of bytes actually
/// read (which may be shorter than `buf` on the file's final chunk).
fn read_fully(file: &mut File, buf: &mut [u8]) -> Result<usize, FilterError> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..]).map_err(|source| FilterError::TransientIo {
            filter: "TsFileSource".to_string(),
            source,
        })?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}
