use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use frame::Metadata;
use pipeline_graph::{Filter, FilterError, FilterHost, Input, LogLevel, Output};

/// Writes each received frame to `output_dir/<filename>`, where `filename`
/// comes from the frame's `FileMetadata` (spec §6 "Segment artifact wire
/// format"). A `FileMetadata::size == i64::MAX` frame is a DELETE request:
/// the named file is unlinked instead of written (spec §6: "the file sink
/// must unlink the named file").
///
/// `process()` runs the filter's own synchronous disk I/O directly, matching
/// `pipeline-graph`'s model of filters as synchronous work already driven
/// from a `spawn_blocking` worker by the executor — there is no separate
/// blocking hop to take here, unlike `FlvWriterTask`'s take/put-back pattern
/// (which exists to cross an async/sync boundary this filter is already on
/// the sync side of).
pub struct FileSink {
    input: Arc<Input>,
    output_dir: PathBuf,
    segments_not_owned: bool,
    bytes_written: u64,
    files_written: u64,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: Input::new(64),
            output_dir: output_dir.into(),
            segments_not_owned: false,
            bytes_written: 0,
            files_written: 0,
        }
    }

    /// Manifest-only mode: file deletion requests are logged but not
    /// applied (spec §6's `segmentsNotOwned`: "Don't delete files;
    /// manifest-only mode").
    pub fn with_segments_not_owned(mut self, segments_not_owned: bool) -> Self {
        self.segments_not_owned = segments_not_owned;
        self
    }

    fn resolve(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }

    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        self.bytes_written += bytes.len() as u64;
        self.files_written += 1;
        Ok(())
    }

    fn delete_file(&mut self, path: &Path, host: &dyn FilterHost) -> std::io::Result<()> {
        if self.segments_not_owned {
            host.log(
                LogLevel::Debug,
                &format!("segmentsNotOwned: skipping delete of {}", path.display()),
            );
            return Ok(());
        }
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl Filter for FileSink {
    fn name(&self) -> &str {
        "FileSink"
    }

    fn inputs(&self) -> &[Arc<Input>] {
        std::slice::from_ref(&self.input)
    }

    fn outputs(&self) -> &[Output] {
        &[]
    }

    fn process(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        while let Some(frame) = self.input.try_pop() {
            let meta = match frame.metadata() {
                Some(Metadata::File(m)) => m.clone(),
                _ => {
                    return Err(FilterError::Contract {
                        filter: "FileSink".to_string(),
                        message: "input must carry Segment/Playlist metadata".to_string(),
                    })
                }
            };
            let path = self.resolve(&meta.filename);
            let result = if meta.is_delete() {
                self.delete_file(&path, host)
            } else {
                self.write_file(&path, frame.data())
            };
            if let Err(source) = result {
                host.log(
                    LogLevel::Warning,
                    &format!("transient I/O error on {}: {source}", path.display()),
                );
                // Transient I/O: retried once within the plugin (spec §7).
                let retry = if meta.is_delete() {
                    self.delete_file(&path, host)
                } else {
                    self.write_file(&path, frame.data())
                };
                if let Err(source) = retry {
                    return Err(FilterError::TransientIo {
                        filter: "FileSink".to_string(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        self.process(host)?;
        host.log(
            LogLevel::Debug,
            &format!(
                "{} files written, {} bytes total",
                self.files_written, self.bytes_written
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame::{FileMetadata, Frame};
    use media_types::StreamKind;
    use std::io::Read;

    struct TestHost;
    impl FilterHost for TestHost {
        fn log(&self, _level: LogLevel, _message: &str) {}
        fn activate(&self, _active: bool) {}
        fn is_active(&self) -> bool {
            true
        }
    }

    fn segment_frame(filename: &str, bytes: Vec<u8>) -> Frame {
        let meta = FileMetadata::new(StreamKind::Segment, filename);
        Frame::new(bytes, Arc::new(Metadata::File(meta)))
    }

    fn delete_frame(filename: &str) -> Frame {
        let meta = FileMetadata {
            size: i64::MAX,
            ..FileMetadata::new(StreamKind::Segment, filename)
        };
        Frame::new(Vec::new(), Arc::new(Metadata::File(meta)))
    }

    #[test]
    fn writes_segment_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path());
        let input = sink.inputs()[0].clone();
        input.connect();
        input.push(segment_frame("v_0/seg-1.m4s", vec![1, 2, 3, 4])).unwrap();

        let host = TestHost;
        sink.process(&host).unwrap();

        let mut buf = Vec::new();
        fs::File::open(dir.path().join("v_0/seg-1.m4s"))
            .unwrap()
            .read_to_end(&mut buf)
            .unwrap();
        assert_eq!(buf, vec![1, 2, 3, 4]);
        assert_eq!(sink.files_written, 1);
    }

    #[test]
    fn delete_request_unlinks_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path());
        let input = sink.inputs()[0].clone();
        input.connect();
        input.push(segment_frame("seg-1.m4s", vec![9])).unwrap();
        input.push(delete_frame("seg-1.m4s")).unwrap();

        let host = TestHost;
        sink.process(&host).unwrap();

        assert!(!dir.path().join("seg-1.m4s").exists());
    }

    #[test]
    fn segments_not_owned_skips_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path()).with_segments_not_owned(true);
        let input = sink.inputs()[0].clone();
        input.connect();
        input.push(segment_frame("seg-1.m4s", vec![9])).unwrap();
        input.push(delete_frame("seg-1.m4s")).unwrap();

        let host = TestHost;
        sink.process(&host).unwrap();

        assert!(dir.path().join("seg-1.m4s").exists());
    }
}
