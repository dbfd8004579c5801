use std::sync::Arc;

use pipeline_graph::{Filter, FilterError, FilterHost, Input, LogLevel, Output};

/// Discards every frame it receives. Used to terminate a graph branch whose
/// output is otherwise unobserved (spec §6: external collaborators are
/// opaque; a `NullSink` is the minimal one that actually implements the
/// contract rather than stubbing it out).
pub struct NullSink {
    input: Arc<Input>,
    frames_dropped: u64,
    bytes_dropped: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self {
            input: Input::new(64),
            frames_dropped: 0,
            bytes_dropped: 0,
        }
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for NullSink {
    fn name(&self) -> &str {
        "NullSink"
    }

    fn inputs(&self) -> &[Arc<Input>] {
        std::slice::from_ref(&self.input)
    }

    fn outputs(&self) -> &[Output] {
        &[]
    }

    fn process(&mut self, _host: &dyn FilterHost) -> Result<(), FilterError> {
        while let Some(frame) = self.input.try_pop() {
            self.frames_dropped += 1;
            self.bytes_dropped += frame.len() as u64;
        }
        Ok(())
    }

    fn flush(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        self.process(host)?;
        host.log(
            LogLevel::Debug,
            &format!(
                "discarded {} frames ({} bytes) total",
                self.frames_dropped, self.bytes_dropped
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame::{Frame, Metadata, StreamMetadata};
    use media_types::StreamKind;

    struct TestHost;
    impl FilterHost for TestHost {
        fn log(&self, _level: LogLevel, _message: &str) {}
        fn activate(&self, _active: bool) {}
        fn is_active(&self) -> bool {
            true
        }
    }

    #[test]
    fn drops_every_frame() {
        let mut sink = NullSink::new();
        let input = sink.inputs()[0].clone();
        input.connect();
        let meta = Arc::new(Metadata::Stream(StreamMetadata::new(
            StreamKind::VideoPkt,
            "h264_annexb",
        )));
        input.push(Frame::new(vec![0u8; 10], meta.clone())).unwrap();
        input.push(Frame::new(vec![0u8; 20], meta)).unwrap();

        let host = TestHost;
        sink.process(&host).unwrap();

        assert_eq!(sink.frames_dropped(), 2);
        assert_eq!(sink.bytes_dropped, 30);
    }
}
