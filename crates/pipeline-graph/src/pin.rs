use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use frame::{Allocator, Frame, Metadata, MetadataUpdate};

use crate::error::FilterError;

struct FifoState {
    queue: VecDeque<Frame>,
    connected: usize,
    metadata: Option<Metadata>,
}

/// A typed input endpoint (spec §4.1 "Input").
///
/// Backed by a bounded FIFO guarded by a mutex/condvar, mirroring the same
/// blocking-pool pattern used by [`frame::Allocator`]: `pop` blocks the
/// calling filter thread until a Frame or disconnection is observed, `try_pop`
/// never blocks.
pub struct Input {
    state: Mutex<FifoState>,
    condvar: Condvar,
    capacity: usize,
}

impl Input {
    pub fn new(capacity: usize) -> Arc<Self> {
        assert!(capacity > 0, "input FIFO must hold at least one frame");
        Arc::new(Self {
            state: Mutex::new(FifoState {
                queue: VecDeque::with_capacity(capacity),
                connected: 0,
                metadata: None,
            }),
            condvar: Condvar::new(),
            capacity,
        })
    }

    /// Called by the runtime when an Output connects to this Input.
    pub fn connect(&self) {
        let mut state = self.state.lock().unwrap();
        state.connected += 1;
    }

    /// Called when the upstream Output disconnects (or the Pipeline tears
    /// down); wakes any blocked `pop` so it can observe end-of-stream.
    pub fn disconnect(&self) {
        let mut state = self.state.lock().unwrap();
        state.connected = state.connected.saturating_sub(1);
        self.condvar.notify_all();
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected > 0
    }

    /// Enqueue a Frame sent by a connected Output's executor, validating and
    /// updating this pin's metadata per spec §3's pin-ingestion rules.
    pub fn push(&self, frame: Frame) -> Result<(), FilterError> {
        let mut state = self.state.lock().unwrap();
        if let Some(incoming) = frame.metadata() {
            match Metadata::resolve_update(incoming, state.metadata.as_ref())? {
                MetadataUpdate::Adopt | MetadataUpdate::Replace => {
                    state.metadata = Some(incoming.clone());
                }
                MetadataUpdate::NoOp => {}
            }
        }
        while state.queue.len() >= self.capacity {
            state = self.condvar.wait(state).unwrap();
        }
        state.queue.push_back(frame);
        self.condvar.notify_all();
        Ok(())
    }

    /// Block until a Frame is available or the pin is empty-and-disconnected
    /// (returns `None` in the latter case, signalling EOS to the filter).
    pub fn pop(&self) -> Option<Frame> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(frame) = state.queue.pop_front() {
                self.condvar.notify_all();
                return Some(frame);
            }
            if state.connected == 0 {
                return None;
            }
            state = self.condvar.wait(state).unwrap();
        }
    }

    /// Non-blocking pop; `None` means either empty or EOS, distinguished via
    /// [`Input::is_connected`].
    pub fn try_pop(&self) -> Option<Frame> {
        let mut state = self.state.lock().unwrap();
        let frame = state.queue.pop_front();
        if frame.is_some() {
            self.condvar.notify_all();
        }
        frame
    }

    pub fn metadata(&self) -> Option<Metadata> {
        self.state.lock().unwrap().metadata.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().queue.is_empty()
    }
}

/// A typed output endpoint (spec §4.1 "Output").
///
/// Owns the pool [`Allocator`] for this pin and broadcasts posted Frames to
/// every connected [`Input`] in the order they were posted (spec §5
/// "frames are delivered in the order they were posted").
pub struct Output {
    allocator: Allocator,
    connections: Mutex<Vec<Arc<Input>>>,
    metadata: Mutex<Option<Metadata>>,
}

impl Output {
    pub fn new(pool_size: usize) -> Self {
        Self {
            allocator: Allocator::new(pool_size),
            connections: Mutex::new(Vec::new()),
            metadata: Mutex::new(None),
        }
    }

    /// Allocate a fresh, zeroed Frame from this Output's pool, blocking on
    /// exhaustion (spec §4.1 "Pool allocator (bounded)").
    pub fn alloc_data(&self, size: usize) -> Result<Frame, FilterError> {
        Ok(self.allocator.alloc(size)?)
    }

    pub fn connect(&self, input: Arc<Input>) {
        input.connect();
        self.connections.lock().unwrap().push(input);
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.lock().unwrap().is_empty()
    }

    pub fn disconnect_all(&self) {
        let mut connections = self.connections.lock().unwrap();
        for input in connections.drain(..) {
            input.disconnect();
        }
    }

    pub fn set_metadata(&self, metadata: Metadata) {
        *self.metadata.lock().unwrap() = Some(metadata);
    }

    pub fn get_metadata(&self) -> Option<Metadata> {
        self.metadata.lock().unwrap().clone()
    }

    /// Validate-and-update this pin's metadata from `frame`, then broadcast
    /// it to every connected Input in order (spec §4.1 "Output::post").
    pub fn post(&self, frame: Frame) -> Result<(), FilterError> {
        if let Some(incoming) = frame.metadata() {
            let mut metadata = self.metadata.lock().unwrap();
            match Metadata::resolve_update(incoming, metadata.as_ref())? {
                MetadataUpdate::Adopt | MetadataUpdate::Replace => {
                    *metadata = Some(incoming.clone());
                }
                MetadataUpdate::NoOp => {}
            }
        }
        let connections = self.connections.lock().unwrap();
        for input in connections.iter() {
            input.push(frame.clone())?;
        }
        Ok(())
    }

    pub fn allocator_stats(&self) -> frame::AllocatorStats {
        self.allocator.stats()
    }

    pub fn shutdown_allocator(&self) {
        self.allocator.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame::StreamMetadata;
    use media_types::StreamKind;
    use std::sync::Arc as StdArc;

    #[test]
    fn push_then_pop_preserves_order() {
        let input = Input::new(4);
        let meta = StdArc::new(Metadata::Stream(StreamMetadata::new(
            StreamKind::VideoPkt,
            "h264_annexb",
        )));
        for i in 0..3u8 {
            input.push(Frame::new(vec![i], meta.clone())).unwrap();
        }
        assert_eq!(input.pop().unwrap().data(), &[0]);
        assert_eq!(input.pop().unwrap().data(), &[1]);
        assert_eq!(input.pop().unwrap().data(), &[2]);
    }

    #[test]
    fn pop_returns_none_once_disconnected_and_drained() {
        let input = Input::new(2);
        input.connect();
        let meta = StdArc::new(Metadata::Stream(StreamMetadata::new(
            StreamKind::VideoPkt,
            "h264_annexb",
        )));
        input.push(Frame::new(vec![1], meta)).unwrap();
        input.disconnect();
        assert!(input.pop().is_some());
        assert!(input.pop().is_none());
    }

    #[test]
    fn output_broadcasts_to_all_connections() {
        let output = Output::new(4);
        let a = Input::new(4);
        let b = Input::new(4);
        output.connect(a.clone());
        output.connect(b.clone());

        let meta = StdArc::new(Metadata::Stream(StreamMetadata::new(
            StreamKind::AudioPkt,
            "aac_adts",
        )));
        output.post(Frame::new(vec![9], meta)).unwrap();

        assert_eq!(a.try_pop().unwrap().data(), &[9]);
        assert_eq!(b.try_pop().unwrap().data(), &[9]);
    }

    #[test]
    fn incompatible_metadata_change_is_rejected() {
        let output = Output::new(4);
        let video = StdArc::new(Metadata::Stream(StreamMetadata::new(
            StreamKind::VideoPkt,
            "h264_annexb",
        )));
        let audio = StdArc::new(Metadata::Stream(StreamMetadata::new(
            StreamKind::AudioPkt,
            "aac_adts",
        )));
        output.post(Frame::new(vec![1], video)).unwrap();
        assert!(output.post(Frame::new(vec![2], audio)).is_err());
    }
}
