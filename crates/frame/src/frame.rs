use std::sync::Arc;

use crate::allocator::{release_backref, AllocatorBackref};
use crate::attributes::Attributes;
use crate::metadata::Metadata;

/// The owned byte storage backing a [`Frame`].
///
/// Holds a weak back-link to the [`crate::Allocator`] it was issued from so
/// that dropping the last [`Frame`] referencing this buffer frees the slot
/// (spec §3: "releasing a Frame returns its block to the allocator").
/// Buffers not issued by an allocator (e.g. built in tests) carry no
/// back-link and simply drop their storage.
pub(crate) struct FrameBuffer {
    bytes: Box<[u8]>,
    backref: Option<AllocatorBackref>,
}

impl FrameBuffer {
    pub(crate) fn new_owned(bytes: Vec<u8>, backref: AllocatorBackref) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
            backref: Some(backref),
        }
    }

    fn unmanaged(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
            backref: None,
        }
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        if let Some(backref) = &self.backref {
            release_backref(backref);
        }
    }
}

/// A unit of data flowing between Pins (spec §3 "Frame").
///
/// `buffer` and `metadata` are reference-counted so cloning a `Frame` is
/// cheap and shares the underlying bytes; `attributes` is owned per clone so
/// each copy of a Frame carries an independent attribute map, matching the
/// original's per-instance metadata overlay semantics.
///
/// `metadata` is `None` for a freshly-allocated buffer straight out of an
/// [`crate::Allocator`]; a filter fills it in via [`Frame::with_metadata`]
/// before handing the frame to a downstream pin (pins reject frames with no
/// metadata, spec §3).
#[derive(Clone)]
pub struct Frame {
    buffer: Arc<FrameBuffer>,
    metadata: Option<Arc<Metadata>>,
    attributes: Attributes,
}

impl Frame {
    /// Build a Frame from raw bytes and a [`Metadata`] descriptor, with no
    /// owning allocator. Used by filters that produce data outside of a
    /// pooled Output (e.g. demuxers wrapping a freshly-parsed access unit).
    pub fn new(bytes: Vec<u8>, metadata: Arc<Metadata>) -> Self {
        Self {
            buffer: Arc::new(FrameBuffer::unmanaged(bytes)),
            metadata: Some(metadata),
            attributes: Attributes::default(),
        }
    }

    pub(crate) fn from_buffer(buffer: Arc<FrameBuffer>) -> Self {
        Self {
            buffer,
            metadata: None,
            attributes: Attributes::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: Arc<Metadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer.bytes
    }

    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        Arc::get_mut(&mut self.buffer).map(|b| &mut b.bytes[..])
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_deref()
    }

    pub fn metadata_arc(&self) -> Option<Arc<Metadata>> {
        self.metadata.clone()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn len(&self) -> usize {
        self.buffer.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.bytes.is_empty()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("len", &self.len())
            .field("metadata", &self.metadata)
            .field("attributes", &self.attributes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::StreamMetadata;
    use media_types::StreamKind;

    #[test]
    fn clone_shares_buffer_but_not_attributes() {
        let meta = Arc::new(Metadata::Stream(StreamMetadata::new(
            StreamKind::VideoPkt,
            "h264_annexb",
        )));
        let mut a = Frame::new(vec![1, 2, 3], meta);
        let b = a.clone();

        a.attributes_mut().presentation_time = Some(42);

        assert_eq!(a.data(), b.data());
        assert_eq!(b.attributes().presentation_time, None);
        assert_eq!(a.attributes().presentation_time, Some(42));
    }
}
