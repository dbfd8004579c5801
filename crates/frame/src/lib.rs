//! The Frame/Metadata/Allocator data model (spec §3).
//!
//! Grounded on `lib_modules/core/{metadata.hpp,buffer.hpp,allocator.cpp,data.cpp}`
//! of the original Signals framework, re-expressed as owning, reference-counted
//! Rust types instead of an intrusive-refcount C++ object graph.

mod allocator;
mod attributes;
mod error;
mod frame;
mod metadata;

pub use allocator::{Allocator, AllocatorStats};
pub use attributes::{Attributes, CodecFlags, CueFlags};
pub use error::{AllocatorError, MetadataError};
pub use frame::Frame;
pub use metadata::{FileMetadata, Metadata, MetadataUpdate, StreamMetadata};
