//! External-collaborator filters (spec §6, §9): these implement the Filter
//! contract for real but stay out of codec/container/HTTP-library territory
//! themselves, matching spec.md's explicit out-of-scope list.

mod error;
mod file_sink;
mod http_sink;
mod null_sink;
mod source_generator;

pub use error::FiltersIoConfigError;
pub use file_sink::FileSink;
pub use http_sink::{HttpSink, HttpSinkConfig};
pub use null_sink::NullSink;
pub use source_generator::{SourceGenerator, SourceGeneratorConfig};
