use thiserror::Error;

/// Configuration-class errors raised at filter construction (spec §7
/// "Configuration-class" errors, never seen by a running pipeline).
#[derive(Debug, Error)]
pub enum FiltersIoConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("invalid endpoint URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}
