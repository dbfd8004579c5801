use crate::error::FilterError;
use crate::pin::{Input, Output};

/// Closed set of log severities a filter may report through its host
/// (spec §7 "Observability": "Levels are Error, Warning, Info, Debug").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

/// The host interface handed to every filter (spec §4.1 "Filter contract":
/// "Filters receive a host handle providing `log(level, msg)` and
/// `activate(bool)`").
///
/// `log` is implemented with `tracing` rather than a raw C-string sink; the
/// filter name is carried as a `tracing::info_span!` entered by the executor
/// around each `process`/`flush` call, so it doesn't need to be threaded
/// through every log call here.
pub trait FilterHost: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    /// `activate(false)` instructs the runtime to stop scheduling
    /// `process()` until data arrives or the filter is re-activated
    /// explicitly.
    fn activate(&self, active: bool);

    fn is_active(&self) -> bool;
}

pub(crate) struct TracingHost {
    name: String,
    active: std::sync::atomic::AtomicBool,
}

impl TracingHost {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl FilterHost for TracingHost {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => tracing::error!(filter = %self.name, "{message}"),
            LogLevel::Warning => tracing::warn!(filter = %self.name, "{message}"),
            LogLevel::Info => tracing::info!(filter = %self.name, "{message}"),
            LogLevel::Debug => tracing::debug!(filter = %self.name, "{message}"),
        }
    }

    fn activate(&self, active: bool) {
        self.active
            .store(active, std::sync::atomic::Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// A processing node in the dataflow graph (spec §4.1 "Filter contract").
///
/// Implementors own their [`Input`]/[`Output`] pins as fields and expose
/// them through `inputs`/`outputs`. `process` is invoked repeatedly by the
/// runtime while the filter is active; a filter with exactly one input
/// typically implements it as `self.inputs()[0].try_pop()` followed by its
/// own per-frame logic (the "default implementation" of spec §4.1 is a
/// convention filters follow, not a mechanism the trait enforces, since
/// Rust has no single blessed override point for a dynamically dispatched
/// default method).
pub trait Filter: Send {
    fn name(&self) -> &str;
    fn inputs(&self) -> &[std::sync::Arc<Input>];
    fn outputs(&self) -> &[Output];

    /// Called repeatedly by the executor while active.
    fn process(&mut self, host: &dyn FilterHost) -> Result<(), FilterError>;

    /// Drain internal state and emit queued outputs. Must be idempotent
    /// (spec §8 "flush() is idempotent on every filter").
    fn flush(&mut self, host: &dyn FilterHost) -> Result<(), FilterError>;

    /// `true` for filters with no inputs — the runtime activates these at
    /// `Pipeline::start` (spec §4.1 step 2).
    fn is_source(&self) -> bool {
        self.inputs().is_empty()
    }
}
