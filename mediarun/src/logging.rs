use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber (spec §7: "`tracing-subscriber`
/// (env-filter + fmt), matching the teacher's logging setup ..., is wired in
/// `mediarun::main`").
///
/// `RUST_LOG` is honored when set; `--verbose` raises the default level to
/// `debug` without requiring the caller to export anything.
pub fn init(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
