use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::info_span;

use crate::cancellation::CancellationToken;
use crate::error::{FilterError, PipelineError};
use crate::filter::{Filter, FilterHost};

/// Threading policy applied uniformly to every filter added to a
/// [`crate::Pipeline`] (spec §4.1 "Executor policy", §5 "Scheduling model").
#[derive(Debug, Clone)]
pub enum ExecutorPolicy {
    /// The caller's own thread runs every filter's `process()` in a loop.
    /// No task is spawned; useful for deterministic tests.
    Mono,
    /// Each filter owns a dedicated `tokio::task::spawn_blocking` worker,
    /// mirroring `pipeline-common::ChannelPipeline::spawn`.
    OnePerModule,
    /// Filters are driven from a bounded pool of `spawn_blocking` tasks
    /// gated by a semaphore, rather than a hand-rolled work-stealing pool.
    SharedPool { max_concurrency: usize },
}

/// Runs a single filter to completion: repeatedly calls `process()` until
/// every input pin is disconnected-and-drained (or the filter is a source
/// and the cancellation token fires), then calls `flush()` once and
/// disconnects the filter's outputs to cascade end-of-stream downstream.
pub(crate) fn drive_to_completion(
    filter: &mut dyn Filter,
    host: &dyn FilterHost,
    token: &CancellationToken,
) -> Result<(), PipelineError> {
    let name = filter.name().to_string();
    let is_source = filter.is_source();

    loop {
        if is_source && token.is_cancelled() {
            break;
        }

        filter
            .process(host)
            .map_err(|source| filter_exception(&name, source))?;

        if is_source {
            continue;
        }
        if filter
            .inputs()
            .iter()
            .all(|input| !input.is_connected() && input.is_empty())
        {
            break;
        }
    }

    filter
        .flush(host)
        .map_err(|source| filter_exception(&name, source))?;

    for output in filter.outputs() {
        output.disconnect_all();
        output.shutdown_allocator();
    }

    Ok(())
}

fn filter_exception(filter: &str, source: FilterError) -> PipelineError {
    PipelineError::FilterException {
        filter: filter.to_string(),
        source,
    }
}

/// Spawns `body` under the policy-appropriate Tokio primitive. `body` is a
/// blocking closure (filters are synchronous, matching
/// `pipeline-common::ChannelPipeline`'s "processors are expected to be
/// synchronous" model).
pub(crate) fn spawn_under_policy(
    policy: &ExecutorPolicy,
    semaphore: Option<Arc<Semaphore>>,
    filter_name: String,
    body: impl FnOnce() -> Result<(), PipelineError> + Send + 'static,
) -> tokio::task::JoinHandle<Result<(), PipelineError>> {
    let span = info_span!("filter", name = %filter_name);
    match policy {
        ExecutorPolicy::Mono => {
            // Mono still returns a JoinHandle for a uniform call site, but
            // runs inline via spawn_blocking on the current runtime so the
            // caller can `.await` it exactly like the other policies.
            tokio::task::spawn_blocking(move || span.in_scope(body))
        }
        ExecutorPolicy::OnePerModule => tokio::task::spawn_blocking(move || span.in_scope(body)),
        ExecutorPolicy::SharedPool { .. } => {
            let semaphore = semaphore.expect("SharedPool policy requires a semaphore");
            let handle = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || {
                let _permit = handle.block_on(semaphore.acquire_owned()).unwrap();
                span.in_scope(body)
            })
        }
    }
}
