use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::cancellation::CancellationToken;
use crate::error::{GraphError, PipelineError};
use crate::executor::{drive_to_completion, spawn_under_policy, ExecutorPolicy};
use crate::filter::{Filter, FilterHost, TracingHost};
use crate::pin::Input;

/// Identifies a filter previously added to a [`Pipeline`].
pub type FilterId = usize;

/// References an Output pin by filter id and index (spec §4.1 `OutputPin`).
#[derive(Debug, Clone, Copy)]
pub struct OutputPin {
    pub filter: FilterId,
    pub index: usize,
}

/// References an Input pin by filter id and index (spec §4.1 `InputPin`).
#[derive(Debug, Clone, Copy)]
pub struct InputPin {
    pub filter: FilterId,
    pub index: usize,
}

struct Node {
    name: String,
    filter: Box<dyn Filter>,
    host: Arc<TracingHost>,
}

struct SharedState {
    remaining: Mutex<usize>,
    condvar: Condvar,
    exception: Mutex<Option<PipelineError>>,
}

impl SharedState {
    fn notify_eos(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        *remaining = remaining.saturating_sub(1);
        self.condvar.notify_all();
    }

    fn set_exception(&self, error: PipelineError) {
        let mut exception = self.exception.lock().unwrap();
        if exception.is_none() {
            *exception = Some(error);
        }
        self.condvar.notify_all();
    }
}

/// The graph manager (spec §4.1 "Pipeline"): constructs filters, manages
/// connections, starts sources, counts EOS notifications to termination,
/// and propagates exceptions.
///
/// Not thread-safe to build (mirrors the original's `/* not thread-safe */`
/// note on the build phase); once `start()` is called ownership of every
/// filter moves into its executor task.
pub struct Pipeline {
    policy: ExecutorPolicy,
    semaphore: Option<Arc<Semaphore>>,
    nodes: HashMap<FilterId, Node>,
    next_id: FilterId,
    token: CancellationToken,
    shared: Arc<SharedState>,
    tasks: Vec<JoinHandle<Result<(), PipelineError>>>,
    started: bool,
}

impl Pipeline {
    pub fn new(policy: ExecutorPolicy) -> Self {
        let semaphore = match &policy {
            ExecutorPolicy::SharedPool { max_concurrency } => {
                Some(Arc::new(Semaphore::new(*max_concurrency)))
            }
            _ => None,
        };
        Self {
            policy,
            semaphore,
            nodes: HashMap::new(),
            next_id: 0,
            token: CancellationToken::new(),
            shared: Arc::new(SharedState {
                remaining: Mutex::new(0),
                condvar: Condvar::new(),
                exception: Mutex::new(None),
            }),
            tasks: Vec::new(),
            started: false,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Instantiate and register a filter, returning a stable id used in
    /// later `connect` calls.
    pub fn add(&mut self, name: impl Into<String>, filter: Box<dyn Filter>) -> FilterId {
        let id = self.next_id;
        self.next_id += 1;
        let name = name.into();
        let host = Arc::new(TracingHost::new(name.clone()));
        self.nodes.insert(id, Node { name, filter, host });
        id
    }

    /// Remove a filter not currently connected on any pin (spec §4.1
    /// "Remove a module from a pipeline. This is only possible when the
    /// module is disconnected and flush()ed").
    pub fn remove_module(&mut self, id: FilterId) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| GraphError::UnknownFilter(id.to_string()))?;
        let still_connected = node.filter.inputs().iter().any(|i| i.is_connected())
            || node.filter.outputs().iter().any(|o| o.is_connected());
        if still_connected {
            return Err(GraphError::StillConnected(node.name.clone()));
        }
        self.nodes.remove(&id);
        Ok(())
    }

    fn input_pin(&self, pin: InputPin) -> Result<Arc<Input>, GraphError> {
        let node = self
            .nodes
            .get(&pin.filter)
            .ok_or_else(|| GraphError::UnknownFilter(pin.filter.to_string()))?;
        node.filter
            .inputs()
            .get(pin.index)
            .cloned()
            .ok_or_else(|| GraphError::InputOutOfRange {
                filter: node.name.clone(),
                index: pin.index,
                num_inputs: node.filter.inputs().len(),
            })
    }

    /// Register an edge from an Output to an Input (spec §4.1 step 1).
    pub fn connect(
        &mut self,
        out: OutputPin,
        inp: InputPin,
        allow_multiple_connections: bool,
    ) -> Result<(), GraphError> {
        let input = self.input_pin(inp)?;
        if !allow_multiple_connections && input.is_connected() {
            let in_node = &self.nodes[&inp.filter];
            return Err(GraphError::InputAlreadyConnected {
                filter: in_node.name.clone(),
                index: inp.index,
            });
        }

        let out_node = self
            .nodes
            .get(&out.filter)
            .ok_or_else(|| GraphError::UnknownFilter(out.filter.to_string()))?;
        let output =
            out_node
                .filter
                .outputs()
                .get(out.index)
                .ok_or_else(|| GraphError::OutputOutOfRange {
                    filter: out_node.name.clone(),
                    index: out.index,
                    num_outputs: out_node.filter.outputs().len(),
                })?;
        output.connect(input);
        Ok(())
    }

    pub fn disconnect(&mut self, out: OutputPin) -> Result<(), GraphError> {
        let out_node = self
            .nodes
            .get(&out.filter)
            .ok_or_else(|| GraphError::UnknownFilter(out.filter.to_string()))?;
        let output =
            out_node
                .filter
                .outputs()
                .get(out.index)
                .ok_or_else(|| GraphError::OutputOutOfRange {
                    filter: out_node.name.clone(),
                    index: out.index,
                    num_outputs: out_node.filter.outputs().len(),
                })?;
        output.disconnect_all();
        Ok(())
    }

    /// Compute topology, activate sources, and spawn every filter's
    /// executor task (spec §4.1 steps 2-3).
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        *self.shared.remaining.lock().unwrap() = self.nodes.len();

        let nodes = std::mem::take(&mut self.nodes);
        for (_, node) in nodes {
            let Node {
                name,
                mut filter,
                host,
            } = node;
            host.activate(filter.is_source());

            let policy = self.policy.clone();
            let semaphore = self.semaphore.clone();
            let token = self.token.clone();
            let shared = self.shared.clone();

            let handle = spawn_under_policy(&policy, semaphore, name, move || {
                let result = drive_to_completion(filter.as_mut(), host.as_ref(), &token);
                shared.notify_eos();
                if let Err(err) = result {
                    shared.set_exception(err);
                }
                Ok(())
            });
            self.tasks.push(handle);
        }
    }

    /// Block (async) until every filter has reported end-of-stream, or
    /// rethrow the first exception raised by any filter (spec §4.1 step 5).
    pub async fn wait_for_end_of_stream(&self) -> Result<(), PipelineError> {
        loop {
            if let Some(err) = self.shared.exception.lock().unwrap().take() {
                return Err(err);
            }
            if *self.shared.remaining.lock().unwrap() == 0 {
                return Ok(());
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }

    /// Join every spawned executor task (called after
    /// `wait_for_end_of_stream` returns, to release filters cleanly).
    pub async fn join(&mut self) -> Result<(), PipelineError> {
        for task in self.tasks.drain(..) {
            match task.await {
                Ok(result) => result?,
                Err(join_err) if join_err.is_panic() => {
                    return Err(PipelineError::ExecutorPanic(join_err.to_string()))
                }
                Err(_) => {}
            }
        }
        Ok(())
    }

    /// Ask every source filter to stop, cascading end-of-stream through the
    /// graph (spec §4.1 step 6).
    pub fn exit_sync(&self) {
        self.token.cancel();
    }
}
