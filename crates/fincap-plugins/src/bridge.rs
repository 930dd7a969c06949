//! Synchronous invocation of asynchronous remote tool calls.
//!
//! [`Tool::invoke`] is synchronous, but remote calls are futures. The
//! [`RuntimeBridge`] drives such a future to completion from whatever
//! thread the caller is on:
//!
//! - Outside any Tokio runtime: a fresh current-thread runtime is built on
//!   the calling thread and blocked on.
//! - Inside a runtime: blocking that runtime's thread on itself would
//!   panic, and handing the future back to the caller's runtime deadlocks a
//!   current-thread runtime whose only thread is the one blocked. A scoped
//!   OS thread with its own fresh runtime runs the future instead, and the
//!   caller blocks until that thread is joined.
//!
//! Both strategies bound the call with a timeout.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fincap_mcp::{RemoteClient, RemoteTool};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{PluginError, PluginResult};
use crate::synthesis;
use crate::tool::{Tool, ToolInput};

/// Name given to dedicated bridge threads.
pub const BRIDGE_THREAD_NAME: &str = "fincap-bridge";

type AsyncContextProbe = dyn Fn() -> bool + Send + Sync;

fn tokio_context_present() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

/// Runs futures to completion from synchronous code.
#[derive(Clone)]
pub struct RuntimeBridge {
    inside_async: Arc<AsyncContextProbe>,
    timeout: Duration,
}

impl fmt::Debug for RuntimeBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeBridge")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RuntimeBridge {
    /// A bridge that detects async context by probing for a Tokio handle.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            inside_async: Arc::new(tokio_context_present),
            timeout,
        }
    }

    /// Replace the "already inside async context" predicate.
    #[must_use]
    pub fn with_probe<F>(mut self, probe: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.inside_async = Arc::new(probe);
        self
    }

    /// Per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the predicate reports an enclosing async context.
    #[must_use]
    pub fn is_inside_async(&self) -> bool {
        (self.inside_async)()
    }

    /// Run `fut` with the strategy the predicate selects.
    ///
    /// # Errors
    ///
    /// Returns the future's error, or [`PluginError::ToolInvocation`] on
    /// timeout, runtime construction failure, or a panic on the dedicated
    /// thread.
    pub fn run<F, T>(&self, tool: &str, fut: F) -> PluginResult<T>
    where
        F: Future<Output = PluginResult<T>> + Send,
        T: Send,
    {
        if self.is_inside_async() {
            self.run_on_dedicated_thread(tool, fut)
        } else {
            self.run_on_current_thread(tool, fut)
        }
    }

    /// Drive `fut` on a fresh current-thread runtime on this thread.
    ///
    /// Must not be called from inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_on_current_thread<F, T>(&self, tool: &str, fut: F) -> PluginResult<T>
    where
        F: Future<Output = PluginResult<T>>,
    {
        debug!(tool, "Bridging call on the current thread");
        block_on_fresh(tool, self.timeout, fut)
    }

    /// Drive `fut` on a scoped thread that owns a fresh runtime, blocking
    /// until the thread has been joined.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_on_dedicated_thread<F, T>(&self, tool: &str, fut: F) -> PluginResult<T>
    where
        F: Future<Output = PluginResult<T>> + Send,
        T: Send,
    {
        debug!(tool, "Bridging call on a dedicated thread");
        let timeout = self.timeout;
        std::thread::scope(|scope| {
            let handle = std::thread::Builder::new()
                .name(BRIDGE_THREAD_NAME.to_string())
                .spawn_scoped(scope, move || block_on_fresh(tool, timeout, fut))
                .map_err(|e| PluginError::invocation(tool, format!("cannot spawn bridge thread: {e}")))?;

            handle.join().map_err(|_| {
                warn!(tool, "Bridge thread panicked");
                PluginError::invocation(tool, "bridge thread panicked")
            })?
        })
    }
}

fn block_on_fresh<F, T>(tool: &str, timeout: Duration, fut: F) -> PluginResult<T>
where
    F: Future<Output = PluginResult<T>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PluginError::invocation(tool, format!("cannot build runtime: {e}")))?;

    runtime.block_on(async move {
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PluginError::invocation(
                tool,
                format!("timed out after {}s", timeout.as_secs_f64()),
            )),
        }
    })
}

/// Wraps remote catalog entries as synchronous [`Tool`]s.
#[derive(Debug, Clone)]
pub struct InvocationBridge {
    client: Arc<RemoteClient>,
    runtime: RuntimeBridge,
}

impl InvocationBridge {
    /// Bridge calls through `client` with the given runtime strategy.
    #[must_use]
    pub fn new(client: Arc<RemoteClient>, runtime: RuntimeBridge) -> Self {
        Self { client, runtime }
    }

    /// The runtime strategy in use.
    #[must_use]
    pub fn runtime(&self) -> &RuntimeBridge {
        &self.runtime
    }

    /// Build a tool whose `invoke` synthesizes arguments from free text,
    /// calls the remote tool, and maps every failure to an error.
    #[must_use]
    pub fn bridge(&self, remote: &RemoteTool) -> Tool {
        let client = Arc::clone(&self.client);
        let runtime = self.runtime.clone();
        let spec = remote.clone();

        Tool::new(
            remote.name.clone(),
            remote.description.clone(),
            move |input: ToolInput| {
                let args = match input {
                    ToolInput::Structured(map) => Value::Object(map),
                    ToolInput::Text(text) => synthesis::synthesize(&spec, &text)?,
                };
                call_remote(&client, &runtime, &spec, args)
            },
        )
        .with_schema(remote.input_schema.clone())
    }
}

fn call_remote(
    client: &RemoteClient,
    runtime: &RuntimeBridge,
    spec: &RemoteTool,
    args: Value,
) -> PluginResult<Value> {
    let name = spec.name.as_str();
    let result = runtime.run(name, async {
        client
            .call_tool(&spec.category, name, args)
            .await
            .map_err(|e| PluginError::invocation(name, e))
    })?;

    if result.is_error {
        let cause = result
            .error
            .unwrap_or_else(|| "remote reported an error".to_string());
        return Err(PluginError::invocation(name, cause));
    }
    Ok(result.content)
}
