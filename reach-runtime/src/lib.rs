//! Tokio runtime for the `reach` binary.
//!
//! A run is one sequential job, so the runtime stays small: a couple of
//! workers, one shared [`CancellationToken`] that every pacer listens to, and
//! a Ctrl-C hook that trips it.
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct ReachRuntime {
    runtime: Runtime,
    cancel: CancellationToken,
}

impl ReachRuntime {
    /// Build a multi-threaded runtime with named worker threads.
    ///
    /// ```
    /// use reach_runtime::ReachRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = ReachRuntime::build("doctest-runtime", Some(1)).unwrap();
    /// assert_eq!(runtime.block_on(async { 2 + 2 }), 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str, worker_threads: Option<usize>) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name);

        if let Some(workers) = worker_threads {
            builder.worker_threads(workers.max(1));
        }

        Ok(Self {
            runtime: builder.build()?,
            cancel: CancellationToken::new(),
        })
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the shared token on the first Ctrl-C.
    ///
    /// Must be called before [`block_on`](Self::block_on) so the listener
    /// runs alongside the job.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    match res {
                        Ok(()) => {
                            warn!("runtime.ctrl_c");
                            cancel.cancel();
                        }
                        Err(e) => warn!(error = %e, "runtime.ctrl_c.unavailable"),
                    }
                }
                _ = cancel.cancelled() => {}
            }
        })
    }

    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel outstanding work and give tasks `graceful` to wind down.
    ///
    /// ```
    /// use reach_runtime::ReachRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = ReachRuntime::build("shutdown-example", Some(1)).unwrap();
    /// let cancel = runtime.cancellation();
    /// runtime.shutdown(Duration::from_millis(5));
    /// assert!(cancel.is_cancelled());
    /// ```
    pub fn shutdown(self, graceful: Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}
