use std::io;

use tokio::runtime::{Builder, Handle, Runtime};

/// Bounded set of threads that run packet decodes.
///
/// Backed by a Tokio runtime used only for its blocking pool: every job
/// goes through `spawn_blocking`, and at most `workers` of them run at
/// once. Extra jobs wait in the runtime's queue in submission order.
///
/// A pool either owns its runtime ([`new`](Self::new)) or borrows one
/// the application already runs ([`from_handle`](Self::from_handle)).
/// An owned runtime is shut down in the background on drop, so dropping
/// the pool never waits for decodes still in flight.
pub struct DecodePool {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl DecodePool {
    /// Start a pool with its own runtime and `workers` decode threads.
    ///
    /// # Errors
    ///
    /// Returns the runtime builder's error if threads cannot be started.
    ///
    /// # Panics
    ///
    /// Panics if `workers` is 0; [`BufferConfig::validate`] rejects that
    /// before a pool is built.
    ///
    /// [`BufferConfig::validate`]: crate::BufferConfig::validate
    pub fn new(workers: usize) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("tsbuf-decode")
            .build()?;
        let handle = runtime.handle().clone();
        log::debug!("decode pool started with {workers} workers");
        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    /// Run jobs on an existing runtime's blocking pool.
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            runtime: None,
            handle,
        }
    }

    /// Queue `job` to run on a pool thread. Jobs cannot be cancelled.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        drop(self.handle.spawn_blocking(job));
    }
}

impl Drop for DecodePool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
