use std::future::Future;

use gust_core::prelude::{ShutdownError, ShutdownHandle};

/// A wrapper around a tokio runtime that lets the synchronous worker entry
/// points drive orchestration with managed shutdown handling.
///
/// When the worker is interrupted, the executor signals all futures raced
/// through [`Executor::execute_in_place`] to stop. Long-running futures
/// should be cancellation-safe or they will hold the worker open.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown: ShutdownHandle,
}

impl Executor {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            runtime: tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?,
            shutdown: ShutdownHandle::new(),
        })
    }

    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown
    }

    /// Run async code in place, blocking until it completes or the worker
    /// shuts down.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut listener = self.shutdown.listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = listener.triggered() => {
                    Err(anyhow::anyhow!(ShutdownError::default()))
                },
            }
        })
    }

    /// Submit async code to run in the background, outside shutdown
    /// management.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}
