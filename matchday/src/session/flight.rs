//! Single-slot in-flight guard.
//!
//! At most one operation runs per slot. Callers arriving while it is running
//! join it and receive the same result; the slot frees itself once the
//! operation completes.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

pub struct SingleFlight<T: Clone> {
    name: &'static str,
    slot: Mutex<Option<Shared<BoxFuture<'static, T>>>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Run the operation built by `start`, or join the one already running.
    /// `start` is only invoked when the slot is free.
    pub async fn run<F, Fut>(&self, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(running) => {
                    debug!(flight = self.name, "joining in-flight operation");
                    running.clone()
                }
                None => {
                    let fut = start().boxed().shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        let out = flight.clone().await;

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|f| Shared::ptr_eq(f, &flight)) {
            *slot = None;
        }
        out
    }
}
