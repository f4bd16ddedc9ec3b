use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Hands out one live [`FetchGeneration`] at a time.
///
/// Beginning a new attempt cancels the previous token and bumps the shared
/// generation counter, so a response that slips past transport cancellation
/// still fails its liveness check.
#[derive(Debug, Default)]
pub struct RequestCoordinator {
    current: Arc<AtomicU64>,
    active: Option<CancellationToken>,
}

#[derive(Debug, Clone)]
pub struct FetchGeneration {
    generation: u64,
    current: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl RequestCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> FetchGeneration {
        self.invalidate();

        let cancel = CancellationToken::new();
        self.active = Some(cancel.clone());

        FetchGeneration {
            generation: self.current.load(Ordering::SeqCst),
            current: Arc::clone(&self.current),
            cancel,
        }
    }

    pub fn is_live(&self, token: &FetchGeneration) -> bool {
        Arc::ptr_eq(&self.current, &token.current) && token.is_live()
    }

    /// Cancels the in-flight attempt, if any, without starting a new one.
    pub fn cancel_current(&mut self) {
        self.invalidate();
    }

    fn invalidate(&mut self) {
        if let Some(previous) = self.active.take() {
            previous.cancel();
        }
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for RequestCoordinator {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel();
        }
    }
}

impl FetchGeneration {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && self.current.load(Ordering::SeqCst) == self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        !self.is_live()
    }

    /// Completes once the attempt has been superseded or cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}
