use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-holder flag marking a commit in progress.
///
/// Cloned into the ingress side so triggers can be dropped before they are
/// queued. Entering is a `compare_exchange`; the returned guard releases on
/// drop, including on early return.
#[derive(Debug, Clone, Default)]
pub struct CommitGate {
    held: Arc<AtomicBool>,
}

impl CommitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate, or `None` if another commit holds it.
    pub fn try_enter(&self) -> Option<CommitGuard> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CommitGuard {
                held: Arc::clone(&self.held),
            })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

#[must_use = "the gate is released when the guard is dropped"]
pub struct CommitGuard {
    held: Arc<AtomicBool>,
}

impl Drop for CommitGuard {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}
