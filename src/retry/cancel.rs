use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic request generation counter.
///
/// Starting a new request (or cancelling) supersedes every token issued
/// before it, so a late response from an older request is never applied.
#[derive(Clone, Debug, Default)]
pub struct RequestTracker {
    latest: Arc<AtomicU64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a token and supersedes all earlier ones.
    pub fn begin(&self) -> CancelToken {
        let issued = self.latest.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        CancelToken {
            latest: Some(Arc::clone(&self.latest)),
            issued,
        }
    }

    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Debug)]
pub struct CancelToken {
    latest: Option<Arc<AtomicU64>>,
    issued: u64,
}

impl CancelToken {
    /// A token nothing can cancel.
    pub fn never() -> Self {
        Self {
            latest: None,
            issued: 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.latest
            .as_ref()
            .map(|l| l.load(Ordering::SeqCst) != self.issued)
            .unwrap_or(false)
    }
}
