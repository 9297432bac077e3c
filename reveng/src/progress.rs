//! Run progress reporting and cooperative cancellation (§4.8, §5).

use bsr::PinRef;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-way progress message from the engine to the caller (§9
/// "Coroutine-like progress").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Init,
    Scanning {
        driver: PinRef,
        index: usize,
        total: usize,
        nets_found: usize,
    },
    Finalizing {
        total: usize,
    },
}

/// A cheaply-cloneable, poll-only cancellation signal (§5
/// "Cancellation"). Checked between driver iterations and before
/// `EnterExtest`; in-flight adapter calls are never interrupted.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled_and_latches() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
