//! Cooperative shutdown signal
//!
//! Every cyclic loop polls a [`Shutdown`] once per iteration and exits
//! cleanly, without a partial output, as soon as it is set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle to a process-wide shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that all loops holding this flag exit.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once a shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let a = Shutdown::new();
        let b = a.clone();
        assert!(!b.is_requested());
        a.request();
        assert!(b.is_requested());
    }
}
