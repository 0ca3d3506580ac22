//! Capture status flags
//!
//! Read by an external capture orchestrator to know when a requested frame
//! has been rendered. A process-wide instance is available through
//! [`StatusFlags::global`]; controllers can also be given a private one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::Serialize;

/// Point-in-time copy of the flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub frame: u64,
    pub paused: bool,
    pub ready: bool,
}

/// Shared frame / paused / ready flags
#[derive(Debug, Default)]
pub struct StatusFlags {
    frame: AtomicU64,
    paused: AtomicBool,
    ready: AtomicBool,
}

static GLOBAL: OnceLock<Arc<StatusFlags>> = OnceLock::new();

impl StatusFlags {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Process-wide flags shared by every controller that doesn't get its own
    pub fn global() -> Arc<Self> {
        GLOBAL.get_or_init(StatusFlags::new).clone()
    }

    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_frame(&self, frame: u64) {
        self.frame.store(frame, Ordering::Release);
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn reset(&self) {
        self.set_frame(0);
        self.set_paused(false);
        self.set_ready(false);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            frame: self.frame(),
            paused: self.paused(),
            ready: self.ready(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_round_trip() {
        let flags = StatusFlags::new();
        flags.set_frame(42);
        flags.set_paused(true);
        flags.set_ready(true);
        assert_eq!(
            flags.snapshot(),
            StatusSnapshot {
                frame: 42,
                paused: true,
                ready: true
            }
        );
        flags.reset();
        assert_eq!(flags.frame(), 0);
        assert!(!flags.paused());
        assert!(!flags.ready());
    }

    #[test]
    fn test_global_is_shared() {
        let a = StatusFlags::global();
        let b = StatusFlags::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
