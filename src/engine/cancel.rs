//! Cooperative cancellation
//!
//! The flag is checked between steps, between attempts, and between polling
//! iterations. A command in flight is never interrupted mid-way, so context
//! mutations are never left half-applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::StepError;

#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag is set
    pub fn check(&self) -> Result<(), StepError> {
        if self.is_cancelled() {
            Err(StepError::Cancelled)
        } else {
            Ok(())
        }
    }
}
