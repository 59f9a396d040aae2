use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::BidsheetError;

/// Wall-clock budget and cancellation signal for one document.
///
/// The engine polls [`Deadline::check`] between pages, rows and anchors, so
/// a pathological document is abandoned at the next checkpoint instead of
/// running unbounded.
#[derive(Debug, Clone)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Deadline {
    pub fn unbounded() -> Self {
        Deadline {
            started: Instant::now(),
            budget: None,
            cancelled: None,
        }
    }

    pub fn after(budget: Duration) -> Self {
        Deadline {
            started: Instant::now(),
            budget: Some(budget),
            cancelled: None,
        }
    }

    /// Also abandon the document once `flag` is set by another thread.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        let cancelled = self
            .cancelled
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed));
        cancelled || self.budget.is_some_and(|b| self.started.elapsed() >= b)
    }

    pub fn check(&self) -> Result<(), BidsheetError> {
        if self.is_expired() {
            return Err(BidsheetError::ExtractionTimeout {
                elapsed_ms: self.elapsed().as_millis(),
            });
        }
        Ok(())
    }
}
