use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{FingerprintError, Result, Stage};

/// Time budget and cancellation token for one analysis
///
/// The default deadline never expires.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    until: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl Deadline {
    /// Deadline that never trips
    pub fn none() -> Self {
        Self::default()
    }

    /// Deadline `budget` from now
    pub fn after(budget: Duration) -> Self {
        Self {
            until: Some(Instant::now() + budget),
            cancelled: None,
        }
    }

    /// Deadline from an optional budget in milliseconds
    pub fn from_budget_ms(budget_ms: Option<u64>) -> Self {
        match budget_ms {
            Some(ms) => Self::after(Duration::from_millis(ms)),
            None => Self::none(),
        }
    }

    /// Also trip when `flag` is set by another thread
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    /// True once the budget is spent or the flag is set
    pub fn expired(&self) -> bool {
        if self
            .cancelled
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return true;
        }
        self.until.is_some_and(|until| Instant::now() >= until)
    }

    /// Fail with `DeadlineExceeded` for `stage` when expired
    pub fn check(&self, stage: Stage) -> Result<()> {
        if self.expired() {
            return Err(FingerprintError::DeadlineExceeded { stage });
        }
        Ok(())
    }
}
