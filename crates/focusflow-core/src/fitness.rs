//! Fitness data collaborators.
//!
//! The orchestrator only needs today's cumulative step count. Platform
//! health stores plug in by implementing [`StepSource`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StepSourceError;

/// Provider of today's step count.
#[async_trait]
pub trait StepSource: Send + Sync {
    /// Cumulative steps since the start of today.
    async fn fetch_today_steps(&self) -> Result<u64, StepSourceError>;
}

/// Always reports the same count.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedStepSource(pub u64);

#[async_trait]
impl StepSource for FixedStepSource {
    async fn fetch_today_steps(&self) -> Result<u64, StepSourceError> {
        Ok(self.0)
    }
}

/// A step counter that can be updated while the orchestrator holds it.
#[derive(Debug, Clone, Default)]
pub struct SharedStepCounter {
    steps: Arc<AtomicU64>,
}

impl SharedStepCounter {
    pub fn new(steps: u64) -> Self {
        Self {
            steps: Arc::new(AtomicU64::new(steps)),
        }
    }

    pub fn set(&self, steps: u64) {
        self.steps.store(steps, Ordering::SeqCst);
    }

    /// Add `delta`, saturating at `u64::MAX`. Returns the new count.
    pub fn add(&self, delta: u64) -> u64 {
        let previous = self
            .steps
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |steps| {
                Some(steps.saturating_add(delta))
            })
            .unwrap_or_else(|steps| steps);
        previous.saturating_add(delta)
    }

    pub fn get(&self) -> u64 {
        self.steps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StepSource for SharedStepCounter {
    async fn fetch_today_steps(&self) -> Result<u64, StepSourceError> {
        Ok(self.get())
    }
}

/// Gates an inner source behind user authorization.
///
/// While unauthorized the inner source is never queried and today's count
/// reads as zero.
#[derive(Debug)]
pub struct AuthorizedStepSource<S> {
    inner: S,
    authorized: AtomicBool,
}

impl<S: StepSource> AuthorizedStepSource<S> {
    pub fn new(inner: S, authorized: bool) -> Self {
        Self {
            inner,
            authorized: AtomicBool::new(authorized),
        }
    }

    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: StepSource> StepSource for AuthorizedStepSource<S> {
    async fn fetch_today_steps(&self) -> Result<u64, StepSourceError> {
        if !self.is_authorized() {
            return Ok(0);
        }
        self.inner.fetch_today_steps().await
    }
}
