//! Cooperative cancellation for render calls.
//!
//! The renderer never gets interrupted. Instead it polls a [`CancelSignal`]
//! at fixed [`Checkpoint`]s through a [`DeadlineGuard`], so abort points are
//! deterministic and cancellation latency is bounded by one decode/paint step.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{RenderError, RenderResult};

// ============================================================================
// Signals
// ============================================================================

/// Something a render can poll to learn it should stop.
pub trait CancelSignal {
    fn is_cancelled(&self) -> bool;
}

impl<T: CancelSignal + ?Sized> CancelSignal for &T {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

/// Wall-clock budget measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// End-to-end budget of the reference serving policy.
    pub const REFERENCE_BUDGET: Duration = Duration::from_secs(5);

    /// Starts a deadline that trips once `budget` has elapsed.
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Starts a deadline with [`Self::REFERENCE_BUDGET`].
    pub fn reference() -> Self {
        Self::after(Self::REFERENCE_BUDGET)
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the deadline trips, zero once it has.
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }
}

impl CancelSignal for Deadline {
    fn is_cancelled(&self) -> bool {
        self.elapsed() >= self.budget
    }
}

/// Shared flag another thread can trip.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl CancelSignal for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Signal that never trips.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

// ============================================================================
// Checkpoints
// ============================================================================

/// Points in the pipeline where cancellation is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Character decoded, not yet painted.
    CharacterDecoded,
    /// Character painted, mask not yet loaded.
    BeforeMask,
    /// Mask done, static layer not yet loaded.
    BeforeStatic,
    /// One card of an album or fan finished, the next not yet started.
    BetweenCards,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CharacterDecoded => "character-decoded",
            Self::BeforeMask => "before-mask",
            Self::BeforeStatic => "before-static",
            Self::BetweenCards => "between-cards",
        })
    }
}

/// Turns a [`CancelSignal`] into `Cancelled` errors at checkpoints.
pub struct DeadlineGuard<'a> {
    signal: &'a dyn CancelSignal,
}

impl<'a> DeadlineGuard<'a> {
    pub fn new(signal: &'a dyn CancelSignal) -> Self {
        Self { signal }
    }

    /// Returns `Cancelled` if the signal has tripped.
    pub fn check(&self, stage: Checkpoint) -> RenderResult<()> {
        if self.signal.is_cancelled() {
            tracing::warn!(%stage, "can't keep up, render cancelled");
            return Err(RenderError::Cancelled { stage });
        }
        Ok(())
    }
}
