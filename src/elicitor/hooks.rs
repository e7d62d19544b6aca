//! Per-round lifecycle hooks for the elicitation loop.

use core::ops::ControlFlow;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::RoundRecord;
use crate::error::Error;
use crate::history::DuelHistory;

/// Lifecycle hooks called by [`Elicitor::seq_learning_with`](super::Elicitor::seq_learning_with).
///
/// Every method has a default, so implementors override only what they
/// need.
///
/// # Examples
///
/// Stop as soon as the best expected improvement gets small:
///
/// ```
/// use std::ops::ControlFlow;
///
/// use elicit::{RoundHooks, RoundRecord};
///
/// struct StopWhenFlat(f64);
///
/// impl RoundHooks for StopWhenFlat {
///     fn after_round(&self, record: &RoundRecord) -> ControlFlow<()> {
///         if record.result.max_exp_imp < self.0 {
///             ControlFlow::Break(())
///         } else {
///             ControlFlow::Continue(())
///         }
///     }
/// }
/// ```
pub trait RoundHooks {
    /// Called before round `iteration` starts. `Break` aborts the loop
    /// without running the round.
    fn before_round(&self, _iteration: usize, _history: &DuelHistory) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called after a round's response has been appended. `Break` aborts
    /// the loop before the next round.
    fn after_round(&self, _record: &RoundRecord) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called when a round fails. `Break` ends the loop with
    /// [`LoopStatus::Failed`](super::LoopStatus::Failed); `Continue` skips
    /// the round and leaves the history unchanged.
    ///
    /// The default breaks on every [round-fatal](Error::is_round_fatal)
    /// error and skips the rest.
    fn on_round_error(&self, _iteration: usize, error: &Error) -> ControlFlow<()> {
        if error.is_round_fatal() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Hooks that never intervene.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl RoundHooks for NoHooks {}

/// A cancellation flag that can be tripped from another thread.
///
/// Cancellation takes effect before the next round starts; a round in
/// progress is finished.
///
/// ```
/// use elicit::Cancellation;
///
/// let cancel = Cancellation::new();
/// let handle = cancel.clone();
/// handle.cancel();
/// assert!(cancel.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// A fresh, untripped flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl RoundHooks for Cancellation {
    fn before_round(&self, _iteration: usize, _history: &DuelHistory) -> ControlFlow<()> {
        if self.is_cancelled() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
