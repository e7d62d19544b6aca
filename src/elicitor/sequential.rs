use crate::acquisition::{AcquisitionEngine, AcquisitionResult};
use crate::error::{Error, Result};
use crate::history::DuelHistory;
use crate::posterior::PosteriorEngine;

use super::hooks::{NoHooks, RoundHooks};
use super::{Elicitor, Round};

/// How an elicitation loop ended.
#[derive(Debug)]
pub enum LoopStatus {
    /// Every round of the budget ran (skipped rounds included).
    Completed,
    /// A hook stopped the loop; `iteration` is the first round that did
    /// not run.
    Aborted {
        /// First round that did not run.
        iteration: usize,
    },
    /// A round failed and the error hook chose to stop.
    Failed {
        /// The failed round.
        iteration: usize,
        /// Why it failed.
        error: Error,
    },
}

impl LoopStatus {
    /// Whether the loop ran its whole budget.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// What one completed round decided and observed.
#[derive(Debug)]
pub struct RoundRecord {
    /// Round index within the trial.
    pub iteration: usize,
    /// Trial the round belongs to.
    pub trial: usize,
    /// The decision.
    pub result: AcquisitionResult,
    /// The response observed for the chosen duel.
    pub response: f64,
    /// Why the snapshot could not be stored, if it could not.
    pub persistence_error: Option<Error>,
    /// Why the diagnostics sink failed, if it did.
    pub diagnostics_error: Option<Error>,
}

/// The terminal state of an elicitation loop.
#[derive(Debug)]
pub struct ElicitationOutcome<M> {
    /// The initial history followed by one duel per completed round.
    pub history: DuelHistory,
    /// The engine of the last completed round; `None` when no decision was
    /// made.
    pub engine: Option<AcquisitionEngine<M>>,
    /// One record per completed round, in order.
    pub rounds: Vec<RoundRecord>,
    /// Rounds skipped by [`RoundHooks::on_round_error`], with their errors.
    pub skipped: Vec<(usize, Error)>,
    /// How the loop ended.
    pub status: LoopStatus,
}

impl<M> ElicitationOutcome<M> {
    pub(super) fn start(history: DuelHistory) -> Self {
        Self {
            history,
            engine: None,
            rounds: Vec::new(),
            skipped: Vec::new(),
            status: LoopStatus::Completed,
        }
    }

    /// Whether any round decided a duel.
    #[must_use]
    pub fn decision_made(&self) -> bool {
        self.engine.is_some()
    }

    /// The decision of the last completed round.
    #[must_use]
    pub fn last_result(&self) -> Option<&AcquisitionResult> {
        self.rounds.last().map(|r| &r.result)
    }
}

impl<C, P> Elicitor<C, P>
where
    P: PosteriorEngine<C>,
{
    /// Run `budget` elicitation rounds starting from `initial`.
    ///
    /// Each round trains a fresh engine on the current history, selects the
    /// next duel by Expected Utility Improvement, obtains one response for
    /// it and appends both. The history only ever grows; earlier rows are
    /// never touched.
    ///
    /// With `budget == 0` no engine is built: the outcome carries the
    /// initial history and [`decision_made`](ElicitationOutcome::decision_made)
    /// is `false`.
    ///
    /// A failing round ends the loop with [`LoopStatus::Failed`]; use
    /// [`seq_learning_with`](Self::seq_learning_with) to react differently.
    pub fn seq_learning(
        &self,
        initial: DuelHistory,
        budget: usize,
        trial: usize,
    ) -> ElicitationOutcome<P::Model> {
        self.seq_learning_with(initial, budget, trial, &NoHooks)
    }

    /// Like [`seq_learning`](Self::seq_learning), with lifecycle hooks for
    /// cancellation, early stopping and error handling.
    pub fn seq_learning_with<H>(
        &self,
        initial: DuelHistory,
        budget: usize,
        trial: usize,
        hooks: &H,
    ) -> ElicitationOutcome<P::Model>
    where
        H: RoundHooks + ?Sized,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("seq_learning", trial, budget).entered();

        let mut outcome = ElicitationOutcome::start(initial);

        for iteration in 0..budget {
            if hooks.before_round(iteration, &outcome.history).is_break() {
                trace_info!(iteration, "elicitation aborted before round");
                outcome.status = LoopStatus::Aborted { iteration };
                return outcome;
            }

            #[cfg(feature = "tracing")]
            let _round = tracing::debug_span!("round", iteration).entered();

            match self.run_round(&mut outcome.history, iteration, trial) {
                Ok((engine, record)) => {
                    outcome.engine = Some(engine);
                    let flow = hooks.after_round(&record);
                    outcome.rounds.push(record);
                    if flow.is_break() {
                        trace_info!(iteration, "elicitation stopped after round");
                        outcome.status = LoopStatus::Aborted {
                            iteration: iteration + 1,
                        };
                        return outcome;
                    }
                }
                Err(error) => {
                    trace_warn!(iteration, error = %error, "round failed");
                    if hooks.on_round_error(iteration, &error).is_break() {
                        outcome.status = LoopStatus::Failed { iteration, error };
                        return outcome;
                    }
                    outcome.skipped.push((iteration, error));
                }
            }
        }

        outcome
    }

    pub(super) fn run_round(
        &self,
        history: &mut DuelHistory,
        iteration: usize,
        trial: usize,
    ) -> Result<(AcquisitionEngine<P::Model>, RoundRecord)> {
        let Round {
            engine,
            result,
            persistence_error,
            diagnostics_error,
        } = self.acquire(history, iteration, trial)?;

        let responses = self
            .responder
            .respond(core::slice::from_ref(&result.next_duel))?;
        let &[response] = responses.as_slice() else {
            return Err(Error::ResponseCountMismatch {
                expected: 1,
                got: responses.len(),
            });
        };

        history.push(result.next_duel.clone(), response)?;

        Ok((
            engine,
            RoundRecord {
                iteration,
                trial,
                result,
                response,
                persistence_error,
                diagnostics_error,
            },
        ))
    }
}
