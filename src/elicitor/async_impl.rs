use std::sync::Arc;

use crate::error::Error;
use crate::history::DuelHistory;
use crate::posterior::PosteriorEngine;

use super::hooks::RoundHooks;
use super::sequential::{ElicitationOutcome, LoopStatus};
use super::Elicitor;

impl<C, P> Elicitor<C, P>
where
    C: Send + Sync + 'static,
    P: PosteriorEngine<C> + 'static,
    P::Model: Send + 'static,
{
    /// Run elicitation rounds without blocking the async runtime.
    ///
    /// Like [`seq_learning_with`](Self::seq_learning_with), but each round's
    /// training, scoring and response collection run inside
    /// [`spawn_blocking`](tokio::task::spawn_blocking). Rounds stay strictly
    /// sequential. Hooks run on the calling task.
    ///
    /// A panicking round surfaces as [`Error::TaskError`] and is handed to
    /// [`RoundHooks::on_round_error`]; the history is left as it was before
    /// that round.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use elicit::prelude::*;
    ///
    /// # #[cfg(feature = "async")]
    /// # async fn example() -> elicit::Result<()> {
    /// let config = ElicitConfig::default().with_gp_seed(3).with_gp_samples(8, 20);
    /// let elicitor = Arc::new(Elicitor::thermal(config)?);
    /// let history = DuelHistory::from_rows(&[vec![20.0, 22.0]], &[1.0])?;
    ///
    /// let outcome = elicitor.seq_learning_async(history, 2, 0, &NoHooks).await;
    /// assert_eq!(outcome.history.len(), 3);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn seq_learning_async<H>(
        self: &Arc<Self>,
        initial: DuelHistory,
        budget: usize,
        trial: usize,
        hooks: &H,
    ) -> ElicitationOutcome<P::Model>
    where
        H: RoundHooks + ?Sized,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("seq_learning_async", trial, budget).entered();

        let mut outcome = ElicitationOutcome::start(initial);

        for iteration in 0..budget {
            if hooks.before_round(iteration, &outcome.history).is_break() {
                trace_info!(iteration, "elicitation aborted before round");
                outcome.status = LoopStatus::Aborted { iteration };
                return outcome;
            }

            let this = Arc::clone(self);
            let mut history = outcome.history.clone();
            let joined = tokio::task::spawn_blocking(move || {
                let res = this.run_round(&mut history, iteration, trial);
                res.map(|(engine, record)| (history, engine, record))
            })
            .await;

            let round = joined
                .map_err(|e| Error::TaskError(e.to_string()))
                .and_then(|res| res);

            match round {
                Ok((history, engine, record)) => {
                    outcome.history = history;
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
}
