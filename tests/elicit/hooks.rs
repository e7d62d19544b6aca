use core::ops::ControlFlow;
use std::cell::RefCell;

use elicit::history::DuelHistory;
use elicit::{Cancellation, Elicitor, Error, LoopStatus, RoundHooks, RoundRecord};

use crate::fakes::{FakePosterior, Identity, Offsets, offsets, peaked, towards_23};

fn elicitor() -> Elicitor<(), FakePosterior> {
    Elicitor::builder((), FakePosterior::new(peaked))
        .normalizer(Identity)
        .reachable(offsets())
        .responder(towards_23)
        .build()
        .unwrap()
}

fn seed_history() -> DuelHistory {
    DuelHistory::from_rows(&[vec![20.0, 22.0]], &[1.0]).unwrap()
}

struct CancelAt(usize);

impl RoundHooks for CancelAt {
    fn before_round(&self, iteration: usize, _history: &DuelHistory) -> ControlFlow<()> {
        if iteration == self.0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

#[test]
fn before_round_break_aborts_without_truncating() {
    let outcome = elicitor().seq_learning_with(seed_history(), 5, 0, &CancelAt(2));

    assert!(matches!(outcome.status, LoopStatus::Aborted { iteration: 2 }));
    assert_eq!(outcome.history.len(), 3);
    assert_eq!(outcome.rounds.len(), 2);
    assert!(outcome.decision_made());
}

#[test]
fn tripped_cancellation_stops_before_the_first_round() {
    let cancel = Cancellation::new();
    cancel.clone().cancel();

    let e = elicitor();
    let outcome = e.seq_learning_with(seed_history(), 3, 0, &cancel);
    assert!(matches!(outcome.status, LoopStatus::Aborted { iteration: 0 }));
    assert!(!outcome.decision_made());
    assert_eq!(outcome.history, seed_history());
    assert_eq!(e.posterior().calls(), 0);
}

struct StopAfterFirst;

impl RoundHooks for StopAfterFirst {
    fn after_round(&self, _record: &RoundRecord) -> ControlFlow<()> {
        ControlFlow::Break(())
    }
}

#[test]
fn after_round_break_keeps_the_finished_round() {
    let outcome = elicitor().seq_learning_with(seed_history(), 4, 0, &StopAfterFirst);

    assert!(matches!(outcome.status, LoopStatus::Aborted { iteration: 1 }));
    assert_eq!(outcome.history.len(), 2);
    assert_eq!(outcome.rounds.len(), 1);
}

#[derive(Default)]
struct SkipErrors {
    seen: RefCell<Vec<usize>>,
}

impl RoundHooks for SkipErrors {
    fn on_round_error(&self, iteration: usize, _error: &Error) -> ControlFlow<()> {
        self.seen.borrow_mut().push(iteration);
        ControlFlow::Continue(())
    }
}

#[test]
fn skipped_rounds_leave_history_unchanged() {
    let e = Elicitor::builder((), FakePosterior::new(peaked))
        .normalizer(Identity)
        .reachable(Offsets(Vec::new()))
        .responder(towards_23)
        .build()
        .unwrap();
    let hooks = SkipErrors::default();

    let outcome = e.seq_learning_with(seed_history(), 3, 0, &hooks);
    assert!(outcome.status.is_completed());
    assert_eq!(*hooks.seen.borrow(), vec![0, 1, 2]);
    assert_eq!(outcome.skipped.len(), 3);
    assert!(
        outcome
            .skipped
            .iter()
            .all(|(_, e)| matches!(e, Error::NoReachableStates { .. }))
    );
    assert_eq!(outcome.history, seed_history());
    assert!(!outcome.decision_made());
}

#[test]
fn hooks_see_the_growing_history() {
    struct Lengths(RefCell<Vec<usize>>);

    impl RoundHooks for Lengths {
        fn before_round(&self, _iteration: usize, history: &DuelHistory) -> ControlFlow<()> {
            self.0.borrow_mut().push(history.len());
            ControlFlow::Continue(())
        }
    }

    let hooks = Lengths(RefCell::new(Vec::new()));
    elicitor().seq_learning_with(seed_history(), 3, 0, &hooks);
    assert_eq!(*hooks.0.borrow(), vec![1, 2, 3]);
}
