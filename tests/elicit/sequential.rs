use elicit::history::{Duel, DuelHistory};
use elicit::storage::{MemorySnapshotStore, SnapshotStore};
use elicit::{Elicitor, Error, LoopStatus};

use crate::fakes::{
    BrokenSink, BrokenStore, Chatty, FakePosterior, Identity, Offsets, offsets, peaked, towards_23,
};

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

#[test]
fn two_rounds_from_one_duel() {
    let outcome = elicitor().seq_learning(seed_history(), 2, 0);

    assert!(outcome.status.is_completed());
    assert!(outcome.decision_made());
    assert_eq!(outcome.history.len(), 3);
    assert_eq!(outcome.history.responses().len(), 3);
    assert_eq!(outcome.rounds.len(), 2);

    let duels = outcome.history.duels();
    assert_eq!(duels[1].previous(), duels[0].current());
    assert_eq!(duels[2].previous(), duels[1].current());
}

#[test]
fn history_grows_by_one_and_keeps_earlier_rows() {
    let initial = DuelHistory::from_rows(
        &[vec![19.0, 20.5], vec![20.5, 21.25]],
        &[1.0, 1.0],
    )
    .unwrap();
    let before: Vec<Vec<u64>> = initial
        .rows()
        .iter()
        .map(|r| r.iter().map(|v| v.to_bits()).collect())
        .collect();

    let outcome = elicitor().seq_learning(initial, 1, 0);
    assert_eq!(outcome.history.len(), 3);

    let after: Vec<Vec<u64>> = outcome.history.rows()[..2]
        .iter()
        .map(|r| r.iter().map(|v| v.to_bits()).collect())
        .collect();
    assert_eq!(before, after);
    assert_eq!(outcome.history.responses()[..2], [1.0, 1.0]);
}

#[test]
fn recorded_responses_come_from_the_responder() {
    let outcome = elicitor().seq_learning(seed_history(), 3, 0);
    for (record, duel) in outcome.rounds.iter().zip(&outcome.history.duels()[1..]) {
        assert_eq!(&record.result.next_duel, duel);
        assert_eq!(record.response, towards_23(duel));
    }
}

#[test]
fn walks_towards_the_utility_peak() {
    let outcome = elicitor().seq_learning(seed_history(), 3, 0);
    let last = outcome.history.duels().last().map(|d| d.current()[0]);
    assert_eq!(last, Some(23.0));
}

#[test]
fn zero_budget_makes_no_decision() {
    let e = elicitor();
    let outcome = e.seq_learning(seed_history(), 0, 0);

    assert!(!outcome.decision_made());
    assert!(outcome.engine.is_none());
    assert!(outcome.status.is_completed());
    assert_eq!(outcome.history, seed_history());
    assert_eq!(e.posterior().calls(), 0);
    assert!(outcome.last_result().is_none());
}

#[test]
fn one_snapshot_per_round() {
    let e = elicitor();
    let outcome = e.seq_learning(seed_history(), 3, 5);

    assert_eq!(e.store().iterations(5).unwrap(), vec![0, 1, 2]);
    for record in &outcome.rounds {
        let snap = e.store().load(5, record.iteration).unwrap().unwrap();
        assert_eq!(snap.mean_exp_imp, record.result.mean_exp_imp);
        assert_eq!(snap.next_duel, record.result.next_duel);
        assert_eq!(snap.x.len(), 1 + record.iteration);
        assert!(record.persistence_error.is_none());
    }
}

#[test]
fn two_feature_history_stops_before_training() {
    let e = elicitor();
    let initial = DuelHistory::from_rows(&[vec![20.0, 0.4, 22.0, 0.5]], &[1.0]).unwrap();
    let outcome = e.seq_learning(initial.clone(), 2, 0);

    match outcome.status {
        LoopStatus::Failed {
            iteration: 0,
            error: Error::UnsupportedDimensionality { width: 4, .. },
        } => {}
        other => panic!("unexpected status: {other:?}"),
    }
    assert_eq!(e.posterior().calls(), 0);
    assert_eq!(outcome.history, initial);
    assert!(!outcome.decision_made());
}

#[test]
fn no_reachable_states_persists_nothing() {
    let store = MemorySnapshotStore::new();
    let e = Elicitor::builder((), FakePosterior::new(peaked))
        .normalizer(Identity)
        .reachable(Offsets(Vec::new()))
        .responder(towards_23)
        .store(store)
        .build()
        .unwrap();

    let outcome = e.seq_learning(seed_history(), 2, 0);
    assert!(matches!(
        outcome.status,
        LoopStatus::Failed {
            iteration: 0,
            error: Error::NoReachableStates { .. }
        }
    ));
    assert!(e.store().iterations(0).unwrap().is_empty());
    assert_eq!(outcome.history.len(), 1);
}

#[test]
fn persistence_failure_keeps_the_decision() {
    let e = Elicitor::builder((), FakePosterior::new(peaked))
        .normalizer(Identity)
        .reachable(offsets())
        .responder(towards_23)
        .store(BrokenStore)
        .build()
        .unwrap();

    let outcome = e.seq_learning(seed_history(), 2, 0);
    assert!(outcome.status.is_completed());
    assert_eq!(outcome.history.len(), 3);
    assert!(outcome.rounds.iter().all(|r| matches!(
        r.persistence_error,
        Some(Error::Persistence(_))
    )));
    assert_eq!(outcome.rounds[0].result.next_state, vec![23.0]);
}

#[test]
fn diagnostics_failure_keeps_the_decision() {
    let e = Elicitor::builder((), FakePosterior::new(peaked))
        .normalizer(Identity)
        .reachable(offsets())
        .responder(towards_23)
        .diagnostics(BrokenSink)
        .build()
        .unwrap();

    let outcome = e.seq_learning(seed_history(), 1, 0);
    assert!(outcome.status.is_completed());
    let round = &outcome.rounds[0];
    assert!(matches!(round.diagnostics_error, Some(Error::Diagnostics(_))));
    assert!(round.persistence_error.is_none());
    assert_eq!(round.result.next_state, vec![23.0]);
}

#[test]
fn one_response_per_duel_is_required() {
    let e = Elicitor::builder((), FakePosterior::new(peaked))
        .normalizer(Identity)
        .reachable(offsets())
        .responder(Chatty)
        .build()
        .unwrap();

    let outcome = e.seq_learning(seed_history(), 1, 0);
    assert!(matches!(
        outcome.status,
        LoopStatus::Failed {
            error: Error::ResponseCountMismatch {
                expected: 1,
                got: 2
            },
            ..
        }
    ));
    assert_eq!(outcome.history.len(), 1);
}

#[test]
fn closures_answer_duels() {
    let e = Elicitor::builder((), FakePosterior::new(peaked))
        .normalizer(Identity)
        .reachable(offsets())
        .responder(|_: &Duel| 0.0)
        .build()
        .unwrap();

    let outcome = e.seq_learning(seed_history(), 2, 0);
    assert_eq!(outcome.history.responses(), &[1.0, 0.0, 0.0]);
}
