use elicit::acquisition::{AcquisitionEngine, RoundContext};
use elicit::history::DuelHistory;
use elicit::{Error, FeatureDim, ModelId, ReachablePolicy};

use crate::fakes::{FakePosterior, Identity, Offsets, flat, offsets, peaked};

fn context<'a>(
    posterior: &'a FakePosterior,
    reachable: &'a Offsets,
) -> RoundContext<'a, (), FakePosterior> {
    RoundContext {
        config: &(),
        normalizer: &Identity,
        posterior,
        reachable,
        model_id: ModelId::default(),
        policy: ReachablePolicy::Physical,
    }
}

fn one_duel() -> DuelHistory {
    DuelHistory::from_rows(&[vec![20.0, 22.0]], &[1.0]).unwrap()
}

#[test]
fn chooses_one_reachable_candidate() {
    let posterior = FakePosterior::new(peaked);
    let reachable = offsets();
    let engine = AcquisitionEngine::new(&one_duel(), &context(&posterior, &reachable)).unwrap();
    let (result, _) = engine.eui(0, 0).unwrap();

    assert_eq!(result.mean_exp_imp.len(), engine.reachable().len());
    assert!(engine.reachable().raw().contains(&result.next_state));
    assert_eq!(result.next_state, engine.reachable().raw()[result.chosen_index]);
    assert_eq!(result.max_exp_imp, result.mean_exp_imp[result.chosen_index]);
    // Utility peaks at 23, one step above the shared state 22.
    assert_eq!(result.next_state, vec![23.0]);
}

#[test]
fn next_duel_starts_at_the_shared_state() {
    let posterior = FakePosterior::new(peaked);
    let reachable = offsets();
    let engine = AcquisitionEngine::new(&one_duel(), &context(&posterior, &reachable)).unwrap();
    let (result, _) = engine.eui(0, 0).unwrap();

    assert_eq!(engine.last_shared_state(), &[22.0]);
    assert_eq!(result.next_duel.previous(), &[22.0]);
    assert_eq!(result.next_duel.current(), result.next_state.as_slice());
}

#[test]
fn ties_resolve_to_the_first_candidate() {
    let posterior = FakePosterior::new(flat);
    let reachable = offsets();
    let engine = AcquisitionEngine::new(&one_duel(), &context(&posterior, &reachable)).unwrap();
    let (result, _) = engine.eui(0, 0).unwrap();

    assert!(
        result
            .mean_exp_imp
            .windows(2)
            .all(|w| (w[0] - w[1]).abs() < 1e-15)
    );
    assert_eq!(result.chosen_index, 0);
    assert_eq!(result.next_state, vec![20.0]);
}

#[test]
fn expected_improvement_is_never_negative() {
    let posterior = FakePosterior::new(peaked).with_variance(1e-6);
    let reachable = Offsets(vec![-8.0, -4.0, -1.0, 0.0, 1.0, 4.0, 8.0]);
    let history =
        DuelHistory::from_rows(&[vec![20.0, 22.0], vec![22.0, 23.0]], &[1.0, 1.0]).unwrap();
    let engine = AcquisitionEngine::new(&history, &context(&posterior, &reachable)).unwrap();
    let (result, diagnostics) = engine.eui(1, 0).unwrap();

    assert!(result.mean_exp_imp.iter().all(|&v| v >= 0.0));
    assert!(diagnostics.scores.per_sample.iter().all(|&v| v >= 0.0));
}

#[test]
fn best_so_far_comes_from_training_predictions() {
    let posterior = FakePosterior::new(peaked);
    let reachable = offsets();
    let history =
        DuelHistory::from_rows(&[vec![18.0, 20.0], vec![20.0, 22.0]], &[1.0, 1.0]).unwrap();
    let engine = AcquisitionEngine::new(&history, &context(&posterior, &reachable)).unwrap();
    let (_, diagnostics) = engine.eui(0, 0).unwrap();

    // Row r adds 0.01 * r; the best training utility is at state 22.
    for (row, best) in diagnostics.scores.best_so_far.iter().enumerate() {
        assert!((best - (peaked(22.0) + 0.01 * row as f64)).abs() < 1e-12);
    }
}

#[test]
fn two_feature_history_fails_before_training() {
    let posterior = FakePosterior::new(peaked);
    let reachable = offsets();
    let history = DuelHistory::from_rows(&[vec![20.0, 0.4, 22.0, 0.5]], &[1.0]).unwrap();

    let err = AcquisitionEngine::new(&history, &context(&posterior, &reachable)).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedDimensionality { width: 4, .. }
    ));
    assert_eq!(posterior.calls(), 0);
    assert_eq!(history.feature_dim().unwrap(), FeatureDim::Two);
}

#[test]
fn empty_history_is_rejected() {
    let posterior = FakePosterior::new(peaked);
    let reachable = offsets();
    let err = AcquisitionEngine::new(&DuelHistory::new(), &context(&posterior, &reachable))
        .unwrap_err();
    assert!(matches!(err, Error::EmptyHistory));
    assert_eq!(posterior.calls(), 0);
}

#[test]
fn empty_reachable_set_is_an_error() {
    let posterior = FakePosterior::new(peaked);
    let reachable = Offsets(Vec::new());
    let err = AcquisitionEngine::new(&one_duel(), &context(&posterior, &reachable)).unwrap_err();
    match err {
        Error::NoReachableStates { shared_state } => assert_eq!(shared_state, vec![22.0]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn zero_candidate_variance_is_an_error() {
    let posterior = FakePosterior::new(peaked).with_variance(0.0);
    let reachable = offsets();
    let engine = AcquisitionEngine::new(&one_duel(), &context(&posterior, &reachable)).unwrap();
    assert!(matches!(
        engine.eui(0, 0),
        Err(Error::InvalidVariance { .. })
    ));
}

#[test]
fn pure_exploration_lists_all_candidates() {
    let posterior = FakePosterior::new(peaked);
    let reachable = offsets();
    let engine = AcquisitionEngine::new(&one_duel(), &context(&posterior, &reachable)).unwrap();
    let states: Vec<f64> = engine.pure_exploration().iter().map(|s| s[0]).collect();
    assert_eq!(states, vec![20.0, 21.0, 22.0, 23.0, 24.0]);
}

#[test]
fn snapshot_captures_the_round() {
    let posterior = FakePosterior::new(peaked);
    let reachable = offsets();
    let history = one_duel();
    let engine = AcquisitionEngine::new(&history, &context(&posterior, &reachable)).unwrap();
    let (result, _) = engine.eui(4, 2).unwrap();
    let snap = engine.snapshot(&result, 4, 2);

    assert_eq!((snap.trial, snap.iter_num), (2, 4));
    assert_eq!(snap.x, vec![vec![20.0, 22.0]]);
    assert_eq!(snap.y, vec![1.0]);
    assert_eq!(snap.x_norm, snap.x);
    assert_eq!(snap.mean_exp_imp, result.mean_exp_imp);
    assert_eq!(snap.chosen_index, result.chosen_index);
    assert_eq!(snap.samples.len(), 4);
    assert_eq!(snap.mtrainmat.len(), 4);
    assert_eq!(snap.vartrainmat[0], vec![0.25]);
    assert_eq!(snap.mreachmat[0].len(), 5);
    assert_eq!(snap.varreachmat[0].len(), 5);
}
