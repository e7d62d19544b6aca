use elicit::config::ElicitConfig;
use elicit::history::{Duel, DuelHistory};
use elicit::normalize::BoundsNormalizer;
use elicit::posterior::SampledGp;
use elicit::reachable::GridReachability;
use elicit::{Elicitor, Error, LoopStatus, ModelId, ReachablePolicy};

use crate::fakes::{FakePosterior, Identity, offsets, peaked, towards_23};

#[test]
fn defaults() {
    let e = Elicitor::builder((), FakePosterior::new(peaked))
        .normalizer(Identity)
        .reachable(offsets())
        .responder(towards_23)
        .build()
        .unwrap();

    assert_eq!(e.model_id(), ModelId(2));
    assert_eq!(e.policy(), ReachablePolicy::Grid1D);
    assert!(e.store().iterations(0).unwrap().is_empty());
}

#[test]
fn overrides() {
    let e = Elicitor::builder((), FakePosterior::new(peaked))
        .normalizer(Identity)
        .reachable(offsets())
        .responder(towards_23)
        .model(ModelId(1))
        .policy(ReachablePolicy::Physical)
        .build()
        .unwrap();

    assert_eq!(e.model_id(), ModelId(1));
    assert_eq!(e.policy(), ReachablePolicy::Physical);
    assert_eq!(e.context().policy, ReachablePolicy::Physical);
}

#[test]
fn missing_collaborators_are_config_errors() {
    let no_normalizer = Elicitor::builder((), FakePosterior::new(peaked))
        .reachable(offsets())
        .responder(towards_23)
        .build();
    assert!(matches!(no_normalizer, Err(Error::Config(msg)) if msg.contains("normalizer")));

    let no_reachable = Elicitor::builder((), FakePosterior::new(peaked))
        .normalizer(Identity)
        .responder(towards_23)
        .build();
    assert!(matches!(no_reachable, Err(Error::Config(msg)) if msg.contains("reachable")));

    let no_responder = Elicitor::builder((), FakePosterior::new(peaked))
        .normalizer(Identity)
        .reachable(offsets())
        .build();
    assert!(matches!(no_responder, Err(Error::Config(msg)) if msg.contains("response")));
}

#[test]
fn thermal_rejects_invalid_config() {
    let config = ElicitConfig {
        bounds: (30.0, 18.0),
        ..ElicitConfig::default()
    };
    assert!(matches!(Elicitor::thermal(config), Err(Error::Config(_))));
}

#[test]
fn reference_collaborators_assemble_by_hand() {
    let e = Elicitor::builder(ElicitConfig::default(), SampledGp)
        .normalizer(BoundsNormalizer)
        .reachable(GridReachability)
        .responder(|d: &Duel| if d.current()[0] < d.previous()[0] { 1.0 } else { 0.0 })
        .model(ModelId(1))
        .build()
        .unwrap();
    assert_eq!(e.config().bounds, (18.0, 30.0));
}

#[test]
fn unvalidated_zero_grid_step_fails_the_round() {
    let config = ElicitConfig {
        grid_step: 0.0,
        ..ElicitConfig::default()
    }
    .with_gp_seed(5)
    .with_gp_samples(4, 10);
    let e = Elicitor::builder(config, SampledGp)
        .normalizer(BoundsNormalizer)
        .reachable(GridReachability)
        .responder(|_: &Duel| 1.0)
        .build()
        .unwrap();

    let history = DuelHistory::from_rows(&[vec![20.0, 22.0]], &[1.0]).unwrap();
    let outcome = e.seq_learning(history.clone(), 1, 0);
    assert!(matches!(
        outcome.status,
        LoopStatus::Failed {
            iteration: 0,
            error: Error::Config(_)
        }
    ));
    assert_eq!(outcome.history, history);
    assert!(e.store().iterations(0).unwrap().is_empty());
}
