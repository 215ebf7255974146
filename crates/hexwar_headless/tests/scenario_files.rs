//! Shipped scenario files load, validate and play.

use std::path::PathBuf;

use hexwar_headless::{run, scenario, RunConfig};

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

#[test]
fn skirmish_file_matches_fixture() {
    let from_file = scenario::load(scenario_path("skirmish.ron")).unwrap();
    assert_eq!(from_file, hexwar_test_utils::fixtures::skirmish_scenario());
}

#[test]
fn skirmish_file_validates() {
    let loaded = scenario::load(scenario_path("skirmish.ron")).unwrap();
    let summary = scenario::validate(&loaded).unwrap();
    assert_eq!(summary.bot_units, 3);
}

#[test]
fn skirmish_file_plays_deterministically() {
    let loaded = scenario::load(scenario_path("skirmish.ron")).unwrap();
    let config = RunConfig { max_turns: Some(3) };
    let first = run(&loaded, &config).unwrap();
    let second = run(&loaded, &config).unwrap();
    assert_eq!(first.state_hash, second.state_hash);
    assert!(first.turns_played <= 3);
}
