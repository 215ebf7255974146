//! Headless battle runner.
//!
//! Deploys the scenario's allocations automatically, then plays the player
//! side with a greedy autopilot against the built-in bot until the battle
//! completes or the turn cap is reached. Everything goes through the public
//! [`BattleEngine`] API, the same surface an interactive front end uses.

use std::cell::RefCell;
use std::rc::Rc;

use hexwar_core::air::{AirMissionReport, AirMissionRequest, MissionKind, SquadronStatus};
use hexwar_core::battle::BattleUnit;
use hexwar_core::bot::{attack_score, BotTurnSummary};
use hexwar_core::engine::{BattleEngine, BattleOutcome, EngineEvent, ObjectiveState};
use hexwar_core::hex::{hex_key, Axial};
use hexwar_core::reserves::{ReserveEntry, ReserveStatus};
use hexwar_core::scenario::Scenario;
use hexwar_core::turn::{Faction, Phase, SupplyTickReport};
use hexwar_core::units::UnitClass;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scenario::ScenarioError;

/// Runner configuration.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Stop after this many player turns even if the battle is still open.
    pub max_turns: Option<u32>,
}

/// Final state of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    /// Display label.
    pub label: String,
    /// Unit type key.
    pub type_key: String,
    /// Position as a `"col,row"` key.
    pub hex: String,
    /// Remaining strength.
    pub strength: i32,
    /// Experience level.
    pub experience: u8,
}

impl From<&BattleUnit> for UnitReport {
    fn from(unit: &BattleUnit) -> Self {
        Self {
            label: unit.label.clone(),
            type_key: unit.unit.type_key.clone(),
            hex: hex_key(unit.unit.hex),
            strength: unit.unit.strength,
            experience: unit.unit.experience,
        }
    }
}

/// Everything a run produced, serialized as JSON on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    /// Scenario name.
    pub scenario: String,
    /// Player turns played.
    pub turns_played: u32,
    /// Turn counter when the run stopped.
    pub final_turn: u32,
    /// How the battle ended, if it did.
    pub outcome: Option<BattleOutcome>,
    /// Attacks the player side made.
    pub player_attacks: u32,
    /// Enemy units the player side destroyed.
    pub kills: u32,
    /// Player units lost.
    pub losses: u32,
    /// Reserves called up.
    pub call_ups: u32,
    /// Surviving player units.
    pub player_units: Vec<UnitReport>,
    /// Surviving bot units.
    pub bot_units: Vec<UnitReport>,
    /// Reserve pool at the end.
    pub reserves: Vec<ReserveEntry>,
    /// Objectives at the end.
    pub objectives: Vec<ObjectiveState>,
    /// Player supply ticks, one per completed turn.
    pub supply: Vec<SupplyTickReport>,
    /// Bot turn summaries.
    pub bot_turns: Vec<BotTurnSummary>,
    /// Air mission reports of both sides.
    pub air_reports: Vec<AirMissionReport>,
    /// Final state hash.
    pub state_hash: u64,
}

#[derive(Debug, Default)]
struct Tally {
    attacks: u32,
    kills: u32,
    losses: u32,
    call_ups: u32,
}

impl Tally {
    fn record(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::AttackResolved {
                faction: Faction::Player,
                ..
            } => self.attacks += 1,
            EngineEvent::UnitDestroyed { faction, .. } => match faction {
                Faction::Player => self.losses += 1,
                Faction::Bot => self.kills += 1,
            },
            EngineEvent::ReserveCalledUp { .. } => self.call_ups += 1,
            _ => {}
        }
    }
}

/// Deploy every allocation into the player zones and finish deployment.
///
/// The base camp goes on the first planned zone hex. Units that do not fit
/// stay in the reserve pool.
pub fn auto_deploy(scenario: &Scenario) -> Result<BattleEngine, ScenarioError> {
    let mut engine = BattleEngine::new(scenario)?;
    engine.initialize_from_allocations(scenario.allocations.clone())?;
    engine.set_queued_allocations(scenario.queued_allocations.clone())?;
    engine.begin_deployment()?;

    let hexes: Vec<Axial> = engine
        .zones()
        .iter()
        .filter(|z| z.faction == Faction::Player)
        .flat_map(|z| z.hexes.iter().copied())
        .collect();
    let Some(&camp) = hexes.first() else {
        return Err(ScenarioError::Unplayable(
            "no player deployment zone".to_string(),
        ));
    };
    if !engine.set_base_camp(camp)? {
        return Err(ScenarioError::Unplayable(format!(
            "base camp {camp} rejected"
        )));
    }

    let mut free = hexes.into_iter();
    'allocations: for allocation in &scenario.allocations {
        for _ in 0..allocation.count {
            let Some(hex) = free.next() else {
                break 'allocations;
            };
            engine.deploy_unit_by_key(hex, &allocation.key)?;
        }
    }

    let reserves = engine.finalize_deployment()?;
    info!(
        deployed = engine.player_units().len(),
        reserves = reserves.len(),
        "Auto-deployment finished"
    );
    Ok(engine)
}

/// Greedy player-side controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Autopilot;

impl Autopilot {
    /// Play one player turn without ending it.
    pub fn play(self, engine: &mut BattleEngine) -> Result<(), ScenarioError> {
        self.call_up_reserves(engine)?;
        self.queue_strikes(engine)?;

        for unit in engine.player_units() {
            if engine.outcome().is_some() {
                break;
            }
            let mut hex = unit.unit.hex;
            if !self.attack_best(engine, hex)? {
                if let Some(to) = self.advance_hex(engine, hex)? {
                    if engine.move_unit(hex, to)? {
                        hex = to;
                    }
                }
                self.attack_best(engine, hex)?;
            }
        }
        Ok(())
    }

    fn attack_best(self, engine: &mut BattleEngine, hex: Axial) -> Result<bool, ScenarioError> {
        let mut best: Option<(i32, Axial)> = None;
        for target in engine.get_attackable_targets(hex)? {
            let Some(preview) = engine.preview_attack(hex, target)? else {
                continue;
            };
            let strength = engine
                .battle()
                .unit_at(target)
                .map_or(0, |u| u.unit.strength);
            let score = attack_score(&preview, strength);
            if score > 0 && best.map_or(true, |(s, _)| score > s) {
                best = Some((score, target));
            }
        }
        let Some((score, target)) = best else {
            return Ok(false);
        };
        debug!(attacker = %hex, %target, score, "Autopilot attacking");
        engine.attack_unit(hex, target)?;
        Ok(true)
    }

    /// Reachable hex closest to the nearest enemy, if it closes the distance.
    fn advance_hex(self, engine: &BattleEngine, from: Axial) -> Result<Option<Axial>, ScenarioError> {
        let Some(goal) = engine
            .bot_units()
            .iter()
            .map(|u| u.unit.hex)
            .min_by_key(|&hex| (from.distance(hex), hex))
        else {
            return Ok(None);
        };
        Ok(engine
            .get_reachable_hexes(from)?
            .into_keys()
            .min_by_key(|&hex| (hex.distance(goal), hex))
            .filter(|&hex| hex.distance(goal) < from.distance(goal)))
    }

    fn call_up_reserves(self, engine: &mut BattleEngine) -> Result<(), ScenarioError> {
        let zone_hexes: Vec<Axial> = engine
            .zones()
            .iter()
            .filter(|z| z.faction == Faction::Player)
            .flat_map(|z| z.hexes.iter().copied())
            .collect();
        for entry in engine.get_reserve_snapshot() {
            if entry.status != ReserveStatus::Ready {
                continue;
            }
            let Some(hex) = zone_hexes
                .iter()
                .copied()
                .find(|&hex| engine.battle().unit_at(hex).is_none())
            else {
                break;
            };
            if !engine.call_up_reserve_by_key(&entry.unit_key, hex)? {
                // Call-ups are closed for the whole turn.
                break;
            }
        }
        Ok(())
    }

    fn queue_strikes(self, engine: &mut BattleEngine) -> Result<(), ScenarioError> {
        let Some(target) = engine
            .bot_units()
            .iter()
            .filter(|u| {
                engine
                    .battle()
                    .visibility_for(Faction::Player, u.unit.hex)
                    .is_detected()
            })
            .min_by_key(|u| (u.unit.strength, u.unit.hex))
            .map(|u| u.unit.hex)
        else {
            return Ok(());
        };

        let bombers: Vec<String> = engine
            .get_air_support_summary()
            .squadrons
            .into_iter()
            .filter(|s| s.status == SquadronStatus::Ready)
            .filter(|s| {
                engine
                    .battle()
                    .catalog()
                    .get(&s.type_key)
                    .is_some_and(|t| t.class == UnitClass::Bomber)
            })
            .map(|s| s.key)
            .collect();

        for squadron_key in bombers {
            let request = AirMissionRequest {
                kind: MissionKind::Strike,
                faction: Faction::Player,
                squadron_key,
                target_hex: Some(target),
                escort_target_unit_key: None,
            };
            engine.schedule_air_mission(&request)?;
        }
        Ok(())
    }
}

/// Deploy, then play until the battle ends or `config.max_turns` player
/// turns have passed.
pub fn run(scenario: &Scenario, config: &RunConfig) -> Result<BattleReport, ScenarioError> {
    let mut engine = auto_deploy(scenario)?;
    let tally = Rc::new(RefCell::new(Tally::default()));
    {
        let tally = Rc::clone(&tally);
        engine.subscribe(move |event| tally.borrow_mut().record(event));
    }

    let mut supply = Vec::new();
    let mut bot_turns = Vec::new();
    let mut turns_played = 0;

    while engine.outcome().is_none() && config.max_turns.map_or(true, |cap| turns_played < cap) {
        let summary = engine.get_turn_summary();
        if summary.phase != Phase::PlayerTurn {
            break;
        }
        debug!(turn = summary.turn_number, "Autopilot turn");
        Autopilot.play(&mut engine)?;
        turns_played += 1;
        if engine.outcome().is_some() {
            break;
        }
        supply.push(engine.end_player_turn()?);
        if let Some(bot) = engine.consume_bot_turn_summary() {
            bot_turns.push(bot);
        }
        engine.check_invariants()?;
    }

    let tally = tally.borrow();
    let report = BattleReport {
        scenario: scenario.name.clone(),
        turns_played,
        final_turn: engine.get_turn_summary().turn_number,
        outcome: engine.outcome(),
        player_attacks: tally.attacks,
        kills: tally.kills,
        losses: tally.losses,
        call_ups: tally.call_ups,
        player_units: engine.player_units().iter().map(UnitReport::from).collect(),
        bot_units: engine.bot_units().iter().map(UnitReport::from).collect(),
        reserves: engine.get_reserve_snapshot(),
        objectives: engine.objectives().to_vec(),
        supply,
        bot_turns,
        air_reports: engine.get_air_mission_reports(),
        state_hash: engine.state_hash(),
    };
    info!(
        scenario = %report.scenario,
        turns = report.turns_played,
        outcome = ?report.outcome,
        kills = report.kills,
        losses = report.losses,
        "Run complete"
    );
    Ok(report)
}
