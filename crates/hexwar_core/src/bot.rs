//! Deterministic heuristic opponent.
//!
//! Each living bot unit, in roster order, takes the best-scoring attack it
//! has. Units without a worthwhile shot close on the nearest goal (an
//! objective the bot does not hold, or a player unit) and fire from the new
//! position when they can. Ready squadrons strike the weakest player unit
//! the bot can see.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::air::{AirMissionRequest, AirMissionScheduler, MissionId, MissionKind};
use crate::battle::{Battle, UnitId};
use crate::combat::{AttackResolution, CombatPreview};
use crate::error::Result;
use crate::hex::Axial;
use crate::movement::Occupancy;
use crate::terrain::TerrainLookup;
use crate::turn::{Faction, SupplyTickReport};

/// Score bonus for an attack expected to destroy its target.
pub const KILL_BONUS: i32 = 50;

/// A move made by a bot unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BotMove {
    /// Unit that moved.
    pub unit: UnitId,
    /// Start hex.
    pub from: Axial,
    /// End hex.
    pub to: Axial,
}

/// A strike queued by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BotStrike {
    /// Queued mission.
    pub mission: MissionId,
    /// Squadron flying it.
    pub squadron_key: String,
    /// Target hex.
    pub target: Axial,
}

/// Everything the bot did in one turn, for playback.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BotTurnSummary {
    /// Turn the actions were taken on.
    pub turn: u32,
    /// Moves in execution order.
    pub moves: Vec<BotMove>,
    /// Attacks in execution order.
    pub attacks: Vec<AttackResolution>,
    /// Strikes queued this turn.
    pub strikes: Vec<BotStrike>,
    /// The bot's supply tick, once it has run.
    pub supply: Option<SupplyTickReport>,
}

/// Desirability of an attack.
#[must_use]
pub fn attack_score(preview: &CombatPreview, target_strength: i32) -> i32 {
    let damage = preview.applied_damage();
    let kill = if damage >= target_strength { KILL_BONUS } else { 0 };
    let retaliation = preview
        .retaliation
        .as_ref()
        .map_or(0, |reply| reply.applied_damage());
    damage + kill - retaliation
}

/// Best attack for `attacker`: highest positive score, ties to the lower hex.
#[must_use]
pub fn best_attack(battle: &Battle, attacker: UnitId) -> Option<(UnitId, i32)> {
    let mut best: Option<(i32, Axial, UnitId)> = None;
    for hex in battle.attackable_targets(attacker) {
        let Some(target) = battle.unit_at(hex) else {
            continue;
        };
        let Some(preview) = battle.preview(attacker, target.id) else {
            continue;
        };
        let score = attack_score(&preview, target.unit.strength);
        // Targets come in coordinate order, so a strict comparison keeps the lowest hex.
        if score > 0 && best.map_or(true, |(top, _, _)| score > top) {
            best = Some((score, hex, target.id));
        }
    }
    best.map(|(score, _, id)| (id, score))
}

/// Nearest goal to `from`: goal hexes first, then player units; ties to the
/// lower hex.
#[must_use]
pub fn nearest_goal(battle: &Battle, from: Axial, objectives: &[Axial]) -> Option<Axial> {
    objectives
        .iter()
        .copied()
        .filter(|&hex| battle.occupancy(hex, Faction::Bot) != Occupancy::Friendly)
        .chain(battle.faction_units(Faction::Player).map(|u| u.unit.hex))
        .min_by_key(|&hex| (from.distance(hex), hex))
}

/// Reachable hex that best approaches `goal`: closest, then highest terrain
/// defense, then lowest coordinate. `None` unless it gets closer than `from`.
#[must_use]
pub fn approach_hex(battle: &Battle, unit: UnitId, from: Axial, goal: Axial) -> Option<Axial> {
    let defense = |hex: Axial| battle.map().terrain_at(hex).map_or(0, |t| t.defense);
    battle
        .reachable(unit)
        .into_keys()
        .min_by_key(|&hex| (hex.distance(goal), -defense(hex), hex))
        .filter(|&hex| hex.distance(goal) < from.distance(goal))
}

/// Stateless planner; all decisions derive from the battle state.
#[derive(Debug, Clone, Copy, Default)]
pub struct BotPlanner;

impl BotPlanner {
    /// Plan and execute the bot's ground actions and queue its strikes.
    ///
    /// `objectives` are the hexes the bot wants to take.
    pub fn run(
        self,
        battle: &mut Battle,
        air: &mut AirMissionScheduler,
        objectives: &[Axial],
        turn: u32,
    ) -> Result<BotTurnSummary> {
        let mut summary = BotTurnSummary {
            turn,
            ..BotTurnSummary::default()
        };

        for id in battle.faction_ids(Faction::Bot) {
            let Some(from) = battle.unit(id).map(|u| u.unit.hex) else {
                // Destroyed by retaliation earlier in the turn.
                continue;
            };

            if let Some((target, score)) = best_attack(battle, id) {
                debug!(?id, ?target, score, "Bot attacks in place");
                if let Some(resolution) = battle.attack(id, target) {
                    summary.attacks.push(resolution);
                }
                continue;
            }

            let Some(goal) = nearest_goal(battle, from, objectives) else {
                continue;
            };
            if let Some(to) = approach_hex(battle, id, from, goal) {
                if battle.move_unit(id, to) {
                    debug!(?id, %from, %to, %goal, "Bot advances");
                    summary.moves.push(BotMove { unit: id, from, to });
                }
            }
            if let Some((target, score)) = best_attack(battle, id) {
                debug!(?id, ?target, score, "Bot attacks after moving");
                if let Some(resolution) = battle.attack(id, target) {
                    summary.attacks.push(resolution);
                }
            }
        }

        summary.strikes = Self::queue_strikes(battle, air, turn)?;
        Ok(summary)
    }

    fn queue_strikes(
        battle: &Battle,
        air: &mut AirMissionScheduler,
        turn: u32,
    ) -> Result<Vec<BotStrike>> {
        let target = battle
            .faction_units(Faction::Player)
            .filter(|u| battle.visibility_for(Faction::Bot, u.unit.hex).is_detected())
            .min_by_key(|u| (u.unit.strength, u.unit.hex))
            .map(|u| u.unit.hex);
        let Some(target) = target else {
            return Ok(Vec::new());
        };

        let keys: Vec<String> = air
            .ready_squadrons(Faction::Bot)
            .into_iter()
            .map(|s| s.key.clone())
            .collect();
        let mut strikes = Vec::new();
        for squadron_key in keys {
            let request = AirMissionRequest {
                kind: MissionKind::Strike,
                faction: Faction::Bot,
                squadron_key: squadron_key.clone(),
                target_hex: Some(target),
                escort_target_unit_key: None,
            };
            if let Some(mission) = air.schedule(&request, turn)? {
                debug!(?mission, squadron = %squadron_key, %target, "Bot strike queued");
                strikes.push(BotStrike {
                    mission,
                    squadron_key,
                    target,
                });
            }
        }
        Ok(strikes)
    }
}
