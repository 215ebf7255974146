//! The battle session.
//!
//! [`BattleEngine`] owns the battlefield, the turn clock, the reserve pool and
//! the air arm, and is the only surface a presentation layer talks to. Every
//! command validates phase and ownership first, mutates state, then notifies
//! subscribers with a typed [`EngineEvent`].
//!
//! # Lifecycle
//!
//! 1. [`initialize_from_allocations`](BattleEngine::initialize_from_allocations)
//!    and [`begin_deployment`](BattleEngine::begin_deployment)
//! 2. [`set_base_camp`](BattleEngine::set_base_camp) and
//!    [`deploy_unit_by_key`](BattleEngine::deploy_unit_by_key)
//! 3. [`finalize_deployment`](BattleEngine::finalize_deployment)
//! 4. Player commands, then [`end_player_turn`](BattleEngine::end_player_turn),
//!    which plays the bot turn and returns to the player or completes the
//!    battle.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::air::{
    AirMission, AirMissionReport, AirMissionRequest, AirMissionScheduler, AirSupportSummary,
    MissionId,
};
use crate::battle::{Battle, BattleUnit, UnitId};
use crate::bot::{BotPlanner, BotTurnSummary};
use crate::combat::{AttackResolution, CombatPreview};
use crate::deployment::{plan_zone_hexes, PlannedZone};
use crate::error::{EngineError, Result};
use crate::hex::{parse_hex_key, Axial, HexDirection};
use crate::map::HexMap;
use crate::reserves::{ReserveEntry, ReserveManager};
use crate::scenario::{EngineConfig, Scenario, UnitAllocation};
use crate::terrain::{MoveType, TerrainCatalog, TerrainLookup};
use crate::turn::{
    entrench_idle, idle_units, supply_tick, Faction, Phase, SupplyTickReport, TurnState,
    TurnSummary,
};
use crate::units::{ScenarioUnit, UnitCatalog, MAX_EXPERIENCE};

/// How a finished battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// Every bot unit was destroyed.
    PlayerVictory,
    /// The player has nothing left on the map or in reserve.
    BotVictory,
    /// The turn limit ran out.
    TurnLimit,
}

/// State-change notification for subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Deployment opened.
    DeploymentStarted {
        /// Player zones available.
        zones: usize,
    },
    /// Player base camp placed.
    BaseCampSet {
        /// Camp hex.
        hex: Axial,
    },
    /// A unit was placed during deployment.
    UnitDeployed {
        /// Hex placed on.
        hex: Axial,
        /// Allocation key.
        unit_key: String,
    },
    /// A placed unit was taken back during deployment.
    UnitRecalled {
        /// Hex vacated.
        hex: Axial,
        /// Allocation key restored.
        unit_key: String,
    },
    /// Deployment closed.
    DeploymentFinalized {
        /// Units on the map.
        deployed: usize,
        /// Units sent to the reserve.
        reserves: u32,
    },
    /// The phase changed.
    PhaseChanged {
        /// Phase left.
        from: Phase,
        /// Phase entered.
        to: Phase,
        /// Turn number after the change.
        turn: u32,
    },
    /// A unit moved.
    UnitMoved {
        /// Owner.
        faction: Faction,
        /// Start hex.
        from: Axial,
        /// End hex.
        to: Axial,
    },
    /// An attack was resolved.
    AttackResolved {
        /// Attacking faction.
        faction: Faction,
        /// Full outcome.
        resolution: AttackResolution,
    },
    /// A unit was destroyed.
    UnitDestroyed {
        /// Owner of the lost unit.
        faction: Faction,
        /// Where it fell.
        hex: Axial,
    },
    /// A reserve unit arrived.
    ReserveCalledUp {
        /// Reserve line.
        unit_key: String,
        /// Arrival hex.
        hex: Axial,
    },
    /// A faction's supply tick ran.
    SupplyTick(SupplyTickReport),
    /// An objective changed hands.
    ObjectiveCaptured {
        /// Objective key.
        key: String,
        /// New holder.
        faction: Faction,
    },
    /// A mission was queued.
    AirMissionScheduled {
        /// Mission id.
        mission: MissionId,
        /// Owning faction.
        faction: Faction,
    },
    /// A mission changed status.
    AirReport(AirMissionReport),
    /// The bot finished its turn.
    BotTurnCompleted {
        /// Turn the bot played.
        turn: u32,
    },
    /// The battle is over.
    BattleCompleted {
        /// Final turn number.
        turn: u32,
        /// Result.
        outcome: BattleOutcome,
    },
}

/// A player unit on the map, for deployment and UI snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Position.
    pub hex: Axial,
    /// Allocation key, when the unit came from one.
    pub unit_key: Option<String>,
    /// Unit type key.
    pub type_key: String,
    /// Display label.
    pub label: String,
}

/// An objective and its holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectiveState {
    /// Objective key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Position.
    pub hex: Axial,
    /// Current holder.
    pub held_by: Option<Faction>,
}

#[derive(Debug, Clone)]
struct AllocationSlot {
    allocation: UnitAllocation,
    remaining: u32,
}

type Observer = Box<dyn FnMut(&EngineEvent)>;

/// One battle session.
pub struct BattleEngine {
    battle: Battle,
    turn: TurnState,
    config: EngineConfig,
    zones: Vec<PlannedZone>,
    allocations: Vec<AllocationSlot>,
    queued: Vec<UnitAllocation>,
    deployment_started: bool,
    player_base_camp: Option<Axial>,
    bot_base_camp: Option<Axial>,
    reserves: ReserveManager,
    air: AirMissionScheduler,
    objectives: Vec<ObjectiveState>,
    pending_bot_summary: Option<BotTurnSummary>,
    outcome: Option<BattleOutcome>,
    observers: Vec<Observer>,
}

impl fmt::Debug for BattleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleEngine")
            .field("turn", &self.turn)
            .field("units", &self.battle.units().count())
            .field("zones", &self.zones.len())
            .field("outcome", &self.outcome)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl BattleEngine {
    /// Load a scenario with the built-in catalogs.
    pub fn new(scenario: &Scenario) -> Result<Self> {
        Self::with_catalogs(scenario, &TerrainCatalog::builtin(), UnitCatalog::builtin())
    }

    /// Load a scenario with custom catalogs.
    ///
    /// Zones are planned and bot forces placed here. Bot units on occupied or
    /// impassable hexes are skipped with a warning; unknown types, bad hex
    /// keys and unplannable zones are errors.
    pub fn with_catalogs(
        scenario: &Scenario,
        terrain: &TerrainCatalog,
        catalog: UnitCatalog,
    ) -> Result<Self> {
        let map = HexMap::from_spec(&scenario.map, terrain)?;
        let zones = scenario
            .zones
            .iter()
            .map(|zone| plan_zone_hexes(zone, &map))
            .collect::<Result<Vec<_>>>()?;
        let config = scenario.config.clone();
        let air = AirMissionScheduler::new(&scenario.squadrons, &catalog)?;

        let mut battle = Battle::new(map, catalog, config.spotting_radius);
        battle.set_commander(Faction::Player, scenario.player_commander);
        battle.set_commander(Faction::Bot, scenario.bot_commander);

        for spec in &scenario.bot_units {
            let hex = parse_hex_key(&spec.hex)?;
            let unit_type = battle.catalog().require(&spec.type_key)?.clone();
            let passable = battle
                .map()
                .terrain_at(hex)
                .is_some_and(|t| t.is_passable(unit_type.move_type));
            if !passable || battle.unit_at(hex).is_some() {
                warn!(type_key = %spec.type_key, hex = %spec.hex, "Bot unit skipped: hex unavailable");
                continue;
            }
            let mut unit = ScenarioUnit::fresh(&unit_type, hex, spec.facing);
            unit.strength = spec.strength.clamp(1, 100);
            unit.experience = spec.experience.min(MAX_EXPERIENCE);
            let label = spec.label.clone().unwrap_or_else(|| unit_type.label.clone());
            battle.spawn(Faction::Bot, unit, label, None)?;
        }

        let bot_base_camp = scenario
            .bot_base_camp
            .as_deref()
            .map(parse_hex_key)
            .transpose()?;
        let objectives = scenario
            .objectives
            .iter()
            .map(|o| {
                Ok(ObjectiveState {
                    key: o.key.clone(),
                    label: o.label.clone(),
                    hex: parse_hex_key(&o.hex)?,
                    held_by: o.held_by,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            scenario = %scenario.name,
            zones = zones.len(),
            bot_units = battle.faction_units(Faction::Bot).count(),
            "Battle loaded"
        );

        Ok(Self {
            battle,
            turn: TurnState::new(),
            reserves: ReserveManager::new(config.reserve_cooldown_turns),
            config,
            zones,
            allocations: Vec::new(),
            queued: Vec::new(),
            deployment_started: false,
            player_base_camp: None,
            bot_base_camp,
            air,
            objectives,
            pending_bot_summary: None,
            outcome: None,
            observers: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Observers and read access
    // ------------------------------------------------------------------

    /// Register an observer for every subsequent event.
    pub fn subscribe(&mut self, observer: impl FnMut(&EngineEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: EngineEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }

    /// The battlefield.
    #[must_use]
    pub const fn battle(&self) -> &Battle {
        &self.battle
    }

    /// Rules in effect.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Planned deployment zones of both factions.
    #[must_use]
    pub fn zones(&self) -> &[PlannedZone] {
        &self.zones
    }

    /// A faction's base camp.
    #[must_use]
    pub const fn base_camp(&self, faction: Faction) -> Option<Axial> {
        match faction {
            Faction::Player => self.player_base_camp,
            Faction::Bot => self.bot_base_camp,
        }
    }

    /// Objectives and their holders.
    #[must_use]
    pub fn objectives(&self) -> &[ObjectiveState] {
        &self.objectives
    }

    /// Result of a completed battle.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        self.outcome
    }

    /// Player units in id order.
    #[must_use]
    pub fn player_units(&self) -> Vec<BattleUnit> {
        self.battle.faction_units(Faction::Player).cloned().collect()
    }

    /// Bot units in id order.
    #[must_use]
    pub fn bot_units(&self) -> Vec<BattleUnit> {
        self.battle.faction_units(Faction::Bot).cloned().collect()
    }

    /// Hash of the full battle state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.turn.summary().hash(&mut hasher);
        for unit in self.battle.units() {
            unit.id.hash(&mut hasher);
            unit.faction.hash(&mut hasher);
            unit.unit.hash(&mut hasher);
            unit.flags.hash(&mut hasher);
        }
        for entry in self.reserves.snapshot() {
            entry.hash(&mut hasher);
        }
        for faction in [Faction::Player, Faction::Bot] {
            for mission in self.air.missions_for(faction) {
                mission.hash(&mut hasher);
            }
        }
        self.objectives.hash(&mut hasher);
        self.player_base_camp.hash(&mut hasher);
        self.outcome.hash(&mut hasher);
        hasher.finish()
    }

    // ------------------------------------------------------------------
    // Deployment
    // ------------------------------------------------------------------

    fn require_deployment(&self, operation: &'static str) -> Result<()> {
        self.turn.require(operation, Phase::Deployment)?;
        if self.deployment_started {
            Ok(())
        } else {
            Err(EngineError::DeploymentNotStarted)
        }
    }

    fn validate_allocations(&self, allocations: &[UnitAllocation]) -> Result<()> {
        for allocation in allocations {
            self.battle.catalog().require(&allocation.type_key)?;
        }
        Ok(())
    }

    /// Commit the player's allocations. Replaces any earlier set.
    pub fn initialize_from_allocations(&mut self, units: Vec<UnitAllocation>) -> Result<()> {
        self.turn.require("initialize_from_allocations", Phase::Deployment)?;
        self.validate_allocations(&units)?;
        self.allocations = units
            .into_iter()
            .map(|allocation| AllocationSlot {
                remaining: allocation.count,
                allocation,
            })
            .collect();
        debug!(lines = self.allocations.len(), "Allocations committed");
        Ok(())
    }

    /// Allocations that skip deployment and go straight to the reserve.
    pub fn set_queued_allocations(&mut self, pending: Vec<UnitAllocation>) -> Result<()> {
        self.turn.require("set_queued_allocations", Phase::Deployment)?;
        self.validate_allocations(&pending)?;
        self.queued = pending;
        Ok(())
    }

    /// Open deployment. Fails without committed allocations.
    pub fn begin_deployment(&mut self) -> Result<()> {
        self.turn.require("begin_deployment", Phase::Deployment)?;
        if self.allocations.iter().all(|slot| slot.remaining == 0) && self.queued.is_empty() {
            return Err(EngineError::NoAllocations);
        }
        self.deployment_started = true;
        let zones = self.player_zones().count();
        info!(zones, "Deployment started");
        self.emit(EngineEvent::DeploymentStarted { zones });
        Ok(())
    }

    fn player_zones(&self) -> impl Iterator<Item = &PlannedZone> {
        self.zones.iter().filter(|z| z.faction == Faction::Player)
    }

    fn in_player_zone(&self, hex: Axial) -> bool {
        self.player_zones().any(|z| z.contains(hex))
    }

    /// Check if a player unit could be placed on `hex` right now.
    fn placeable(&self, hex: Axial, type_key: &str) -> bool {
        let move_type = self
            .battle
            .catalog()
            .get(type_key)
            .map_or(MoveType::Leg, |t| t.move_type);
        self.in_player_zone(hex)
            && self.battle.unit_at(hex).is_none()
            && self
                .battle
                .map()
                .terrain_at(hex)
                .is_some_and(|t| t.is_passable(move_type))
    }

    /// Place the player's base camp. `false` when the hex lies outside every
    /// player zone.
    pub fn set_base_camp(&mut self, hex: Axial) -> Result<bool> {
        self.require_deployment("set_base_camp")?;
        if !self.battle.map().in_bounds(hex) {
            return Err(EngineError::OutOfBounds(hex));
        }
        if !self.in_player_zone(hex) {
            return Ok(false);
        }
        self.player_base_camp = Some(hex);
        debug!(%hex, "Base camp set");
        self.emit(EngineEvent::BaseCampSet { hex });
        Ok(true)
    }

    /// Place one unit of an allocation.
    ///
    /// `false` without mutation when the allocation is used up or the hex is
    /// outside the player zones, occupied or impassable.
    pub fn deploy_unit_by_key(&mut self, hex: Axial, unit_key: &str) -> Result<bool> {
        self.require_deployment("deploy_unit_by_key")?;
        let slot = self
            .allocations
            .iter()
            .position(|slot| slot.allocation.key == unit_key)
            .ok_or_else(|| EngineError::UnknownUnitKey(unit_key.to_string()))?;
        let allocation = self.allocations[slot].allocation.clone();
        if self.allocations[slot].remaining == 0 || !self.placeable(hex, &allocation.type_key) {
            return Ok(false);
        }

        let unit_type = self.battle.catalog().require(&allocation.type_key)?.clone();
        let mut unit = ScenarioUnit::fresh(&unit_type, hex, HexDirection::East);
        unit.experience = allocation.experience.min(MAX_EXPERIENCE);
        self.battle.spawn(
            Faction::Player,
            unit,
            allocation.label.clone(),
            Some(allocation.key.clone()),
        )?;
        self.allocations[slot].remaining -= 1;
        debug!(%hex, unit_key, remaining = self.allocations[slot].remaining, "Unit deployed");
        self.emit(EngineEvent::UnitDeployed {
            hex,
            unit_key: unit_key.to_string(),
        });
        self.validate();
        Ok(true)
    }

    /// Take a placed unit back into its allocation.
    pub fn recall_unit_at(&mut self, hex: Axial) -> Result<()> {
        self.require_deployment("recall_unit_at")?;
        let id = self.battle.require_at(hex)?;
        let owned = self
            .battle
            .unit(id)
            .filter(|u| u.faction == Faction::Player)
            .ok_or(EngineError::NotOwned(hex))?;
        let unit_key = owned
            .allocation_key
            .clone()
            .ok_or_else(|| EngineError::UnknownUnitKey(owned.label.clone()))?;
        let slot = self
            .allocations
            .iter_mut()
            .find(|slot| slot.allocation.key == unit_key)
            .ok_or_else(|| EngineError::UnknownUnitKey(unit_key.clone()))?;
        slot.remaining += 1;
        self.battle.remove(id);
        debug!(%hex, unit_key, "Unit recalled");
        self.emit(EngineEvent::UnitRecalled { hex, unit_key });
        Ok(())
    }

    /// Remaining allocation counts, in commit order.
    #[must_use]
    pub fn allocation_snapshot(&self) -> Vec<(String, u32)> {
        self.allocations
            .iter()
            .map(|slot| (slot.allocation.key.clone(), slot.remaining))
            .collect()
    }

    /// Player units on the map, in id order.
    #[must_use]
    pub fn get_player_placements_snapshot(&self) -> Vec<Placement> {
        self.battle
            .faction_units(Faction::Player)
            .map(|u| Placement {
                hex: u.unit.hex,
                unit_key: u.allocation_key.clone(),
                type_key: u.unit.type_key.clone(),
                label: u.label.clone(),
            })
            .collect()
    }

    /// Close deployment and start turn 1.
    ///
    /// Undeployed allocation units and queued allocations form the reserve,
    /// which is returned.
    pub fn finalize_deployment(&mut self) -> Result<Vec<ReserveEntry>> {
        self.require_deployment("finalize_deployment")?;
        if self.player_base_camp.is_none() {
            return Err(EngineError::BaseCampMissing);
        }
        let deployed = self.battle.faction_units(Faction::Player).count();
        let leftover: u32 = self.allocations.iter().map(|slot| slot.remaining).sum();
        let queued: u32 = self.queued.iter().map(|a| a.count).sum();
        if deployed == 0 && leftover + queued == 0 {
            return Err(EngineError::NothingDeployed);
        }

        for slot in &self.allocations {
            if slot.remaining > 0 {
                self.reserves.add(&slot.allocation, slot.remaining);
            }
        }
        for allocation in &self.queued {
            self.reserves.add(allocation, allocation.count);
        }
        for slot in &mut self.allocations {
            slot.remaining = 0;
        }

        let reserves = self.reserves.total_remaining();
        info!(deployed, reserves, "Deployment finalized");
        self.emit(EngineEvent::DeploymentFinalized { deployed, reserves });
        self.change_phase("finalize_deployment", Phase::PlayerTurn)?;
        self.refresh_objectives();
        Ok(self.reserves.snapshot())
    }

    // ------------------------------------------------------------------
    // Player turn
    // ------------------------------------------------------------------

    fn change_phase(&mut self, operation: &'static str, to: Phase) -> Result<()> {
        let from = self.turn.phase();
        self.turn.advance(operation, to)?;
        self.emit(EngineEvent::PhaseChanged {
            from,
            to,
            turn: self.turn.turn_number(),
        });
        Ok(())
    }

    /// Prepare the player's turn: clear action flags. Returns the turn clock.
    pub fn start_player_turn_phase(&mut self) -> Result<TurnSummary> {
        self.turn.require("start_player_turn_phase", Phase::PlayerTurn)?;
        self.battle.reset_flags(Faction::Player);
        Ok(self.turn.summary())
    }

    /// Id of the player unit on `hex`.
    fn player_unit_at(&self, hex: Axial) -> Result<UnitId> {
        let id = self.battle.require_at(hex)?;
        match self.battle.unit(id) {
            Some(unit) if unit.faction == Faction::Player => Ok(id),
            _ => Err(EngineError::NotOwned(hex)),
        }
    }

    /// Destinations for the player unit on `hex`, with path costs. Empty
    /// outside the player's turn.
    pub fn get_reachable_hexes(&self, hex: Axial) -> Result<BTreeMap<Axial, u32>> {
        let id = self.player_unit_at(hex)?;
        if self.turn.phase() != Phase::PlayerTurn {
            return Ok(BTreeMap::new());
        }
        Ok(self.battle.reachable(id))
    }

    /// Movement points left for the player unit on `hex`.
    pub fn get_movement_budget(&self, hex: Axial) -> Result<u32> {
        let id = self.player_unit_at(hex)?;
        if self.turn.phase() != Phase::PlayerTurn {
            return Ok(0);
        }
        Ok(self.battle.movement_budget(id))
    }

    /// Move a player unit. `false` without mutation when `to` is not
    /// reachable this turn.
    pub fn move_unit(&mut self, from: Axial, to: Axial) -> Result<bool> {
        self.turn.require("move_unit", Phase::PlayerTurn)?;
        let id = self.player_unit_at(from)?;
        if !self.battle.move_unit(id, to) {
            return Ok(false);
        }
        self.emit(EngineEvent::UnitMoved {
            faction: Faction::Player,
            from,
            to,
        });
        self.refresh_objectives();
        self.validate();
        Ok(true)
    }

    fn attack_pair(&self, attacker: Axial, defender: Axial) -> Result<(UnitId, UnitId)> {
        let attacker_id = self.player_unit_at(attacker)?;
        let defender_id = self.battle.require_at(defender)?;
        Ok((attacker_id, defender_id))
    }

    /// Preview a player attack. `None` when it is not possible, including
    /// outside the player's turn.
    pub fn preview_attack(&self, attacker: Axial, defender: Axial) -> Result<Option<CombatPreview>> {
        let (attacker_id, defender_id) = self.attack_pair(attacker, defender)?;
        if self.turn.phase() != Phase::PlayerTurn {
            return Ok(None);
        }
        let preview = self.battle.preview(attacker_id, defender_id);
        debug!(%attacker, %defender, possible = preview.is_some(), "Attack previewed");
        Ok(preview)
    }

    /// Enemy hexes the player unit on `hex` can fire on.
    pub fn get_attackable_targets(&self, hex: Axial) -> Result<Vec<Axial>> {
        let id = self.player_unit_at(hex)?;
        if self.turn.phase() != Phase::PlayerTurn {
            return Ok(Vec::new());
        }
        Ok(self.battle.attackable_targets(id))
    }

    /// Execute a player attack.
    ///
    /// Fails with [`EngineError::InvalidAttack`] when no preview exists.
    /// Destroying the last bot unit completes the battle.
    pub fn attack_unit(&mut self, attacker: Axial, defender: Axial) -> Result<AttackResolution> {
        self.turn.require("attack_unit", Phase::PlayerTurn)?;
        let (attacker_id, defender_id) = self.attack_pair(attacker, defender)?;
        let resolution = self
            .battle
            .attack(attacker_id, defender_id)
            .ok_or(EngineError::InvalidAttack { attacker, defender })?;
        self.announce_attack(Faction::Player, &resolution);
        if self.battle.is_eliminated(Faction::Bot) {
            self.complete("attack_unit")?;
        }
        self.validate();
        Ok(resolution)
    }

    fn announce_attack(&mut self, faction: Faction, resolution: &AttackResolution) {
        self.emit(EngineEvent::AttackResolved {
            faction,
            resolution: resolution.clone(),
        });
        if resolution.defender_destroyed {
            self.emit(EngineEvent::UnitDestroyed {
                faction: faction.opponent(),
                hex: resolution.defender_hex,
            });
        }
        if let Some(reply) = &resolution.retaliation {
            if reply.defender_destroyed {
                self.emit(EngineEvent::UnitDestroyed {
                    faction,
                    hex: reply.defender_hex,
                });
            }
        }
    }

    /// Player units that have neither moved nor attacked. Empty outside the
    /// player's turn.
    #[must_use]
    pub fn idle_units(&self) -> BTreeSet<Axial> {
        if self.turn.phase() == Phase::PlayerTurn {
            idle_units(&self.battle, Faction::Player)
        } else {
            BTreeSet::new()
        }
    }

    // ------------------------------------------------------------------
    // Reserves
    // ------------------------------------------------------------------

    /// Bring one reserve unit onto `hex`.
    ///
    /// `false` without mutation while call-ups are closed, or when the hex is
    /// occupied, impassable or outside every player zone, or the line is
    /// exhausted. Unknown keys are errors. Arrivals cannot move this turn.
    pub fn call_up_reserve_by_key(&mut self, unit_key: &str, hex: Axial) -> Result<bool> {
        if !self.knows_unit_key(unit_key) {
            return Err(EngineError::UnknownUnitKey(unit_key.to_string()));
        }
        if !self
            .reserves
            .call_ups_open(self.turn.phase(), self.turn.turn_number())
        {
            debug!(unit_key, turn = self.turn.turn_number(), "Call-up rejected: closed");
            return Ok(false);
        }
        let entry = self.reserves.entry(unit_key)?.clone();
        if entry.remaining == 0 || !self.placeable(hex, &entry.type_key) {
            return Ok(false);
        }
        let Some(entry) = self.reserves.take(unit_key)? else {
            return Ok(false);
        };

        let unit_type = self.battle.catalog().require(&entry.type_key)?.clone();
        let mut unit = ScenarioUnit::fresh(&unit_type, hex, HexDirection::East);
        unit.experience = entry.experience.min(MAX_EXPERIENCE);
        let id = self.battle.spawn(
            Faction::Player,
            unit,
            entry.label.clone(),
            Some(entry.unit_key.clone()),
        )?;
        if let Some(arrival) = self.battle.unit_mut(id) {
            arrival.flags.moved = true;
        }
        info!(unit_key, %hex, remaining = entry.remaining, "Reserve called up");
        self.emit(EngineEvent::ReserveCalledUp {
            unit_key: unit_key.to_string(),
            hex,
        });
        self.refresh_objectives();
        self.validate();
        Ok(true)
    }

    /// Keys from the reserve pool or from allocations not yet finalized.
    fn knows_unit_key(&self, unit_key: &str) -> bool {
        self.reserves.entry(unit_key).is_ok()
            || self.allocations.iter().any(|slot| slot.allocation.key == unit_key)
            || self.queued.iter().any(|a| a.key == unit_key)
    }

    /// Reserve lines, in insertion order.
    #[must_use]
    pub fn get_reserve_snapshot(&self) -> Vec<ReserveEntry> {
        self.reserves.snapshot()
    }

    // ------------------------------------------------------------------
    // Turn end and the bot turn
    // ------------------------------------------------------------------

    /// End the player's turn and play the bot's.
    ///
    /// Returns the player's supply report. The bot's actions are available
    /// once through [`consume_bot_turn_summary`](Self::consume_bot_turn_summary).
    pub fn end_player_turn(&mut self) -> Result<SupplyTickReport> {
        self.turn.require("end_player_turn", Phase::PlayerTurn)?;
        let turn = self.turn.turn_number();

        entrench_idle(&mut self.battle, Faction::Player, self.config.max_entrench);
        let player_supply = supply_tick(
            &mut self.battle,
            Faction::Player,
            self.player_base_camp,
            turn,
            &self.config,
        );
        self.emit(EngineEvent::SupplyTick(player_supply.clone()));

        self.change_phase("end_player_turn", Phase::BotTurn)?;
        self.battle.reset_flags(Faction::Bot);

        let reports = self.air.tick(
            &mut self.battle,
            turn,
            self.config.recon_radius,
            self.config.air_cover_radius,
        )?;
        for report in reports {
            self.emit(EngineEvent::AirReport(report));
        }

        let targets: Vec<Axial> = self
            .objectives
            .iter()
            .filter(|o| o.held_by != Some(Faction::Bot))
            .map(|o| o.hex)
            .collect();
        let mut summary = BotPlanner.run(&mut self.battle, &mut self.air, &targets, turn)?;
        for step in &summary.moves {
            self.emit(EngineEvent::UnitMoved {
                faction: Faction::Bot,
                from: step.from,
                to: step.to,
            });
        }
        for resolution in &summary.attacks {
            self.announce_attack(Faction::Bot, resolution);
        }
        for strike in &summary.strikes {
            self.emit(EngineEvent::AirMissionScheduled {
                mission: strike.mission,
                faction: Faction::Bot,
            });
        }
        self.refresh_objectives();

        entrench_idle(&mut self.battle, Faction::Bot, self.config.max_entrench);
        let bot_supply = supply_tick(
            &mut self.battle,
            Faction::Bot,
            self.bot_base_camp,
            turn,
            &self.config,
        );
        self.emit(EngineEvent::SupplyTick(bot_supply.clone()));
        summary.supply = Some(bot_supply);
        info!(
            turn,
            moves = summary.moves.len(),
            attacks = summary.attacks.len(),
            strikes = summary.strikes.len(),
            "Bot turn played"
        );
        self.pending_bot_summary = Some(summary);
        self.emit(EngineEvent::BotTurnCompleted { turn });

        self.turn.next_turn();
        let player_out = self.battle.is_eliminated(Faction::Player)
            && self.reserves.total_remaining() == 0;
        if self.turn.turn_number() > self.config.max_turns
            || player_out
            || self.battle.is_eliminated(Faction::Bot)
        {
            self.complete("end_player_turn")?;
        } else {
            self.change_phase("end_player_turn", Phase::PlayerTurn)?;
            self.battle.reset_flags(Faction::Player);
        }
        self.validate();
        Ok(player_supply)
    }

    fn complete(&mut self, operation: &'static str) -> Result<()> {
        let outcome = if self.battle.is_eliminated(Faction::Bot) {
            BattleOutcome::PlayerVictory
        } else if self.battle.is_eliminated(Faction::Player) && self.reserves.total_remaining() == 0
        {
            BattleOutcome::BotVictory
        } else {
            BattleOutcome::TurnLimit
        };
        self.change_phase(operation, Phase::Completed)?;
        self.outcome = Some(outcome);
        let turn = self.turn.turn_number();
        info!(turn, ?outcome, "Battle completed");
        self.emit(EngineEvent::BattleCompleted { turn, outcome });
        Ok(())
    }

    /// Current turn clock.
    #[must_use]
    pub const fn get_turn_summary(&self) -> TurnSummary {
        self.turn.summary()
    }

    /// The last bot turn's actions. Returns `Some` once per bot turn.
    pub fn consume_bot_turn_summary(&mut self) -> Option<BotTurnSummary> {
        self.pending_bot_summary.take()
    }

    fn refresh_objectives(&mut self) {
        let mut captured = Vec::new();
        for objective in &mut self.objectives {
            let Some(holder) = self.battle.unit_at(objective.hex).map(|u| u.faction) else {
                continue;
            };
            if objective.held_by != Some(holder) {
                objective.held_by = Some(holder);
                info!(key = %objective.key, faction = ?holder, "Objective captured");
                captured.push((objective.key.clone(), holder));
            }
        }
        for (key, faction) in captured {
            self.emit(EngineEvent::ObjectiveCaptured { key, faction });
        }
    }

    // ------------------------------------------------------------------
    // Air support
    // ------------------------------------------------------------------

    /// Queue a player mission. `Ok(None)` when the squadron is busy or the
    /// request lacks a target. Requests on behalf of the bot, or naming a bot
    /// squadron, fail with [`EngineError::SquadronNotOwned`].
    pub fn schedule_air_mission(&mut self, request: &AirMissionRequest) -> Result<Option<MissionId>> {
        self.turn.require("schedule_air_mission", Phase::PlayerTurn)?;
        if request.faction != Faction::Player {
            return Err(EngineError::SquadronNotOwned {
                squadron: request.squadron_key.clone(),
                faction: request.faction,
            });
        }
        if let Some(hex) = request.target_hex {
            if !self.battle.map().in_bounds(hex) {
                return Err(EngineError::OutOfBounds(hex));
            }
        }
        let mission = self.air.schedule(request, self.turn.turn_number())?;
        if let Some(mission) = mission {
            self.emit(EngineEvent::AirMissionScheduled {
                mission,
                faction: request.faction,
            });
        }
        Ok(mission)
    }

    /// The player's air arm.
    #[must_use]
    pub fn get_air_support_summary(&self) -> AirSupportSummary {
        self.air.summary(Faction::Player, self.battle.catalog())
    }

    /// Every air report so far, oldest first. Pair with
    /// [`AirReportFeed`](crate::air::AirReportFeed) to see each once.
    #[must_use]
    pub fn get_air_mission_reports(&self) -> Vec<AirMissionReport> {
        self.air.reports().to_vec()
    }

    /// A faction's missions, in id order.
    #[must_use]
    pub fn get_scheduled_air_missions(&self, faction: Faction) -> Vec<AirMission> {
        self.air.missions_for(faction)
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check roster invariants: every unit in bounds, on passable ground, one
    /// unit per hex, strength in range.
    pub fn check_invariants(&self) -> Result<()> {
        let mut occupied = BTreeSet::new();
        for unit in self.battle.units() {
            let hex = unit.unit.hex;
            if !self.battle.map().in_bounds(hex) {
                return Err(EngineError::OutOfBounds(hex));
            }
            if !occupied.insert(hex) {
                return Err(EngineError::Scenario(format!("two units share hex {hex}")));
            }
            if !(1..=100).contains(&unit.unit.strength) {
                return Err(EngineError::Scenario(format!(
                    "unit at {hex} has strength {}",
                    unit.unit.strength
                )));
            }
        }
        Ok(())
    }

    #[cfg(feature = "debug-validation")]
    fn validate(&self) {
        if let Err(error) = self.check_invariants() {
            panic!("battle invariant violated: {error}");
        }
    }

    #[cfg(not(feature = "debug-validation"))]
    #[allow(clippy::unused_self)]
    fn validate(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::air::MissionKind;
    use crate::deployment::DeploymentZone;
    use crate::map::MapSpec;
    use crate::scenario::{BotUnitSpec, Objective, SquadronSpec};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn scenario() -> Scenario {
        Scenario {
            name: "Test ridge".to_string(),
            description: String::new(),
            map: MapSpec {
                width: 12,
                height: 8,
                fill: "plains".to_string(),
                tiles: Vec::new(),
            },
            config: EngineConfig {
                max_turns: 3,
                ..EngineConfig::default()
            },
            zones: vec![DeploymentZone {
                key: "west".to_string(),
                label: "West".to_string(),
                description: String::new(),
                capacity: 6,
                faction: Faction::Player,
                anchors: vec!["0,3".to_string()],
            }],
            player_commander: Default::default(),
            bot_commander: Default::default(),
            bot_units: vec![BotUnitSpec {
                type_key: "infantry".to_string(),
                hex: "10,3".to_string(),
                label: None,
                strength: 100,
                experience: 0,
                facing: HexDirection::West,
            }],
            bot_base_camp: Some("11,3".to_string()),
            squadrons: vec![SquadronSpec {
                key: "kg1".to_string(),
                label: "Bombers".to_string(),
                type_key: "bomber".to_string(),
                faction: Faction::Player,
            }],
            objectives: vec![Objective {
                key: "village".to_string(),
                label: "Village".to_string(),
                hex: "6,3".to_string(),
                held_by: None,
            }],
            allocations: Vec::new(),
            queued_allocations: Vec::new(),
        }
    }

    fn allocation(key: &str, type_key: &str, count: u32) -> UnitAllocation {
        UnitAllocation {
            key: key.to_string(),
            type_key: type_key.to_string(),
            label: key.to_string(),
            sprite: String::new(),
            count,
            experience: 0,
        }
    }

    fn zone_hex(engine: &BattleEngine, index: usize) -> Axial {
        engine.zones()[0].hexes[index]
    }

    fn deployed_engine() -> BattleEngine {
        deployed_engine_for(&scenario())
    }

    fn deployed_engine_for(scenario: &Scenario) -> BattleEngine {
        let mut engine = BattleEngine::new(scenario).unwrap();
        engine
            .initialize_from_allocations(vec![allocation("rifles", "infantry", 3)])
            .unwrap();
        engine.begin_deployment().unwrap();
        let camp = zone_hex(&engine, 0);
        assert!(engine.set_base_camp(camp).unwrap());
        assert!(engine.deploy_unit_by_key(zone_hex(&engine, 1), "rifles").unwrap());
        engine.finalize_deployment().unwrap();
        engine
    }

    #[test]
    fn test_zone_planned_on_load() {
        let engine = BattleEngine::new(&scenario()).unwrap();
        assert_eq!(engine.zones()[0].hexes.len(), 6);
        assert!(engine.zones()[0].hexes.iter().all(|h| h.to_offset().col < 2));
        assert_eq!(engine.bot_units().len(), 1);
    }

    #[test]
    fn test_begin_deployment_requires_allocations() {
        let mut engine = BattleEngine::new(&scenario()).unwrap();
        assert_eq!(engine.begin_deployment(), Err(EngineError::NoAllocations));
        assert_eq!(
            engine.set_base_camp(Axial::new(0, 0)),
            Err(EngineError::DeploymentNotStarted)
        );
    }

    #[test]
    fn test_deploy_rules() {
        let mut engine = BattleEngine::new(&scenario()).unwrap();
        engine
            .initialize_from_allocations(vec![allocation("rifles", "infantry", 1)])
            .unwrap();
        engine.begin_deployment().unwrap();
        let first = zone_hex(&engine, 0);

        assert!(!engine.deploy_unit_by_key(Axial::new(8, 2), "rifles").unwrap());
        assert_eq!(
            engine.deploy_unit_by_key(first, "ghosts"),
            Err(EngineError::UnknownUnitKey("ghosts".to_string()))
        );
        assert!(engine.deploy_unit_by_key(first, "rifles").unwrap());
        assert!(!engine.deploy_unit_by_key(zone_hex(&engine, 1), "rifles").unwrap());

        engine.recall_unit_at(first).unwrap();
        assert_eq!(engine.allocation_snapshot(), vec![("rifles".to_string(), 1)]);
        assert!(engine.get_player_placements_snapshot().is_empty());
        assert!(matches!(
            engine.recall_unit_at(first),
            Err(EngineError::UnitNotFound { .. })
        ));
    }

    #[test]
    fn test_finalize_requires_base_camp() {
        let mut engine = BattleEngine::new(&scenario()).unwrap();
        engine
            .initialize_from_allocations(vec![allocation("rifles", "infantry", 1)])
            .unwrap();
        engine.begin_deployment().unwrap();
        assert_eq!(engine.finalize_deployment(), Err(EngineError::BaseCampMissing));
        assert!(!engine.set_base_camp(Axial::new(9, 1)).unwrap());
    }

    #[test]
    fn test_finalize_moves_leftovers_to_reserve() {
        let mut engine = BattleEngine::new(&scenario()).unwrap();
        engine
            .initialize_from_allocations(vec![allocation("rifles", "infantry", 3)])
            .unwrap();
        engine
            .set_queued_allocations(vec![allocation("tanks", "tank", 2)])
            .unwrap();
        engine.begin_deployment().unwrap();
        engine.set_base_camp(zone_hex(&engine, 0)).unwrap();
        engine.deploy_unit_by_key(zone_hex(&engine, 0), "rifles").unwrap();

        let reserves = engine.finalize_deployment().unwrap();
        assert_eq!(reserves.len(), 2);
        assert_eq!(reserves[0].remaining, 2);
        assert_eq!(reserves[1].remaining, 2);
        let summary = engine.get_turn_summary();
        assert_eq!(summary.phase, Phase::PlayerTurn);
        assert_eq!(summary.turn_number, 1);
    }

    #[test]
    fn test_call_up_closed_during_deployment() {
        let mut engine = BattleEngine::new(&scenario()).unwrap();
        engine
            .initialize_from_allocations(vec![allocation("rifles", "infantry", 3)])
            .unwrap();
        engine
            .set_queued_allocations(vec![allocation("guns", "artillery", 1)])
            .unwrap();
        engine.begin_deployment().unwrap();
        let hex = zone_hex(&engine, 2);

        assert!(!engine.call_up_reserve_by_key("rifles", hex).unwrap());
        assert!(!engine.call_up_reserve_by_key("guns", hex).unwrap());
        assert!(engine.battle().unit_at(hex).is_none());
        assert!(matches!(
            engine.call_up_reserve_by_key("ghosts", hex),
            Err(EngineError::UnknownUnitKey(_))
        ));
        assert_eq!(engine.allocation_snapshot(), vec![("rifles".to_string(), 3)]);
    }

    #[test]
    fn test_reserve_cooldown() {
        let mut engine = deployed_engine();
        let hex = zone_hex(&engine, 2);
        assert!(!engine.call_up_reserve_by_key("rifles", hex).unwrap());
        assert_eq!(engine.get_reserve_snapshot()[0].remaining, 2);
        assert!(engine.call_up_reserve_by_key("ghosts", hex).is_err());

        engine.end_player_turn().unwrap();
        assert_eq!(engine.get_turn_summary().turn_number, 2);
        assert!(engine.call_up_reserve_by_key("rifles", hex).unwrap());
        assert_eq!(engine.get_reserve_snapshot()[0].remaining, 1);
        assert_eq!(engine.get_movement_budget(hex).unwrap(), 0);
        // Occupied now.
        assert!(!engine.call_up_reserve_by_key("rifles", hex).unwrap());
    }

    #[test]
    fn test_end_turn_phase_guard_and_increment() {
        let mut engine = BattleEngine::new(&scenario()).unwrap();
        assert!(matches!(
            engine.end_player_turn(),
            Err(EngineError::PhaseViolation { .. })
        ));

        let mut engine = deployed_engine();
        let report = engine.end_player_turn().unwrap();
        assert_eq!(report.faction, Faction::Player);
        assert_eq!(engine.get_turn_summary().turn_number, 2);
        assert_eq!(engine.get_turn_summary().phase, Phase::PlayerTurn);

        let summary = engine.consume_bot_turn_summary().unwrap();
        assert_eq!(summary.turn, 1);
        assert!(summary.supply.is_some());
        assert!(engine.consume_bot_turn_summary().is_none());
    }

    #[test]
    fn test_turn_limit_completes() {
        let mut engine = deployed_engine();
        for _ in 0..3 {
            engine.end_player_turn().unwrap();
        }
        assert_eq!(engine.get_turn_summary().phase, Phase::Completed);
        assert_eq!(engine.outcome(), Some(BattleOutcome::TurnLimit));
        assert!(engine.end_player_turn().is_err());
    }

    #[test]
    fn test_stale_and_foreign_references() {
        let mut engine = deployed_engine();
        let bot_hex = engine.bot_units()[0].unit.hex;
        assert!(matches!(
            engine.move_unit(Axial::new(5, 5), Axial::new(5, 4)),
            Err(EngineError::UnitNotFound { .. })
        ));
        assert_eq!(
            engine.move_unit(bot_hex, Axial::new(8, 3)),
            Err(EngineError::NotOwned(bot_hex))
        );
    }

    #[test]
    fn test_idle_units_track_flags() {
        let mut engine = deployed_engine();
        let hex = zone_hex(&engine, 1);
        assert!(engine.idle_units().contains(&hex));
        let to = *engine.get_reachable_hexes(hex).unwrap().keys().last().unwrap();
        assert!(engine.move_unit(hex, to).unwrap());
        assert!(engine.idle_units().is_empty());
    }

    #[test]
    fn test_events_reach_subscribers() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut engine = BattleEngine::new(&scenario()).unwrap();
        engine.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        engine
            .initialize_from_allocations(vec![allocation("rifles", "infantry", 1)])
            .unwrap();
        engine.begin_deployment().unwrap();
        engine.set_base_camp(zone_hex(&engine, 0)).unwrap();
        engine.deploy_unit_by_key(zone_hex(&engine, 0), "rifles").unwrap();
        engine.finalize_deployment().unwrap();

        let events = seen.borrow();
        assert!(matches!(events[0], EngineEvent::DeploymentStarted { zones: 1 }));
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::PhaseChanged {
                from: Phase::Deployment,
                to: Phase::PlayerTurn,
                turn: 1
            }
        )));
    }

    #[test]
    fn test_air_mission_through_engine() {
        let mut engine = deployed_engine();
        let target = engine.bot_units()[0].unit.hex;
        let request = AirMissionRequest {
            kind: MissionKind::Strike,
            faction: Faction::Player,
            squadron_key: "kg1".to_string(),
            target_hex: Some(target),
            escort_target_unit_key: None,
        };
        assert!(engine.schedule_air_mission(&request).unwrap().is_some());
        assert_eq!(engine.get_air_support_summary().active_missions, 1);
        assert_eq!(engine.get_scheduled_air_missions(Faction::Player).len(), 1);
        let before = engine.get_air_mission_reports().len();
        engine.end_player_turn().unwrap();
        assert_eq!(engine.get_air_mission_reports().len(), before + 1);
    }

    #[test]
    fn test_air_missions_only_for_player_squadrons() {
        let mut with_enemy_air = scenario();
        with_enemy_air.squadrons.push(SquadronSpec {
            key: "botkg".to_string(),
            label: "Enemy bombers".to_string(),
            type_key: "bomber".to_string(),
            faction: Faction::Bot,
        });
        let mut engine = deployed_engine_for(&with_enemy_air);
        let target = engine.player_units()[0].unit.hex;

        let as_bot = AirMissionRequest {
            kind: MissionKind::Strike,
            faction: Faction::Bot,
            squadron_key: "botkg".to_string(),
            target_hex: Some(target),
            escort_target_unit_key: None,
        };
        assert!(matches!(
            engine.schedule_air_mission(&as_bot),
            Err(EngineError::SquadronNotOwned { faction: Faction::Bot, .. })
        ));

        let borrowed = AirMissionRequest {
            faction: Faction::Player,
            ..as_bot
        };
        assert!(matches!(
            engine.schedule_air_mission(&borrowed),
            Err(EngineError::SquadronNotOwned { .. })
        ));
        assert!(engine.get_scheduled_air_missions(Faction::Bot).is_empty());
        assert!(engine.get_scheduled_air_missions(Faction::Player).is_empty());
    }

    #[test]
    fn test_state_hash_is_reproducible() {
        let mut a = deployed_engine();
        let mut b = deployed_engine();
        assert_eq!(a.state_hash(), b.state_hash());
        a.end_player_turn().unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
        b.end_player_turn().unwrap();
        assert_eq!(a.state_hash(), b.state_hash());
        assert!(a.check_invariants().is_ok());
    }
}
