//! Air support: squadrons, mission lifecycle and reports.
//!
//! Missions advance exactly one status per tick:
//!
//! ```text
//! Queued -> InFlight -> Resolving -> Completed [-> Refit]
//! ```
//!
//! Strikes resolve through the combat pipeline when they reach `Resolving`.
//! Squadrons whose type needs refitting sit out a number of ticks after
//! their mission, then become ready again.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::battle::Battle;
use crate::error::{EngineError, Result};
use crate::hex::Axial;
use crate::scenario::SquadronSpec;
use crate::turn::Faction;
use crate::units::UnitCatalog;

/// Mission identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MissionId(pub u32);

/// Kind of air mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionKind {
    /// Reveal hexes around a target.
    Recon,
    /// Attack the unit on a target hex.
    Strike,
    /// Protect another squadron's strike from interception.
    Escort,
    /// Intercept enemy strikes near a target hex.
    AirCover,
}

/// Mission lifecycle status. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MissionStatus {
    /// Accepted, waiting for dispatch.
    Queued,
    /// Airborne.
    InFlight,
    /// Over the target.
    Resolving,
    /// Outcome known.
    Completed,
    /// Squadron refitting after the mission.
    Refit,
}

/// Squadron availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SquadronStatus {
    /// Free to fly.
    Ready,
    /// Flying a mission.
    Assigned(MissionId),
    /// Refitting.
    Refit {
        /// Ticks until ready.
        turns_left: u32,
    },
}

/// A squadron and its current availability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Squadron {
    /// Squadron key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Aircraft type key.
    pub type_key: String,
    /// Owning faction.
    pub faction: Faction,
    /// Availability.
    pub status: SquadronStatus,
}

/// Request to fly a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirMissionRequest {
    /// Mission kind.
    pub kind: MissionKind,
    /// Requesting faction.
    pub faction: Faction,
    /// Squadron to fly it.
    pub squadron_key: String,
    /// Target hex; required for every kind except escort.
    pub target_hex: Option<Axial>,
    /// Squadron key to escort; required for escorts.
    pub escort_target_unit_key: Option<String>,
}

/// Result of a resolved mission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionOutcome {
    /// A strike hit its target.
    StrikeHit {
        /// Strength removed.
        damage: i32,
        /// The target was destroyed.
        destroyed: bool,
        /// Enemy air cover halved the damage.
        intercepted: bool,
    },
    /// A strike found nothing to attack.
    NoTarget,
    /// Recon revealed hexes.
    Revealed {
        /// Hexes revealed until the next tick.
        hexes: usize,
    },
    /// Escort flown.
    Escorted,
    /// Air cover flown.
    CoverFlown,
}

/// A scheduled mission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AirMission {
    /// Mission id.
    pub id: MissionId,
    /// Mission kind.
    pub kind: MissionKind,
    /// Owning faction.
    pub faction: Faction,
    /// Squadron flying it.
    pub squadron_key: String,
    /// Current status.
    pub status: MissionStatus,
    /// Target hex.
    pub target_hex: Option<Axial>,
    /// Escorted squadron key.
    pub escort_target_unit_key: Option<String>,
    /// Outcome, once resolved.
    pub outcome: Option<MissionOutcome>,
}

impl AirMission {
    /// Airborne over the battlefield: past dispatch, not yet refitting.
    #[must_use]
    pub fn is_airborne(&self) -> bool {
        matches!(
            self.status,
            MissionStatus::InFlight | MissionStatus::Resolving | MissionStatus::Completed
        )
    }
}

/// One lifecycle transition, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AirMissionReport {
    /// Unique report id.
    pub id: u64,
    /// Mission the report is about.
    pub mission_id: MissionId,
    /// Turn of the transition.
    pub turn: u32,
    /// Mission faction.
    pub faction: Faction,
    /// Mission kind.
    pub kind: MissionKind,
    /// Squadron key.
    pub squadron_key: String,
    /// Status entered.
    pub status: MissionStatus,
    /// Outcome, on completion.
    pub outcome: Option<MissionOutcome>,
}

/// Consumer-side record of reports already handled.
#[derive(Debug, Clone, Default)]
pub struct AirReportFeed {
    seen: BTreeSet<u64>,
}

impl AirReportFeed {
    /// Empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports not seen before, marking them seen.
    pub fn consume(&mut self, reports: &[AirMissionReport]) -> Vec<AirMissionReport> {
        reports
            .iter()
            .filter(|report| self.seen.insert(report.id))
            .cloned()
            .collect()
    }
}

/// Read-only view of a faction's air arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirSupportSummary {
    /// Every squadron, in key order.
    pub squadrons: Vec<Squadron>,
    /// Squadrons free to fly.
    pub ready: usize,
    /// Squadrons refitting.
    pub refitting: usize,
    /// Missions not yet finished.
    pub active_missions: usize,
}

/// Squadron registry and mission scheduler.
#[derive(Debug, Clone, Default)]
pub struct AirMissionScheduler {
    squadrons: BTreeMap<String, Squadron>,
    missions: BTreeMap<MissionId, AirMission>,
    reports: Vec<AirMissionReport>,
    next_mission: u32,
    next_report: u64,
}

impl AirMissionScheduler {
    /// Register the scenario's squadrons. Unknown aircraft types are an error.
    pub fn new(squadrons: &[SquadronSpec], catalog: &UnitCatalog) -> Result<Self> {
        let mut scheduler = Self::default();
        for spec in squadrons {
            let unit_type = catalog.require(&spec.type_key)?;
            if !unit_type.class.is_air() {
                return Err(EngineError::Scenario(format!(
                    "squadron '{}' flies non-air type '{}'",
                    spec.key, spec.type_key
                )));
            }
            scheduler.squadrons.insert(
                spec.key.clone(),
                Squadron {
                    key: spec.key.clone(),
                    label: spec.label.clone(),
                    type_key: spec.type_key.clone(),
                    faction: spec.faction,
                    status: SquadronStatus::Ready,
                },
            );
        }
        Ok(scheduler)
    }

    /// Look up a squadron.
    #[must_use]
    pub fn squadron(&self, key: &str) -> Option<&Squadron> {
        self.squadrons.get(key)
    }

    /// A faction's ready squadrons, in key order.
    #[must_use]
    pub fn ready_squadrons(&self, faction: Faction) -> Vec<&Squadron> {
        self.squadrons
            .values()
            .filter(|s| s.faction == faction && s.status == SquadronStatus::Ready)
            .collect()
    }

    /// Look up a mission.
    #[must_use]
    pub fn mission(&self, id: MissionId) -> Option<&AirMission> {
        self.missions.get(&id)
    }

    /// Missions of a faction, in id order.
    #[must_use]
    pub fn missions_for(&self, faction: Faction) -> Vec<AirMission> {
        self.missions
            .values()
            .filter(|m| m.faction == faction)
            .cloned()
            .collect()
    }

    /// Every report emitted so far, oldest first.
    #[must_use]
    pub fn reports(&self) -> &[AirMissionReport] {
        &self.reports
    }

    /// Summary of one faction's air arm.
    #[must_use]
    pub fn summary(&self, faction: Faction, catalog: &UnitCatalog) -> AirSupportSummary {
        let squadrons: Vec<Squadron> = self
            .squadrons
            .values()
            .filter(|s| s.faction == faction)
            .cloned()
            .collect();
        AirSupportSummary {
            ready: squadrons
                .iter()
                .filter(|s| s.status == SquadronStatus::Ready)
                .count(),
            refitting: squadrons
                .iter()
                .filter(|s| matches!(s.status, SquadronStatus::Refit { .. }))
                .count(),
            active_missions: self
                .missions
                .values()
                .filter(|m| m.faction == faction && !self.is_finished(m, catalog))
                .count(),
            squadrons,
        }
    }

    fn refit_turns(&self, squadron_key: &str, catalog: &UnitCatalog) -> u32 {
        self.squadrons
            .get(squadron_key)
            .and_then(|s| catalog.get(&s.type_key))
            .map_or(0, |t| t.refit_turns)
    }

    fn is_finished(&self, mission: &AirMission, catalog: &UnitCatalog) -> bool {
        match mission.status {
            MissionStatus::Refit => true,
            MissionStatus::Completed => self.refit_turns(&mission.squadron_key, catalog) == 0,
            _ => false,
        }
    }

    fn report(&mut self, mission: &AirMission, turn: u32) -> AirMissionReport {
        let report = AirMissionReport {
            id: self.next_report,
            mission_id: mission.id,
            turn,
            faction: mission.faction,
            kind: mission.kind,
            squadron_key: mission.squadron_key.clone(),
            status: mission.status,
            outcome: mission.outcome.clone(),
        };
        self.next_report += 1;
        self.reports.push(report.clone());
        report
    }

    /// Queue a mission.
    ///
    /// `Ok(None)` when the squadron is busy or the request lacks the target
    /// its kind needs. Unknown squadrons and squadrons of the other faction
    /// are errors.
    pub fn schedule(&mut self, request: &AirMissionRequest, turn: u32) -> Result<Option<MissionId>> {
        let squadron = self
            .squadrons
            .get(&request.squadron_key)
            .ok_or_else(|| EngineError::UnknownSquadron(request.squadron_key.clone()))?;
        if squadron.faction != request.faction {
            return Err(EngineError::SquadronNotOwned {
                squadron: request.squadron_key.clone(),
                faction: request.faction,
            });
        }
        if squadron.status != SquadronStatus::Ready {
            return Ok(None);
        }
        match request.kind {
            MissionKind::Escort => {
                let Some(escorted) = &request.escort_target_unit_key else {
                    return Ok(None);
                };
                let escorted = self
                    .squadrons
                    .get(escorted)
                    .ok_or_else(|| EngineError::UnknownSquadron(escorted.clone()))?;
                if escorted.faction != request.faction || escorted.key == request.squadron_key {
                    return Ok(None);
                }
            }
            MissionKind::Recon | MissionKind::Strike | MissionKind::AirCover => {
                if request.target_hex.is_none() {
                    return Ok(None);
                }
            }
        }

        let id = MissionId(self.next_mission);
        self.next_mission += 1;
        let mission = AirMission {
            id,
            kind: request.kind,
            faction: request.faction,
            squadron_key: request.squadron_key.clone(),
            status: MissionStatus::Queued,
            target_hex: request.target_hex,
            escort_target_unit_key: request.escort_target_unit_key.clone(),
            outcome: None,
        };
        if let Some(squadron) = self.squadrons.get_mut(&request.squadron_key) {
            squadron.status = SquadronStatus::Assigned(id);
        }
        debug!(?id, kind = ?mission.kind, squadron = %mission.squadron_key, "Air mission queued");
        self.report(&mission, turn);
        self.missions.insert(id, mission);
        Ok(Some(id))
    }

    /// Check if an enemy air-cover mission protects `target`.
    fn is_covered(&self, attacker: Faction, target: Axial, radius: u32) -> bool {
        self.missions.values().any(|m| {
            m.faction != attacker
                && m.kind == MissionKind::AirCover
                && m.is_airborne()
                && m.target_hex.is_some_and(|hex| hex.distance(target) <= radius)
        })
    }

    /// Check if an airborne escort of the same faction covers a squadron.
    fn is_escorted(&self, faction: Faction, squadron_key: &str) -> bool {
        self.missions.values().any(|m| {
            m.faction == faction
                && m.kind == MissionKind::Escort
                && m.is_airborne()
                && m.escort_target_unit_key.as_deref() == Some(squadron_key)
        })
    }

    fn resolve(
        &self,
        mission: &AirMission,
        battle: &mut Battle,
        recon_radius: u32,
        air_cover_radius: u32,
        revealed: &mut BTreeMap<Faction, BTreeSet<Axial>>,
    ) -> Result<MissionOutcome> {
        let outcome = match mission.kind {
            MissionKind::Strike => {
                let Some(target) = mission.target_hex else {
                    return Ok(MissionOutcome::NoTarget);
                };
                let type_key = self
                    .squadrons
                    .get(&mission.squadron_key)
                    .map(|s| s.type_key.clone())
                    .ok_or_else(|| EngineError::UnknownSquadron(mission.squadron_key.clone()))?;
                let intercepted = self.is_covered(mission.faction, target, air_cover_radius)
                    && !self.is_escorted(mission.faction, &mission.squadron_key);
                match battle.air_strike(mission.faction, &type_key, target, intercepted)? {
                    Some(resolution) => MissionOutcome::StrikeHit {
                        damage: resolution.damage,
                        destroyed: resolution.defender_destroyed,
                        intercepted,
                    },
                    None => MissionOutcome::NoTarget,
                }
            }
            MissionKind::Recon => {
                let hexes: BTreeSet<Axial> = mission
                    .target_hex
                    .map(|center| {
                        center
                            .hexes_in_range(recon_radius)
                            .into_iter()
                            .filter(|&hex| battle.map().in_bounds(hex))
                            .collect()
                    })
                    .unwrap_or_default();
                let count = hexes.len();
                revealed.entry(mission.faction).or_default().extend(hexes);
                MissionOutcome::Revealed { hexes: count }
            }
            MissionKind::Escort => MissionOutcome::Escorted,
            MissionKind::AirCover => MissionOutcome::CoverFlown,
        };
        Ok(outcome)
    }

    /// Advance every unfinished mission one status and count down refits.
    ///
    /// Recon reveals from the previous tick expire; reveals produced by this
    /// tick are written to the battle. Returns the reports emitted.
    pub fn tick(
        &mut self,
        battle: &mut Battle,
        turn: u32,
        recon_radius: u32,
        air_cover_radius: u32,
    ) -> Result<Vec<AirMissionReport>> {
        let catalog = battle.catalog().clone();
        let first_report = self.reports.len();

        for squadron in self.squadrons.values_mut() {
            if let SquadronStatus::Refit { turns_left } = squadron.status {
                squadron.status = if turns_left <= 1 {
                    SquadronStatus::Ready
                } else {
                    SquadronStatus::Refit {
                        turns_left: turns_left - 1,
                    }
                };
            }
        }

        let mut revealed: BTreeMap<Faction, BTreeSet<Axial>> = BTreeMap::new();
        let ids: Vec<MissionId> = self.missions.keys().copied().collect();
        for id in ids {
            let Some(mut mission) = self.missions.get(&id).cloned() else {
                continue;
            };
            if self.is_finished(&mission, &catalog) {
                continue;
            }
            let refit_turns = self.refit_turns(&mission.squadron_key, &catalog);

            match mission.status {
                MissionStatus::Queued => mission.status = MissionStatus::InFlight,
                MissionStatus::InFlight => mission.status = MissionStatus::Resolving,
                MissionStatus::Resolving => {
                    let outcome =
                        self.resolve(&mission, battle, recon_radius, air_cover_radius, &mut revealed)?;
                    mission.outcome = Some(outcome);
                    mission.status = MissionStatus::Completed;
                    if refit_turns == 0 {
                        self.set_squadron_status(&mission.squadron_key, SquadronStatus::Ready);
                    }
                }
                MissionStatus::Completed => {
                    mission.status = MissionStatus::Refit;
                    self.set_squadron_status(
                        &mission.squadron_key,
                        SquadronStatus::Refit {
                            turns_left: refit_turns,
                        },
                    );
                }
                MissionStatus::Refit => continue,
            }

            debug!(?id, status = ?mission.status, "Air mission advanced");
            self.report(&mission, turn);
            self.missions.insert(id, mission);
        }

        for faction in [Faction::Player, Faction::Bot] {
            battle.set_revealed(faction, revealed.remove(&faction).unwrap_or_default());
        }

        let emitted = self.reports[first_report..].to_vec();
        info!(turn, reports = emitted.len(), "Air missions ticked");
        Ok(emitted)
    }

    fn set_squadron_status(&mut self, key: &str, status: SquadronStatus) {
        if let Some(squadron) = self.squadrons.get_mut(key) {
            squadron.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::HexDirection;
    use crate::map::{HexMap, MapSpec};
    use crate::terrain::TerrainCatalog;
    use crate::units::ScenarioUnit;

    fn battle() -> Battle {
        let spec = MapSpec {
            width: 12,
            height: 10,
            fill: "plains".to_string(),
            tiles: Vec::new(),
        };
        let map = HexMap::from_spec(&spec, &TerrainCatalog::builtin()).unwrap();
        Battle::new(map, UnitCatalog::builtin(), 2)
    }

    fn squadron(key: &str, type_key: &str, faction: Faction) -> SquadronSpec {
        SquadronSpec {
            key: key.to_string(),
            label: key.to_string(),
            type_key: type_key.to_string(),
            faction,
        }
    }

    fn request(kind: MissionKind, faction: Faction, key: &str, target: Option<Axial>) -> AirMissionRequest {
        AirMissionRequest {
            kind,
            faction,
            squadron_key: key.to_string(),
            target_hex: target,
            escort_target_unit_key: None,
        }
    }

    fn scheduler(specs: &[SquadronSpec]) -> AirMissionScheduler {
        AirMissionScheduler::new(specs, &UnitCatalog::builtin()).unwrap()
    }

    #[test]
    fn test_unknown_and_foreign_squadrons() {
        let mut air = scheduler(&[squadron("jg1", "fighter", Faction::Bot)]);
        assert!(matches!(
            air.schedule(&request(MissionKind::Recon, Faction::Player, "ghost", Some(Axial::new(1, 1))), 1),
            Err(EngineError::UnknownSquadron(_))
        ));
        assert!(matches!(
            air.schedule(&request(MissionKind::Recon, Faction::Player, "jg1", Some(Axial::new(1, 1))), 1),
            Err(EngineError::SquadronNotOwned { .. })
        ));
    }

    #[test]
    fn test_ground_type_rejected() {
        let result = AirMissionScheduler::new(&[squadron("bad", "tank", Faction::Player)], &UnitCatalog::builtin());
        assert!(matches!(result, Err(EngineError::Scenario(_))));
    }

    #[test]
    fn test_strike_lifecycle_with_refit() {
        let mut battle = battle();
        let unit_type = battle.catalog().get("infantry").unwrap().clone();
        let target = Axial::new(5, 2);
        let victim = battle
            .spawn(Faction::Bot, ScenarioUnit::fresh(&unit_type, target, HexDirection::West), "rifles", None)
            .unwrap();
        let mut air = scheduler(&[squadron("kg1", "bomber", Faction::Player)]);

        let id = air
            .schedule(&request(MissionKind::Strike, Faction::Player, "kg1", Some(target)), 1)
            .unwrap()
            .unwrap();
        // Busy squadrons cannot take a second mission.
        assert!(air
            .schedule(&request(MissionKind::Strike, Faction::Player, "kg1", Some(target)), 1)
            .unwrap()
            .is_none());

        let statuses: Vec<MissionStatus> = (2..=5)
            .map(|turn| {
                air.tick(&mut battle, turn, 2, 3).unwrap();
                air.mission(id).unwrap().status
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                MissionStatus::InFlight,
                MissionStatus::Resolving,
                MissionStatus::Completed,
                MissionStatus::Refit,
            ]
        );
        assert_eq!(battle.unit(victim).unwrap().unit.strength, 87);
        assert_eq!(
            air.squadron("kg1").unwrap().status,
            SquadronStatus::Refit { turns_left: 2 }
        );

        air.tick(&mut battle, 6, 2, 3).unwrap();
        air.tick(&mut battle, 7, 2, 3).unwrap();
        assert_eq!(air.squadron("kg1").unwrap().status, SquadronStatus::Ready);
        assert_eq!(air.mission(id).unwrap().status, MissionStatus::Refit);
    }

    #[test]
    fn test_air_cover_intercepts_unless_escorted() {
        let mut battle = battle();
        let unit_type = battle.catalog().get("infantry").unwrap().clone();
        let target = Axial::new(5, 2);
        battle
            .spawn(Faction::Bot, ScenarioUnit::fresh(&unit_type, target, HexDirection::West), "rifles", None)
            .unwrap();
        let mut air = scheduler(&[
            squadron("kg1", "bomber", Faction::Player),
            squadron("jg1", "fighter", Faction::Player),
            squadron("cover", "fighter", Faction::Bot),
        ]);
        air.schedule(&request(MissionKind::AirCover, Faction::Bot, "cover", Some(Axial::new(6, 2))), 1)
            .unwrap()
            .unwrap();
        let strike = air
            .schedule(&request(MissionKind::Strike, Faction::Player, "kg1", Some(target)), 1)
            .unwrap()
            .unwrap();
        for turn in 2..=4 {
            air.tick(&mut battle, turn, 2, 3).unwrap();
        }
        assert!(matches!(
            air.mission(strike).unwrap().outcome,
            Some(MissionOutcome::StrikeHit { intercepted: true, .. })
        ));

        // Second run with an escort.
        let mut battle = self::battle();
        battle
            .spawn(Faction::Bot, ScenarioUnit::fresh(&unit_type, target, HexDirection::West), "rifles", None)
            .unwrap();
        let mut air = scheduler(&[
            squadron("kg1", "bomber", Faction::Player),
            squadron("jg1", "fighter", Faction::Player),
            squadron("cover", "fighter", Faction::Bot),
        ]);
        air.schedule(&request(MissionKind::AirCover, Faction::Bot, "cover", Some(Axial::new(6, 2))), 1)
            .unwrap();
        let mut escort = request(MissionKind::Escort, Faction::Player, "jg1", None);
        escort.escort_target_unit_key = Some("kg1".to_string());
        air.schedule(&escort, 1).unwrap().unwrap();
        let strike = air
            .schedule(&request(MissionKind::Strike, Faction::Player, "kg1", Some(target)), 1)
            .unwrap()
            .unwrap();
        for turn in 2..=4 {
            air.tick(&mut battle, turn, 2, 3).unwrap();
        }
        assert!(matches!(
            air.mission(strike).unwrap().outcome,
            Some(MissionOutcome::StrikeHit { intercepted: false, damage: 13, .. })
        ));
    }

    #[test]
    fn test_recon_reveals_until_next_tick() {
        let mut battle = battle();
        let mut air = scheduler(&[squadron("recce", "fighter", Faction::Player)]);
        let center = Axial::new(5, 2);
        air.schedule(&request(MissionKind::Recon, Faction::Player, "recce", Some(center)), 1)
            .unwrap()
            .unwrap();
        air.tick(&mut battle, 2, 1, 3).unwrap();
        air.tick(&mut battle, 3, 1, 3).unwrap();
        assert!(battle.revealed(Faction::Player).is_empty());
        air.tick(&mut battle, 4, 1, 3).unwrap();
        assert_eq!(battle.revealed(Faction::Player).len(), 7);
        assert!(battle.revealed(Faction::Player).contains(&center));
        air.tick(&mut battle, 5, 1, 3).unwrap();
        assert!(battle.revealed(Faction::Player).is_empty());
    }

    #[test]
    fn test_reports_unique_and_feed_idempotent() {
        let mut battle = battle();
        let mut air = scheduler(&[squadron("recce", "fighter", Faction::Player)]);
        air.schedule(&request(MissionKind::Recon, Faction::Player, "recce", Some(Axial::new(4, 4))), 1)
            .unwrap();
        air.tick(&mut battle, 2, 1, 3).unwrap();

        let mut ids: Vec<u64> = air.reports().iter().map(|r| r.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), air.reports().len());

        let mut feed = AirReportFeed::new();
        assert_eq!(feed.consume(air.reports()).len(), 2);
        assert!(feed.consume(air.reports()).is_empty());
        air.tick(&mut battle, 3, 1, 3).unwrap();
        assert_eq!(feed.consume(air.reports()).len(), 1);
    }

    #[test]
    fn test_summary_counts() {
        let mut battle = battle();
        let mut air = scheduler(&[
            squadron("recce", "fighter", Faction::Player),
            squadron("kg1", "bomber", Faction::Player),
        ]);
        air.schedule(&request(MissionKind::Recon, Faction::Player, "recce", Some(Axial::new(4, 4))), 1)
            .unwrap();
        let summary = air.summary(Faction::Player, battle.catalog());
        assert_eq!(summary.ready, 1);
        assert_eq!(summary.active_missions, 1);
        for turn in 2..=5 {
            air.tick(&mut battle, turn, 1, 3).unwrap();
        }
        let summary = air.summary(Faction::Player, battle.catalog());
        assert_eq!(summary.refitting, 1);
        assert_eq!(summary.active_missions, 0);
    }
}
