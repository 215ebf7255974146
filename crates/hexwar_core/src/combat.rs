//! Deterministic combat resolution.
//!
//! Every figure is computed in fixed point, in a fixed order:
//!
//! 1. Accuracy: base accuracy for the range band plus an experience bonus,
//!    both scaled by the commander, then the defender tile's modifier, then
//!    the spotted-only penalty; clamped to 0..=100.
//! 2. Shots scale with strength; expected hits = shots × accuracy.
//! 3. Damage per hit from the class table, scaled by experience and the
//!    commander, then by the payload multiplier.
//! 4. Penetration compares armor piercing with the facing armor. It is
//!    reported, not applied.
//! 5. Expected damage and suppression, each before and after payload.
//! 6. Retaliation by a surviving defender, through the same pipeline.
//!
//! There is no randomness: the damage applied is the rounded expected damage,
//! so a preview always matches the resolution computed from the same state.

use serde::{Deserialize, Serialize};

use crate::hex::{Axial, HexDirection};
use crate::math::{fixed_serde, percent, round_to_i32, Fixed};
use crate::terrain::TerrainDefinition;
use crate::units::{ScenarioUnit, UnitClass, UnitTypeDefinition};
use crate::visibility::Visibility;

/// Accuracy factor against targets seen only indirectly, in percent.
pub const SPOTTED_ACCURACY_PERCENT: i32 = 80;

/// Experience bonus per level, in percent (accuracy points and damage scale).
pub const EXPERIENCE_BONUS_PERCENT: i32 = 5;

/// Suppression reduction per entrenchment level, in percent.
pub const ENTRENCH_SUPPRESSION_PERCENT: i32 = 10;

/// Damage factor for strikes caught by enemy air cover, in percent.
pub const INTERCEPTED_DAMAGE_PERCENT: i32 = 50;

/// Commander modifiers, in percent (100 is neutral).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commander {
    /// Accuracy multiplier.
    pub accuracy: i32,
    /// Damage multiplier.
    pub damage: i32,
}

impl Default for Commander {
    fn default() -> Self {
        Self {
            accuracy: 100,
            damage: 100,
        }
    }
}

/// One side of an engagement.
#[derive(Debug, Clone, Copy)]
pub struct Combatant<'a> {
    /// Unit state.
    pub unit: &'a ScenarioUnit,
    /// Unit type.
    pub unit_type: &'a UnitTypeDefinition,
    /// Commanding officer's modifiers.
    pub commander: Commander,
    /// Terrain of the tile the unit stands on.
    pub terrain: Option<&'a TerrainDefinition>,
}

impl Combatant<'_> {
    fn class(&self) -> UnitClass {
        self.unit_type.class
    }
}

/// What a shooter's faction knows about its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sighting {
    /// The shooter itself has unobstructed sight to the target.
    pub line_of_sight: bool,
    /// Faction-wide classification of the target.
    pub visibility: Visibility,
}

/// Everything needed to preview or resolve one attack and its reply.
#[derive(Debug, Clone, Copy)]
pub struct Engagement<'a> {
    /// Unit firing first.
    pub attacker: Combatant<'a>,
    /// Unit being fired upon.
    pub defender: Combatant<'a>,
    /// Attacker's view of the defender.
    pub forward: Sighting,
    /// Defender's view of the attacker, used for retaliation.
    pub reverse: Sighting,
    /// The attack was intercepted by enemy air cover.
    pub intercepted: bool,
}

/// Which armor plate an attack strikes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArmorFacing {
    /// Frontal arc (heading and both adjacent sides).
    Front,
    /// Flanks and rear.
    Side,
    /// From above.
    Top,
}

impl ArmorFacing {
    /// Arc struck by an attack from `attacker_hex` on a defender at
    /// `defender_hex` facing `defender_facing`.
    #[must_use]
    pub fn for_attack(
        attacker_hex: Axial,
        attacker_is_air: bool,
        defender_hex: Axial,
        defender_facing: HexDirection,
    ) -> Self {
        if attacker_is_air || attacker_hex == defender_hex {
            return ArmorFacing::Top;
        }
        let incoming = HexDirection::toward(defender_hex, attacker_hex);
        if incoming.turns_between(defender_facing) <= 1 {
            ArmorFacing::Front
        } else {
            ArmorFacing::Side
        }
    }
}

/// Projected outcome of one unit firing on another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatPreview {
    /// Hex distance between the units.
    pub distance: u32,
    /// Final accuracy in percent, 0..=100.
    #[serde(with = "fixed_serde")]
    pub accuracy: Fixed,
    /// Shots fired at current strength.
    pub shots: u32,
    /// Shots × accuracy.
    #[serde(with = "fixed_serde")]
    pub expected_hits: Fixed,
    /// Damage per hit before the payload multiplier.
    #[serde(with = "fixed_serde")]
    pub damage_per_hit: Fixed,
    /// Payload multiplier.
    pub payload: u32,
    /// Expected damage before the payload multiplier.
    #[serde(with = "fixed_serde")]
    pub expected_damage_pre_payload: Fixed,
    /// Expected damage after payload (and interception).
    #[serde(with = "fixed_serde")]
    pub expected_damage: Fixed,
    /// Expected suppression before the payload multiplier.
    #[serde(with = "fixed_serde")]
    pub expected_suppression_pre_payload: Fixed,
    /// Expected suppression after payload (and interception).
    #[serde(with = "fixed_serde")]
    pub expected_suppression: Fixed,
    /// Armor arc struck.
    pub armor_facing: ArmorFacing,
    /// Armor value on that arc.
    pub facing_armor: i32,
    /// Armor piercing meets or beats the facing armor.
    pub penetrates: bool,
    /// The target was only spotted indirectly.
    pub spotted_only: bool,
    /// Damage was halved by enemy air cover.
    pub intercepted: bool,
    /// Projected reply from the defender, if it can return fire.
    pub retaliation: Option<Box<CombatPreview>>,
}

impl CombatPreview {
    /// Strength the target loses: the expected damage, rounded.
    #[must_use]
    pub fn applied_damage(&self) -> i32 {
        round_to_i32(self.expected_damage).max(0)
    }
}

/// Result of an executed attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResolution {
    /// Hex of the unit that fired.
    pub attacker_hex: Axial,
    /// Hex of the unit fired upon.
    pub defender_hex: Axial,
    /// Figures the damage was derived from.
    pub preview: CombatPreview,
    /// Strength removed from the target.
    pub damage: i32,
    /// Target strength afterwards, floored at 0.
    pub defender_strength: i32,
    /// The target was destroyed.
    pub defender_destroyed: bool,
    /// The defender's reply, if any.
    pub retaliation: Option<Box<AttackResolution>>,
}

/// Final accuracy in percent.
#[must_use]
pub fn accuracy(
    base: u32,
    experience: u8,
    commander_accuracy: i32,
    terrain_acc_mod: i32,
    spotted_only: bool,
) -> Fixed {
    let commander = percent(commander_accuracy);
    let base = Fixed::from_num(base);
    let experience_bonus = Fixed::from_num(EXPERIENCE_BONUS_PERCENT * i32::from(experience));

    let mut accuracy = base * commander + experience_bonus * commander;
    accuracy *= Fixed::ONE + percent(terrain_acc_mod);
    if spotted_only {
        accuracy *= percent(SPOTTED_ACCURACY_PERCENT);
    }
    accuracy.clamp(Fixed::ZERO, Fixed::from_num(100))
}

/// Shots fired by a unit type at `strength`: scaled down with losses,
/// rounded up, never below one.
#[must_use]
pub fn shots(unit_type: &UnitTypeDefinition, strength: i32) -> u32 {
    let strength = strength.clamp(0, 100) as u32;
    (unit_type.shots * strength).div_ceil(100).max(1)
}

/// Base damage per hit by attacker and defender class.
#[must_use]
pub const fn damage_table(attacker: UnitClass, defender: UnitClass) -> i32 {
    use UnitClass::{Artillery, Bomber, Fighter, Infantry, Recon, Tank, Vehicle};
    match (attacker, defender) {
        // Small arms
        (Infantry | Recon, Infantry | Recon | Artillery) => 3,
        (Infantry | Recon, Vehicle) => 2,
        (Infantry | Recon, Tank | Fighter | Bomber) => 1,

        // Autocannon and flak
        (Vehicle, Infantry | Recon | Artillery | Vehicle) => 3,
        (Vehicle, Tank) => 1,
        (Vehicle, Fighter | Bomber) => 2,

        // Main guns
        (Tank, Infantry | Recon | Artillery) => 4,
        (Tank, Vehicle) => 5,
        (Tank, Tank) => 4,
        (Tank, Fighter | Bomber) => 1,

        // Shells
        (Artillery, Infantry | Recon | Artillery) => 5,
        (Artillery, Vehicle) => 4,
        (Artillery, Tank) => 2,
        (Artillery, Fighter | Bomber) => 0,

        // Aircraft: payload multiplier scales these up
        (Fighter, Fighter | Bomber) => 3,
        (Fighter | Bomber, _) => 1,
    }
}

/// Suppression per hit by attacker and defender class.
#[must_use]
pub const fn suppression_table(attacker: UnitClass, defender: UnitClass) -> i32 {
    let base = match attacker {
        UnitClass::Infantry | UnitClass::Vehicle | UnitClass::Fighter => 2,
        UnitClass::Recon => 1,
        UnitClass::Tank => 3,
        UnitClass::Artillery | UnitClass::Bomber => 5,
    };
    // Crews behind armor shrug off half.
    if defender.is_armored() {
        base / 2
    } else {
        base
    }
}

/// Payload multiplier: heavy bomb loads against ground targets, dogfight
/// tempo for fighters against aircraft.
#[must_use]
pub const fn payload_multiplier(attacker: UnitClass, defender: UnitClass) -> u32 {
    match attacker {
        UnitClass::Bomber if !defender.is_air() => 10,
        UnitClass::Fighter if defender.is_air() => 4,
        _ => 1,
    }
}

fn can_fire(shooter: &Combatant<'_>, target: &Combatant<'_>, sighting: Sighting) -> bool {
    let unit_type = shooter.unit_type;
    let distance = shooter.unit.hex.distance(target.unit.hex);
    if shooter.unit.ammo == 0
        || !shooter.unit.is_alive()
        || !unit_type.can_target(target.class())
        || !unit_type.in_range(distance)
        || !sighting.visibility.is_detected()
    {
        return false;
    }
    sighting.line_of_sight || unit_type.indirect_fire
}

fn fire(
    shooter: &Combatant<'_>,
    target: &Combatant<'_>,
    sighting: Sighting,
    intercepted: bool,
) -> CombatPreview {
    let unit_type = shooter.unit_type;
    let distance = shooter.unit.hex.distance(target.unit.hex);
    let spotted_only = sighting.visibility == Visibility::SpottedOnly;
    let acc_mod = target.terrain.map_or(0, |t| t.acc_mod);

    let accuracy = accuracy(
        unit_type.base_accuracy(distance),
        shooter.unit.experience,
        shooter.commander.accuracy,
        acc_mod,
        spotted_only,
    );
    let shots = shots(unit_type, shooter.unit.strength);
    let expected_hits = Fixed::from_num(shots) * accuracy / Fixed::from_num(100);

    let experience_scale =
        Fixed::ONE + percent(EXPERIENCE_BONUS_PERCENT * i32::from(shooter.unit.experience));
    let damage_per_hit = Fixed::from_num(damage_table(shooter.class(), target.class()))
        * experience_scale
        * percent(shooter.commander.damage);
    let payload = payload_multiplier(shooter.class(), target.class());
    let intercept_scale = if intercepted {
        percent(INTERCEPTED_DAMAGE_PERCENT)
    } else {
        Fixed::ONE
    };

    let expected_damage_pre_payload = expected_hits * damage_per_hit;
    let expected_damage = expected_damage_pre_payload * Fixed::from_num(payload) * intercept_scale;

    let entrench_scale = (Fixed::ONE
        - percent(ENTRENCH_SUPPRESSION_PERCENT * i32::from(target.unit.entrench)))
    .max(Fixed::ZERO);
    let suppression_per_hit =
        Fixed::from_num(suppression_table(shooter.class(), target.class())) * entrench_scale;
    let expected_suppression_pre_payload = expected_hits * suppression_per_hit;
    let expected_suppression =
        expected_suppression_pre_payload * Fixed::from_num(payload) * intercept_scale;

    let armor_facing = ArmorFacing::for_attack(
        shooter.unit.hex,
        shooter.class().is_air(),
        target.unit.hex,
        target.unit.facing,
    );
    let armor = &target.unit_type.armor;
    let facing_armor = match armor_facing {
        ArmorFacing::Front => armor.front,
        ArmorFacing::Side => armor.side,
        ArmorFacing::Top => armor.top,
    };

    CombatPreview {
        distance,
        accuracy,
        shots,
        expected_hits,
        damage_per_hit,
        payload,
        expected_damage_pre_payload,
        expected_damage,
        expected_suppression_pre_payload,
        expected_suppression,
        armor_facing,
        facing_armor,
        penetrates: unit_type.armor_piercing >= facing_armor,
        spotted_only,
        intercepted,
        retaliation: None,
    }
}

/// Defender's reply after absorbing `damage`, if it survives and can fire back.
fn retaliation(engagement: &Engagement<'_>, damage: i32) -> Option<(ScenarioUnit, CombatPreview)> {
    let mut wounded = engagement.defender.unit.clone();
    wounded.strength = (wounded.strength - damage).max(0);
    let shooter = Combatant {
        unit: &wounded,
        ..engagement.defender
    };
    if !can_fire(&shooter, &engagement.attacker, engagement.reverse) {
        return None;
    }
    let preview = fire(&shooter, &engagement.attacker, engagement.reverse, false);
    Some((wounded, preview))
}

/// Preview an attack, including the projected retaliation.
///
/// Returns `None` when the attacker is out of ammo, cannot engage the
/// target's class, is out of range, or lacks sight (direct, or a spotted
/// target for indirect-fire units).
#[must_use]
pub fn preview_attack(engagement: &Engagement<'_>) -> Option<CombatPreview> {
    if !can_fire(&engagement.attacker, &engagement.defender, engagement.forward) {
        return None;
    }
    let mut preview = fire(
        &engagement.attacker,
        &engagement.defender,
        engagement.forward,
        engagement.intercepted,
    );
    preview.retaliation =
        retaliation(engagement, preview.applied_damage()).map(|(_, reply)| Box::new(reply));
    Some(preview)
}

/// Resolve an attack. Returns `None` exactly when [`preview_attack`] does.
///
/// Pure: the caller applies strength and ammo changes to its roster.
#[must_use]
pub fn resolve_attack(engagement: &Engagement<'_>) -> Option<AttackResolution> {
    let preview = preview_attack(engagement)?;
    let damage = preview.applied_damage();
    let defender_strength = (engagement.defender.unit.strength - damage).max(0);

    let retaliation = preview.retaliation.as_ref().map(|reply| {
        let reply_damage = reply.applied_damage();
        let attacker_strength = (engagement.attacker.unit.strength - reply_damage).max(0);
        Box::new(AttackResolution {
            attacker_hex: engagement.defender.unit.hex,
            defender_hex: engagement.attacker.unit.hex,
            preview: (**reply).clone(),
            damage: reply_damage,
            defender_strength: attacker_strength,
            defender_destroyed: attacker_strength == 0,
            retaliation: None,
        })
    });

    Some(AttackResolution {
        attacker_hex: engagement.attacker.unit.hex,
        defender_hex: engagement.defender.unit.hex,
        preview,
        damage,
        defender_strength,
        defender_destroyed: defender_strength == 0,
        retaliation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TerrainCatalog;
    use crate::units::UnitCatalog;

    fn unit(catalog: &UnitCatalog, key: &str, hex: Axial, facing: HexDirection) -> ScenarioUnit {
        ScenarioUnit::fresh(catalog.get(key).unwrap(), hex, facing)
    }

    fn clear() -> Sighting {
        Sighting {
            line_of_sight: true,
            visibility: Visibility::Direct,
        }
    }

    #[test]
    fn test_documented_accuracy_pipeline() {
        // 60 base, +10 experience, ×1.1 commander, -15% terrain, ×0.8 spotted.
        let result = accuracy(60, 2, 110, -15, true);
        let expected = (60.0 * 1.1 + 10.0 * 1.1) * 0.85 * 0.8;
        assert!((result.to_num::<f64>() - expected).abs() < 0.01);
        assert!((result.to_num::<f64>() - 52.36).abs() < 0.01);
    }

    #[test]
    fn test_accuracy_clamped() {
        assert_eq!(accuracy(95, 5, 150, 20, false), Fixed::from_num(100));
        assert_eq!(accuracy(10, 0, 100, -150, false), Fixed::ZERO);
    }

    #[test]
    fn test_shots_scale_with_strength() {
        let catalog = UnitCatalog::builtin();
        let infantry = catalog.get("infantry").unwrap();
        assert_eq!(shots(infantry, 100), 6);
        assert_eq!(shots(infantry, 50), 3);
        assert_eq!(shots(infantry, 34), 3);
        assert_eq!(shots(infantry, 1), 1);
        assert_eq!(shots(infantry, 0), 1);
    }

    #[test]
    fn test_payload_multipliers() {
        assert_eq!(payload_multiplier(UnitClass::Bomber, UnitClass::Tank), 10);
        assert_eq!(payload_multiplier(UnitClass::Fighter, UnitClass::Bomber), 4);
        assert_eq!(payload_multiplier(UnitClass::Fighter, UnitClass::Infantry), 1);
        assert_eq!(payload_multiplier(UnitClass::Tank, UnitClass::Tank), 1);
    }

    #[test]
    fn test_armor_facing() {
        let defender = Axial::new(0, 0);
        let east = Axial::new(1, 0);
        let west = Axial::new(-1, 0);
        assert_eq!(
            ArmorFacing::for_attack(east, false, defender, HexDirection::East),
            ArmorFacing::Front
        );
        assert_eq!(
            ArmorFacing::for_attack(west, false, defender, HexDirection::East),
            ArmorFacing::Side
        );
        assert_eq!(
            ArmorFacing::for_attack(west, true, defender, HexDirection::East),
            ArmorFacing::Top
        );
    }

    #[test]
    fn test_preview_requires_range_and_ammo() {
        let catalog = UnitCatalog::builtin();
        let tank_type = catalog.get("tank").unwrap();
        let infantry_type = catalog.get("infantry").unwrap();
        let tank = unit(&catalog, "tank", Axial::new(0, 0), HexDirection::East);
        let far = unit(&catalog, "infantry", Axial::new(3, 0), HexDirection::West);

        let engagement = Engagement {
            attacker: Combatant {
                unit: &tank,
                unit_type: tank_type,
                commander: Commander::default(),
                terrain: None,
            },
            defender: Combatant {
                unit: &far,
                unit_type: infantry_type,
                commander: Commander::default(),
                terrain: None,
            },
            forward: clear(),
            reverse: clear(),
            intercepted: false,
        };
        assert!(preview_attack(&engagement).is_none());

        let near = unit(&catalog, "infantry", Axial::new(2, 0), HexDirection::West);
        let mut dry = tank.clone();
        dry.ammo = 0;
        let engagement = Engagement {
            attacker: Combatant { unit: &dry, ..engagement.attacker },
            defender: Combatant { unit: &near, ..engagement.defender },
            ..engagement
        };
        assert!(preview_attack(&engagement).is_none());
    }

    #[test]
    fn test_blocked_sight_needs_indirect_fire() {
        let catalog = UnitCatalog::builtin();
        let tank = unit(&catalog, "tank", Axial::new(0, 0), HexDirection::East);
        let gun = unit(&catalog, "artillery", Axial::new(0, 0), HexDirection::East);
        let target = unit(&catalog, "infantry", Axial::new(2, 0), HexDirection::West);
        let blocked = Sighting {
            line_of_sight: false,
            visibility: Visibility::SpottedOnly,
        };
        let defender = Combatant {
            unit: &target,
            unit_type: catalog.get("infantry").unwrap(),
            commander: Commander::default(),
            terrain: None,
        };

        let direct = Engagement {
            attacker: Combatant {
                unit: &tank,
                unit_type: catalog.get("tank").unwrap(),
                commander: Commander::default(),
                terrain: None,
            },
            defender,
            forward: blocked,
            reverse: clear(),
            intercepted: false,
        };
        assert!(preview_attack(&direct).is_none());

        let indirect = Engagement {
            attacker: Combatant {
                unit: &gun,
                unit_type: catalog.get("artillery").unwrap(),
                commander: Commander::default(),
                terrain: None,
            },
            ..direct
        };
        let preview = preview_attack(&indirect).unwrap();
        assert!(preview.spotted_only);

        let hidden = Engagement {
            forward: Sighting {
                line_of_sight: false,
                visibility: Visibility::Hidden,
            },
            ..indirect
        };
        assert!(preview_attack(&hidden).is_none());
    }

    #[test]
    fn test_resolution_matches_preview() {
        let catalog = UnitCatalog::builtin();
        let terrain = TerrainCatalog::builtin();
        let attacker = unit(&catalog, "infantry", Axial::new(0, 0), HexDirection::East);
        let defender = unit(&catalog, "infantry", Axial::new(1, 0), HexDirection::West);
        let engagement = Engagement {
            attacker: Combatant {
                unit: &attacker,
                unit_type: catalog.get("infantry").unwrap(),
                commander: Commander::default(),
                terrain: terrain.get("plains"),
            },
            defender: Combatant {
                unit: &defender,
                unit_type: catalog.get("infantry").unwrap(),
                commander: Commander::default(),
                terrain: terrain.get("forest"),
            },
            forward: clear(),
            reverse: clear(),
            intercepted: false,
        };

        let preview = preview_attack(&engagement).unwrap();
        let resolution = resolve_attack(&engagement).unwrap();
        assert_eq!(resolution.preview, preview);
        assert_eq!(resolution.damage, preview.applied_damage());
        assert_eq!(resolution.defender_strength, 100 - preview.applied_damage());

        // 6 shots × 63.75% × 3 damage = 11.475
        assert_eq!(preview.applied_damage(), 11);
        let reply = resolution.retaliation.unwrap();
        assert_eq!(reply.attacker_hex, defender.hex);
        // 89 strength fires 6 shots at 75% on open ground.
        assert_eq!(reply.preview.shots, 6);
        assert_eq!(reply.damage, 14);
    }

    #[test]
    fn test_payload_reported_both_ways() {
        let catalog = UnitCatalog::builtin();
        let bomber = unit(&catalog, "bomber", Axial::new(3, 3), HexDirection::East);
        let tank = unit(&catalog, "tank", Axial::new(3, 3), HexDirection::East);
        let engagement = Engagement {
            attacker: Combatant {
                unit: &bomber,
                unit_type: catalog.get("bomber").unwrap(),
                commander: Commander::default(),
                terrain: None,
            },
            defender: Combatant {
                unit: &tank,
                unit_type: catalog.get("tank").unwrap(),
                commander: Commander::default(),
                terrain: None,
            },
            forward: clear(),
            reverse: clear(),
            intercepted: false,
        };
        let preview = preview_attack(&engagement).unwrap();
        assert_eq!(preview.payload, 10);
        assert_eq!(preview.armor_facing, ArmorFacing::Top);
        assert!(preview.penetrates);
        assert_eq!(
            preview.expected_damage,
            preview.expected_damage_pre_payload * Fixed::from_num(10)
        );
        // Tanks cannot shoot back at aircraft.
        assert!(preview.retaliation.is_none());

        let intercepted = preview_attack(&Engagement {
            intercepted: true,
            ..engagement
        })
        .unwrap();
        let halved = preview.expected_damage.to_num::<f64>() / 2.0;
        assert!((intercepted.expected_damage.to_num::<f64>() - halved).abs() < 1e-6);
    }

    #[test]
    fn test_entrenchment_reduces_suppression() {
        let catalog = UnitCatalog::builtin();
        let attacker = unit(&catalog, "infantry", Axial::new(0, 0), HexDirection::East);
        let mut dug_in = unit(&catalog, "infantry", Axial::new(1, 0), HexDirection::West);
        dug_in.entrench = 3;
        let open = unit(&catalog, "infantry", Axial::new(1, 0), HexDirection::West);
        let infantry = catalog.get("infantry").unwrap();
        let engage = |defender: &ScenarioUnit| {
            let engagement = Engagement {
                attacker: Combatant {
                    unit: &attacker,
                    unit_type: infantry,
                    commander: Commander::default(),
                    terrain: None,
                },
                defender: Combatant {
                    unit: defender,
                    unit_type: infantry,
                    commander: Commander::default(),
                    terrain: None,
                },
                forward: clear(),
                reverse: clear(),
                intercepted: false,
            };
            preview_attack(&engagement).unwrap()
        };
        let open = engage(&open);
        let dug_in = engage(&dug_in);
        assert_eq!(open.expected_damage, dug_in.expected_damage);
        assert!(dug_in.expected_suppression < open.expected_suppression);
    }
}
