//! Reserve pool: allocated units not yet on the map.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::scenario::UnitAllocation;
use crate::turn::Phase;

/// Whether an entry can still be called up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReserveStatus {
    /// At least one unit remains.
    Ready,
    /// Nothing left.
    Exhausted,
}

/// One reserve line, keyed by allocation key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReserveEntry {
    /// Allocation key.
    pub unit_key: String,
    /// Unit type key.
    pub type_key: String,
    /// Display label.
    pub label: String,
    /// Sprite identifier.
    pub sprite: String,
    /// Starting experience of called-up units.
    pub experience: u8,
    /// Units left.
    pub remaining: u32,
    /// Ready or exhausted.
    pub status: ReserveStatus,
}

impl ReserveEntry {
    fn refresh_status(&mut self) {
        self.status = if self.remaining == 0 {
            ReserveStatus::Exhausted
        } else {
            ReserveStatus::Ready
        };
    }
}

/// Reserve pool for the player.
#[derive(Debug, Clone, Default)]
pub struct ReserveManager {
    entries: Vec<ReserveEntry>,
    cooldown_turns: u32,
}

impl ReserveManager {
    /// Empty pool with a call-up cooldown.
    #[must_use]
    pub fn new(cooldown_turns: u32) -> Self {
        Self {
            entries: Vec::new(),
            cooldown_turns,
        }
    }

    /// Add `count` units of an allocation, merging with an existing line.
    pub fn add(&mut self, allocation: &UnitAllocation, count: u32) {
        match self.entries.iter_mut().find(|e| e.unit_key == allocation.key) {
            Some(entry) => {
                entry.remaining += count;
                entry.refresh_status();
            }
            None => {
                let mut entry = ReserveEntry {
                    unit_key: allocation.key.clone(),
                    type_key: allocation.type_key.clone(),
                    label: allocation.label.clone(),
                    sprite: allocation.sprite.clone(),
                    experience: allocation.experience,
                    remaining: count,
                    status: ReserveStatus::Ready,
                };
                entry.refresh_status();
                self.entries.push(entry);
            }
        }
    }

    /// Check if call-ups are open in `phase` on `turn`.
    #[must_use]
    pub const fn call_ups_open(&self, phase: Phase, turn: u32) -> bool {
        matches!(phase, Phase::PlayerTurn) && turn > self.cooldown_turns
    }

    /// Look up a line. Unknown keys are an error.
    pub fn entry(&self, unit_key: &str) -> Result<&ReserveEntry> {
        self.entries
            .iter()
            .find(|e| e.unit_key == unit_key)
            .ok_or_else(|| EngineError::UnknownUnitKey(unit_key.to_string()))
    }

    /// Take one unit from a line. `Ok(None)` when the line is exhausted.
    pub fn take(&mut self, unit_key: &str) -> Result<Option<ReserveEntry>> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.unit_key == unit_key)
            .ok_or_else(|| EngineError::UnknownUnitKey(unit_key.to_string()))?;
        if entry.remaining == 0 {
            return Ok(None);
        }
        entry.remaining -= 1;
        entry.refresh_status();
        debug!(unit_key, remaining = entry.remaining, "Reserve unit taken");
        Ok(Some(entry.clone()))
    }

    /// Copy of every line, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ReserveEntry> {
        self.entries.clone()
    }

    /// Units left across all lines.
    #[must_use]
    pub fn total_remaining(&self) -> u32 {
        self.entries.iter().map(|e| e.remaining).sum()
    }
}
