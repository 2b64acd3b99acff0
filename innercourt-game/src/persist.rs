//! Save-slot payloads and the cross-playthrough legacy record.
//!
//! The engine only shapes the data; reading and writing a slot is the
//! storage collaborator's business (`GameStorage` in the crate root).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::logbook::Chronicle;
use crate::state::{PlayerState, StatDelta, Stats, WorldState};
use crate::summary::QuarterSnapshot;

/// Named save slots: one reserved autosave plus three manual slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotId {
    Auto,
    Slot1,
    Slot2,
    Slot3,
}

impl SlotId {
    pub const ALL: [Self; 4] = [Self::Auto, Self::Slot1, Self::Slot2, Self::Slot3];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Slot1 => "slot1",
            Self::Slot2 => "slot2",
            Self::Slot3 => "slot3",
        }
    }

    #[must_use]
    pub const fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Auto => "Autosave",
            Self::Slot1 => "Save One",
            Self::Slot2 => "Save Two",
            Self::Slot3 => "Save Three",
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "slot1" => Ok(Self::Slot1),
            "slot2" => Ok(Self::Slot2),
            "slot3" => Ok(Self::Slot3),
            _ => Err(()),
        }
    }
}

/// Lightweight slot metadata for save pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMeta {
    pub saved_at_ms: u64,
    pub turn: u32,
    pub month: u8,
    pub ap: u32,
    pub favor: f64,
    pub health: f64,
    pub cash: f64,
}

/// Everything a slot holds: the full session state plus replayable history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavePayload {
    pub player: PlayerState,
    pub world: WorldState,
    #[serde(default)]
    pub chronicle: Chronicle,
    #[serde(default)]
    pub quarter_snapshot: Option<QuarterSnapshot>,
    pub meta: SaveMeta,
}

impl SavePayload {
    /// Capture a payload from live session state.
    #[must_use]
    pub fn capture(
        player: &PlayerState,
        world: &WorldState,
        chronicle: &Chronicle,
        quarter_snapshot: Option<&QuarterSnapshot>,
        saved_at_ms: u64,
    ) -> Self {
        Self {
            player: player.clone(),
            world: world.clone(),
            chronicle: chronicle.clone(),
            quarter_snapshot: quarter_snapshot.cloned(),
            meta: SaveMeta {
                saved_at_ms,
                turn: world.turn,
                month: world.month,
                ap: world.ap,
                favor: player.stats.favor,
                health: player.stats.health,
                cash: player.stats.cash,
            },
        }
    }
}

/// Carry-over record written when a playthrough ends terminally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legacy {
    pub stats: Stats,
    pub turn: u32,
    pub month: u8,
    pub saved_at_ms: u64,
}

impl Legacy {
    /// Snapshot a finished run.
    #[must_use]
    pub fn from_run(player: &PlayerState, world: &WorldState, saved_at_ms: u64) -> Self {
        Self {
            stats: player.stats.clone(),
            turn: world.turn,
            month: world.month,
            saved_at_ms,
        }
    }

    /// Stat bonus granted to the next playthrough's character creation,
    /// scaled by how far the previous run progressed.
    #[must_use]
    pub fn creation_bonus(&self) -> StatDelta {
        let progress = f64::from(self.turn);
        let mut bonus = StatDelta::new();
        let scheming = (progress / 20.0).floor().min(5.0);
        if scheming > 0.0 {
            bonus = bonus.with("scheming", scheming);
        }
        let network = (progress / 30.0).floor().min(3.0);
        if network > 0.0 {
            bonus = bonus.with("network", network);
        }
        let cash = (self.stats.cash * 0.1).clamp(0.0, 20.0).floor();
        if cash > 0.0 {
            bonus = bonus.with("cash", cash);
        }
        bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_ids_roundtrip_strings() {
        for slot in SlotId::ALL {
            assert_eq!(slot.as_str().parse::<SlotId>(), Ok(slot));
        }
        assert!("slot9".parse::<SlotId>().is_err());
        assert!(SlotId::Auto.is_auto());
        assert!(!SlotId::Slot2.is_auto());
    }

    #[test]
    fn payload_meta_mirrors_state() {
        let mut player = PlayerState::default();
        player.stats.cash = 14.0;
        let world = WorldState::default();
        let payload = SavePayload::capture(&player, &world, &Chronicle::default(), None, 99);
        assert_eq!(payload.meta.turn, 1);
        assert!((payload.meta.cash - 14.0).abs() < f64::EPSILON);
        assert_eq!(payload.meta.saved_at_ms, 99);
    }

    #[test]
    fn payload_roundtrips_through_json() {
        let player = PlayerState::default();
        let world = WorldState::default();
        let payload = SavePayload::capture(&player, &world, &Chronicle::default(), None, 1);
        let json = serde_json::to_string(&payload).unwrap();
        let restored: SavePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, restored);
    }

    #[test]
    fn legacy_bonus_scales_with_progress() {
        let mut player = PlayerState::default();
        player.stats.cash = 250.0;
        let world = WorldState {
            turn: 65,
            ..WorldState::default()
        };
        let legacy = Legacy::from_run(&player, &world, 0);
        let bonus = legacy.creation_bonus();
        assert!((bonus.get("scheming").unwrap() - 3.0).abs() < f64::EPSILON);
        assert!((bonus.get("network").unwrap() - 2.0).abs() < f64::EPSILON);
        assert!((bonus.get("cash").unwrap() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_runs_leave_no_bonus() {
        let legacy = Legacy::from_run(&PlayerState::default(), &WorldState::default(), 0);
        assert!(legacy.creation_bonus().is_empty());
    }
}
