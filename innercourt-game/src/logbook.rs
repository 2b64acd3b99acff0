//! Before/after snapshot diffing into an append-only, capped chronicle.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::constants::{CHRONICLE_CAP, FLOAT_EPSILON};
use crate::numbers::i64_to_f64;
use crate::state::{PlayerState, StatId, Stats, WorldState};

/// Marker prefixed to the chronicled option text of a freeform action.
pub const FREEFORM_MARKER: &str = "Improvised: ";

/// Immutable captured state used as the "before" side of a diff.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    stats: Stats,
    relations: BTreeMap<String, f64>,
    inventory: BTreeMap<String, i64>,
    turn: u32,
    month: u8,
    ap: u32,
}

/// Capture the tracked fields of player and world state.
#[must_use]
pub fn snapshot(player: &PlayerState, world: &WorldState) -> StateSnapshot {
    StateSnapshot {
        stats: player.stats.clone(),
        relations: player.npc_relations.clone(),
        inventory: player.inventory.clone(),
        turn: world.turn,
        month: world.month,
        ap: world.ap,
    }
}

/// Player-side and world-side deltas of a transition; empty maps collapse
/// to `None` so quiet transitions serialize compactly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateDiff {
    pub player_delta: Option<BTreeMap<String, f64>>,
    pub world_delta: Option<BTreeMap<String, f64>>,
}

/// Diff a snapshot against current state: after minus before for every
/// stat, relationship, inventory counter and world field, omitting entries
/// below the epsilon.
#[must_use]
pub fn diff(before: &StateSnapshot, player: &PlayerState, world: &WorldState) -> StateDiff {
    let mut player_delta = BTreeMap::new();
    for stat in StatId::ALL {
        let change = player.stats.get(stat) - before.stats.get(stat);
        if change.abs() > FLOAT_EPSILON {
            player_delta.insert(stat.as_str().to_string(), change);
        }
    }
    let npc_keys: std::collections::BTreeSet<&String> =
        before.relations.keys().chain(player.npc_relations.keys()).collect();
    for key in npc_keys {
        let change = player.npc_relations.get(key).copied().unwrap_or(0.0)
            - before.relations.get(key).copied().unwrap_or(0.0);
        if change.abs() > FLOAT_EPSILON {
            player_delta.insert(format!("npc_{key}"), change);
        }
    }
    let item_keys: std::collections::BTreeSet<&String> =
        before.inventory.keys().chain(player.inventory.keys()).collect();
    for key in item_keys {
        let change = i64_to_f64(
            player.inventory.get(key).copied().unwrap_or(0)
                - before.inventory.get(key).copied().unwrap_or(0),
        );
        if change.abs() > FLOAT_EPSILON {
            player_delta.insert(format!("item_{key}"), change);
        }
    }

    let mut world_delta = BTreeMap::new();
    let world_fields = [
        ("turn", f64::from(world.turn) - f64::from(before.turn)),
        ("month", f64::from(world.month) - f64::from(before.month)),
        ("ap", f64::from(world.ap) - f64::from(before.ap)),
    ];
    for (key, change) in world_fields {
        if change.abs() > FLOAT_EPSILON {
            world_delta.insert(key.to_string(), change);
        }
    }

    StateDiff {
        player_delta: if player_delta.is_empty() {
            None
        } else {
            Some(player_delta)
        },
        world_delta: if world_delta.is_empty() {
            None
        } else {
            Some(world_delta)
        },
    }
}

/// One replayable line of game history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub turn: u32,
    pub month: u8,
    pub timestamp_ms: u64,
    pub event_title: String,
    pub option_text: String,
    pub result_text: String,
    #[serde(default)]
    pub delta: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub world_delta: Option<BTreeMap<String, f64>>,
}

/// Append-only ring of log entries, capped so it stays replayable inside a
/// persisted save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chronicle {
    entries: VecDeque<LogEntry>,
    seq: u64,
    #[serde(default = "Chronicle::default_cap")]
    cap: usize,
}

impl Default for Chronicle {
    fn default() -> Self {
        Self::with_cap(CHRONICLE_CAP)
    }
}

impl Chronicle {
    const fn default_cap() -> usize {
        CHRONICLE_CAP
    }

    #[must_use]
    pub fn with_cap(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            seq: 0,
            cap: cap.max(1),
        }
    }

    /// Compose and append an entry for a transition, dropping the oldest
    /// entry once the cap is reached.
    pub fn record(
        &mut self,
        before: &StateSnapshot,
        player: &PlayerState,
        world: &WorldState,
        event_title: &str,
        option_text: &str,
        result_text: &str,
    ) -> &LogEntry {
        let transition = diff(before, player, world);
        self.seq += 1;
        let entry = LogEntry {
            seq: self.seq,
            turn: world.turn,
            month: world.month,
            timestamp_ms: world.current_timestamp_ms(),
            event_title: event_title.to_string(),
            option_text: option_text.to_string(),
            result_text: result_text.to_string(),
            delta: transition.player_delta,
            world_delta: transition.world_delta,
        };
        self.entries.push_back(entry);
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
        self.entries.back().expect("entry just pushed")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }
}
