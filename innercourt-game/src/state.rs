//! Player and world state owned exclusively by a running session.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::child::Child;
use crate::constants::{
    DEFAULT_MAX_AP, MINUTES_PER_ACTION, NPC_LORD, NPC_MATRON, START_MONTH,
};
use crate::numbers::round_f64_to_i64;

/// Closed set of player stats tracked by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatId {
    Appearance,
    Scheming,
    Status,
    Network,
    Favor,
    Health,
    Cash,
    Business,
}

impl StatId {
    /// Every stat, in display order.
    pub const ALL: [Self; 8] = [
        Self::Appearance,
        Self::Scheming,
        Self::Status,
        Self::Network,
        Self::Favor,
        Self::Health,
        Self::Cash,
        Self::Business,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Appearance => "appearance",
            Self::Scheming => "scheming",
            Self::Status => "status",
            Self::Network => "network",
            Self::Favor => "favor",
            Self::Health => "health",
            Self::Cash => "cash",
            Self::Business => "business",
        }
    }
}

impl fmt::Display for StatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appearance" => Ok(Self::Appearance),
            "scheming" => Ok(Self::Scheming),
            "status" => Ok(Self::Status),
            "network" => Ok(Self::Network),
            "favor" => Ok(Self::Favor),
            "health" => Ok(Self::Health),
            "cash" => Ok(Self::Cash),
            "business" => Ok(Self::Business),
            _ => Err(()),
        }
    }
}

/// Player stat block. Values are unbounded; content keeps them sane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub appearance: f64,
    #[serde(default)]
    pub scheming: f64,
    #[serde(default)]
    pub status: f64,
    #[serde(default)]
    pub network: f64,
    #[serde(default)]
    pub favor: f64,
    #[serde(default)]
    pub health: f64,
    #[serde(default)]
    pub cash: f64,
    #[serde(default)]
    pub business: f64,
}

impl Stats {
    #[must_use]
    pub const fn get(&self, id: StatId) -> f64 {
        match id {
            StatId::Appearance => self.appearance,
            StatId::Scheming => self.scheming,
            StatId::Status => self.status,
            StatId::Network => self.network,
            StatId::Favor => self.favor,
            StatId::Health => self.health,
            StatId::Cash => self.cash,
            StatId::Business => self.business,
        }
    }

    pub const fn get_mut(&mut self, id: StatId) -> &mut f64 {
        match id {
            StatId::Appearance => &mut self.appearance,
            StatId::Scheming => &mut self.scheming,
            StatId::Status => &mut self.status,
            StatId::Network => &mut self.network,
            StatId::Favor => &mut self.favor,
            StatId::Health => &mut self.health,
            StatId::Cash => &mut self.cash,
            StatId::Business => &mut self.business,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            appearance: 60.0,
            scheming: 35.0,
            status: 10.0,
            network: 5.0,
            favor: 15.0,
            health: 70.0,
            cash: 0.0,
            business: 0.0,
        }
    }
}

/// A keyed bag of additive deltas produced by option resolution.
///
/// Keys are either bare stat names, `npc_<key>` relationship adjustments,
/// or `item_<key>` inventory adjustments, matching the authored content form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatDelta(pub BTreeMap<String, f64>);

impl StatDelta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, mainly for tests and fixtures.
    #[must_use]
    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Fold another delta into this one, summing shared keys.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.0 {
            *self.0.entry(key.clone()).or_insert(0.0) += value;
        }
    }

    /// Whether this delta raises favor, which resets the neglect counter.
    #[must_use]
    pub fn gains_favor(&self) -> bool {
        self.get(StatId::Favor.as_str()).is_some_and(|v| v > 0.0)
    }
}

/// Ordered position lifecycle; promotion is one-directional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    #[default]
    Chambermaid,
    Concubine,
    Consort,
}

impl Rank {
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Chambermaid => 1,
            Self::Concubine => 2,
            Self::Consort => 3,
        }
    }

    /// The next rank up, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Chambermaid => Some(Self::Concubine),
            Self::Concubine => Some(Self::Consort),
            Self::Consort => None,
        }
    }

    /// Monthly allowance credited on every turn advance.
    #[must_use]
    pub const fn monthly_salary(self) -> f64 {
        match self {
            Self::Chambermaid => 2.0,
            Self::Concubine => 6.0,
            Self::Consort => 12.0,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chambermaid => "chambermaid",
            Self::Concubine => "concubine",
            Self::Consort => "consort",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chambermaid" => Ok(Self::Chambermaid),
            "concubine" => Ok(Self::Concubine),
            "consort" => Ok(Self::Consort),
            _ => Err(()),
        }
    }
}

/// Cached descriptive text summarizing an NPC's current attitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impression {
    pub text: String,
    pub refreshed_turn: u32,
}

/// The player character. Mutated only through resolution paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub background_id: String,
    #[serde(default)]
    pub background_name: String,
    #[serde(default)]
    pub rank: Rank,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub npc_relations: BTreeMap<String, f64>,
    #[serde(default)]
    pub npc_impressions: BTreeMap<String, Impression>,
    #[serde(default)]
    pub inventory: BTreeMap<String, i64>,
    #[serde(default)]
    pub history: BTreeSet<String>,
    #[serde(default)]
    pub children: Vec<Child>,
    #[serde(default)]
    pub pregnancy_start_turn: Option<u32>,
}

impl Default for PlayerState {
    fn default() -> Self {
        let mut npc_relations = BTreeMap::new();
        npc_relations.insert(NPC_LORD.to_string(), 0.0);
        npc_relations.insert(NPC_MATRON.to_string(), 0.0);
        Self {
            name: String::new(),
            background_id: String::new(),
            background_name: String::new(),
            rank: Rank::Chambermaid,
            stats: Stats::default(),
            npc_relations,
            npc_impressions: BTreeMap::new(),
            inventory: BTreeMap::new(),
            history: BTreeSet::new(),
            children: Vec::new(),
            pregnancy_start_turn: None,
        }
    }
}

impl PlayerState {
    /// Set identity fields chosen during character creation.
    pub fn set_identity(&mut self, name: &str, background_id: &str, background_name: &str) {
        self.name = name.to_string();
        self.background_id = background_id.to_string();
        self.background_name = background_name.to_string();
    }

    /// Relationship value for an NPC key, defaulting to 0.
    #[must_use]
    pub fn relation(&self, npc: &str) -> f64 {
        self.npc_relations.get(npc).copied().unwrap_or(0.0)
    }

    /// Inventory count for an item key, defaulting to 0.
    #[must_use]
    pub fn item_count(&self, item: &str) -> i64 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    #[must_use]
    pub fn matron_trust(&self) -> f64 {
        self.relation(crate::constants::NPC_MATRON)
    }

    /// Apply a keyed delta bag: stats add directly, `npc_` keys adjust
    /// relationships, `item_` keys adjust inventory with a floor of zero.
    /// Other keys are ignored (replies from the narrative service may carry
    /// fields outside the vocabulary).
    pub fn apply_delta(&mut self, delta: &StatDelta) {
        for (key, value) in &delta.0 {
            if let Ok(stat) = key.parse::<StatId>() {
                *self.stats.get_mut(stat) += value;
            } else if let Some(npc) = key.strip_prefix("npc_") {
                *self.npc_relations.entry(npc.to_string()).or_insert(0.0) += value;
            } else if let Some(item) = key.strip_prefix("item_") {
                let entry = self.inventory.entry(item.to_string()).or_insert(0);
                *entry = (*entry + round_f64_to_i64(*value)).max(0);
            } else {
                log::debug!("ignoring delta for unrecognized key {key}");
            }
        }
    }
}

/// Turn, month and action-point bookkeeping for the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub turn: u32,
    pub month: u8,
    pub ap: u32,
    pub max_ap: u32,
    pub max_turn: u32,
    pub stage: u32,
    #[serde(default)]
    pub periods_without_favor: u32,
    /// User seed backing the session's RNG streams; kept here so a loaded
    /// save reconstructs the same draw sequence.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub start_timestamp_ms: u64,
    #[serde(default)]
    pub action_count: u64,
    #[serde(default = "WorldState::default_minutes_per_action")]
    pub minutes_per_action: u32,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            turn: 1,
            month: START_MONTH,
            ap: DEFAULT_MAX_AP,
            max_ap: DEFAULT_MAX_AP,
            max_turn: crate::session::stage_config(1).turn_ceiling,
            stage: 1,
            periods_without_favor: 0,
            seed: 0,
            start_timestamp_ms: 0,
            action_count: 0,
            minutes_per_action: MINUTES_PER_ACTION,
        }
    }
}

impl WorldState {
    const fn default_minutes_per_action() -> u32 {
        MINUTES_PER_ACTION
    }

    /// Advance to the next period: turn up, month wraps 1-12, AP refilled.
    pub fn advance_turn(&mut self) {
        self.turn += 1;
        self.month = (self.month % 12) + 1;
        self.ap = self.max_ap;
    }

    /// Spend action points, clamping at zero. Reaching zero advances the
    /// turn and refills AP; returns whether that rollover happened.
    pub fn spend_ap(&mut self, cost: u32) -> bool {
        self.ap = self.ap.saturating_sub(cost);
        self.action_count += u64::from(cost);
        if self.ap == 0 {
            self.advance_turn();
            return true;
        }
        false
    }

    /// Display timestamp derived from spent actions.
    #[must_use]
    pub fn current_timestamp_ms(&self) -> u64 {
        let minutes = self.action_count * u64::from(self.minutes_per_action);
        self.start_timestamp_ms + minutes * 60 * 1000
    }
}
