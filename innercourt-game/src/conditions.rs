//! Predicate evaluation over player and world state.
//!
//! Condition groups are authored as JSON maps (`stat_*`, `npc_*`, `item_*`,
//! `event_*`, `month_range`, `turn_range`, `has_children`, `chance`,
//! `chanceStat`). They are parsed into a closed variant type once at content
//! load; an unrecognized key is a load-time error, never a silent pass.

use rand::Rng;
use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::constants::{CHANCE_STAT_CEIL, CHANCE_STAT_FLOOR, FLOAT_EPSILON};
use crate::state::{PlayerState, StatId, WorldState};

/// Errors raised while validating authored content.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("unrecognized condition key `{0}`")]
    UnknownConditionKey(String),
    #[error("condition `{key}` expects {expected}")]
    InvalidConditionValue { key: String, expected: &'static str },
    #[error("malformed comparison `{0}`")]
    MalformedComparison(String),
    #[error("unknown stat `{0}`")]
    UnknownStat(String),
    #[error("event `{event}` option `{option}`: {reason}")]
    InvalidOption {
        event: String,
        option: String,
        reason: String,
    },
}

/// Comparison operator vocabulary for numeric conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Ge,
    Le,
    Eq,
    Gt,
    Lt,
}

impl CmpOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

/// A numeric comparison against a state value.
///
/// Authored either as a bare number (meaning "at least") or as an operator
/// string such as `">= 30"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub op: CmpOp,
    pub value: f64,
}

impl Comparison {
    #[must_use]
    pub const fn at_least(value: f64) -> Self {
        Self {
            op: CmpOp::Ge,
            value,
        }
    }

    #[must_use]
    pub fn matches(&self, current: f64) -> bool {
        match self.op {
            CmpOp::Ge => current >= self.value,
            CmpOp::Le => current <= self.value,
            CmpOp::Gt => current > self.value,
            CmpOp::Lt => current < self.value,
            CmpOp::Eq => (current - self.value).abs() < FLOAT_EPSILON,
        }
    }

    /// Parse the authored JSON form.
    pub fn from_json(key: &str, value: &Value) -> Result<Self, ContentError> {
        if let Some(number) = value.as_f64() {
            return Ok(Self::at_least(number));
        }
        let Some(text) = value.as_str() else {
            return Err(ContentError::InvalidConditionValue {
                key: key.to_string(),
                expected: "a number or an operator string",
            });
        };
        Self::parse_str(text)
    }

    fn parse_str(text: &str) -> Result<Self, ContentError> {
        let trimmed = text.trim();
        // Two-character operators first so ">" does not shadow ">=".
        let ops = [
            (">=", CmpOp::Ge),
            ("<=", CmpOp::Le),
            ("==", CmpOp::Eq),
            (">", CmpOp::Gt),
            ("<", CmpOp::Lt),
        ];
        for (prefix, op) in ops {
            if let Some(rest) = trimmed.strip_prefix(prefix) {
                let value = rest
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ContentError::MalformedComparison(text.to_string()))?;
                return Ok(Self { op, value });
            }
        }
        Err(ContentError::MalformedComparison(text.to_string()))
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.symbol(), self.value)
    }
}

/// One predicate over player or world state.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Stat(StatId, Comparison),
    Npc(String, Comparison),
    Item(String, Comparison),
    /// History membership, optionally inverted.
    EventDone(String, bool),
    MonthRange(u8, u8),
    TurnRange(u32, u32),
    HasChildren(bool),
    /// True when the matron's trust exceeds the lord's favor.
    MatronOverFavor(bool),
}

impl Condition {
    /// Pure predicate check; no randomness, no side effects.
    #[must_use]
    pub fn matches(&self, player: &PlayerState, world: &WorldState) -> bool {
        match self {
            Self::Stat(id, cmp) => cmp.matches(player.stats.get(*id)),
            Self::Npc(key, cmp) => cmp.matches(player.relation(key)),
            Self::Item(key, cmp) => cmp.matches(crate::numbers::i64_to_f64(player.item_count(key))),
            Self::EventDone(id, expected) => player.history.contains(id) == *expected,
            Self::MonthRange(start, end) => (*start..=*end).contains(&world.month),
            Self::TurnRange(start, end) => (*start..=*end).contains(&world.turn),
            Self::HasChildren(expected) => player.has_children() == *expected,
            Self::MatronOverFavor(expected) => {
                (player.matron_trust() > player.stats.favor) == *expected
            }
        }
    }
}

/// A set of AND-ed predicates plus an optional leading chance gate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionGroup {
    pub conditions: Vec<Condition>,
    pub chance: Option<f64>,
    pub chance_stat: Option<StatId>,
}

impl ConditionGroup {
    /// An empty group, vacuously true.
    #[must_use]
    pub fn always() -> Self {
        Self::default()
    }

    /// Whether evaluation involves a random roll.
    #[must_use]
    pub const fn is_deterministic(&self) -> bool {
        self.chance.is_none() && self.chance_stat.is_none()
    }

    /// Effective pass probability of the chance gate, if one is authored.
    ///
    /// `chanceStat` maps the named stat into `clamp(stat/100, 0.05, 0.95)`,
    /// multiplied into the flat chance when both are present.
    #[must_use]
    pub fn gate_probability(&self, player: &PlayerState) -> Option<f64> {
        let derived = self
            .chance_stat
            .map(|stat| (player.stats.get(stat) / 100.0).clamp(CHANCE_STAT_FLOOR, CHANCE_STAT_CEIL));
        match (self.chance, derived) {
            (Some(flat), Some(derived)) => Some(flat * derived),
            (Some(flat), None) => Some(flat),
            (None, Some(derived)) => Some(derived),
            (None, None) => None,
        }
    }

    /// Evaluate the group. The chance gate, if present, is rolled first and
    /// short-circuits the whole group on failure; remaining predicates are
    /// AND-ed. No state is mutated.
    pub fn evaluate<R: Rng>(
        &self,
        player: &PlayerState,
        world: &WorldState,
        rng: &mut R,
    ) -> bool {
        if let Some(probability) = self.gate_probability(player)
            && rng.gen_range(0.0..1.0) > probability
        {
            return false;
        }
        self.conditions
            .iter()
            .all(|condition| condition.matches(player, world))
    }

    /// Parse the authored map form, rejecting unknown keys.
    pub fn from_raw(map: &serde_json::Map<String, Value>) -> Result<Self, ContentError> {
        let mut group = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "chance" => {
                    group.chance = Some(expect_number(key, value)?);
                }
                "chanceStat" => {
                    group.chance_stat = Some(parse_stat(key, value)?);
                }
                "month_range" => {
                    let (start, end) = expect_range(key, value)?;
                    group.conditions.push(Condition::MonthRange(
                        clamp_to_u8(start),
                        clamp_to_u8(end),
                    ));
                }
                "turn_range" => {
                    let (start, end) = expect_range(key, value)?;
                    group
                        .conditions
                        .push(Condition::TurnRange(clamp_to_u32(start), clamp_to_u32(end)));
                }
                "has_children" => {
                    group
                        .conditions
                        .push(Condition::HasChildren(expect_bool(key, value)?));
                }
                "npc_matron_over_favor" => {
                    group
                        .conditions
                        .push(Condition::MatronOverFavor(expect_bool(key, value)?));
                }
                other => {
                    if let Some(stat_key) = other.strip_prefix("stat_") {
                        let stat = stat_key.parse::<StatId>().map_err(|()| {
                            ContentError::UnknownStat(stat_key.to_string())
                        })?;
                        group
                            .conditions
                            .push(Condition::Stat(stat, Comparison::from_json(key, value)?));
                    } else if let Some(npc) = other.strip_prefix("npc_") {
                        group.conditions.push(Condition::Npc(
                            npc.to_string(),
                            Comparison::from_json(key, value)?,
                        ));
                    } else if let Some(item) = other.strip_prefix("item_") {
                        group.conditions.push(Condition::Item(
                            item.to_string(),
                            Comparison::from_json(key, value)?,
                        ));
                    } else if let Some(event) = other.strip_prefix("event_") {
                        group
                            .conditions
                            .push(Condition::EventDone(event.to_string(), expect_bool(key, value)?));
                    } else {
                        return Err(ContentError::UnknownConditionKey(other.to_string()));
                    }
                }
            }
        }
        Ok(group)
    }
}

fn expect_number(key: &str, value: &Value) -> Result<f64, ContentError> {
    value.as_f64().ok_or(ContentError::InvalidConditionValue {
        key: key.to_string(),
        expected: "a number",
    })
}

fn expect_bool(key: &str, value: &Value) -> Result<bool, ContentError> {
    value.as_bool().ok_or(ContentError::InvalidConditionValue {
        key: key.to_string(),
        expected: "a boolean",
    })
}

fn expect_range(key: &str, value: &Value) -> Result<(f64, f64), ContentError> {
    let err = || ContentError::InvalidConditionValue {
        key: key.to_string(),
        expected: "a [start, end] pair",
    };
    let items = value.as_array().ok_or_else(err)?;
    if items.len() != 2 {
        return Err(err());
    }
    let start = items[0].as_f64().ok_or_else(err)?;
    let end = items[1].as_f64().ok_or_else(err)?;
    Ok((start, end))
}

fn parse_stat(key: &str, value: &Value) -> Result<StatId, ContentError> {
    let text = value.as_str().ok_or(ContentError::InvalidConditionValue {
        key: key.to_string(),
        expected: "a stat name",
    })?;
    text.parse::<StatId>()
        .map_err(|()| ContentError::UnknownStat(text.to_string()))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_to_u8(value: f64) -> u8 {
    value.clamp(0.0, f64::from(u8::MAX)) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_to_u32(value: f64) -> u32 {
    value.clamp(0.0, f64::from(u32::MAX)) as u32
}

impl<'de> Deserialize<'de> for ConditionGroup {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = serde_json::Map::deserialize(deserializer)?;
        Self::from_raw(&map).map_err(D::Error::custom)
    }
}

impl Serialize for ConditionGroup {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let extra = usize::from(self.chance.is_some()) + usize::from(self.chance_stat.is_some());
        let mut map = serializer.serialize_map(Some(self.conditions.len() + extra))?;
        if let Some(chance) = self.chance {
            map.serialize_entry("chance", &chance)?;
        }
        if let Some(stat) = self.chance_stat {
            map.serialize_entry("chanceStat", stat.as_str())?;
        }
        for condition in &self.conditions {
            match condition {
                Condition::Stat(id, cmp) => {
                    map.serialize_entry(&format!("stat_{id}"), &cmp.to_string())?;
                }
                Condition::Npc(key, cmp) => {
                    map.serialize_entry(&format!("npc_{key}"), &cmp.to_string())?;
                }
                Condition::Item(key, cmp) => {
                    map.serialize_entry(&format!("item_{key}"), &cmp.to_string())?;
                }
                Condition::EventDone(id, expected) => {
                    map.serialize_entry(&format!("event_{id}"), expected)?;
                }
                Condition::MonthRange(start, end) => {
                    map.serialize_entry("month_range", &[*start, *end])?;
                }
                Condition::TurnRange(start, end) => {
                    map.serialize_entry("turn_range", &[*start, *end])?;
                }
                Condition::HasChildren(expected) => {
                    map.serialize_entry("has_children", expected)?;
                }
                Condition::MatronOverFavor(expected) => {
                    map.serialize_entry("npc_matron_over_favor", expected)?;
                }
            }
        }
        map.end()
    }
}
