//! Static content records loaded at startup and immutable for the session.

use serde::{Deserialize, Serialize};

use crate::conditions::{ConditionGroup, ContentError};
use crate::constants::DEFAULT_AP_COST;
use crate::state::{StatDelta, StatId};

/// How a resolved option or stage check terminates the playthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndKind {
    Death,
    SentAway,
    Sold,
    /// A chapter-closing ending that is not a death or an expulsion.
    Chapter,
}

impl EndKind {
    /// Derive a kind from a narrative-service ending trigger tag.
    #[must_use]
    pub fn from_trigger(trigger: &str) -> Self {
        let tag = trigger.to_ascii_lowercase();
        if tag.contains("dead") || tag.contains("death") {
            Self::Death
        } else if tag.contains("sold") {
            Self::Sold
        } else {
            Self::Chapter
        }
    }
}

/// Terminal state descriptor attached to options, tiers and stage checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndState {
    #[serde(rename = "type")]
    pub kind: EndKind,
    pub text: String,
}

/// Bespoke handlers an option can invoke beyond its plain deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialAction {
    Pregnancy,
    Birth,
    Escape,
    ChildTraining,
}

/// A stat-banded alternate resolution for an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeTier {
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub cost: Option<StatDelta>,
    #[serde(default)]
    pub reward: Option<StatDelta>,
    #[serde(default)]
    pub result_text: Option<String>,
    #[serde(default)]
    pub end: Option<EndState>,
}

impl OutcomeTier {
    /// Whether the band contains the given stat value.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.is_none_or(|max| value <= max)
    }
}

/// A player-facing choice within an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub require: ConditionGroup,
    #[serde(default = "default_ap_cost")]
    pub ap_cost: u32,
    #[serde(default)]
    pub cost: Option<StatDelta>,
    #[serde(default)]
    pub reward: Option<StatDelta>,
    #[serde(default)]
    pub result_text: Option<String>,
    #[serde(default)]
    pub chance: Option<f64>,
    #[serde(default)]
    pub chance_stat: Option<StatId>,
    #[serde(default)]
    pub fail_cost: Option<StatDelta>,
    #[serde(default)]
    pub fail_reward: Option<StatDelta>,
    #[serde(default)]
    pub fail_text: Option<String>,
    #[serde(default)]
    pub fail_result_text: Option<String>,
    #[serde(default)]
    pub outcome_stat: Option<StatId>,
    #[serde(default)]
    pub outcomes: Vec<OutcomeTier>,
    #[serde(default)]
    pub special: Option<SpecialAction>,
    #[serde(default)]
    pub end: Option<EndState>,
}

const fn default_ap_cost() -> u32 {
    DEFAULT_AP_COST
}

/// One narrative beat with a trigger and a set of selectable options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Stable id, prefixed by stage (`s1_0001`).
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub trigger: ConditionGroup,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub once: bool,
    #[serde(default)]
    pub allow_custom: bool,
    #[serde(default)]
    pub options: Vec<EventOption>,
}

impl Event {
    #[must_use]
    pub fn option(&self, option_id: &str) -> Option<&EventOption> {
        self.options.iter().find(|opt| opt.id == option_id)
    }
}

/// Container for all loaded events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventData {
    pub events: Vec<Event>,
}

impl EventData {
    /// Create empty event data (useful for tests).
    #[must_use]
    pub fn empty() -> Self {
        Self { events: Vec::new() }
    }

    /// Load event data from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON cannot be parsed, including when a
    /// condition group carries an unrecognized key.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Create event data from pre-parsed events.
    #[must_use]
    pub fn from_events(events: Vec<Event>) -> Self {
        Self { events }
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Structural validation beyond what deserialization guarantees.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate event ids, tiered options without an
    /// `outcomeStat`, or tier bands whose bounds are inverted.
    pub fn validate(&self) -> Result<(), ContentError> {
        let mut seen = std::collections::BTreeSet::new();
        for event in &self.events {
            if !seen.insert(event.id.as_str()) {
                return Err(ContentError::InvalidOption {
                    event: event.id.clone(),
                    option: String::new(),
                    reason: "duplicate event id".to_string(),
                });
            }
            for option in &event.options {
                if !option.outcomes.is_empty() && option.outcome_stat.is_none() {
                    return Err(ContentError::InvalidOption {
                        event: event.id.clone(),
                        option: option.id.clone(),
                        reason: "outcome tiers require an outcomeStat".to_string(),
                    });
                }
                for tier in &option.outcomes {
                    if tier.max.is_some_and(|max| max < tier.min) {
                        return Err(ContentError::InvalidOption {
                            event: event.id.clone(),
                            option: option.id.clone(),
                            reason: format!("tier band [{}, {:?}] is inverted", tier.min, tier.max),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Purchasable item offered by the household shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub price: f64,
    #[serde(default)]
    pub effects: StatDelta,
}

/// Narrative bridge shown when a stage transition happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interlude {
    pub id: String,
    /// Stage the interlude introduces.
    pub stage: u32,
    pub title: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "events": [
                {
                    "id": "s1_0001",
                    "title": "The First Evening",
                    "text": "The lamps are lit early tonight.",
                    "trigger": {"turn_range": [1, 1]},
                    "once": true,
                    "allowCustom": true,
                    "options": [
                        {
                            "id": "bow",
                            "text": "Keep your eyes lowered",
                            "reward": {"npc_matron": 2},
                            "resultText": "The matron nods, barely."
                        },
                        {
                            "id": "speak",
                            "text": "Offer a careful greeting",
                            "require": {"stat_scheming": 30},
                            "chance": 0.6,
                            "chanceStat": "scheming",
                            "failText": "Your words come out wrong.",
                            "reward": {"favor": 3}
                        }
                    ]
                }
            ]
        }"#
    }

    #[test]
    fn event_data_parses_authored_form() {
        let data = EventData::from_json(sample_json()).unwrap();
        assert_eq!(data.events.len(), 1);
        let event = data.find("s1_0001").unwrap();
        assert!(event.once);
        assert!(event.allow_custom);
        assert_eq!(event.options.len(), 2);
        let speak = event.option("speak").unwrap();
        assert_eq!(speak.ap_cost, 1);
        assert_eq!(speak.chance, Some(0.6));
        assert_eq!(speak.chance_stat, Some(StatId::Scheming));
        assert!(data.validate().is_ok());
    }

    #[test]
    fn malformed_condition_key_is_a_load_error() {
        let bad = r#"{
            "events": [
                {
                    "id": "s1_0002",
                    "title": "t",
                    "text": "t",
                    "trigger": {"stat_favr": 10},
                    "options": []
                }
            ]
        }"#;
        assert!(EventData::from_json(bad).is_err());
    }

    #[test]
    fn validate_rejects_duplicate_ids_and_bad_tiers() {
        let mut data = EventData::from_json(sample_json()).unwrap();
        let duplicate = data.events[0].clone();
        data.events.push(duplicate);
        assert!(data.validate().is_err());

        let mut data = EventData::from_json(sample_json()).unwrap();
        data.events[0].options[0].outcomes.push(OutcomeTier {
            min: 10.0,
            max: Some(5.0),
            ..OutcomeTier::default()
        });
        data.events[0].options[0].outcome_stat = Some(StatId::Favor);
        assert!(data.validate().is_err());
    }

    #[test]
    fn end_kinds_derive_from_trigger_tags() {
        assert_eq!(EndKind::from_trigger("be_dead_poison"), EndKind::Death);
        assert_eq!(EndKind::from_trigger("be_sold"), EndKind::Sold);
        assert_eq!(EndKind::from_trigger("sent_to_temple"), EndKind::Chapter);
    }

    #[test]
    fn tier_band_membership_is_inclusive() {
        let tier = OutcomeTier {
            min: 20.0,
            max: Some(40.0),
            ..OutcomeTier::default()
        };
        assert!(tier.contains(20.0));
        assert!(tier.contains(40.0));
        assert!(!tier.contains(41.0));
        let open = OutcomeTier {
            min: 60.0,
            max: None,
            ..OutcomeTier::default()
        };
        assert!(open.contains(900.0));
    }
}
