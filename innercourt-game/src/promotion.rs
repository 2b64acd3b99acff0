//! The position promotion state machine.
//!
//! A promotion path is defined per (from-rank, to-rank, stage) with a
//! priority-ordered list of alternative qualifying rule sets. The first
//! fully satisfied rule wins, and which one matched is reported so the
//! narrative can vary by path. Promotion is one-directional and permanent
//! for the playthrough.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

use crate::child::Sex;
use crate::constants::ITEM_IMPERIAL_MERIT;
use crate::state::{PlayerState, Rank, StatId};

/// Unmet requirement descriptions, short enough to stay inline.
pub type MissingList = SmallVec<[String; 4]>;

/// One alternative set of qualifying requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RuleRequirements {
    #[serde(default)]
    pub has_child: Option<bool>,
    #[serde(default)]
    pub has_son: Option<bool>,
    /// Minimum value of the best skill across all children.
    #[serde(default)]
    pub child_talent: Option<f64>,
    #[serde(default)]
    pub imperial_merit: Option<bool>,
    /// Stat minimums.
    #[serde(default)]
    pub stats: BTreeMap<StatId, f64>,
    /// NPC relationship minimums.
    #[serde(default)]
    pub npcs: BTreeMap<String, f64>,
}

impl RuleRequirements {
    /// Collect every unmet requirement as a display string. Empty means
    /// fully satisfied.
    #[must_use]
    pub fn check(&self, player: &PlayerState) -> MissingList {
        let mut missing = MissingList::new();
        if let Some(expected) = self.has_child {
            if expected && !player.has_children() {
                missing.push("a child must be born".to_string());
            } else if !expected && player.has_children() {
                missing.push("must be without children".to_string());
            }
        }
        if self.has_son == Some(true)
            && !player.children.iter().any(|child| child.sex == Sex::Boy)
        {
            missing.push("a son must be born".to_string());
        }
        if let Some(threshold) = self.child_talent {
            let best = player
                .children
                .iter()
                .map(|child| child.skills.highest())
                .fold(0.0_f64, f64::max);
            if best < threshold {
                missing.push(format!(
                    "a child's talent must reach {threshold} (best is {best:.0})"
                ));
            }
        }
        if self.imperial_merit == Some(true) && player.item_count(ITEM_IMPERIAL_MERIT) <= 0 {
            missing.push("imperial merit must be earned".to_string());
        }
        for (stat, minimum) in &self.stats {
            let current = player.stats.get(*stat);
            if current < *minimum {
                missing.push(format!("{stat} must reach {minimum} (now {current:.0})"));
            }
        }
        for (npc, minimum) in &self.npcs {
            let current = player.relation(npc);
            if current < *minimum {
                missing.push(format!("{npc}'s regard must reach {minimum} (now {current:.0})"));
            }
        }
        missing
    }
}

/// A qualifying rule with its evaluation precedence (lower runs first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRule {
    pub id: String,
    pub priority: u32,
    #[serde(default)]
    pub requires: RuleRequirements,
}

/// A promotion edge in the rank lifecycle, scoped to a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionPath {
    pub from: Rank,
    pub to: Rank,
    pub stage: u32,
    pub rules: Vec<PromotionRule>,
}

/// Result of evaluating a promotion path.
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionCheck {
    /// Id of the first satisfied rule, in ascending priority order.
    pub matched: Option<String>,
    /// When nothing matched: unmet requirements of the highest-precedence
    /// rule, for UI hinting.
    pub missing: MissingList,
}

impl PromotionCheck {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.matched.is_some()
    }
}

/// Find the path leaving the player's current rank in the current stage.
#[must_use]
pub fn applicable_path<'a>(
    paths: &'a [PromotionPath],
    rank: Rank,
    stage: u32,
) -> Option<&'a PromotionPath> {
    paths
        .iter()
        .find(|path| path.from == rank && path.stage == stage)
}

/// Evaluate rules in ascending priority order and commit to the first fully
/// satisfied one.
#[must_use]
pub fn try_promotion(path: &PromotionPath, player: &PlayerState) -> PromotionCheck {
    let mut rules: Vec<&PromotionRule> = path.rules.iter().collect();
    rules.sort_by_key(|rule| rule.priority);
    for rule in &rules {
        let missing = rule.requires.check(player);
        if missing.is_empty() {
            return PromotionCheck {
                matched: Some(rule.id.clone()),
                missing: MissingList::new(),
            };
        }
    }
    let missing = rules
        .first()
        .map(|rule| rule.requires.check(player))
        .unwrap_or_default();
    PromotionCheck {
        matched: None,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::child::Child;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rule(id: &str, priority: u32, requires: RuleRequirements) -> PromotionRule {
        PromotionRule {
            id: id.to_string(),
            priority,
            requires,
        }
    }

    fn path(rules: Vec<PromotionRule>) -> PromotionPath {
        PromotionPath {
            from: Rank::Chambermaid,
            to: Rank::Concubine,
            stage: 2,
            rules,
        }
    }

    #[test]
    fn lower_priority_number_wins_even_when_both_match() {
        let relaxed = RuleRequirements::default();
        let strict = RuleRequirements {
            stats: BTreeMap::from([(StatId::Favor, 0.0)]),
            ..RuleRequirements::default()
        };
        let path = path(vec![rule("fallback", 2, relaxed), rule("primary", 1, strict)]);
        let player = PlayerState::default();
        let check = try_promotion(&path, &player);
        assert_eq!(check.matched.as_deref(), Some("primary"));
    }

    #[test]
    fn failure_reports_highest_precedence_gaps() {
        let strict = RuleRequirements {
            has_child: Some(true),
            npcs: BTreeMap::from([("matron".to_string(), 60.0)]),
            ..RuleRequirements::default()
        };
        let stricter = RuleRequirements {
            stats: BTreeMap::from([(StatId::Favor, 95.0)]),
            ..RuleRequirements::default()
        };
        let path = path(vec![rule("with_child", 1, strict), rule("sheer_favor", 2, stricter)]);
        let player = PlayerState::default();
        let check = try_promotion(&path, &player);
        assert!(!check.succeeded());
        assert_eq!(check.missing.len(), 2);
        assert!(check.missing[0].contains("child"));
    }

    #[test]
    fn child_requirements_inspect_offspring() {
        let mut rng = ChaCha20Rng::from_seed([9u8; 32]);
        let mut player = PlayerState::default();
        let mut child = Child::newborn(4, &mut rng);
        child.sex = Sex::Girl;
        child.skills.literary = 72.0;
        player.children.push(child);

        let requires = RuleRequirements {
            has_child: Some(true),
            child_talent: Some(70.0),
            ..RuleRequirements::default()
        };
        assert!(requires.check(&player).is_empty());

        let requires_son = RuleRequirements {
            has_son: Some(true),
            ..RuleRequirements::default()
        };
        assert_eq!(requires_son.check(&player).len(), 1);
    }

    #[test]
    fn path_lookup_is_scoped_to_rank_and_stage() {
        let paths = vec![path(Vec::new())];
        assert!(applicable_path(&paths, Rank::Chambermaid, 2).is_some());
        assert!(applicable_path(&paths, Rank::Chambermaid, 1).is_none());
        assert!(applicable_path(&paths, Rank::Concubine, 2).is_none());
    }
}
