//! Resolution of a chosen option into concrete state deltas.

use rand::Rng;

use crate::constants::{
    CHANCE_STAT_CEIL, CHANCE_STAT_FLOOR, NEGLECT_APPEARANCE_DECAY, NEGLECT_FAVOR_PENALTY,
    NEGLECT_THRESHOLD,
};
use crate::data::{EndKind, EndState, Event, EventOption, OutcomeTier};
use crate::state::{PlayerState, StatDelta, WorldState};

/// Narrative shown when an option id does not exist on the event.
pub const TEXT_UNKNOWN_OPTION: &str = "That choice is no longer open to you.";
/// Narrative shown when an option's requirement group is not met.
pub const TEXT_REQUIREMENT_FAILED: &str = "You lack the standing to attempt it.";
/// Narrative shown when the player cannot pay the AP cost.
pub const TEXT_INSUFFICIENT_AP: &str =
    "You have no strength left today; it will keep until tomorrow.";
/// Narrative for the synthesized collapse ending.
pub const TEXT_HEALTH_COLLAPSE: &str =
    "Your illness has deepened beyond remedy; you will not last the night.";

/// Caller options for a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveContext {
    /// Subplot and special events resolve without touching AP.
    pub consume_ap: bool,
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self { consume_ap: true }
    }
}

impl ResolveContext {
    #[must_use]
    pub const fn ap_exempt() -> Self {
        Self { consume_ap: false }
    }
}

/// What actually happened inside a resolution call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStatus {
    /// Deltas were applied (possibly via the fail branch of a chance roll).
    Applied,
    UnknownOption,
    RequirementFailed,
    InsufficientAp,
}

/// Result of resolving an option. Failure paths are ordinary values with a
/// narrative and no deltas; this function never errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub text: String,
    pub end: Option<EndState>,
    pub delta: Option<StatDelta>,
    pub status: ResolutionStatus,
    /// Whether spending AP rolled the world into the next turn.
    pub turn_advanced: bool,
}

impl Resolution {
    fn refused(text: &str, status: ResolutionStatus) -> Self {
        Self {
            text: text.to_string(),
            end: None,
            delta: None,
            status,
            turn_advanced: false,
        }
    }
}

/// Resolve `option_id` on `event` against the given state.
pub fn apply_option<R: Rng>(
    event: &Event,
    option_id: &str,
    player: &mut PlayerState,
    world: &mut WorldState,
    rng: &mut R,
    ctx: ResolveContext,
) -> Resolution {
    let Some(option) = event.option(option_id) else {
        return Resolution::refused(TEXT_UNKNOWN_OPTION, ResolutionStatus::UnknownOption);
    };

    if !option.require.evaluate(player, world, rng) {
        let text = option.fail_text.as_deref().unwrap_or(TEXT_REQUIREMENT_FAILED);
        return Resolution::refused(text, ResolutionStatus::RequirementFailed);
    }

    if ctx.consume_ap && option.ap_cost > world.ap {
        return Resolution::refused(TEXT_INSUFFICIENT_AP, ResolutionStatus::InsufficientAp);
    }

    let mut cost = option.cost.clone();
    let mut reward = option.reward.clone();
    let mut result_text = option.result_text.clone().unwrap_or_default();
    let mut end = option.end.clone();

    if let Some(tier) = select_tier(option, player) {
        if let Some(tier_cost) = &tier.cost {
            cost = Some(tier_cost.clone());
        }
        if let Some(tier_reward) = &tier.reward {
            reward = Some(tier_reward.clone());
        }
        if let Some(tier_text) = &tier.result_text {
            result_text = tier_text.clone();
        }
        if let Some(tier_end) = &tier.end {
            end = Some(tier_end.clone());
        }
    } else if let Some(probability) = roll_probability(option, player)
        && rng.gen_range(0.0..1.0) > probability
    {
        cost = option.fail_cost.clone();
        reward = option.fail_reward.clone();
        if let Some(text) = option.fail_result_text.clone().or_else(|| option.fail_text.clone()) {
            result_text = text;
        }
    }

    let mut applied = StatDelta::new();
    if let Some(cost) = &cost {
        player.apply_delta(cost);
        applied.merge(cost);
    }
    if let Some(reward) = &reward {
        player.apply_delta(reward);
        applied.merge(reward);
    }

    if end.is_none() && player.stats.health <= 0.0 {
        end = Some(EndState {
            kind: EndKind::Death,
            text: TEXT_HEALTH_COLLAPSE.to_string(),
        });
    }

    if event.once {
        player.history.insert(event.id.clone());
    }

    let mut turn_advanced = false;
    if ctx.consume_ap {
        let favor_gain = reward.as_ref().is_some_and(StatDelta::gains_favor);
        turn_advanced = spend_ap_with_neglect(player, world, option.ap_cost, favor_gain);
    }

    Resolution {
        text: result_text,
        end,
        delta: if applied.is_empty() {
            None
        } else {
            Some(applied)
        },
        status: ResolutionStatus::Applied,
        turn_advanced,
    }
}

/// Spend AP and maintain the passive-neglect counter: a favor-raising reward
/// resets it, while each favor-less period rollover increments it, decaying
/// appearance and, past the threshold, favor itself.
pub fn spend_ap_with_neglect(
    player: &mut PlayerState,
    world: &mut WorldState,
    ap_cost: u32,
    favor_gain: bool,
) -> bool {
    let advanced = world.spend_ap(ap_cost);
    if favor_gain {
        world.periods_without_favor = 0;
    } else if advanced {
        world.periods_without_favor += 1;
        if world.periods_without_favor >= NEGLECT_THRESHOLD {
            player.stats.favor -= NEGLECT_FAVOR_PENALTY;
        }
        player.stats.appearance -= NEGLECT_APPEARANCE_DECAY;
    }
    advanced
}

/// Pick the tier whose band contains the keyed stat's current value.
/// Tiers are considered in descending `min` order; the lowest band is the
/// fallback when nothing matches.
fn select_tier<'a>(option: &'a EventOption, player: &PlayerState) -> Option<&'a OutcomeTier> {
    let stat = option.outcome_stat?;
    if option.outcomes.is_empty() {
        return None;
    }
    let value = player.stats.get(stat);
    let mut sorted: Vec<&OutcomeTier> = option.outcomes.iter().collect();
    sorted.sort_by(|a, b| b.min.partial_cmp(&a.min).unwrap_or(std::cmp::Ordering::Equal));
    sorted
        .iter()
        .find(|tier| tier.contains(value))
        .copied()
        .or_else(|| sorted.last().copied())
}

/// Effective success probability of an option's chance roll.
fn roll_probability(option: &EventOption, player: &PlayerState) -> Option<f64> {
    let derived = option
        .chance_stat
        .map(|stat| (player.stats.get(stat) / 100.0).clamp(CHANCE_STAT_FLOOR, CHANCE_STAT_CEIL));
    match (option.chance, derived) {
        (Some(flat), Some(derived)) => Some(flat * derived),
        (Some(flat), None) => Some(flat),
        (None, Some(derived)) => Some(derived),
        (None, None) => None,
    }
}
