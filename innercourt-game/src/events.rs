//! Eligible-event filtering and weighted selection.

use rand::Rng;

use crate::constants::DEFAULT_EVENT_WEIGHT;
use crate::data::Event;
use crate::state::{PlayerState, WorldState};

/// Filter events by an extra caller predicate plus the standard gates
/// (trigger group, once/history exclusion, positive weight) and pick one by
/// a single weighted draw. Returns `None` when no candidate remains, which
/// callers must treat as "no event this period".
pub fn pick_event_where<'a, R, F>(
    events: &'a [Event],
    player: &PlayerState,
    world: &WorldState,
    rng: &mut R,
    predicate: F,
) -> Option<&'a Event>
where
    R: Rng,
    F: Fn(&Event) -> bool,
{
    let mut candidates: Vec<(&Event, f64)> = Vec::new();
    for event in events {
        if !predicate(event) {
            continue;
        }
        if event.once && player.history.contains(&event.id) {
            continue;
        }
        let weight = event.weight.unwrap_or(DEFAULT_EVENT_WEIGHT);
        if weight <= 0.0 {
            continue;
        }
        if !event.trigger.evaluate(player, world, rng) {
            continue;
        }
        candidates.push((event, weight));
    }
    choose_weighted(&candidates, rng)
}

/// Weighted pick without an extra predicate.
pub fn pick_event<'a, R: Rng>(
    events: &'a [Event],
    player: &PlayerState,
    world: &WorldState,
    rng: &mut R,
) -> Option<&'a Event> {
    pick_event_where(events, player, world, rng, |_| true)
}

fn choose_weighted<'a, R: Rng>(
    candidates: &[(&'a Event, f64)],
    rng: &mut R,
) -> Option<&'a Event> {
    if candidates.is_empty() {
        return None;
    }
    let total: f64 = candidates.iter().map(|(_, weight)| weight).sum();
    let mut roll = rng.gen_range(0.0..total);
    for (event, weight) in candidates {
        roll -= weight;
        if roll <= 0.0 {
            return Some(event);
        }
    }
    // Floating-point residue can leave the walk one step short.
    candidates.last().map(|(event, _)| *event)
}
