//! Period-summary prose interposed on the summary cadence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::NPC_MATRON;
use crate::state::{PlayerState, Stats, WorldState};

/// Stat snapshot taken after each summary, diffed by the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterSnapshot {
    pub turn: u32,
    pub stats: Stats,
    pub npc_relations: BTreeMap<String, f64>,
}

/// Capture the fields the next summary will compare against.
#[must_use]
pub fn capture(player: &PlayerState, world: &WorldState) -> QuarterSnapshot {
    QuarterSnapshot {
        turn: world.turn,
        stats: player.stats.clone(),
        npc_relations: player.npc_relations.clone(),
    }
}

/// Season for a calendar month.
#[must_use]
pub const fn season_name(month: u8) -> &'static str {
    match month {
        3..=5 => "spring",
        6..=8 => "summer",
        9..=11 => "autumn",
        _ => "winter",
    }
}

/// Compose the full summary: a dated heading, household news, and personal
/// changes against the previous quarter snapshot.
#[must_use]
pub fn compose(
    player: &PlayerState,
    world: &WorldState,
    last: Option<&QuarterSnapshot>,
) -> String {
    // Turn 1 falls in the third month of the era's twelfth year.
    let months_passed = (world.turn - 1) + 2;
    let era_year = 12 + months_passed / 12;
    let season = season_name(world.month);
    let title = format!("Year {era_year} of the era, {season}\nNotes from the Household\n\n");
    let mut body = household_news(player, world);
    body.push_str("\n\n");
    match last {
        Some(snapshot) => body.push_str(&personal_changes(player, world, snapshot)),
        None => body.push_str("You are new to the household; everything is still unfamiliar."),
    }
    title + &body
}

fn household_news(player: &PlayerState, world: &WorldState) -> String {
    let mut news = String::from("Around the household:\n\n");
    if world.stage == 1 {
        news.push_str(match world.turn {
            0..=6 => {
                "The matron still runs the courtyard down to the smallest duty roster; \
                 nothing escapes her eye."
            }
            7..=12 => {
                "Word spreads that the master's fortunes are rising. The maids whisper \
                 that a proper marriage for the young lord cannot be far off."
            }
            13..=18 => {
                "The rumors have hardened into certainty: a bride is being chosen. \
                 Everyone is quietly jockeying for position."
            }
            _ => {
                "The main courtyard is being refitted for the lady who will soon arrive. \
                 A new order of things is about to begin."
            }
        });
    } else if world.stage == 2 {
        news.push_str(
            "The new mistress has rewritten the rules of the house. Accounts have been \
             audited, sloppy hands dismissed, and everyone watches their step.",
        );
    } else {
        news.push_str(
            "The household has settled under the mistress's firm hand, and even the \
             matron speaks of her with respect. Attention turns outward, to the family's \
             standing beyond these walls.",
        );
    }

    let favor = player.stats.favor;
    if favor >= 80.0 {
        news.push_str(
            " Everyone can see the lord's regard for you; some of the maids have begun \
             currying favor through you.",
        );
    } else if favor >= 50.0 {
        news.push_str(" You have a recognized place at the lord's side, modest but real.");
    } else if favor <= 20.0 {
        news.push_str(" You pass through the courtyard like a shadow; hardly anyone notices you.");
    }

    let matron = player.relation(NPC_MATRON);
    if matron >= 70.0 {
        news.push_str(
            " The matron treats you as one of her own, and the household knows it.",
        );
    }
    news
}

fn personal_changes(
    player: &PlayerState,
    _world: &WorldState,
    last: &QuarterSnapshot,
) -> String {
    let mut changes: Vec<String> = Vec::new();

    let appearance = player.stats.appearance - last.stats.appearance;
    if appearance >= 5.0 {
        changes.push(
            "Passing servants glance at you twice now; the mirror agrees that the season \
             has been kind to your looks."
                .to_string(),
        );
    } else if appearance >= 2.0 {
        changes.push("Your color has improved; you look less worn than before.".to_string());
    } else if appearance <= -5.0 {
        changes.push(
            "The mirror shows a drawn face and shadowed eyes; people have begun to ask \
             whether you are unwell."
                .to_string(),
        );
    } else if appearance <= -2.0 {
        changes.push("You look a little tired of late, and you know it.".to_string());
    }

    let scheming = player.stats.scheming - last.stats.scheming;
    if scheming >= 5.0 {
        changes.push(
            "You read the currents of the household more clearly now, hearing what is \
             meant underneath what is said."
                .to_string(),
        );
    } else if scheming >= 3.0 {
        changes.push("You weigh your words more carefully than you used to.".to_string());
    } else if scheming <= -3.0 {
        changes.push("Comfort has dulled your edge; you catch yourself off guard.".to_string());
    }

    let status = player.stats.status - last.stats.status;
    if status >= 5.0 {
        changes.push(
            "The servants defer to you more readily; your name carries weight it did not \
             have a season ago."
                .to_string(),
        );
    } else if status <= -5.0 {
        changes.push(
            "Something unkind is being said behind your back; people who were once \
             polite now look through you."
                .to_string(),
        );
    }

    let network = player.stats.network - last.stats.network;
    if network >= 5.0 {
        changes.push(
            "You have friends in most corners of the house now; errands and rumors both \
             move faster for it."
                .to_string(),
        );
    } else if network <= -3.0 {
        changes.push("Old acquaintances have cooled; connections fade when untended.".to_string());
    }

    let favor = player.stats.favor - last.stats.favor;
    if favor >= 10.0 {
        changes.push(
            "The lord keeps you near in the evenings and speaks to you almost warmly; \
             the difference has not gone unnoticed."
                .to_string(),
        );
    } else if favor >= 5.0 {
        changes.push("The lord's manner toward you has softened noticeably.".to_string());
    } else if favor <= -10.0 {
        changes.push(
            "The lord barely calls for you anymore, and is short with you when he does. \
             It is a bad sign."
                .to_string(),
        );
    } else if favor <= -5.0 {
        changes.push("The lord seems more distant than he was.".to_string());
    }

    let health = player.stats.health - last.stats.health;
    if health >= 10.0 {
        changes.push("Your strength has returned; the work tires you far less.".to_string());
    } else if health <= -10.0 {
        changes.push(
            "You tire quickly and cough at night; if this continues you will fall \
             properly ill."
                .to_string(),
        );
    }

    let matron = player.relation(NPC_MATRON) - last.npc_relations.get(NPC_MATRON).copied().unwrap_or(0.0);
    if matron >= 10.0 {
        changes.push(
            "The matron has plainly taken you under her wing, teaching you the ways of \
             the house and speaking for you where it counts."
                .to_string(),
        );
    } else if matron <= -10.0 {
        changes.push(
            "The matron's manner toward you has gone cold; somewhere you have displeased \
             her."
                .to_string(),
        );
    }

    if changes.is_empty() {
        return "Your quarter:\n\nThe season passed quietly, with little to show for it."
            .to_string();
    }
    format!("Your quarter:\n\n{}", changes.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_map_to_months() {
        assert_eq!(season_name(3), "spring");
        assert_eq!(season_name(8), "summer");
        assert_eq!(season_name(11), "autumn");
        assert_eq!(season_name(1), "winter");
        assert_eq!(season_name(12), "winter");
    }

    #[test]
    fn first_summary_has_no_personal_diff() {
        let player = PlayerState::default();
        let world = WorldState::default();
        let text = compose(&player, &world, None);
        assert!(text.contains("new to the household"));
        assert!(text.contains("spring"));
    }

    #[test]
    fn diffed_summary_reflects_stat_movement() {
        let mut player = PlayerState::default();
        let world = WorldState::default();
        let last = capture(&player, &world);
        player.stats.favor += 12.0;
        player.stats.health -= 15.0;
        let text = compose(&player, &world, Some(&last));
        assert!(text.contains("evenings"));
        assert!(text.contains("cough at night"));
    }

    #[test]
    fn quiet_quarters_say_so() {
        let player = PlayerState::default();
        let world = WorldState::default();
        let last = capture(&player, &world);
        let text = compose(&player, &world, Some(&last));
        assert!(text.contains("passed quietly"));
    }
}
