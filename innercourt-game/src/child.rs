//! Offspring creation, growth, training, and personality drift.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::CUSTODY_TRUST_THRESHOLD;

const PERSONALITY_REBELLIOUS_BELOW: f64 = 35.0;
const PERSONALITY_OBEDIENT_ABOVE: f64 = 65.0;
const APTITUDE_MIN: u32 = 40;
const APTITUDE_MAX: u32 = 95;
const PASSIVE_GROWTH_BASE: f64 = 0.35;
const TRAINING_FOCUS_BONUS: f64 = 2.2;
const TRAINING_SPREAD_BONUS: f64 = 0.7;
const PERSONALITY_SHIFT_CAP: f64 = 4.0;

/// Sex assigned at birth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Boy,
    Girl,
}

/// Trainable skill dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrainingFocus {
    #[default]
    Balanced,
    Literary,
    Martial,
    Etiquette,
    Business,
}

impl TrainingFocus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Literary => "literary",
            Self::Martial => "martial",
            Self::Etiquette => "etiquette",
            Self::Business => "business",
        }
    }
}

impl fmt::Display for TrainingFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainingFocus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balanced" => Ok(Self::Balanced),
            "literary" => Ok(Self::Literary),
            "martial" => Ok(Self::Martial),
            "etiquette" => Ok(Self::Etiquette),
            "business" => Ok(Self::Business),
            _ => Err(()),
        }
    }
}

/// Bounded skill block; every value stays inside [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChildSkills {
    #[serde(default)]
    pub literary: f64,
    #[serde(default)]
    pub martial: f64,
    #[serde(default)]
    pub etiquette: f64,
    #[serde(default)]
    pub business: f64,
}

impl ChildSkills {
    fn apply(&mut self, focus: TrainingFocus, focused: f64, spread: f64) {
        let bump = |value: &mut f64, amount: f64| *value = (*value + amount).clamp(0.0, 100.0);
        // Balanced spreads the focused amount evenly; otherwise the chosen
        // skill takes the heavy share and the rest take the light one.
        match focus {
            TrainingFocus::Balanced => {
                let each = (focused + 3.0 * spread) / 4.0;
                bump(&mut self.literary, each);
                bump(&mut self.martial, each);
                bump(&mut self.etiquette, each);
                bump(&mut self.business, each);
            }
            TrainingFocus::Literary => {
                bump(&mut self.literary, focused);
                bump(&mut self.martial, spread);
                bump(&mut self.etiquette, spread);
                bump(&mut self.business, spread);
            }
            TrainingFocus::Martial => {
                bump(&mut self.literary, spread);
                bump(&mut self.martial, focused);
                bump(&mut self.etiquette, spread);
                bump(&mut self.business, spread);
            }
            TrainingFocus::Etiquette => {
                bump(&mut self.literary, spread);
                bump(&mut self.martial, spread);
                bump(&mut self.etiquette, focused);
                bump(&mut self.business, spread);
            }
            TrainingFocus::Business => {
                bump(&mut self.literary, spread);
                bump(&mut self.martial, spread);
                bump(&mut self.etiquette, spread);
                bump(&mut self.business, focused);
            }
        }
    }

    /// Highest single skill value.
    #[must_use]
    pub fn highest(&self) -> f64 {
        self.literary
            .max(self.martial)
            .max(self.etiquette)
            .max(self.business)
    }
}

/// Broad personality classification derived from the scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalityKind {
    Rebellious,
    Moderate,
    Obedient,
}

/// A child of the player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: String,
    /// Unset until the naming step happens.
    #[serde(default)]
    pub name: Option<String>,
    pub sex: Sex,
    pub birth_turn: u32,
    /// Fixed at birth; drives growth speed.
    pub aptitude: u32,
    #[serde(default)]
    pub skills: ChildSkills,
    #[serde(default)]
    pub training: TrainingFocus,
    pub personality: f64,
    #[serde(default)]
    pub taken_by_matron: bool,
    #[serde(default)]
    pub care_actions: u32,
}

impl Child {
    /// Create a newborn with randomized aptitude, skill spread and
    /// personality. All draws come from the injected RNG.
    pub fn newborn<R: Rng>(birth_turn: u32, rng: &mut R) -> Self {
        let aptitude = rng.gen_range(APTITUDE_MIN..=APTITUDE_MAX);
        let base = 12.0 + rng.gen_range(0.0..10.0) + f64::from(aptitude) * 0.1;
        let variance = |rng: &mut R| rng.gen_range(-3.0..3.0);
        let skills = ChildSkills {
            literary: (base + variance(rng)).clamp(0.0, 100.0),
            martial: (base + variance(rng)).clamp(0.0, 100.0),
            etiquette: (base + variance(rng)).clamp(0.0, 100.0),
            business: (base + variance(rng)).clamp(0.0, 100.0),
        };
        // Three-sample average pulls the noise toward the midpoint.
        let noise: f64 = (rng.gen_range(0.0..1.0) + rng.gen_range(0.0..1.0) + rng.gen_range(0.0..1.0))
            / 3.0
            - 0.5;
        let personality = (50.0 + noise * 60.0).clamp(0.0, 100.0);
        let sex = if rng.gen_bool(0.5) { Sex::Boy } else { Sex::Girl };
        Self {
            id: format!("child_{birth_turn}_{:05}", rng.gen_range(0u32..100_000)),
            name: None,
            sex,
            birth_turn,
            aptitude,
            skills,
            training: TrainingFocus::Balanced,
            personality,
            taken_by_matron: false,
            care_actions: 0,
        }
    }

    /// Whether a newborn is claimed by the matron, by trust threshold.
    #[must_use]
    pub fn custody_taken(matron_trust: f64) -> bool {
        matron_trust >= CUSTODY_TRUST_THRESHOLD
    }

    #[must_use]
    pub fn personality_kind(&self) -> PersonalityKind {
        if self.personality < PERSONALITY_REBELLIOUS_BELOW {
            PersonalityKind::Rebellious
        } else if self.personality > PERSONALITY_OBEDIENT_ABOVE {
            PersonalityKind::Obedient
        } else {
            PersonalityKind::Moderate
        }
    }

    /// Age in completed turns (months) at the given current turn.
    #[must_use]
    pub const fn age_turns(&self, current_turn: u32) -> u32 {
        current_turn.saturating_sub(self.birth_turn)
    }

    /// Passive aging growth applied on every turn advance. Aptitude scales
    /// the gain; the current training direction tilts it slightly.
    pub fn grow_passively(&mut self) {
        let rate = PASSIVE_GROWTH_BASE * (f64::from(self.aptitude) / 100.0);
        self.skills
            .apply(self.training, rate * 1.5, rate * 0.75);
    }

    /// Explicit training action: a larger, direction-weighted bonus.
    pub fn train(&mut self) {
        let scale = f64::from(self.aptitude) / 100.0;
        self.skills.apply(
            self.training,
            TRAINING_FOCUS_BONUS * scale,
            TRAINING_SPREAD_BONUS * scale,
        );
        self.care_actions = self.care_actions.saturating_add(1);
    }

    /// Shift personality toward obedience or rebellion from the household
    /// environment: parental favor, the matron's trust, standing, business
    /// acumen, and hands-on care all pull on the child.
    pub fn shift_personality(&mut self, ctx: &NurtureContext) {
        let favor_pull = (ctx.favor - 50.0) * 0.012;
        let matron_pull = (ctx.matron_trust - 50.0) * 0.016;
        let status_pull = (ctx.status - 50.0) * 0.006;
        let business_pull = ctx.business * 0.004;
        let care_pull = f64::from(self.care_actions.min(12)) * 0.05;
        let delta = (favor_pull + matron_pull + status_pull + business_pull + care_pull)
            .clamp(-PERSONALITY_SHIFT_CAP, PERSONALITY_SHIFT_CAP);
        self.personality = (self.personality + delta).clamp(0.0, 100.0);
    }
}

/// Household environment feeding the personality-shift formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NurtureContext {
    pub favor: f64,
    pub matron_trust: f64,
    pub status: f64,
    pub business: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::from_seed([7u8; 32])
    }

    #[test]
    fn newborn_fields_are_in_range() {
        let mut rng = rng();
        for turn in 1..20 {
            let child = Child::newborn(turn, &mut rng);
            assert!((APTITUDE_MIN..=APTITUDE_MAX).contains(&child.aptitude));
            assert!(child.personality >= 0.0 && child.personality <= 100.0);
            assert!(child.skills.highest() <= 100.0);
            assert!(child.name.is_none());
            assert_eq!(child.birth_turn, turn);
        }
    }

    #[test]
    fn custody_follows_trust_threshold() {
        assert!(Child::custody_taken(CUSTODY_TRUST_THRESHOLD));
        assert!(!Child::custody_taken(CUSTODY_TRUST_THRESHOLD - 1.0));
    }

    #[test]
    fn personality_kinds_split_at_thresholds() {
        let mut child = Child::newborn(1, &mut rng());
        child.personality = 20.0;
        assert_eq!(child.personality_kind(), PersonalityKind::Rebellious);
        child.personality = 50.0;
        assert_eq!(child.personality_kind(), PersonalityKind::Moderate);
        child.personality = 80.0;
        assert_eq!(child.personality_kind(), PersonalityKind::Obedient);
    }

    #[test]
    fn training_favors_the_chosen_direction() {
        let mut child = Child::newborn(1, &mut rng());
        child.training = TrainingFocus::Martial;
        let before = child.skills.clone();
        child.train();
        let martial_gain = child.skills.martial - before.martial;
        let literary_gain = child.skills.literary - before.literary;
        assert!(martial_gain > literary_gain);
        assert_eq!(child.care_actions, 1);
    }

    #[test]
    fn passive_growth_scales_with_aptitude() {
        let mut slow = Child::newborn(1, &mut rng());
        let mut fast = slow.clone();
        slow.aptitude = APTITUDE_MIN;
        fast.aptitude = APTITUDE_MAX;
        let slow_before = slow.skills.highest();
        let fast_before = fast.skills.highest();
        slow.grow_passively();
        fast.grow_passively();
        assert!(fast.skills.highest() - fast_before > slow.skills.highest() - slow_before);
    }

    #[test]
    fn personality_shift_is_clamped() {
        let mut child = Child::newborn(1, &mut rng());
        child.personality = 99.5;
        child.care_actions = 50;
        child.shift_personality(&NurtureContext {
            favor: 100.0,
            matron_trust: 100.0,
            status: 100.0,
            business: 100.0,
        });
        assert!(child.personality <= 100.0);

        child.personality = 0.2;
        child.care_actions = 0;
        child.shift_personality(&NurtureContext {
            favor: 0.0,
            matron_trust: 0.0,
            status: 0.0,
            business: 0.0,
        });
        assert!(child.personality >= 0.0);
    }
}
