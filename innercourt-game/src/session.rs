//! The orchestrating progression state machine.
//!
//! A `Session` owns the player, the world, the loaded content and the RNG
//! streams; it is the single writer of shared state. On each turn-advance
//! request it evaluates stage endings, interposes period summaries on their
//! cadence, selects a special event (falling back to the period's recurring
//! event), routes chosen options and freeform actions through resolution,
//! chronicles every transition, and evaluates promotion paths before
//! yielding control back to the UI.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::adjudicate::{
    self, NarrativeClient, NarrativeError, NarrativeSettings, TEXT_EMPTY_INPUT,
    TEXT_GENERATION_DISABLED, TEXT_WORDS_FAILED,
};
use crate::child::{Child, NurtureContext};
use crate::constants::{
    IMPRESSION_REFRESH_TURNS, ITEM_ESCAPE_PROGRESS, PREGNANCY_TERM_TURNS,
    RECURRING_EVENT_SUFFIX,
};
use crate::data::{EndKind, EndState, Event, EventData, Interlude, ShopItem, SpecialAction};
use crate::logbook::{self, Chronicle, FREEFORM_MARKER};
use crate::outcome::{self, ResolveContext, Resolution, ResolutionStatus};
use crate::persist::{Legacy, SavePayload};
use crate::promotion::{self, MissingList, PromotionPath};
use crate::rng::RngBundle;
use crate::shop::{self, PurchaseReceipt, ShopError};
use crate::state::{Impression, PlayerState, Rank, StatDelta, Stats, WorldState};
use crate::summary::{self, QuarterSnapshot};

/// Last stage of the position lifecycle; its ending is terminal.
pub const FINAL_STAGE: u32 = 3;

/// Narrative for the stage-ceiling collapse ending.
pub const TEXT_STAGE_COLLAPSE: &str =
    "Your body and your standing have both given out; the household has no further use for you.";
/// Narrative for the stage-one expulsion ending.
pub const TEXT_SOLD_AWAY: &str =
    "You could hold neither the lord's favor nor the matron's regard. Within days you are sold \
     out of the household; the story ends here.";
/// Narrative for the stage-two expulsion ending.
pub const TEXT_SENT_AWAY: &str =
    "The mistress has no place for you in the new order of the house. You are sent away with a \
     month's silver and no farewell.";
/// Narrative closing the final stage.
pub const TEXT_FINAL_CHAPTER: &str =
    "These long years in the household have run their course; your story closes here.";

/// Per-stage ending thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageThresholds {
    pub favor_pass: f64,
    pub trust_pass: f64,
    pub favor_collapse: f64,
    pub trust_collapse: f64,
    pub health_collapse: f64,
}

/// Shape of one chapter: its ceiling, its summary cadence, its outcomes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageConfig {
    pub stage: u32,
    pub turn_ceiling: u32,
    pub summary_cadence: u32,
    pub thresholds: StageThresholds,
}

const STAGES: [StageConfig; FINAL_STAGE as usize] = [
    StageConfig {
        stage: 1,
        turn_ceiling: 22,
        summary_cadence: 3,
        thresholds: StageThresholds {
            favor_pass: 50.0,
            trust_pass: 60.0,
            favor_collapse: 20.0,
            trust_collapse: 25.0,
            health_collapse: 20.0,
        },
    },
    StageConfig {
        stage: 2,
        turn_ceiling: 60,
        summary_cadence: 3,
        thresholds: StageThresholds {
            favor_pass: 65.0,
            trust_pass: 70.0,
            favor_collapse: 30.0,
            trust_collapse: 35.0,
            health_collapse: 20.0,
        },
    },
    StageConfig {
        stage: 3,
        turn_ceiling: 120,
        summary_cadence: 4,
        thresholds: StageThresholds {
            favor_pass: f64::INFINITY,
            trust_pass: f64::INFINITY,
            favor_collapse: 30.0,
            trust_collapse: 35.0,
            health_collapse: 20.0,
        },
    },
];

/// Configuration for a stage ordinal, clamped to the defined range.
#[must_use]
pub fn stage_config(stage: u32) -> &'static StageConfig {
    let index = stage.clamp(1, FINAL_STAGE) - 1;
    &STAGES[index as usize]
}

/// Static content tables loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct ContentSet {
    pub events: EventData,
    pub shop_items: Vec<ShopItem>,
    pub interludes: Vec<Interlude>,
    pub promotions: Vec<PromotionPath>,
}

/// What the UI must render after a turn-advance request.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnSignal {
    /// The playthrough is over; render the ending and offer a new game.
    Ending(EndState),
    /// A stage boundary passed; render the interlude then call `tick` again.
    StageAdvanced {
        stage: u32,
        interlude: Option<Interlude>,
    },
    /// The period summary is due; render it then call `tick` again.
    PeriodSummary(String),
    /// A special event fired; render it and resolve one of its options.
    SpecialEvent(String),
    /// No special event; render the period's recurring event.
    RecurringEvent(String),
    /// Nothing is eligible this period.
    Quiet,
}

/// A promotion that committed during a resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionEvent {
    pub to: Rank,
    pub rule_id: String,
}

/// Everything a single option resolution produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub resolution: Resolution,
    pub promotion: Option<PromotionEvent>,
}

/// How a freeform action came out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeformStatus {
    Applied,
    EmptyInput,
    Disabled,
    UnknownEvent,
    InsufficientAp,
    /// Transport failure or malformed reply; nothing was mutated.
    ServiceFailed,
}

/// Result of adjudicating a freeform action.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeformReport {
    pub text: String,
    pub end: Option<EndState>,
    pub delta: Option<StatDelta>,
    pub status: FreeformStatus,
    pub promotion: Option<PromotionEvent>,
}

impl FreeformReport {
    fn refused(text: &str, status: FreeformStatus) -> Self {
        Self {
            text: text.to_string(),
            end: None,
            delta: None,
            status,
            promotion: None,
        }
    }
}

/// Caller knobs for a freeform resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeformOptions {
    pub consume_ap: bool,
    /// Record the event in history even when it is not once-flagged.
    pub force_once: bool,
}

impl Default for FreeformOptions {
    fn default() -> Self {
        Self {
            consume_ap: true,
            force_once: false,
        }
    }
}

/// A queued list of option ids executed sequentially, valid within its
/// start turn and the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PlanQueue {
    event_id: String,
    start_turn: u32,
    queue: VecDeque<String>,
}

/// Whether an event may accept freeform input under the given settings.
#[must_use]
pub fn freeform_allowed(event: &Event, settings: &NarrativeSettings) -> bool {
    event.allow_custom && settings.is_ready()
}

/// A running playthrough.
#[derive(Debug, Clone)]
pub struct Session {
    player: PlayerState,
    world: WorldState,
    content: ContentSet,
    chronicle: Chronicle,
    quarter_snapshot: Option<QuarterSnapshot>,
    rng: RngBundle,
    last_summary_turn: u32,
    plan: Option<PlanQueue>,
    ending: Option<EndState>,
}

impl Session {
    /// Start a fresh playthrough from a seed and loaded content.
    #[must_use]
    pub fn new(seed: u64, content: ContentSet) -> Self {
        let mut world = WorldState::default();
        world.seed = seed;
        Self {
            player: PlayerState::default(),
            world,
            content,
            chronicle: Chronicle::default(),
            quarter_snapshot: None,
            rng: RngBundle::from_user_seed(seed),
            last_summary_turn: 0,
            plan: None,
            ending: None,
        }
    }

    /// Start a fresh playthrough, folding a previous run's legacy bonus
    /// into character creation.
    #[must_use]
    pub fn new_with_legacy(seed: u64, content: ContentSet, legacy: Option<&Legacy>) -> Self {
        let mut session = Self::new(seed, content);
        if let Some(legacy) = legacy {
            let bonus = legacy.creation_bonus();
            if !bonus.is_empty() {
                log::debug!("applying legacy bonus from turn {}", legacy.turn);
                session.player.apply_delta(&bonus);
            }
        }
        session
    }

    /// Rebuild a session from a persisted payload.
    #[must_use]
    pub fn from_payload(payload: SavePayload, content: ContentSet) -> Self {
        let seed = payload.world.seed;
        Self {
            player: payload.player,
            world: payload.world,
            content,
            chronicle: payload.chronicle,
            quarter_snapshot: payload.quarter_snapshot,
            rng: RngBundle::from_user_seed(seed),
            last_summary_turn: 0,
            plan: None,
            ending: None,
        }
    }

    /// Snapshot the session into a persistable payload.
    #[must_use]
    pub fn to_payload(&self, saved_at_ms: u64) -> SavePayload {
        SavePayload::capture(
            &self.player,
            &self.world,
            &self.chronicle,
            self.quarter_snapshot.as_ref(),
            saved_at_ms,
        )
    }

    /// Finish character creation: identity, rolled stats, background bonus.
    pub fn begin(
        &mut self,
        name: &str,
        background_id: &str,
        background_name: &str,
        base_stats: Stats,
        background_bonus: &StatDelta,
    ) {
        self.player
            .set_identity(name, background_id, background_name);
        self.player.stats = base_stats;
        self.player.apply_delta(background_bonus);
        self.quarter_snapshot = Some(summary::capture(&self.player, &self.world));
    }

    #[must_use]
    pub const fn player(&self) -> &PlayerState {
        &self.player
    }

    pub const fn player_mut(&mut self) -> &mut PlayerState {
        &mut self.player
    }

    #[must_use]
    pub const fn world(&self) -> &WorldState {
        &self.world
    }

    pub const fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    #[must_use]
    pub const fn content(&self) -> &ContentSet {
        &self.content
    }

    #[must_use]
    pub const fn chronicle(&self) -> &Chronicle {
        &self.chronicle
    }

    #[must_use]
    pub const fn ending(&self) -> Option<&EndState> {
        self.ending.as_ref()
    }

    /// Id of the current stage's recurring period event.
    #[must_use]
    pub fn recurring_event_id(&self) -> String {
        format!(
            "s{}_{RECURRING_EVENT_SUFFIX}",
            self.world.stage.min(FINAL_STAGE)
        )
    }

    /// Whether an in-progress pregnancy has reached term.
    #[must_use]
    pub fn pregnancy_due(&self) -> bool {
        self.player
            .pregnancy_start_turn
            .is_some_and(|start| self.world.turn.saturating_sub(start) >= PREGNANCY_TERM_TURNS)
    }

    /// Drive one turn-advance request; see [`TurnSignal`] for what the UI
    /// should do with the result.
    pub fn tick(&mut self) -> TurnSignal {
        if let Some(end) = self.ending.clone() {
            return TurnSignal::Ending(end);
        }
        if let Some(signal) = self.check_stage_ending() {
            return signal;
        }
        if self.should_show_summary() {
            let text = summary::compose(&self.player, &self.world, self.quarter_snapshot.as_ref());
            self.last_summary_turn = self.world.turn;
            self.quarter_snapshot = Some(summary::capture(&self.player, &self.world));
            return TurnSignal::PeriodSummary(text);
        }

        let recurring_id = self.recurring_event_id();
        let stage_prefix = format!("s{}_", self.world.stage.min(FINAL_STAGE));
        let special_id = {
            let mut rng = self.rng.events();
            crate::events::pick_event_where(
                &self.content.events.events,
                &self.player,
                &self.world,
                &mut *rng,
                |event| {
                    event.id.starts_with(&stage_prefix)
                        && event.id != recurring_id
                        && !self.player.history.contains(&event.id)
                },
            )
            .map(|event| event.id.clone())
        };
        if let Some(id) = special_id {
            return TurnSignal::SpecialEvent(id);
        }

        let recurring_eligible = self.content.events.find(&recurring_id).is_some() && {
            let mut rng = self.rng.events();
            crate::events::pick_event_where(
                &self.content.events.events,
                &self.player,
                &self.world,
                &mut *rng,
                |event| event.id == recurring_id,
            )
            .is_some()
        };
        if recurring_eligible {
            TurnSignal::RecurringEvent(recurring_id)
        } else {
            TurnSignal::Quiet
        }
    }

    fn should_show_summary(&self) -> bool {
        let cadence = stage_config(self.world.stage).summary_cadence;
        self.world.turn > 1
            && self.world.turn % cadence == 1
            && self.last_summary_turn != self.world.turn
    }

    fn check_stage_ending(&mut self) -> Option<TurnSignal> {
        if self.world.turn <= self.world.max_turn {
            return None;
        }
        if self.world.stage >= FINAL_STAGE {
            let end = EndState {
                kind: EndKind::Chapter,
                text: TEXT_FINAL_CHAPTER.to_string(),
            };
            self.finish(end.clone());
            return Some(TurnSignal::Ending(end));
        }
        let thresholds = stage_config(self.world.stage).thresholds;
        let favor = self.player.stats.favor;
        let trust = self.player.matron_trust();
        let health = self.player.stats.health;

        if favor > thresholds.favor_pass && trust > thresholds.trust_pass {
            let next_stage = self.world.stage + 1;
            self.world.stage = next_stage;
            self.world.max_turn = stage_config(next_stage).turn_ceiling;
            let interlude = self
                .content
                .interludes
                .iter()
                .find(|interlude| interlude.stage == next_stage)
                .cloned();
            log::debug!("stage advanced to {next_stage}");
            return Some(TurnSignal::StageAdvanced {
                stage: next_stage,
                interlude,
            });
        }

        let end = if health <= thresholds.health_collapse
            || (favor <= thresholds.favor_collapse && trust <= thresholds.trust_collapse)
        {
            EndState {
                kind: EndKind::Death,
                text: TEXT_STAGE_COLLAPSE.to_string(),
            }
        } else if self.world.stage == 1 {
            EndState {
                kind: EndKind::Sold,
                text: TEXT_SOLD_AWAY.to_string(),
            }
        } else {
            EndState {
                kind: EndKind::SentAway,
                text: TEXT_SENT_AWAY.to_string(),
            }
        };
        self.finish(end.clone());
        Some(TurnSignal::Ending(end))
    }

    /// Resolve a chosen option on an event, spending AP.
    pub fn resolve_option(&mut self, event_id: &str, option_id: &str) -> TurnReport {
        self.resolve_with(event_id, option_id, ResolveContext::default(), false)
    }

    /// Resolve a special event's option: AP-exempt, always entering history.
    pub fn resolve_special_option(&mut self, event_id: &str, option_id: &str) -> TurnReport {
        self.resolve_with(event_id, option_id, ResolveContext::ap_exempt(), true)
    }

    fn resolve_with(
        &mut self,
        event_id: &str,
        option_id: &str,
        ctx: ResolveContext,
        force_once: bool,
    ) -> TurnReport {
        let Some(event) = self.content.events.find(event_id).cloned() else {
            return TurnReport {
                resolution: Resolution {
                    text: outcome::TEXT_UNKNOWN_OPTION.to_string(),
                    end: None,
                    delta: None,
                    status: ResolutionStatus::UnknownOption,
                    turn_advanced: false,
                },
                promotion: None,
            };
        };

        let before = logbook::snapshot(&self.player, &self.world);
        let turn_before = self.world.turn;
        let resolution = {
            let mut rng = self.rng.outcome();
            outcome::apply_option(
                &event,
                option_id,
                &mut self.player,
                &mut self.world,
                &mut *rng,
                ctx,
            )
        };

        if resolution.status == ResolutionStatus::Applied {
            if let Some(special) = event.option(option_id).and_then(|option| option.special) {
                self.handle_special(special);
            }
            if force_once {
                self.player.history.insert(event.id.clone());
            }
        }
        if self.world.turn > turn_before {
            self.on_turn_advanced();
        }

        let option_text = event
            .option(option_id)
            .map(|option| option.text.clone())
            .unwrap_or_default();
        self.chronicle.record(
            &before,
            &self.player,
            &self.world,
            &event.title,
            &option_text,
            &resolution.text,
        );

        if let Some(end) = &resolution.end {
            self.finish(end.clone());
        }

        let promotion = if self.ending.is_none() && resolution.status == ResolutionStatus::Applied
        {
            self.check_promotion()
        } else {
            None
        };

        TurnReport {
            resolution,
            promotion,
        }
    }

    fn handle_special(&mut self, special: SpecialAction) {
        match special {
            SpecialAction::Pregnancy => {
                if self.player.pregnancy_start_turn.is_none() {
                    self.player.pregnancy_start_turn = Some(self.world.turn);
                }
            }
            SpecialAction::Birth => self.deliver_child(),
            SpecialAction::Escape => {
                self.player
                    .apply_delta(&StatDelta::new().with(&format!("item_{ITEM_ESCAPE_PROGRESS}"), 1.0));
            }
            SpecialAction::ChildTraining => {
                let ctx = self.nurture_context();
                for child in &mut self.player.children {
                    if child.taken_by_matron {
                        continue;
                    }
                    child.train();
                    child.shift_personality(&ctx);
                }
            }
        }
    }

    fn deliver_child(&mut self) {
        let mut child = {
            let mut rng = self.rng.child();
            Child::newborn(self.world.turn, &mut *rng)
        };
        child.taken_by_matron = Child::custody_taken(self.player.matron_trust());
        log::debug!(
            "child born at turn {} (custody taken: {})",
            self.world.turn,
            child.taken_by_matron
        );
        self.player.children.push(child);
        self.player.pregnancy_start_turn = None;
    }

    fn nurture_context(&self) -> NurtureContext {
        NurtureContext {
            favor: self.player.stats.favor,
            matron_trust: self.player.matron_trust(),
            status: self.player.stats.status,
            business: self.player.stats.business,
        }
    }

    /// Side effects of every period rollover: salary is paid and children
    /// age one period.
    fn on_turn_advanced(&mut self) {
        self.player.stats.cash += self.player.rank.monthly_salary();
        let ctx = self.nurture_context();
        for child in &mut self.player.children {
            child.grow_passively();
            child.shift_personality(&ctx);
        }
    }

    fn check_promotion(&mut self) -> Option<PromotionEvent> {
        let path =
            promotion::applicable_path(&self.content.promotions, self.player.rank, self.world.stage)?;
        let check = promotion::try_promotion(path, &self.player);
        let rule_id = check.matched?;
        let to = path.to;
        self.player.rank = to;
        log::debug!("promoted to {to} via rule {rule_id}");
        Some(PromotionEvent { to, rule_id })
    }

    /// Unmet requirements of the current promotion path, for UI hinting.
    #[must_use]
    pub fn promotion_hint(&self) -> Option<MissingList> {
        let path =
            promotion::applicable_path(&self.content.promotions, self.player.rank, self.world.stage)?;
        let check = promotion::try_promotion(path, &self.player);
        if check.succeeded() {
            None
        } else {
            Some(check.missing)
        }
    }

    /// Adjudicate a freeform player action through the narrative
    /// collaborator. Every failure mode is a recoverable narrative; state
    /// is only mutated after a fully parsed success.
    pub fn resolve_freeform(
        &mut self,
        event_id: &str,
        input: &str,
        client: &dyn NarrativeClient,
        settings: &NarrativeSettings,
        opts: FreeformOptions,
    ) -> FreeformReport {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return FreeformReport::refused(TEXT_EMPTY_INPUT, FreeformStatus::EmptyInput);
        }
        if !settings.is_ready() {
            return FreeformReport::refused(TEXT_GENERATION_DISABLED, FreeformStatus::Disabled);
        }
        let Some(event) = self.content.events.find(event_id).cloned() else {
            return FreeformReport::refused(
                outcome::TEXT_UNKNOWN_OPTION,
                FreeformStatus::UnknownEvent,
            );
        };
        if opts.consume_ap && self.world.ap == 0 {
            return FreeformReport::refused(
                outcome::TEXT_INSUFFICIENT_AP,
                FreeformStatus::InsufficientAp,
            );
        }

        let request = adjudicate::adjudication_prompt(&event, &self.player, &self.world, trimmed);
        let raw = match client.complete(settings, &request) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("narrative transport failed: {err}");
                return FreeformReport::refused(TEXT_WORDS_FAILED, FreeformStatus::ServiceFailed);
            }
        };
        let reply = match adjudicate::parse_reply(&raw) {
            Ok(reply) => reply,
            Err(err) => {
                log::warn!("narrative reply unusable: {err}");
                return FreeformReport::refused(TEXT_WORDS_FAILED, FreeformStatus::ServiceFailed);
            }
        };

        let before = logbook::snapshot(&self.player, &self.world);
        let turn_before = self.world.turn;
        if let Some(changes) = &reply.stat_changes {
            self.player.apply_delta(changes);
        }
        if event.once || opts.force_once {
            self.player.history.insert(event.id.clone());
        }

        let end = match &reply.trigger_ending {
            Some(trigger) if !trigger.trim().is_empty() => Some(EndState {
                kind: EndKind::from_trigger(trigger),
                text: reply.result_text.clone(),
            }),
            _ if self.player.stats.health <= 0.0 => Some(EndState {
                kind: EndKind::Death,
                text: outcome::TEXT_HEALTH_COLLAPSE.to_string(),
            }),
            _ => None,
        };

        let option_text = format!("{FREEFORM_MARKER}{trimmed}");
        let mut promotion = None;
        if let Some(end) = &end {
            self.chronicle.record(
                &before,
                &self.player,
                &self.world,
                &event.title,
                &option_text,
                &reply.result_text,
            );
            self.finish(end.clone());
        } else {
            if opts.consume_ap {
                let favor_gain = reply
                    .stat_changes
                    .as_ref()
                    .is_some_and(StatDelta::gains_favor);
                outcome::spend_ap_with_neglect(&mut self.player, &mut self.world, 1, favor_gain);
            }
            if self.world.turn > turn_before {
                self.on_turn_advanced();
            }
            self.chronicle.record(
                &before,
                &self.player,
                &self.world,
                &event.title,
                &option_text,
                &reply.result_text,
            );
            promotion = self.check_promotion();
        }

        FreeformReport {
            text: reply.result_text,
            end,
            delta: reply.stat_changes,
            status: FreeformStatus::Applied,
            promotion,
        }
    }

    /// Whether the cached impression for an NPC is stale or missing.
    #[must_use]
    pub fn impression_stale(&self, npc: &str) -> bool {
        self.player.npc_impressions.get(npc).is_none_or(|impression| {
            self.world.turn.saturating_sub(impression.refreshed_turn) >= IMPRESSION_REFRESH_TURNS
        })
    }

    /// Refresh the cached impression for an NPC via the narrative service.
    ///
    /// # Errors
    ///
    /// Returns an error when generation is disabled or the collaborator
    /// fails; the cached impression is left untouched in that case.
    pub fn refresh_impression(
        &mut self,
        npc: &str,
        client: &dyn NarrativeClient,
        settings: &NarrativeSettings,
    ) -> Result<String, NarrativeError> {
        if !settings.is_ready() {
            return Err(NarrativeError::Disabled);
        }
        let request = adjudicate::impression_prompt(npc, &self.player, &self.world);
        let text = client.complete(settings, &request)?.trim().to_string();
        self.player.npc_impressions.insert(
            npc.to_string(),
            Impression {
                text: text.clone(),
                refreshed_turn: self.world.turn,
            },
        );
        Ok(text)
    }

    /// Generate the character's background story at creation time.
    ///
    /// # Errors
    ///
    /// Returns an error when generation is disabled or the collaborator fails.
    pub fn generate_background_story(
        &self,
        client: &dyn NarrativeClient,
        settings: &NarrativeSettings,
    ) -> Result<String, NarrativeError> {
        if !settings.is_ready() {
            return Err(NarrativeError::Disabled);
        }
        let request = adjudicate::background_story_prompt(&self.player);
        Ok(client.complete(settings, &request)?.trim().to_string())
    }

    /// Generate the lord's first reaction to the player's name.
    ///
    /// # Errors
    ///
    /// Returns an error when generation is disabled or the collaborator fails.
    pub fn generate_name_comment(
        &self,
        client: &dyn NarrativeClient,
        settings: &NarrativeSettings,
    ) -> Result<String, NarrativeError> {
        if !settings.is_ready() {
            return Err(NarrativeError::Disabled);
        }
        let request = adjudicate::name_comment_prompt(&self.player.name);
        Ok(client.complete(settings, &request)?.trim().to_string())
    }

    /// Generate the end-of-playthrough lifetime review.
    ///
    /// # Errors
    ///
    /// Returns an error when generation is disabled, no ending has fired,
    /// or the collaborator fails.
    pub fn generate_lifetime_review(
        &self,
        client: &dyn NarrativeClient,
        settings: &NarrativeSettings,
    ) -> Result<String, NarrativeError> {
        if !settings.is_ready() {
            return Err(NarrativeError::Disabled);
        }
        let ending_text = self
            .ending
            .as_ref()
            .map(|end| end.text.as_str())
            .unwrap_or_default();
        let request = adjudicate::lifetime_review_prompt(&self.player, &self.world, ending_text);
        Ok(client.complete(settings, &request)?.trim().to_string())
    }

    /// Queue a sequence of option ids on one event to run back-to-back.
    pub fn queue_plan(&mut self, event_id: &str, option_ids: Vec<String>) {
        self.plan = Some(PlanQueue {
            event_id: event_id.to_string(),
            start_turn: self.world.turn,
            queue: option_ids.into(),
        });
    }

    /// Resolve the next planned option, if the plan is still valid. Plans
    /// survive one turn rollover, so an AP-exhausted period can finish its
    /// queue the next morning.
    pub fn advance_plan(&mut self) -> Option<TurnReport> {
        let plan = self.plan.as_mut()?;
        if self.world.turn.saturating_sub(plan.start_turn) > 1 {
            self.plan = None;
            return None;
        }
        let Some(option_id) = plan.queue.pop_front() else {
            self.plan = None;
            return None;
        };
        let event_id = plan.event_id.clone();
        let report = self.resolve_option(&event_id, &option_id);
        if self.ending.is_some() {
            self.plan = None;
        }
        Some(report)
    }

    /// Buy a shop item, chronicling the purchase.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown items or insufficient cash.
    pub fn purchase(&mut self, item_id: &str) -> Result<PurchaseReceipt, ShopError> {
        let before = logbook::snapshot(&self.player, &self.world);
        let receipt = shop::purchase(&self.content.shop_items, item_id, &mut self.player)?;
        self.chronicle.record(
            &before,
            &self.player,
            &self.world,
            "Household Shop",
            &format!("Bought {}", receipt.item_name),
            "The purchase is made without fuss.",
        );
        Ok(receipt)
    }

    fn finish(&mut self, end: EndState) {
        if self.ending.is_none() {
            log::debug!("playthrough ended: {:?}", end.kind);
            self.plan = None;
            self.ending = Some(end);
        }
    }
}
