//! Freeform-action adjudication against the external narrative service.
//!
//! The engine builds a structured prompt, hands it to the collaborator, and
//! expects a reply containing one top-level brace-delimited object with at
//! minimum a `result_text` field. Anything else is a recoverable parse
//! failure: the caller shows a fallback narrative and mutates nothing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::Event;
use crate::state::{PlayerState, StatDelta, WorldState};

/// Narrative shown when the collaborator fails or replies malformed.
pub const TEXT_WORDS_FAILED: &str =
    "Words fail you, and the moment slips away. (connection trouble)";
/// Narrative shown when the player submits empty input.
pub const TEXT_EMPTY_INPUT: &str = "You open your mouth, but nothing comes.";
/// Narrative shown when generation is disabled in settings.
pub const TEXT_GENERATION_DISABLED: &str =
    "Improvised actions are not available; the path is fixed for now.";

/// Read-only configuration consulted before every freeform interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSettings {
    pub enabled: bool,
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "NarrativeSettings::default_model")]
    pub model: String,
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: String::new(),
            api_key: String::new(),
            model: Self::default_model(),
        }
    }
}

impl NarrativeSettings {
    fn default_model() -> String {
        "deepseek-chat".to_string()
    }

    /// Whether freeform interactions may be offered at all.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.enabled && !self.api_url.is_empty()
    }
}

/// Failures at the adjudication boundary. All are recoverable; the
/// playthrough continues with a fallback narrative.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative generation is disabled")]
    Disabled,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed reply: {0}")]
    MalformedReply(String),
}

/// A single request to the narrative collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
}

/// External narrative-generation collaborator. Calls are strictly
/// sequential and blocking; the engine never issues overlapping requests.
pub trait NarrativeClient {
    /// Produce the raw text reply for a request.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    fn complete(
        &self,
        settings: &NarrativeSettings,
        request: &NarrativeRequest,
    ) -> Result<String, NarrativeError>;
}

/// Machine-parseable part of an adjudication reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdjudicationReply {
    pub result_text: String,
    #[serde(default)]
    pub stat_changes: Option<StatDelta>,
    #[serde(default)]
    pub trigger_ending: Option<String>,
}

/// Extract the first top-level brace-delimited object from a text blob,
/// tolerating prose or code fences around it. String literals inside the
/// object are skipped so embedded braces do not truncate the scan.
#[must_use]
pub fn extract_braced(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a raw reply into its structured form.
///
/// # Errors
///
/// Returns `MalformedReply` when no brace-delimited object is present, the
/// object is not valid JSON, or the narrative field is missing or empty.
pub fn parse_reply(content: &str) -> Result<AdjudicationReply, NarrativeError> {
    let json = extract_braced(content)
        .ok_or_else(|| NarrativeError::MalformedReply("no structured object".to_string()))?;
    let reply: AdjudicationReply = serde_json::from_str(json)
        .map_err(|err| NarrativeError::MalformedReply(err.to_string()))?;
    if reply.result_text.trim().is_empty() {
        return Err(NarrativeError::MalformedReply(
            "empty result_text".to_string(),
        ));
    }
    Ok(reply)
}

fn state_context(player: &PlayerState, world: &WorldState) -> String {
    let stats = serde_json::to_string(&player.stats).unwrap_or_default();
    let relations = serde_json::to_string(&player.npc_relations).unwrap_or_default();
    let inventory = serde_json::to_string(&player.inventory).unwrap_or_default();
    format!(
        "Player stats: {stats}\nNPC relations: {relations}\nInventory: {inventory}\n\
         Turn info: {{\"turn\": {}, \"month\": {}, \"ap\": {}}}",
        world.turn, world.month, world.ap
    )
}

/// Build the adjudication prompt for a freeform player action.
#[must_use]
pub fn adjudication_prompt(
    event: &Event,
    player: &PlayerState,
    world: &WorldState,
    input: &str,
) -> NarrativeRequest {
    let options = event
        .options
        .iter()
        .map(|opt| format!("- {}: {}", opt.id, opt.text))
        .collect::<Vec<_>>()
        .join("\n");
    let options = if options.is_empty() {
        "(none)".to_string()
    } else {
        options
    };
    let system_prompt = format!(
        "# Role\n\
         You are the adjudication system (GM) of a hard historical survival\n\
         game set in a noble household. Tone: realistic, oppressive, strictly\n\
         hierarchical, logically consistent. No wish fulfillment.\n\n\
         # Context\n\
         Current event: {title}\n\
         Event text: {text}\n\
         Listed options:\n{options}\n\
         {state}\n\n\
         # User Input\n{input}\n\n\
         # Rules\n\
         1) Nothing appears from thin air; no deus ex machina.\n\
         2) Defiance, deception or violence is judged against scheming and status.\n\
         3) The further out of line the act, the heavier the penalty; clever and\n\
            plausible acts may earn a small reward.\n\
         4) Narrate in second person, 30-50 words, period diction.\n\n\
         # Output (Strict JSON)\n\
         Output JSON only:\n\
         {{\n  \"result_text\": \"...\",\n  \"stat_changes\": {{ \"health\": -10, \"scheming\": 1 }},\n  \"trigger_ending\": null\n}}",
        title = event.title,
        text = event.text,
        state = state_context(player, world),
    );
    NarrativeRequest {
        system_prompt,
        user_prompt: "Adjudicate and output strict JSON.".to_string(),
        temperature: 0.4,
    }
}

/// Build the character background-story prompt used at creation time.
#[must_use]
pub fn background_story_prompt(player: &PlayerState) -> NarrativeRequest {
    let stats = serde_json::to_string(&player.stats).unwrap_or_default();
    let system_prompt = format!(
        "# Role\n\
         You are the background-story generator of a hard historical survival\n\
         game set in a noble household.\n\n\
         # Character\n\
         Name: {name}\nOrigin: {background}\nStats: {stats}\n\n\
         # Task\n\
         Write a 150-200 word origin story in second person covering three\n\
         beats: the character's birth circumstances, how she entered the\n\
         household as a servant, and how she came to be assigned to the young\n\
         lord. Weave the stat distribution into the history. Keep the tone\n\
         restrained and fatalistic.\n\n\
         # Output\n\
         Output the story text only.",
        name = player.name,
        background = player.background_name,
    );
    NarrativeRequest {
        system_prompt,
        user_prompt: "Generate the background story.".to_string(),
        temperature: 0.8,
    }
}

/// Build the young lord's first reaction to the player's name.
#[must_use]
pub fn name_comment_prompt(player_name: &str) -> NarrativeRequest {
    let system_prompt = format!(
        "# Role\n\
         You are the scene generator of a hard historical survival game set in\n\
         a noble household.\n\n\
         # Context\n\
         The matron has just assigned a chambermaid named \"{player_name}\" to\n\
         the young lord. He hears the name for the first time and knows nothing\n\
         else about her.\n\n\
         # Task\n\
         Write his brief reaction on hearing the name: reserved, well-bred,\n\
         faintly distant. 15-30 words, third person.\n\n\
         # Output\n\
         Output one sentence only, in the form: Hearing the name, he ...",
    );
    NarrativeRequest {
        system_prompt,
        user_prompt: "Generate the reaction.".to_string(),
        temperature: 0.7,
    }
}

/// Build an NPC's interview-style impression of the player.
#[must_use]
pub fn impression_prompt(
    npc_key: &str,
    player: &PlayerState,
    world: &WorldState,
) -> NarrativeRequest {
    let system_prompt = format!(
        "# Role\n\
         You voice the household figure \"{npc_key}\" in a hard historical\n\
         survival game.\n\n\
         # Context\n\
         {state}\n\
         Relationship with the player: {relation:.0}\n\n\
         # Task\n\
         In the NPC's own voice, give a short candid appraisal of the player\n\
         character as things stand: her conduct, her prospects, what the NPC\n\
         privately thinks of her. 60-100 words, first person.\n\n\
         # Output\n\
         Output the appraisal text only.",
        state = state_context(player, world),
        relation = player.relation(npc_key),
    );
    NarrativeRequest {
        system_prompt,
        user_prompt: "Give the appraisal.".to_string(),
        temperature: 0.7,
    }
}

/// Build the end-of-playthrough lifetime review.
#[must_use]
pub fn lifetime_review_prompt(
    player: &PlayerState,
    world: &WorldState,
    ending_text: &str,
) -> NarrativeRequest {
    let system_prompt = format!(
        "# Role\n\
         You are the epilogue narrator of a hard historical survival game.\n\n\
         # Context\n\
         {state}\n\
         Final rank: {rank}\nEnding: {ending_text}\n\n\
         # Task\n\
         Compose a 120-180 word retrospective of the character's life in the\n\
         household, second person, measured and elegiac, closing on the ending\n\
         given above.\n\n\
         # Output\n\
         Output the retrospective text only.",
        state = state_context(player, world),
        rank = player.rank,
    );
    NarrativeRequest {
        system_prompt,
        user_prompt: "Compose the retrospective.".to_string(),
        temperature: 0.8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::ConditionGroup;

    #[test]
    fn extraction_finds_first_top_level_object() {
        let text = "Here you go:\n```json\n{\"result_text\": \"ok\", \"nested\": {\"a\": 1}}\n``` trailing";
        let json = extract_braced(text).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
        assert!(serde_json::from_str::<serde_json::Value>(json).is_ok());
    }

    #[test]
    fn extraction_ignores_braces_inside_strings() {
        let text = r#"{"result_text": "a } in prose", "trigger_ending": null} extra"#;
        let json = extract_braced(text).unwrap();
        let reply = parse_reply(json).unwrap();
        assert_eq!(reply.result_text, "a } in prose");
    }

    #[test]
    fn parse_requires_result_text() {
        assert!(parse_reply("no json here at all").is_err());
        assert!(parse_reply(r#"{"stat_changes": {"health": -1}}"#).is_err());
        assert!(parse_reply(r#"{"result_text": "   "}"#).is_err());
    }

    #[test]
    fn parse_accepts_minimal_reply() {
        let reply = parse_reply(r#"{"result_text": "You bow and withdraw."}"#).unwrap();
        assert!(reply.stat_changes.is_none());
        assert!(reply.trigger_ending.is_none());
    }

    #[test]
    fn parse_reads_deltas_and_trigger() {
        let reply = parse_reply(
            r#"{"result_text": "...", "stat_changes": {"health": -10, "scheming": 1}, "trigger_ending": "be_sold"}"#,
        )
        .unwrap();
        let changes = reply.stat_changes.unwrap();
        assert!((changes.get("health").unwrap() + 10.0).abs() < f64::EPSILON);
        assert_eq!(reply.trigger_ending.as_deref(), Some("be_sold"));
    }

    #[test]
    fn adjudication_prompt_embeds_event_and_state() {
        let event = Event {
            id: "s1_0005".to_string(),
            title: "An Errand Gone Wrong".to_string(),
            text: "The tray slips.".to_string(),
            trigger: ConditionGroup::always(),
            weight: None,
            once: false,
            allow_custom: true,
            options: Vec::new(),
        };
        let player = PlayerState::default();
        let world = WorldState::default();
        let request = adjudication_prompt(&event, &player, &world, "I catch it with my sleeve");
        assert!(request.system_prompt.contains("An Errand Gone Wrong"));
        assert!(request.system_prompt.contains("I catch it with my sleeve"));
        assert!(request.system_prompt.contains("\"turn\": 1"));
        assert!((request.temperature - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn settings_gate_readiness() {
        let mut settings = NarrativeSettings::default();
        assert!(!settings.is_ready());
        settings.enabled = true;
        assert!(!settings.is_ready());
        settings.api_url = "https://example.test/v1/chat/completions".to_string();
        assert!(settings.is_ready());
    }
}
