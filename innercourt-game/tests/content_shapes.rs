//! Shape tests for the authored content documents.

use innercourt_game::{
    EndKind, EventData, Interlude, PromotionPath, Rank, ShopItem, SpecialAction, StatId,
};

const EVENTS_DOC: &str = r#"{
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
                    "id": "keep_quiet",
                    "text": "Keep your eyes lowered",
                    "reward": {"npc_matron": 2},
                    "resultText": "The matron nods, barely."
                },
                {
                    "id": "speak_up",
                    "text": "Offer a careful greeting",
                    "require": {"stat_scheming": 30},
                    "chance": 0.6,
                    "chanceStat": "scheming",
                    "failCost": {"favor": -2},
                    "failResultText": "Your words come out wrong.",
                    "reward": {"favor": 3}
                }
            ]
        },
        {
            "id": "s1_0050",
            "title": "A Test of Standing",
            "text": "The steward weighs you with a look.",
            "weight": 2,
            "options": [
                {
                    "id": "endure",
                    "text": "Endure the scrutiny",
                    "outcomeStat": "status",
                    "outcomes": [
                        {"min": 60, "resultText": "He defers at once."},
                        {"min": 30, "max": 59, "resultText": "He lets you pass."},
                        {"min": 0, "max": 29, "resultText": "He turns you away.", "cost": {"status": -1}}
                    ]
                }
            ]
        },
        {
            "id": "s2_0300",
            "title": "A Quickening",
            "text": "The physician confirms what you suspected.",
            "once": true,
            "options": [
                {
                    "id": "accept",
                    "text": "Carry the child",
                    "special": "pregnancy",
                    "resultText": "The household will know soon enough."
                }
            ]
        },
        {
            "id": "s2_0400",
            "title": "The End of Patience",
            "text": "The mistress has made her decision.",
            "trigger": {"npc_matron": "< 10", "stat_favor": "< 10"},
            "options": [
                {
                    "id": "submit",
                    "text": "Bow your head",
                    "end": {"type": "sent_away", "text": "A cart waits at the rear gate."}
                }
            ]
        }
    ]
}"#;

#[test]
fn full_event_document_parses_and_validates() {
    let data = EventData::from_json(EVENTS_DOC).expect("document parses");
    data.validate().expect("document validates");
    assert_eq!(data.events.len(), 4);

    let tiered = data.find("s1_0050").unwrap();
    let endure = tiered.option("endure").unwrap();
    assert_eq!(endure.outcome_stat, Some(StatId::Status));
    assert_eq!(endure.outcomes.len(), 3);

    let quickening = data.find("s2_0300").unwrap();
    assert_eq!(
        quickening.option("accept").unwrap().special,
        Some(SpecialAction::Pregnancy)
    );

    let ending = data.find("s2_0400").unwrap();
    let end = ending.option("submit").unwrap().end.as_ref().unwrap();
    assert_eq!(end.kind, EndKind::SentAway);
}

#[test]
fn typo_in_condition_key_refuses_to_load() {
    let doc = r#"{
        "events": [
            {
                "id": "s1_0002",
                "title": "t",
                "text": "t",
                "trigger": {"stat_helath": 10},
                "options": []
            }
        ]
    }"#;
    let err = EventData::from_json(doc).unwrap_err();
    assert!(err.to_string().contains("helath"));
}

#[test]
fn typo_in_chance_stat_refuses_to_load() {
    let doc = r#"{
        "events": [
            {
                "id": "s1_0003",
                "title": "t",
                "text": "t",
                "options": [
                    {"id": "o", "text": "o", "require": {"chanceStat": "luck"}}
                ]
            }
        ]
    }"#;
    assert!(EventData::from_json(doc).is_err());
}

#[test]
fn shop_document_parses() {
    let doc = r#"[
        {
            "id": "tonic",
            "name": "Bitter Tonic",
            "desc": "Restores the body, punishes the tongue.",
            "price": 6,
            "effects": {"health": 8}
        },
        {
            "id": "hairpin",
            "name": "Silver Hairpin",
            "price": 12,
            "effects": {"item_hairpin": 1, "appearance": 1}
        }
    ]"#;
    let items: Vec<ShopItem> = serde_json::from_str(doc).unwrap();
    assert_eq!(items.len(), 2);
    assert!((items[0].effects.get("health").unwrap() - 8.0).abs() < f64::EPSILON);
    assert!(items[1].desc.is_empty());
}

#[test]
fn promotion_document_parses_with_mixed_requirements() {
    let doc = r#"[
        {
            "from": "chambermaid",
            "to": "concubine",
            "stage": 2,
            "rules": [
                {
                    "id": "with_child",
                    "priority": 1,
                    "requires": {
                        "hasChild": true,
                        "npcs": {"matron": 60}
                    }
                },
                {
                    "id": "sheer_standing",
                    "priority": 2,
                    "requires": {
                        "hasChild": false,
                        "stats": {"favor": 80, "status": 50, "scheming": 55}
                    }
                }
            ]
        }
    ]"#;
    let paths: Vec<PromotionPath> = serde_json::from_str(doc).unwrap();
    assert_eq!(paths[0].from, Rank::Chambermaid);
    assert_eq!(paths[0].to, Rank::Concubine);
    assert_eq!(paths[0].rules.len(), 2);
    assert_eq!(paths[0].rules[1].requires.has_child, Some(false));
}

#[test]
fn interlude_document_parses() {
    let doc = r#"[
        {
            "id": "into_stage_two",
            "stage": 2,
            "title": "A New Mistress",
            "text": "The sedan chairs arrive before dawn."
        }
    ]"#;
    let interludes: Vec<Interlude> = serde_json::from_str(doc).unwrap();
    assert_eq!(interludes[0].stage, 2);
}
