//! Inner Court Game Engine
//!
//! Platform-agnostic core logic for Inner Court, a turn-based narrative
//! life simulation set in a noble household. This crate provides the full
//! progression and resolution engine without UI, storage-medium, or
//! network dependencies; those are collaborators the host implements.

pub mod adjudicate;
pub mod child;
pub mod conditions;
pub mod constants;
pub mod data;
pub mod events;
pub mod logbook;
pub mod numbers;
pub mod outcome;
pub mod persist;
pub mod promotion;
pub mod rng;
pub mod session;
pub mod shop;
pub mod state;
pub mod summary;

#[cfg(feature = "http-client")]
pub mod client;

// Re-export commonly used types
pub use adjudicate::{
    AdjudicationReply, NarrativeClient, NarrativeError, NarrativeRequest, NarrativeSettings,
};
pub use child::{Child, ChildSkills, NurtureContext, PersonalityKind, Sex, TrainingFocus};
pub use conditions::{CmpOp, Comparison, Condition, ConditionGroup, ContentError};
pub use data::{
    EndKind, EndState, Event, EventData, EventOption, Interlude, OutcomeTier, ShopItem,
    SpecialAction,
};
pub use events::{pick_event, pick_event_where};
pub use logbook::{Chronicle, LogEntry, StateDiff, StateSnapshot, diff, snapshot};
pub use outcome::{ResolutionStatus, Resolution, ResolveContext, apply_option};
pub use persist::{Legacy, SaveMeta, SavePayload, SlotId};
pub use promotion::{
    PromotionCheck, PromotionPath, PromotionRule, RuleRequirements, try_promotion,
};
pub use rng::{CountingRng, RngBundle};
pub use session::{
    ContentSet, FreeformOptions, FreeformReport, FreeformStatus, PromotionEvent, Session,
    StageConfig, TurnReport, TurnSignal, freeform_allowed, stage_config,
};
pub use shop::{PurchaseReceipt, ShopError, purchase};
pub use state::{Impression, PlayerState, Rank, StatDelta, StatId, Stats, WorldState};

/// Trait for abstracting static-content loading.
/// Platform-specific implementations should provide this.
pub trait ContentSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the event tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the event data cannot be loaded or parsed.
    fn load_events(&self) -> Result<EventData, Self::Error>;

    /// Load the shop catalogue.
    ///
    /// # Errors
    ///
    /// Returns an error if the shop data cannot be loaded or parsed.
    fn load_shop_items(&self) -> Result<Vec<ShopItem>, Self::Error>;

    /// Load stage interludes.
    ///
    /// # Errors
    ///
    /// Returns an error if the interlude data cannot be loaded or parsed.
    fn load_interludes(&self) -> Result<Vec<Interlude>, Self::Error>;

    /// Load the promotion path tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the promotion data cannot be loaded or parsed.
    fn load_promotions(&self) -> Result<Vec<PromotionPath>, Self::Error>;
}

/// Trait for abstracting save/load operations.
/// Platform-specific implementations should provide this.
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write a payload to a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn write_slot(&self, slot: SlotId, payload: &SavePayload) -> Result<(), Self::Error>;

    /// Read the payload in a slot, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read.
    fn read_slot(&self, slot: SlotId) -> Result<Option<SavePayload>, Self::Error>;

    /// Clear a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be cleared.
    fn clear_slot(&self, slot: SlotId) -> Result<(), Self::Error>;

    /// Write the cross-playthrough legacy record.
    ///
    /// # Errors
    ///
    /// Returns an error if the legacy record cannot be written.
    fn write_legacy(&self, legacy: &Legacy) -> Result<(), Self::Error>;

    /// Read the legacy record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the legacy record cannot be read.
    fn read_legacy(&self) -> Result<Option<Legacy>, Self::Error>;

    /// Clear the legacy record.
    ///
    /// # Errors
    ///
    /// Returns an error if the legacy record cannot be cleared.
    fn clear_legacy(&self) -> Result<(), Self::Error>;
}

/// Main engine binding a content source and a storage backend.
pub struct GameEngine<C, S>
where
    C: ContentSource,
    S: GameStorage,
{
    content_source: C,
    storage: S,
}

impl<C, S> GameEngine<C, S>
where
    C: ContentSource,
    S: GameStorage,
{
    /// Create a new engine with the provided collaborators.
    pub const fn new(content_source: C, storage: S) -> Self {
        Self {
            content_source,
            storage,
        }
    }

    /// Load and validate every content table.
    ///
    /// # Errors
    ///
    /// Returns an error when a table cannot be loaded or fails validation.
    pub fn load_content(&self) -> Result<ContentSet, anyhow::Error>
    where
        C::Error: Into<anyhow::Error>,
    {
        let events = self.content_source.load_events().map_err(Into::into)?;
        events.validate()?;
        Ok(ContentSet {
            events,
            shop_items: self.content_source.load_shop_items().map_err(Into::into)?,
            interludes: self.content_source.load_interludes().map_err(Into::into)?,
            promotions: self.content_source.load_promotions().map_err(Into::into)?,
        })
    }

    /// Start a new playthrough, folding in any stored legacy bonus.
    ///
    /// # Errors
    ///
    /// Returns an error when content loading or legacy reading fails.
    pub fn new_session(&self, seed: u64) -> Result<Session, anyhow::Error>
    where
        C::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let content = self.load_content()?;
        let legacy = self.storage.read_legacy().map_err(Into::into)?;
        Ok(Session::new_with_legacy(seed, content, legacy.as_ref()))
    }

    /// Load a session from a slot, rehydrating it with fresh content.
    ///
    /// # Errors
    ///
    /// Returns an error when the slot or the content cannot be loaded.
    pub fn load_session(&self, slot: SlotId) -> Result<Option<Session>, anyhow::Error>
    where
        C::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(payload) = self.storage.read_slot(slot).map_err(Into::into)? else {
            return Ok(None);
        };
        let content = self.load_content()?;
        Ok(Some(Session::from_payload(payload, content)))
    }

    /// Persist the session into the reserved autosave slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    pub fn autosave(&self, session: &Session, now_ms: u64) -> Result<(), S::Error> {
        self.storage
            .write_slot(SlotId::Auto, &session.to_payload(now_ms))
    }

    /// Persist the session into a manual slot. Writes aimed at the
    /// reserved autosave slot are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    pub fn save_manual(
        &self,
        slot: SlotId,
        session: &Session,
        now_ms: u64,
    ) -> Result<(), S::Error> {
        if slot.is_auto() {
            log::warn!("manual save aimed at the autosave slot; ignoring");
            return Ok(());
        }
        self.storage.write_slot(slot, &session.to_payload(now_ms))
    }

    /// Slot metadata for save pickers.
    ///
    /// # Errors
    ///
    /// Returns an error if a slot cannot be read.
    pub fn slots(&self) -> Result<Vec<(SlotId, Option<SaveMeta>)>, S::Error> {
        SlotId::ALL
            .into_iter()
            .map(|slot| {
                Ok((
                    slot,
                    self.storage.read_slot(slot)?.map(|payload| payload.meta),
                ))
            })
            .collect()
    }

    /// Write the legacy record for a terminally ended session. Does
    /// nothing while the playthrough is still alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the legacy record cannot be written.
    pub fn record_legacy(&self, session: &Session, now_ms: u64) -> Result<(), S::Error> {
        if session.ending().is_none() {
            return Ok(());
        }
        let legacy = Legacy::from_run(session.player(), session.world(), now_ms);
        self.storage.write_legacy(&legacy)
    }

    /// Clear every slot and the legacy record for a full reset.
    ///
    /// # Errors
    ///
    /// Returns an error if a slot cannot be cleared.
    pub fn clear_all(&self) -> Result<(), S::Error> {
        for slot in SlotId::ALL {
            self.storage.clear_slot(slot)?;
        }
        self.storage.clear_legacy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Copy, Default)]
    struct FixtureSource;

    impl ContentSource for FixtureSource {
        type Error = Infallible;

        fn load_events(&self) -> Result<EventData, Self::Error> {
            Ok(EventData::empty())
        }

        fn load_shop_items(&self) -> Result<Vec<ShopItem>, Self::Error> {
            Ok(Vec::new())
        }

        fn load_interludes(&self) -> Result<Vec<Interlude>, Self::Error> {
            Ok(Vec::new())
        }

        fn load_promotions(&self) -> Result<Vec<PromotionPath>, Self::Error> {
            Ok(Vec::new())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStorage {
        slots: Rc<RefCell<HashMap<SlotId, SavePayload>>>,
        legacy: Rc<RefCell<Option<Legacy>>>,
    }

    impl GameStorage for MemoryStorage {
        type Error = Infallible;

        fn write_slot(&self, slot: SlotId, payload: &SavePayload) -> Result<(), Self::Error> {
            self.slots.borrow_mut().insert(slot, payload.clone());
            Ok(())
        }

        fn read_slot(&self, slot: SlotId) -> Result<Option<SavePayload>, Self::Error> {
            Ok(self.slots.borrow().get(&slot).cloned())
        }

        fn clear_slot(&self, slot: SlotId) -> Result<(), Self::Error> {
            self.slots.borrow_mut().remove(&slot);
            Ok(())
        }

        fn write_legacy(&self, legacy: &Legacy) -> Result<(), Self::Error> {
            *self.legacy.borrow_mut() = Some(legacy.clone());
            Ok(())
        }

        fn read_legacy(&self) -> Result<Option<Legacy>, Self::Error> {
            Ok(self.legacy.borrow().clone())
        }

        fn clear_legacy(&self) -> Result<(), Self::Error> {
            *self.legacy.borrow_mut() = None;
            Ok(())
        }
    }

    #[test]
    fn engine_creates_and_roundtrips_sessions() {
        let engine = GameEngine::new(FixtureSource, MemoryStorage::default());
        let mut session = engine.new_session(0xABCD).unwrap();
        session.player_mut().stats.cash = 25.0;
        engine.autosave(&session, 7).unwrap();

        let loaded = engine
            .load_session(SlotId::Auto)
            .unwrap()
            .expect("autosave exists");
        assert!((loaded.player().stats.cash - 25.0).abs() < f64::EPSILON);
        assert_eq!(loaded.world().seed, 0xABCD);
        assert!(engine.load_session(SlotId::Slot2).unwrap().is_none());
    }

    #[test]
    fn manual_saves_cannot_clobber_the_autosave() {
        let engine = GameEngine::new(FixtureSource, MemoryStorage::default());
        let session = engine.new_session(1).unwrap();
        engine.save_manual(SlotId::Auto, &session, 0).unwrap();
        assert!(engine.load_session(SlotId::Auto).unwrap().is_none());
        engine.save_manual(SlotId::Slot1, &session, 0).unwrap();
        assert!(engine.load_session(SlotId::Slot1).unwrap().is_some());
    }

    #[test]
    fn terminal_endings_feed_the_next_playthrough() {
        let engine = GameEngine::new(FixtureSource, MemoryStorage::default());
        let mut session = engine.new_session(2).unwrap();
        // No legacy yet: record_legacy is a no-op for a live session.
        engine.record_legacy(&session, 0).unwrap();
        assert!(engine.storage.read_legacy().unwrap().is_none());

        session.world_mut().turn = 61;
        session.world_mut().stage = 2;
        session.world_mut().max_turn = 60;
        let signal = session.tick();
        assert!(matches!(signal, TurnSignal::Ending(_)));
        engine.record_legacy(&session, 0).unwrap();

        let next = engine.new_session(3).unwrap();
        assert!(next.player().stats.scheming >= Stats::default().scheming);
    }

    #[test]
    fn clear_all_wipes_slots_and_legacy() {
        let engine = GameEngine::new(FixtureSource, MemoryStorage::default());
        let session = engine.new_session(4).unwrap();
        engine.autosave(&session, 0).unwrap();
        engine
            .storage
            .write_legacy(&Legacy::from_run(session.player(), session.world(), 0))
            .unwrap();
        engine.clear_all().unwrap();
        assert!(engine.load_session(SlotId::Auto).unwrap().is_none());
        assert!(engine.storage.read_legacy().unwrap().is_none());
    }

    #[test]
    fn slot_listing_exposes_metadata() {
        let engine = GameEngine::new(FixtureSource, MemoryStorage::default());
        let session = engine.new_session(5).unwrap();
        engine.autosave(&session, 42).unwrap();
        let slots = engine.slots().unwrap();
        assert_eq!(slots.len(), SlotId::ALL.len());
        let auto = slots.iter().find(|(slot, _)| slot.is_auto()).unwrap();
        assert_eq!(auto.1.as_ref().map(|meta| meta.saved_at_ms), Some(42));
    }
}
