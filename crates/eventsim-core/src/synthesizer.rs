//! Event Synthesizer
//!
//! Builds random activity records from the reference catalogs and applies
//! the injection policy. One call yields one logical record, emitted once
//! or (when duplication fires) twice.
//!
//! Defect and duplicate draws are independent per record, so over many
//! records the observed rates converge to the policy's probabilities no
//! matter how the records are later batched.

use chrono::{SecondsFormat, Utc};
use rand::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::{CatalogMode, Catalogs};
use crate::event::{
    Event, EventType, INVALID_TIMESTAMP, Properties, PropertyValue, Source, UserRef,
};
use crate::policy::{Defect, InjectionPolicy};

pub const PROP_AMOUNT: &str = "amount";
pub const PROP_PRODUCT_ID: &str = "product_id";
pub const PROP_CONTENT_ID: &str = "content_id";
pub const PROP_MEDIA_TYPE: &str = "media_type";
pub const PROP_PRAYER_TYPE: &str = "prayer_type";

const MIN_AMOUNT: f64 = 5.0;
const MAX_AMOUNT: f64 = 500.0;
const PRODUCT_COUNT: u32 = 100;

/// Property keys an event of `event_type` carries under `mode`
pub fn property_keys(event_type: EventType, mode: CatalogMode) -> &'static [&'static str] {
    match (event_type, mode) {
        (EventType::Purchase, _) => &[PROP_AMOUNT, PROP_PRODUCT_ID],
        (t, CatalogMode::Rich) if t.references_content() => {
            &[PROP_CONTENT_ID, PROP_MEDIA_TYPE, PROP_PRAYER_TYPE]
        }
        (t, CatalogMode::Bare) if t.references_content() => &[PROP_CONTENT_ID],
        _ => &[],
    }
}

/// Random event source backed by shared catalogs
#[derive(Debug, Clone)]
pub struct Synthesizer {
    catalogs: Arc<Catalogs>,
    mode: CatalogMode,
    policy: InjectionPolicy,
}

impl Synthesizer {
    pub fn new(catalogs: Arc<Catalogs>) -> Self {
        Self {
            catalogs,
            mode: CatalogMode::default(),
            policy: InjectionPolicy::default(),
        }
    }

    pub fn with_mode(mut self, mode: CatalogMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_policy(mut self, policy: InjectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn mode(&self) -> CatalogMode {
        self.mode
    }

    pub fn policy(&self) -> &InjectionPolicy {
        &self.policy
    }

    /// One logical record: a single event, or the same event twice.
    pub fn synthesize<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Event> {
        let event = self.synthesize_single(rng);

        if self.policy.roll_duplicate(rng) {
            vec![event.clone(), event]
        } else {
            vec![event]
        }
    }

    /// A record without the duplication roll. Defects still apply.
    pub fn synthesize_single<R: Rng + ?Sized>(&self, rng: &mut R) -> Event {
        let event_type = *EventType::ALL.choose(rng).unwrap_or(&EventType::Click);
        let source = Source::KNOWN.choose(rng).cloned().unwrap_or(Source::Web);

        let user_id = self.catalogs.random_user(rng).map(|user| match self.mode {
            CatalogMode::Rich => UserRef::Record(user.clone()),
            CatalogMode::Bare => UserRef::Id(user.user_id.clone()),
        });

        let mut event = Event {
            event_id: Uuid::new_v4().to_string(),
            user_id,
            event_type,
            source,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            properties: self.properties_for(event_type, rng),
        };

        match self.policy.roll_defect(rng) {
            Some(Defect::InvalidTimestamp) => event.timestamp = INVALID_TIMESTAMP.to_string(),
            Some(Defect::MissingUser) => event.user_id = None,
            None => {}
        }

        event
    }

    /// `count` calls to [`synthesize`](Self::synthesize), concatenated.
    pub fn synthesize_many<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Event> {
        let mut events = Vec::with_capacity(count);
        for _ in 0..count {
            events.extend(self.synthesize(rng));
        }
        events
    }

    fn properties_for<R: Rng + ?Sized>(&self, event_type: EventType, rng: &mut R) -> Properties {
        let mut props = Properties::new();

        if event_type == EventType::Purchase {
            props.insert(
                PROP_AMOUNT.to_string(),
                PropertyValue::from(rng.random_range(MIN_AMOUNT..MAX_AMOUNT)),
            );
            props.insert(
                PROP_PRODUCT_ID.to_string(),
                PropertyValue::from(format!("prod_{}", rng.random_range(1..=PRODUCT_COUNT))),
            );
        }

        if event_type.references_content() {
            if let Some(item) = self.catalogs.random_content(rng) {
                props.insert(
                    PROP_CONTENT_ID.to_string(),
                    PropertyValue::from(item.content_id.as_str()),
                );
                if self.mode == CatalogMode::Rich {
                    props.insert(
                        PROP_MEDIA_TYPE.to_string(),
                        PropertyValue::from(item.media_type.as_str()),
                    );
                    props.insert(
                        PROP_PRAYER_TYPE.to_string(),
                        PropertyValue::from(item.prayer_type.as_str()),
                    );
                }
            }
        }

        props
    }
}
