//! # eventsim-core - Synthetic Event Generation Engine
//!
//! Pseudo-random user-activity records with controlled data-quality defects,
//! plus a start/stop delivery loop that pushes them to a webhook.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       eventsim-core                          │
//! │                                                              │
//! │   ┌────────────┐      ┌─────────────┐      ┌─────────────┐   │
//! │   │  Catalogs  │─────►│ Synthesizer │◄─────│  Injection  │   │
//! │   │ users      │      │ 1-2 events  │      │  Policy     │   │
//! │   │ content    │      │ per call    │      │ 5% / 3%     │   │
//! │   └────────────┘      └──────┬──────┘      └─────────────┘   │
//! │                              │                               │
//! │               ┌──────────────┴───────────────┐               │
//! │               ▼                              ▼               │
//! │     ┌──────────────────┐           ┌──────────────────┐      │
//! │     │    Delivery      │           │   pull handlers  │      │
//! │     │   Controller     │           │ (eventsim-server)│      │
//! │     │ start/stop loop  │           └──────────────────┘      │
//! │     └────────┬─────────┘                                     │
//! │              ▼                                               │
//! │        EventSink (WebhookSink: POST {"events": [...]})       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eventsim_core::{CatalogConfig, Catalogs, Synthesizer};
//! use std::sync::Arc;
//!
//! let mut rng = rand::rng();
//! let catalogs = Arc::new(Catalogs::generate(&CatalogConfig::default(), &mut rng));
//! let synthesizer = Synthesizer::new(catalogs);
//!
//! // One call yields one record, or the same record twice
//! let events = synthesizer.synthesize(&mut rng);
//! assert!((1..=2).contains(&events.len()));
//! ```

// Wire types
pub mod event;

// Reference data
pub mod catalog;

// Probabilities for defects, duplicates and request faults
pub mod policy;

// Record synthesis
pub mod synthesizer;

// Background push loop
pub mod delivery;

pub mod error;

pub use catalog::{
    CatalogConfig, CatalogMode, Catalogs, Content, Country, MediaType, PrayerType, User,
    UserPage, UserStatus,
};
pub use delivery::{
    DeliveryConfig, DeliveryController, DeliveryStats, EventSink, StatsSnapshot, WebhookSink,
};
pub use error::{DeliveryError, Result};
pub use event::{Event, EventBatch, EventType, PropertyValue, Source, UserRef};
pub use policy::{Defect, Fault, FaultPolicy, InjectionPolicy};
pub use synthesizer::Synthesizer;
