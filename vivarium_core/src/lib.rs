#![forbid(unsafe_code)]

//! Core domain model and welfare computations for the Vivarium system.
//!
//! This crate provides:
//! - Domain types (subjects, weighings, administrations, restriction periods)
//! - The per-subject event store and its invariants
//! - Reference-weight resolution and growth-curve lookup
//! - Weight status classification and daily water balance
//! - The day-by-day welfare ledger
//! - Record loading, the event journal and CSV rollup

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod store;
pub mod restriction;
pub mod reference;
pub mod growth;
pub mod classify;
pub mod balance;
pub mod ledger;
pub mod journal;
pub mod records;
pub mod rollup;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, LabConfig};
pub use store::EventStore;
pub use growth::{default_table, GrowthPoint, GrowthTable};
pub use journal::{EventSink, JournalEvent, JsonlSink};
pub use records::load_subject;
pub use balance::SessionFilter;
