//! Shared type definitions for the Annals historical event manager.
//!
//! Types defined here are used by producers, the manager and observers
//! alike, and flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity and event identifiers
//! - [`enums`] -- Event types and the categories they belong to
//! - [`structs`] -- Event content and accepted event records

pub mod enums;
pub mod ids;
pub mod structs;

pub use enums::{EventCategory, EventType};
pub use ids::{EntityId, EventId};
pub use structs::{EventContent, HistoricalEvent};
