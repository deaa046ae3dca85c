//! Historical event records.
//!
//! An event is split in two: [`EventContent`] is everything a producer
//! supplies and is what deduplication compares, while [`HistoricalEvent`]
//! wraps the content with the ordering and identity stamped on acceptance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EventCategory, EventType};
use crate::ids::{EntityId, EventId};

// ---------------------------------------------------------------------------
// Event content
// ---------------------------------------------------------------------------

/// The business content of an event, as supplied by its producer.
///
/// Two contents are the same occurrence when every field is equal; the
/// derived [`PartialEq`] is exactly the deduplication equality.
///
/// `source`, `description` and `actor` are required and must contain
/// non-whitespace text; a blank one is refused as
/// `MalformedEvent { field }` naming that field. `cause` may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventContent {
    /// The kind of event.
    pub event_type: EventType,
    /// Subsystem or module that produced the event.
    pub source: String,
    /// Why the event happened.
    pub cause: String,
    /// Human-readable summary.
    pub description: String,
    /// The person, task or process responsible.
    pub actor: String,
    /// First domain object the event concerns, if any.
    pub primary_entity: Option<EntityId>,
    /// Second domain object the event concerns, if any.
    pub secondary_entity: Option<EntityId>,
}

impl EventContent {
    /// The category of this content's event type.
    pub const fn category(&self) -> EventCategory {
        self.event_type.category()
    }

    /// Name of the first required text field that is blank, if any.
    ///
    /// `source`, `description` and `actor` must contain non-whitespace text.
    /// `cause` may be empty.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("source", &self.source),
            ("description", &self.description),
            ("actor", &self.actor),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

// ---------------------------------------------------------------------------
// Historical event
// ---------------------------------------------------------------------------

/// An accepted, immutable entry of the event history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HistoricalEvent {
    /// Unique event identifier.
    pub id: EventId,
    /// Strictly increasing ordering value assigned at registration.
    pub sequence: u64,
    /// Simulation tick reported by the sequence source at registration.
    pub tick: u64,
    /// Real-world timestamp when the event was accepted.
    pub created_at: DateTime<Utc>,
    /// What happened.
    pub content: EventContent,
}

impl HistoricalEvent {
    /// The kind of event.
    pub const fn event_type(&self) -> EventType {
        self.content.event_type
    }

    /// The category of the event type.
    pub const fn category(&self) -> EventCategory {
        self.content.event_type.category()
    }

    /// Human-readable summary.
    pub fn description(&self) -> &str {
        &self.content.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(description: &str) -> EventContent {
        EventContent {
            event_type: EventType::MedicalCured,
            source: "Medical".to_owned(),
            cause: "Cold".to_owned(),
            description: description.to_owned(),
            actor: "Jane Doe".to_owned(),
            primary_entity: None,
            secondary_entity: None,
        }
    }

    #[test]
    fn equality_covers_entities() {
        let settlement = EntityId::new();
        let mut a = content("Recovered");
        let mut b = content("Recovered");
        assert_eq!(a, b);

        a.primary_entity = Some(settlement);
        assert_ne!(a, b);
        b.primary_entity = Some(settlement);
        assert_eq!(a, b);
    }

    #[test]
    fn blank_required_fields_are_reported() {
        assert_eq!(content("Recovered").missing_field(), None);
        assert_eq!(content("   ").missing_field(), Some("description"));

        let mut no_source = content("Recovered");
        no_source.source = String::new();
        assert_eq!(no_source.missing_field(), Some("source"));

        let mut no_actor = content("Recovered");
        no_actor.actor = " ".to_owned();
        assert_eq!(no_actor.missing_field(), Some("actor"));
    }

    #[test]
    fn record_accessors_read_content() {
        let event = HistoricalEvent {
            id: EventId::new(),
            sequence: 1,
            tick: 0,
            created_at: Utc::now(),
            content: content("Recovered"),
        };
        assert_eq!(event.description(), "Recovered");
        assert_eq!(event.event_type(), EventType::MedicalCured);
        assert_eq!(event.category(), EventCategory::Medical);
    }

    #[test]
    fn empty_cause_is_allowed() {
        let mut c = content("Recovered");
        c.cause = String::new();
        assert_eq!(c.missing_field(), None);
    }
}
