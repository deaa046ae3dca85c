//! Builder for validated [`EventContent`] values.

use annals_types::{EntityId, EventContent, EventType};

use crate::error::HistoryError;

/// Builder for constructing validated [`EventContent`] values.
///
/// # Examples
///
/// ```
/// use annals_core::EventBuilder;
/// use annals_types::{EntityId, EventType};
///
/// let settlement = EntityId::new();
/// let content = EventBuilder::new(EventType::MedicalCured)
///     .source("Medical")
///     .cause("Cold")
///     .description("Recovered from a cold")
///     .actor("Jane Doe")
///     .secondary_entity(settlement)
///     .build();
///
/// assert!(content.is_ok());
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct EventBuilder {
    event_type: EventType,
    source: String,
    cause: String,
    description: String,
    actor: String,
    primary_entity: Option<EntityId>,
    secondary_entity: Option<EntityId>,
}

impl EventBuilder {
    /// Start building an event of the given type.
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            source: String::new(),
            cause: String::new(),
            description: String::new(),
            actor: String::new(),
            primary_entity: None,
            secondary_entity: None,
        }
    }

    /// Set the producing subsystem.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the reason the event happened.
    pub fn cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = cause.into();
        self
    }

    /// Set the human-readable summary.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the responsible party.
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Set the first domain object the event concerns.
    pub const fn primary_entity(mut self, entity: EntityId) -> Self {
        self.primary_entity = Some(entity);
        self
    }

    /// Set the second domain object the event concerns.
    pub const fn secondary_entity(mut self, entity: EntityId) -> Self {
        self.secondary_entity = Some(entity);
        self
    }

    /// Build the content.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::MalformedEvent`] if `source`, `description`
    /// or `actor` is blank.
    pub fn build(self) -> Result<EventContent, HistoryError> {
        let content = EventContent {
            event_type: self.event_type,
            source: self.source,
            cause: self.cause,
            description: self.description,
            actor: self.actor,
            primary_entity: self.primary_entity,
            secondary_entity: self.secondary_entity,
        };
        match content.missing_field() {
            Some(field) => Err(HistoryError::MalformedEvent { field }),
            None => Ok(content),
        }
    }
}
