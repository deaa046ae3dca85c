//! Enumeration types for historical events.
//!
//! [`EventType`] is the closed set of event kinds producers may record.
//! Every type belongs to exactly one [`EventCategory`], which is what
//! notification panels and statistics group by.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Event category
// ---------------------------------------------------------------------------

/// Broad grouping of event types, used for filtering and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Illness, injury, death and rescue of people.
    Medical,
    /// Equipment and building malfunctions.
    Malfunction,
    /// Mission lifecycle and mission emergencies.
    Mission,
    /// Completion of individual tasks.
    Task,
    /// Resupply and transport items.
    Transport,
    /// Environmental hazards.
    Hazard,
}

impl EventCategory {
    /// All categories in display order.
    pub const ALL: [Self; 6] = [
        Self::Medical,
        Self::Malfunction,
        Self::Mission,
        Self::Task,
        Self::Transport,
        Self::Hazard,
    ];

    /// Human-readable category name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Medical => "Medical",
            Self::Malfunction => "Malfunction",
            Self::Mission => "Mission",
            Self::Task => "Task",
            Self::Transport => "Transport",
            Self::Hazard => "Hazard",
        }
    }
}

impl core::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Event type
// ---------------------------------------------------------------------------

/// The kind of a historical event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // --- Medical ---
    /// A person fell ill or was injured.
    MedicalStarts,
    /// A person was cured of a health problem.
    MedicalCured,
    /// A person received treatment.
    MedicalTreated,
    /// A person died.
    MedicalDeath,
    /// A person was brought back to safety.
    MedicalRescue,
    /// A person was resuscitated.
    MedicalResuscitated,

    // --- Malfunction ---
    /// A malfunction caused by a natural event.
    MalfunctionActOfGod,
    /// A malfunction caused by a person.
    MalfunctionHumanFactors,
    /// A malfunction caused by faulty software.
    MalfunctionProgrammingError,
    /// A malfunction caused by worn or failed parts.
    MalfunctionPartsFailure,
    /// A malfunction was repaired.
    MalfunctionFixed,

    // --- Mission ---
    /// A mission started.
    MissionStart,
    /// A member joined a mission.
    MissionJoining,
    /// A mission finished.
    MissionFinish,
    /// A mission switched to an emergency destination.
    MissionEmergencyDestination,
    /// A mission turned its emergency beacon on.
    MissionEmergencyBeaconOn,
    /// A mission has a medical emergency.
    MissionMedicalEmergency,
    /// A mission ran short on resources.
    MissionNotEnoughResources,
    /// A rescue vehicle reached its target.
    MissionRendezvous,
    /// A stranded vehicle was salvaged.
    MissionSalvageVehicle,
    /// A person was rescued by a mission.
    MissionRescuePerson,

    // --- Task ---
    /// A task was completed.
    TaskFinish,

    // --- Transport ---
    /// A transport item was scheduled.
    TransportItemCreated,
    /// A transport item was launched.
    TransportItemLaunched,
    /// A transport item arrived.
    TransportItemArrived,
    /// A transport item was modified.
    TransportItemModified,
    /// A transport item was cancelled.
    TransportItemCancelled,

    // --- Hazard ---
    /// A natural disaster.
    HazardActsOfGod,
    /// A meteorite struck.
    HazardMeteoriteImpact,
    /// People were exposed to radiation.
    HazardRadiationExposure,
}

impl EventType {
    /// The category this event type belongs to.
    pub const fn category(self) -> EventCategory {
        match self {
            Self::MedicalStarts
            | Self::MedicalCured
            | Self::MedicalTreated
            | Self::MedicalDeath
            | Self::MedicalRescue
            | Self::MedicalResuscitated => EventCategory::Medical,
            Self::MalfunctionActOfGod
            | Self::MalfunctionHumanFactors
            | Self::MalfunctionProgrammingError
            | Self::MalfunctionPartsFailure
            | Self::MalfunctionFixed => EventCategory::Malfunction,
            Self::MissionStart
            | Self::MissionJoining
            | Self::MissionFinish
            | Self::MissionEmergencyDestination
            | Self::MissionEmergencyBeaconOn
            | Self::MissionMedicalEmergency
            | Self::MissionNotEnoughResources
            | Self::MissionRendezvous
            | Self::MissionSalvageVehicle
            | Self::MissionRescuePerson => EventCategory::Mission,
            Self::TaskFinish => EventCategory::Task,
            Self::TransportItemCreated
            | Self::TransportItemLaunched
            | Self::TransportItemArrived
            | Self::TransportItemModified
            | Self::TransportItemCancelled => EventCategory::Transport,
            Self::HazardActsOfGod | Self::HazardMeteoriteImpact | Self::HazardRadiationExposure => {
                EventCategory::Hazard
            }
        }
    }

    /// Human-readable name shown in notification panels.
    pub const fn name(self) -> &'static str {
        match self {
            Self::MedicalStarts => "Illness/Injury Starts",
            Self::MedicalCured => "Cured",
            Self::MedicalTreated => "Treated",
            Self::MedicalDeath => "Death",
            Self::MedicalRescue => "Rescued",
            Self::MedicalResuscitated => "Resuscitated",
            Self::MalfunctionActOfGod => "Act of God",
            Self::MalfunctionHumanFactors => "Human Factors",
            Self::MalfunctionProgrammingError => "Programming Error",
            Self::MalfunctionPartsFailure => "Parts Failure",
            Self::MalfunctionFixed => "Fixed",
            Self::MissionStart => "Mission Started",
            Self::MissionJoining => "Mission Joined",
            Self::MissionFinish => "Mission Finished",
            Self::MissionEmergencyDestination => "Emergency Destination",
            Self::MissionEmergencyBeaconOn => "Emergency Beacon On",
            Self::MissionMedicalEmergency => "Medical Emergency",
            Self::MissionNotEnoughResources => "Not Enough Resources",
            Self::MissionRendezvous => "Rendezvous",
            Self::MissionSalvageVehicle => "Vehicle Salvaged",
            Self::MissionRescuePerson => "Person Rescued",
            Self::TaskFinish => "Task Finished",
            Self::TransportItemCreated => "Transport Item Created",
            Self::TransportItemLaunched => "Transport Item Launched",
            Self::TransportItemArrived => "Transport Item Arrived",
            Self::TransportItemModified => "Transport Item Modified",
            Self::TransportItemCancelled => "Transport Item Cancelled",
            Self::HazardActsOfGod => "Acts of God",
            Self::HazardMeteoriteImpact => "Meteorite Impact",
            Self::HazardRadiationExposure => "Radiation Exposure",
        }
    }
}

impl core::fmt::Display for EventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
