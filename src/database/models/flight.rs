use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LabeledEnum, TrainingLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "flight_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    Scheduled,
    AtRisk,
    Cancelled,
    Rescheduled,
    Completed,
}

impl FlightStatus {
    /// Statuses from which a flight can still be moved to another slot.
    pub fn can_reschedule(&self) -> bool {
        matches!(
            self,
            FlightStatus::Scheduled | FlightStatus::AtRisk | FlightStatus::Rescheduled
        )
    }
}

impl LabeledEnum for FlightStatus {
    const ALL: &'static [Self] = &[
        FlightStatus::Scheduled,
        FlightStatus::AtRisk,
        FlightStatus::Cancelled,
        FlightStatus::Rescheduled,
        FlightStatus::Completed,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "SCHEDULED",
            FlightStatus::AtRisk => "AT_RISK",
            FlightStatus::Cancelled => "CANCELLED",
            FlightStatus::Rescheduled => "RESCHEDULED",
            FlightStatus::Completed => "COMPLETED",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "Scheduled",
            FlightStatus::AtRisk => "At risk",
            FlightStatus::Cancelled => "Cancelled",
            FlightStatus::Rescheduled => "Rescheduled",
            FlightStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "risk_level", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl LabeledEnum for RiskLevel {
    const ALL: &'static [Self] = &[
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::Extreme,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Extreme => "EXTREME",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::Extreme => "Extreme",
        }
    }
}

/// Airfield or waypoint embedded in a flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icao_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: String,
    pub instructor_id: String,
    pub student_id: String,
    pub scheduled_date: DateTime<Utc>,
    pub training_level: TrainingLevel,
    pub departure_location: Location,
    pub destination_location: Option<Location>,
    pub duration: f64,
    pub notes: Option<String>,
    pub status: FlightStatus,
    pub cancellation_probability: i32,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flight {
    pub fn involves(&self, user_id: &str) -> bool {
        self.student_id == user_id || self.instructor_id == user_id
    }

    /// Whether the weather-alert panel should surface this flight.
    pub fn needs_attention(&self) -> bool {
        self.status == FlightStatus::AtRisk || self.risk_level >= RiskLevel::High
    }
}

/// Row to insert for a new booking. Status and risk start at their defaults.
#[derive(Debug, Clone)]
pub struct NewFlight {
    pub instructor_id: String,
    pub student_id: String,
    pub scheduled_date: DateTime<Utc>,
    pub training_level: TrainingLevel,
    pub departure_location: Location,
    pub destination_location: Option<Location>,
    pub duration: f64,
    pub notes: Option<String>,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightChanges {
    pub scheduled_date: Option<DateTime<Utc>>,
    pub status: Option<FlightStatus>,
    pub cancellation_probability: Option<i32>,
    pub risk_level: Option<RiskLevel>,
}

impl FlightChanges {
    pub fn is_empty(&self) -> bool {
        *self == FlightChanges::default()
    }

    pub fn apply(&self, flight: &mut Flight) {
        if let Some(date) = self.scheduled_date {
            flight.scheduled_date = date;
        }
        if let Some(status) = self.status {
            flight.status = status;
        }
        if let Some(probability) = self.cancellation_probability {
            flight.cancellation_probability = probability;
        }
        if let Some(risk) = self.risk_level {
            flight.risk_level = risk;
        }
    }
}

/// Which flights a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlightScope {
    All,
    Participant(String),
}

impl FlightScope {
    pub fn admits(&self, flight: &Flight) -> bool {
        match self {
            FlightScope::All => true,
            FlightScope::Participant(user_id) => flight.involves(user_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightQuery {
    pub scope: FlightScope,
    pub status: Option<FlightStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl FlightQuery {
    pub fn matches(&self, flight: &Flight) -> bool {
        self.scope.admits(flight)
            && self.status.map_or(true, |status| flight.status == status)
            && self.start_date.map_or(true, |start| flight.scheduled_date >= start)
            && self.end_date.map_or(true, |end| flight.scheduled_date <= end)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightPage {
    pub flights: Vec<Flight>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
