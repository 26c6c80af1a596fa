use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::location::parse_location;
use super::{Fields, Schema, ValidationErrors};
use crate::database::models::{FlightChanges, FlightStatus, Location, RiskLevel, TrainingLevel};

pub const MAX_DURATION_HOURS: f64 = 10.0;
pub const MAX_NOTES_CHARS: usize = 1000;
pub const MAX_REASON_CHARS: usize = 500;
pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const MAX_LIST_LIMIT: i64 = 100;

/// Booking request. There is deliberately no student field: the student is
/// always the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlightInput {
    pub instructor_id: String,
    pub scheduled_date: DateTime<Utc>,
    pub training_level: TrainingLevel,
    pub departure_location: Location,
    pub destination_location: Option<Location>,
    pub duration: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFlightInput {
    pub id: String,
    pub status: Option<FlightStatus>,
    pub cancellation_probability: Option<i32>,
    pub risk_level: Option<RiskLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFlightsInput {
    pub status: Option<FlightStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleFlightInput {
    pub id: String,
    pub scheduled_date: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightIdInput {
    pub id: String,
}

impl UpdateFlightInput {
    pub fn changes(&self) -> FlightChanges {
        FlightChanges {
            scheduled_date: None,
            status: self.status,
            cancellation_probability: self.cancellation_probability,
            risk_level: self.risk_level,
        }
    }
}

fn future_date(fields: &mut Fields<'_>, key: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let date = fields.date(key, true)?;
    if date <= now {
        fields.fail(key, "Flight must be scheduled in the future");
        return None;
    }
    Some(date)
}

fn bounded_text(fields: &mut Fields<'_>, key: &str, max: usize, message: &str) -> Option<String> {
    let text = fields.string(key, false)?;
    if text.chars().count() > max {
        fields.fail(key, message);
    }
    Some(text)
}

impl Schema for CreateFlightInput {
    fn parse(input: &Value, now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut fields = Fields::root(input, &mut errors);

        let instructor_id = fields.identifier("instructorId", true, "Invalid instructor ID");
        let scheduled_date = future_date(&mut fields, "scheduledDate", now);
        let training_level = fields.enumeration::<TrainingLevel>("trainingLevel", true);

        let departure_location = fields
            .nested("departureLocation", true)
            .and_then(|(value, path)| parse_location(value, path, fields.errors()));
        let destination = fields.nested("destinationLocation", false);
        let destination_location =
            destination.map(|(value, path)| parse_location(value, path, fields.errors()));

        let duration = fields.number("duration", true);
        if let Some(hours) = duration {
            if hours <= 0.0 {
                fields.fail("duration", "Duration must be positive");
            } else if hours > MAX_DURATION_HOURS {
                fields.fail("duration", "Duration cannot exceed 10 hours");
            }
        }

        let notes = bounded_text(
            &mut fields,
            "notes",
            MAX_NOTES_CHARS,
            "Notes cannot exceed 1000 characters",
        );

        errors.finish(|| {
            Some(CreateFlightInput {
                instructor_id: instructor_id?,
                scheduled_date: scheduled_date?,
                training_level: training_level?,
                departure_location: departure_location?,
                destination_location: match destination_location {
                    Some(parsed) => Some(parsed?),
                    None => None,
                },
                duration: duration?,
                notes,
            })
        })
    }
}

impl Schema for UpdateFlightInput {
    fn parse(input: &Value, _now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut fields = Fields::root(input, &mut errors);

        let id = fields.identifier("id", true, "Invalid flight ID");
        let status = fields.enumeration::<FlightStatus>("status", false);
        let cancellation_probability = fields.integer("cancellationProbability", false);
        if matches!(cancellation_probability, Some(p) if !(0..=100).contains(&p)) {
            fields.fail(
                "cancellationProbability",
                "Cancellation probability must be between 0 and 100",
            );
        }
        let risk_level = fields.enumeration::<RiskLevel>("riskLevel", false);

        errors.finish(|| {
            Some(UpdateFlightInput {
                id: id?,
                status,
                cancellation_probability: cancellation_probability.map(|p| p as i32),
                risk_level,
            })
        })
    }
}

impl Schema for ListFlightsInput {
    fn parse(input: &Value, _now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        // The whole options object is optional
        let empty = Value::Object(Map::new());
        let input = if input.is_null() { &empty } else { input };

        let mut errors = ValidationErrors::new();
        let mut fields = Fields::root(input, &mut errors);

        let status = fields.enumeration::<FlightStatus>("status", false);
        let start_date = fields.date("startDate", false);
        let end_date = fields.date("endDate", false);

        let limit = fields.integer("limit", false);
        match limit {
            Some(l) if l < 1 => fields.fail("limit", "Number must be greater than or equal to 1"),
            Some(l) if l > MAX_LIST_LIMIT => {
                fields.fail("limit", "Number must be less than or equal to 100")
            }
            _ => {}
        }

        let offset = fields.integer("offset", false);
        if matches!(offset, Some(o) if o < 0) {
            fields.fail("offset", "Number must be greater than or equal to 0");
        }

        errors.finish(|| {
            Some(ListFlightsInput {
                status,
                start_date,
                end_date,
                limit: limit.unwrap_or(DEFAULT_LIST_LIMIT),
                offset: offset.unwrap_or(0),
            })
        })
    }
}

impl Schema for RescheduleFlightInput {
    fn parse(input: &Value, now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut fields = Fields::root(input, &mut errors);

        let id = fields.identifier("id", true, "Invalid flight ID");
        let scheduled_date = future_date(&mut fields, "scheduledDate", now);
        let reason = bounded_text(
            &mut fields,
            "reason",
            MAX_REASON_CHARS,
            "Reason cannot exceed 500 characters",
        );

        errors.finish(|| {
            Some(RescheduleFlightInput {
                id: id?,
                scheduled_date: scheduled_date?,
                reason,
            })
        })
    }
}

impl Schema for FlightIdInput {
    fn parse(input: &Value, _now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut fields = Fields::root(input, &mut errors);
        let id = fields.identifier("id", true, "Invalid flight ID");
        errors.finish(|| Some(FlightIdInput { id: id? }))
    }
}
