pub mod flight;
pub mod user;

pub use flight::{
    Flight, FlightChanges, FlightPage, FlightQuery, FlightScope, FlightStatus, Location, NewFlight,
    RiskLevel,
};
pub use user::{InstructorSummary, NewUser, Role, TrainingLevel, User};

/// Enumerations with a fixed wire spelling and a human label.
pub trait LabeledEnum: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn label(&self) -> &'static str;

    fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|variant| variant.as_str() == value)
    }
}

/// Opaque collision-resistant record identifier.
pub fn new_id() -> String {
    format!("c{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_spelling() {
        assert_eq!(FlightStatus::parse("AT_RISK"), Some(FlightStatus::AtRisk));
        assert_eq!(Role::parse("INSTRUCTOR"), Some(Role::Instructor));
        assert_eq!(RiskLevel::parse("extreme"), None);
    }

    #[test]
    fn serde_matches_as_str() {
        for status in FlightStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::String(status.as_str().to_string()));
        }
        for level in TrainingLevel::ALL {
            let json = serde_json::to_value(level).unwrap();
            assert_eq!(json, serde_json::Value::String(level.as_str().to_string()));
        }
    }

    #[test]
    fn generated_ids_are_distinct_and_prefixed() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert!(a.starts_with('c'));
        assert_eq!(a.len(), 33);
    }
}
