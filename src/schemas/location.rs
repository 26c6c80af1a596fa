use serde_json::Value;

use super::{Fields, ValidationErrors};
use crate::database::models::Location;

/// Validate a location object found at `path`, recording problems into `errors`
pub(crate) fn parse_location(
    input: &Value,
    path: String,
    errors: &mut ValidationErrors,
) -> Option<Location> {
    let mut fields = Fields::at(input, path, errors);

    let name = fields.string("name", true);
    if matches!(&name, Some(n) if n.trim().is_empty()) {
        fields.fail("name", "Location name is required");
    }

    let latitude = fields.number("latitude", true);
    if matches!(latitude, Some(lat) if !(-90.0..=90.0).contains(&lat)) {
        fields.fail("latitude", "Latitude must be between -90 and 90");
    }

    let longitude = fields.number("longitude", true);
    if matches!(longitude, Some(lon) if !(-180.0..=180.0).contains(&lon)) {
        fields.fail("longitude", "Longitude must be between -180 and 180");
    }

    let icao_code = fields.string("icaoCode", false);

    Some(Location {
        name: name?,
        latitude: latitude?,
        longitude: longitude?,
        icao_code,
    })
}

impl super::Schema for Location {
    fn parse(
        input: &Value,
        _now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let location = parse_location(input, String::new(), &mut errors);
        errors.finish(|| location)
    }
}

#[cfg(test)]
mod tests {
    use super::super::Schema;
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn parse(input: Value) -> Result<Location, ValidationErrors> {
        Location::parse(&input, Utc::now())
    }

    #[test]
    fn accepts_valid_location() {
        let location = parse(json!({"name": "KPAO", "latitude": 37.46, "longitude": -122.11})).unwrap();
        assert_eq!(location.name, "KPAO");
        assert!(location.icao_code.is_none());
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(parse(json!({"name": "Pole", "latitude": 90, "longitude": 180})).is_ok());
        assert!(parse(json!({"name": "Pole", "latitude": -90, "longitude": -180})).is_ok());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        for (lat, lon) in [(90.01, 0.0), (-90.5, 0.0), (0.0, 180.1), (0.0, -181.0)] {
            let err = parse(json!({"name": "X", "latitude": lat, "longitude": lon})).unwrap_err();
            assert!(
                !err.messages("latitude").is_empty() || !err.messages("longitude").is_empty(),
                "({lat}, {lon}) should fail"
            );
        }
    }

    #[test]
    fn reports_every_problem() {
        let err = parse(json!({"name": "  ", "latitude": 120, "longitude": "west"})).unwrap_err();
        assert_eq!(err.messages("name"), ["Location name is required"]);
        assert_eq!(err.messages("latitude"), ["Latitude must be between -90 and 90"]);
        assert_eq!(err.messages("longitude"), ["Expected number, received string"]);
    }

    #[test]
    fn non_object_is_rejected() {
        let err = parse(json!("KPAO")).unwrap_err();
        assert_eq!(err.messages(""), ["Expected object, received string"]);
    }
}
