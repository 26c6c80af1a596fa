//! Input schemas for RPC procedures and form posts.
//!
//! Every schema reads an untyped JSON value and either yields a typed value
//! or a [`ValidationErrors`] naming each violated field. Parsing never stops
//! at the first problem.

pub mod credentials;
pub mod flight;
pub mod location;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::database::models::LabeledEnum;

pub use credentials::Credentials;
pub use flight::{CreateFlightInput, FlightIdInput, ListFlightsInput, RescheduleFlightInput, UpdateFlightInput};

static CUID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^c[^\s-]{8,}$").expect("valid regex"));

/// Field path → messages, ordered by path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(path.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    pub fn messages(&self, path: &str) -> &[String] {
        self.fields.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    /// Finish a parse: the value if nothing was recorded, otherwise the errors
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
        if !self.is_empty() {
            return Err(self);
        }
        match build() {
            Some(value) => Ok(value),
            None => {
                let mut errors = self;
                errors.add("", "Invalid input");
                Err(errors)
            }
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .flat_map(|(path, messages)| {
                messages.iter().map(move |m| {
                    if path.is_empty() {
                        m.clone()
                    } else {
                        format!("{path}: {m}")
                    }
                })
            })
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// A typed procedure input
pub trait Schema: Sized {
    /// `now` is the validation-time clock used by date rules
    fn parse(input: &Value, now: DateTime<Utc>) -> Result<Self, ValidationErrors>;
}

/// Procedures without input accept anything, including a missing body
impl Schema for () {
    fn parse(_input: &Value, _now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Cursor over one JSON object that records problems under a path prefix
pub(crate) struct Fields<'a> {
    object: Option<&'a Map<String, Value>>,
    prefix: String,
    errors: &'a mut ValidationErrors,
}

impl<'a> Fields<'a> {
    pub(crate) fn root(input: &'a Value, errors: &'a mut ValidationErrors) -> Self {
        Self::at(input, String::new(), errors)
    }

    pub(crate) fn at(input: &'a Value, prefix: String, errors: &'a mut ValidationErrors) -> Self {
        let object = match input {
            Value::Object(map) => Some(map),
            other => {
                errors.add(
                    prefix.clone(),
                    format!("Expected object, received {}", type_name(other)),
                );
                None
            }
        };
        Self { object, prefix, errors }
    }

    pub(crate) fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }

    pub(crate) fn errors(&mut self) -> &mut ValidationErrors {
        self.errors
    }

    pub(crate) fn fail(&mut self, key: &str, message: impl Into<String>) {
        let path = self.path(key);
        self.errors.add(path, message);
    }

    /// Present and non-null value for `key`
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.object?.get(key).filter(|v| !v.is_null())
    }

    fn missing(&mut self, key: &str, required: bool) -> Option<&'a Value> {
        match self.get(key) {
            Some(value) => Some(value),
            None => {
                // The object itself was already reported when absent
                if required && self.object.is_some() {
                    self.fail(key, "Required");
                }
                None
            }
        }
    }

    pub(crate) fn nested(&mut self, key: &str, required: bool) -> Option<(&'a Value, String)> {
        let value = self.missing(key, required)?;
        Some((value, self.path(key)))
    }

    pub(crate) fn string(&mut self, key: &str, required: bool) -> Option<String> {
        match self.missing(key, required)? {
            Value::String(s) => Some(s.clone()),
            other => {
                self.fail(key, format!("Expected string, received {}", type_name(other)));
                None
            }
        }
    }

    pub(crate) fn number(&mut self, key: &str, required: bool) -> Option<f64> {
        match self.missing(key, required)? {
            Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).or_else(|| {
                self.fail(key, "Expected finite number");
                None
            }),
            other => {
                self.fail(key, format!("Expected number, received {}", type_name(other)));
                None
            }
        }
    }

    pub(crate) fn integer(&mut self, key: &str, required: bool) -> Option<i64> {
        let number = self.number(key, required)?;
        if number.fract() != 0.0 {
            self.fail(key, "Expected integer, received float");
            return None;
        }
        Some(number as i64)
    }

    pub(crate) fn identifier(&mut self, key: &str, required: bool, message: &str) -> Option<String> {
        let id = self.string(key, required)?;
        if !is_identifier(&id) {
            self.fail(key, message);
            return None;
        }
        Some(id)
    }

    pub(crate) fn enumeration<T: LabeledEnum>(&mut self, key: &str, required: bool) -> Option<T> {
        let raw = self.string(key, required)?;
        T::parse(&raw).or_else(|| {
            let expected: Vec<String> =
                T::ALL.iter().map(|v| format!("'{}'", v.as_str())).collect();
            self.fail(
                key,
                format!(
                    "Invalid enum value. Expected {}, received '{}'",
                    expected.join(" | "),
                    raw
                ),
            );
            None
        })
    }

    /// Coerces strings and epoch milliseconds to a timestamp
    pub(crate) fn date(&mut self, key: &str, required: bool) -> Option<DateTime<Utc>> {
        let value = self.missing(key, required)?;
        coerce_date(value).or_else(|| {
            self.fail(key, "Invalid date");
            None
        })
    }
}

pub fn is_identifier(value: &str) -> bool {
    CUID.is_match(value)
}

/// Accepts RFC 3339, `datetime-local` form values (read as UTC), plain dates
/// and epoch milliseconds
pub fn coerce_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_f64().filter(|f| f.is_finite())?;
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(Utc.from_utc_datetime(&naive));
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifiers_follow_cuid_shape() {
        assert!(is_identifier("ckz1a2b3c4d5e6"));
        assert!(is_identifier(&crate::database::models::new_id()));
        assert!(!is_identifier("c123"));
        assert!(!is_identifier("xkz1a2b3c4d5e6"));
        assert!(!is_identifier("ckz1a2b3-c4d5e6"));
    }

    #[test]
    fn coerces_common_date_shapes() {
        let expected = Utc.with_ymd_and_hms(2030, 5, 1, 14, 30, 0).unwrap();
        assert_eq!(coerce_date(&json!("2030-05-01T14:30:00Z")), Some(expected));
        assert_eq!(coerce_date(&json!("2030-05-01T16:30:00+02:00")), Some(expected));
        assert_eq!(coerce_date(&json!("2030-05-01T14:30")), Some(expected));
        assert_eq!(coerce_date(&json!(expected.timestamp_millis())), Some(expected));
        assert!(coerce_date(&json!("next tuesday")).is_none());
        assert!(coerce_date(&json!(true)).is_none());
    }

    #[test]
    fn display_lists_every_field() {
        let mut errors = ValidationErrors::new();
        errors.add("duration", "Duration cannot exceed 10 hours");
        errors.add("notes", "Too long");
        let text = errors.to_string();
        assert!(text.contains("duration: Duration cannot exceed 10 hours"));
        assert!(text.contains("notes: Too long"));
    }
}
