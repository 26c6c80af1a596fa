use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{Fields, Schema, ValidationErrors};

/// Email/password pair posted to the credentials sign-in callback
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Schema for Credentials {
    fn parse(input: &Value, _now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut fields = Fields::root(input, &mut errors);

        let email = fields.string("email", true).map(|e| e.trim().to_lowercase());
        if matches!(&email, Some(e) if !e.contains('@')) {
            fields.fail("email", "Invalid email");
        }
        let password = fields.string("password", true);
        if matches!(&password, Some(p) if p.is_empty()) {
            fields.fail("password", "Password is required");
        }

        errors.finish(|| {
            Some(Credentials {
                email: email?,
                password: password?,
            })
        })
    }
}
