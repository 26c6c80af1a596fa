use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::LabeledEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl LabeledEnum for Role {
    const ALL: &'static [Self] = &[Role::Student, Role::Instructor, Role::Admin];

    fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Instructor => "INSTRUCTOR",
            Role::Admin => "ADMIN",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Instructor => "Instructor",
            Role::Admin => "Admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "training_level", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainingLevel {
    Student,
    Private,
    Instrument,
    Commercial,
}

impl LabeledEnum for TrainingLevel {
    const ALL: &'static [Self] = &[
        TrainingLevel::Student,
        TrainingLevel::Private,
        TrainingLevel::Instrument,
        TrainingLevel::Commercial,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            TrainingLevel::Student => "STUDENT",
            TrainingLevel::Private => "PRIVATE",
            TrainingLevel::Instrument => "INSTRUMENT",
            TrainingLevel::Commercial => "COMMERCIAL",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TrainingLevel::Student => "Student Pilot",
            TrainingLevel::Private => "Private Pilot",
            TrainingLevel::Instrument => "Instrument Rated",
            TrainingLevel::Commercial => "Commercial Pilot",
        }
    }
}

/// A SkyShift account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub training_level: TrainingLevel,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// Account to insert when its email is not registered yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub training_level: TrainingLevel,
    pub password_hash: String,
    pub email_verified: Option<DateTime<Utc>>,
}

/// Projection used by the instructor picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InstructorSummary {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
}
