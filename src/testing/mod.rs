use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::auth::{Session, SessionUser};
use crate::database::models::{Flight, Location, NewFlight, NewUser, Role, TrainingLevel, User};
use crate::database::{MemoryStore, SharedStore, Store};
use crate::rpc::{Context, SessionState};

/// In-memory store populated with one user per role plus a second student
pub struct TestContext {
    pub store: SharedStore,
    pub student: User,
    pub other_student: User,
    pub instructor: User,
    pub admin: User,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let store: SharedStore = Arc::new(MemoryStore::new());

        let student = Self::insert(&store, "student@test.dev", Role::Student).await?;
        let other_student = Self::insert(&store, "other@test.dev", Role::Student).await?;
        let instructor = Self::insert(&store, "instructor@test.dev", Role::Instructor).await?;
        let admin = Self::insert(&store, "admin@test.dev", Role::Admin).await?;

        Ok(Self {
            store,
            student,
            other_student,
            instructor,
            admin,
        })
    }

    async fn insert(store: &SharedStore, email: &str, role: Role) -> anyhow::Result<User> {
        store
            .insert_user_if_absent(NewUser {
                name: format!("{:?} User", role),
                email: email.to_string(),
                role,
                training_level: TrainingLevel::Private,
                password_hash: "unused".to_string(),
                email_verified: None,
            })
            .await?;
        store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user {} missing after insert", email))
    }

    pub fn session(user: &User) -> Session {
        Session {
            user: SessionUser::from(user),
            expires: Utc::now() + Duration::hours(1),
        }
    }

    pub fn context_for(&self, user: &User) -> Context {
        Context::new(
            self.store.clone(),
            SessionState::Authenticated(Self::session(user)),
        )
    }

    pub fn anonymous(&self) -> Context {
        Context::new(self.store.clone(), SessionState::Anonymous)
    }

    /// Insert a flight directly, `hours_ahead` from now
    pub async fn book(&self, student: &User, hours_ahead: i64) -> anyhow::Result<Flight> {
        let flight = self
            .store
            .create_flight(NewFlight {
                instructor_id: self.instructor.id.clone(),
                student_id: student.id.clone(),
                scheduled_date: Utc::now() + Duration::hours(hours_ahead),
                training_level: TrainingLevel::Student,
                departure_location: location(),
                destination_location: None,
                duration: 1.5,
                notes: None,
            })
            .await?;
        Ok(flight)
    }

    /// A valid `flight.create` input taught by the fixture instructor
    pub fn create_input(&self) -> Value {
        json!({
            "instructorId": self.instructor.id,
            "scheduledDate": (Utc::now() + Duration::days(2)).to_rfc3339(),
            "trainingLevel": "PRIVATE",
            "departureLocation": {"name": "Palo Alto", "latitude": 37.46, "longitude": -122.11, "icaoCode": "KPAO"},
            "duration": 2
        })
    }
}

pub fn location() -> Location {
    Location {
        name: "Palo Alto".to_string(),
        latitude: 37.46,
        longitude: -122.11,
        icao_code: Some("KPAO".to_string()),
    }
}
