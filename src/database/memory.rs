use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::{
    new_id, Flight, FlightChanges, FlightPage, FlightQuery, FlightScope, FlightStatus,
    InstructorSummary, NewFlight, NewUser, RiskLevel, Role, User,
};
use super::{DatabaseError, Store};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    flights: HashMap<String, Flight>,
}

/// Process-local store for development and tests. Data is lost on exit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_instructors(&self) -> Result<Vec<InstructorSummary>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut instructors: Vec<InstructorSummary> = tables
            .users
            .values()
            .filter(|u| u.role == Role::Instructor)
            .map(|u| InstructorSummary {
                id: u.id.clone(),
                name: u.name.clone(),
                email: u.email.clone(),
            })
            .collect();
        // NULLS LAST, then email, matching the SQL ordering
        instructors.sort_by(|a, b| {
            (a.name.is_none(), &a.name, &a.email).cmp(&(b.name.is_none(), &b.name, &b.email))
        });
        Ok(instructors)
    }

    async fn insert_user_if_absent(&self, user: NewUser) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Ok(false);
        }

        let id = new_id();
        tables.users.insert(
            id.clone(),
            User {
                id,
                name: Some(user.name),
                email: user.email,
                role: user.role,
                training_level: user.training_level,
                password: Some(user.password_hash),
                email_verified: user.email_verified,
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn count_users(&self) -> Result<i64, DatabaseError> {
        Ok(self.tables.read().await.users.len() as i64)
    }

    async fn create_flight(&self, flight: NewFlight) -> Result<Flight, DatabaseError> {
        let mut tables = self.tables.write().await;
        for user_id in [&flight.instructor_id, &flight.student_id] {
            if !tables.users.contains_key(user_id.as_str()) {
                return Err(DatabaseError::QueryError(format!(
                    "flights references unknown user {user_id}"
                )));
            }
        }

        let now = Utc::now();
        let created = Flight {
            id: new_id(),
            instructor_id: flight.instructor_id,
            student_id: flight.student_id,
            scheduled_date: flight.scheduled_date,
            training_level: flight.training_level,
            departure_location: flight.departure_location,
            destination_location: flight.destination_location,
            duration: flight.duration,
            notes: flight.notes,
            status: FlightStatus::Scheduled,
            cancellation_probability: 0,
            risk_level: RiskLevel::Low,
            created_at: now,
            updated_at: now,
        };
        tables.flights.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn find_flight(&self, id: &str) -> Result<Option<Flight>, DatabaseError> {
        Ok(self.tables.read().await.flights.get(id).cloned())
    }

    async fn update_flight(
        &self,
        id: &str,
        changes: &FlightChanges,
    ) -> Result<Option<Flight>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(flight) = tables.flights.get_mut(id) else {
            return Ok(None);
        };
        changes.apply(flight);
        flight.updated_at = Utc::now();
        Ok(Some(flight.clone()))
    }

    async fn list_flights(&self, query: &FlightQuery) -> Result<FlightPage, DatabaseError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&Flight> =
            tables.flights.values().filter(|f| query.matches(f)).collect();
        matching.sort_by(|a, b| (a.scheduled_date, &a.id).cmp(&(b.scheduled_date, &b.id)));

        let total = matching.len() as i64;
        let flights = matching
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok(FlightPage {
            flights,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }

    async fn list_alerts(
        &self,
        scope: &FlightScope,
        after: DateTime<Utc>,
    ) -> Result<Vec<Flight>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut alerts: Vec<Flight> = tables
            .flights
            .values()
            .filter(|f| scope.admits(f) && f.scheduled_date > after)
            .filter(|f| f.needs_attention() && f.status.can_reschedule())
            .cloned()
            .collect();
        alerts.sort_by_key(|f| f.scheduled_date);
        Ok(alerts)
    }

    async fn close(&self) {}
}
