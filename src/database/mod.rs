pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use models::{
    Flight, FlightChanges, FlightPage, FlightQuery, FlightScope, InstructorSummary, NewFlight,
    NewUser, User,
};

/// Data-store handle shared by the request context, pages and the seed command.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip proving the backend is reachable
    async fn health_check(&self) -> Result<(), DatabaseError>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Users with role INSTRUCTOR, ordered by name
    async fn list_instructors(&self) -> Result<Vec<InstructorSummary>, DatabaseError>;

    /// Insert keyed on the unique email. Existing rows are left untouched;
    /// returns whether a row was inserted.
    async fn insert_user_if_absent(&self, user: NewUser) -> Result<bool, DatabaseError>;

    async fn count_users(&self) -> Result<i64, DatabaseError>;

    async fn create_flight(&self, flight: NewFlight) -> Result<Flight, DatabaseError>;

    async fn find_flight(&self, id: &str) -> Result<Option<Flight>, DatabaseError>;

    /// Returns `None` when no flight has this id
    async fn update_flight(
        &self,
        id: &str,
        changes: &FlightChanges,
    ) -> Result<Option<Flight>, DatabaseError>;

    /// Page of flights ordered by scheduled date ascending
    async fn list_flights(&self, query: &FlightQuery) -> Result<FlightPage, DatabaseError>;

    /// Upcoming flights flagged AT_RISK or with HIGH/EXTREME weather risk
    async fn list_alerts(
        &self,
        scope: &FlightScope,
        after: DateTime<Utc>,
    ) -> Result<Vec<Flight>, DatabaseError>;

    /// Release connections; the store must not be used afterwards
    async fn close(&self);
}

pub type SharedStore = Arc<dyn Store>;
