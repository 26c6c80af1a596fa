use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};

use super::models::{
    new_id, Flight, FlightChanges, FlightPage, FlightQuery, FlightScope, FlightStatus,
    InstructorSummary, Location, NewFlight, NewUser, RiskLevel, Role, TrainingLevel, User,
};
use super::{DatabaseError, Store};

const USER_COLUMNS: &str =
    "id, name, email, role, training_level, password, email_verified, created_at";

const FLIGHT_COLUMNS: &str = "id, instructor_id, student_id, scheduled_date, training_level, \
     departure_location, destination_location, duration, notes, status, \
     cancellation_probability, risk_level, created_at, updated_at";

// Shared WHERE clause: $1 participant id, $2 status, $3 start, $4 end
const FLIGHT_FILTER: &str = "($1::text IS NULL OR student_id = $1 OR instructor_id = $1) \
     AND ($2::flight_status IS NULL OR status = $2) \
     AND ($3::timestamptz IS NULL OR scheduled_date >= $3) \
     AND ($4::timestamptz IS NULL OR scheduled_date <= $4)";

#[derive(Debug, FromRow)]
struct FlightRow {
    id: String,
    instructor_id: String,
    student_id: String,
    scheduled_date: DateTime<Utc>,
    training_level: TrainingLevel,
    departure_location: Json<Location>,
    destination_location: Option<Json<Location>>,
    duration: f64,
    notes: Option<String>,
    status: FlightStatus,
    cancellation_probability: i32,
    risk_level: RiskLevel,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Flight {
            id: row.id,
            instructor_id: row.instructor_id,
            student_id: row.student_id,
            scheduled_date: row.scheduled_date,
            training_level: row.training_level,
            departure_location: row.departure_location.0,
            destination_location: row.destination_location.map(|json| json.0),
            duration: row.duration,
            notes: row.notes,
            status: row.status,
            cancellation_probability: row.cancellation_probability,
            risk_level: row.risk_level,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    fn participant(scope: &FlightScope) -> Option<&str> {
        match scope {
            FlightScope::All => None,
            FlightScope::Participant(user_id) => Some(user_id.as_str()),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_instructors(&self) -> Result<Vec<InstructorSummary>, DatabaseError> {
        let instructors = sqlx::query_as::<_, InstructorSummary>(
            "SELECT id, name, email FROM users WHERE role = $1 ORDER BY name NULLS LAST, email",
        )
        .bind(Role::Instructor)
        .fetch_all(&self.pool)
        .await?;

        Ok(instructors)
    }

    async fn insert_user_if_absent(&self, user: NewUser) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO users (id, name, email, role, training_level, password, email_verified)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(new_id())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.training_level)
        .bind(&user.password_hash)
        .bind(user.email_verified)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn count_users(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_flight(&self, flight: NewFlight) -> Result<Flight, DatabaseError> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "INSERT INTO flights (id, instructor_id, student_id, scheduled_date, training_level,
                 departure_location, destination_location, duration, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {FLIGHT_COLUMNS}"
        ))
        .bind(new_id())
        .bind(&flight.instructor_id)
        .bind(&flight.student_id)
        .bind(flight.scheduled_date)
        .bind(flight.training_level)
        .bind(Json(&flight.departure_location))
        .bind(flight.destination_location.as_ref().map(Json))
        .bind(flight.duration)
        .bind(&flight.notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_flight(&self, id: &str) -> Result<Option<Flight>, DatabaseError> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Flight::from))
    }

    async fn update_flight(
        &self,
        id: &str,
        changes: &FlightChanges,
    ) -> Result<Option<Flight>, DatabaseError> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "UPDATE flights SET
                 scheduled_date = COALESCE($2, scheduled_date),
                 status = COALESCE($3, status),
                 cancellation_probability = COALESCE($4, cancellation_probability),
                 risk_level = COALESCE($5, risk_level),
                 updated_at = now()
             WHERE id = $1
             RETURNING {FLIGHT_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.scheduled_date)
        .bind(changes.status)
        .bind(changes.cancellation_probability)
        .bind(changes.risk_level)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Flight::from))
    }

    async fn list_flights(&self, query: &FlightQuery) -> Result<FlightPage, DatabaseError> {
        let participant = Self::participant(&query.scope);

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM flights WHERE {FLIGHT_FILTER}"))
                .bind(participant)
                .bind(query.status)
                .bind(query.start_date)
                .bind(query.end_date)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights WHERE {FLIGHT_FILTER}
             ORDER BY scheduled_date ASC, id ASC
             LIMIT $5 OFFSET $6"
        ))
        .bind(participant)
        .bind(query.status)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(FlightPage {
            flights: rows.into_iter().map(Flight::from).collect(),
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
        let rows = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights
             WHERE ($1::text IS NULL OR student_id = $1 OR instructor_id = $1)
               AND scheduled_date > $2
               AND (status = $3 OR risk_level IN ($4, $5))
             ORDER BY scheduled_date ASC"
        ))
        .bind(Self::participant(scope))
        .bind(after)
        .bind(FlightStatus::AtRisk)
        .bind(RiskLevel::High)
        .bind(RiskLevel::Extreme)
        .fetch_all(&self.pool)
        .await?;

        // Cancelled or completed flights no longer need a weather decision
        Ok(rows
            .into_iter()
            .map(Flight::from)
            .filter(|flight| flight.status.can_reschedule())
            .collect())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
