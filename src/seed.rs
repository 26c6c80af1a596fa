//! Demo accounts for local development and the login page hint.

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::auth::{password, AuthError};
use crate::database::models::{NewUser, Role, TrainingLevel};
use crate::database::{DatabaseError, Store};

/// Shared password of every demo account
pub const DEMO_PASSWORD: &str = "password123";

pub struct DemoAccount {
    pub email: &'static str,
    pub name: &'static str,
    pub role: Role,
    pub training_level: TrainingLevel,
}

pub const DEMO_ACCOUNTS: [DemoAccount; 3] = [
    DemoAccount {
        email: "student@skyshift.com",
        name: "Sam Student",
        role: Role::Student,
        training_level: TrainingLevel::Student,
    },
    DemoAccount {
        email: "instructor@skyshift.com",
        name: "Ivy Instructor",
        role: Role::Instructor,
        training_level: TrainingLevel::Commercial,
    },
    DemoAccount {
        email: "admin@skyshift.com",
        name: "Ada Admin",
        role: Role::Admin,
        training_level: TrainingLevel::Instrument,
    },
];

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to hash demo password: {0}")]
    Hash(#[from] AuthError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

/// Insert every demo account whose email is not registered yet. Existing
/// rows, including their passwords, are left as they are.
pub async fn seed_demo_accounts(store: &dyn Store) -> Result<SeedReport, SeedError> {
    let password_hash = password::hash_password(DEMO_PASSWORD).await?;
    let mut report = SeedReport::default();

    for account in &DEMO_ACCOUNTS {
        let inserted = store
            .insert_user_if_absent(NewUser {
                name: account.name.to_string(),
                email: account.email.to_string(),
                role: account.role,
                training_level: account.training_level,
                password_hash: password_hash.clone(),
                email_verified: Some(chrono::Utc::now()),
            })
            .await?;

        if inserted {
            info!("Created demo account {}", account.email);
            report.created.push(account.email.to_string());
        } else {
            report.existing.push(account.email.to_string());
        }
    }

    Ok(report)
}
