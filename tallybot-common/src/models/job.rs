// File: tallybot-common/src/models/job.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reusable quest template. Completing a job never deletes the row;
/// only an explicit admin removal does (cascading its assignments).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub job_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// One (job, user) link. A user is linked to a given job at most once.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobAssignment {
    pub job_id: Uuid,
    pub user_id: String,
    pub assigned_at: DateTime<Utc>,
}

/// Listing shape: a job together with everyone currently on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobWithAssignees {
    pub job: Job,
    pub assignees: Vec<String>,
}
