// File: tallybot-core/src/repositories/postgres/jobs.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tallybot_common::error::Error;
use tallybot_common::models::job::{Job, JobWithAssignees};
use tallybot_common::traits::repository_traits::JobRepository;
use uuid::Uuid;

pub struct PostgresJobRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresJobRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn job_from_row(row: &sqlx::postgres::PgRow) -> Result<Job, Error> {
    Ok(Job {
        job_id: row.try_get("job_id")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl JobRepository for PostgresJobRepository {
    async fn create_job(&self, job: &Job) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO jobs (job_id, description, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(job.job_id)
        .bind(&job.description)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        let row_opt = sqlx::query(
            "SELECT job_id, description, created_at FROM jobs WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(row) => Ok(Some(job_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn all_jobs(&self) -> Result<Vec<Job>, Error> {
        let rows = sqlx::query(
            "SELECT job_id, description, created_at FROM jobs ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut list = Vec::new();
        for row in rows {
            list.push(job_from_row(&row)?);
        }
        Ok(list)
    }

    async fn list_jobs(&self) -> Result<Vec<JobWithAssignees>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT j.job_id, j.description, j.created_at, a.user_id
            FROM jobs j
            LEFT JOIN job_assignments a ON a.job_id = j.job_id
            ORDER BY j.created_at ASC, a.user_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut list: Vec<JobWithAssignees> = Vec::new();
        for row in rows {
            let job = job_from_row(&row)?;
            let assignee: Option<String> = row.try_get("user_id")?;

            match list.last_mut() {
                Some(entry) if entry.job.job_id == job.job_id => {
                    if let Some(user) = assignee {
                        entry.assignees.push(user);
                    }
                }
                _ => {
                    list.push(JobWithAssignees {
                        job,
                        assignees: assignee.into_iter().collect(),
                    });
                }
            }
        }
        Ok(list)
    }

    async fn remove_job(&self, job_id: Uuid) -> Result<bool, Error> {
        // Assignments go with it via ON DELETE CASCADE.
        let res = sqlx::query("DELETE FROM jobs WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn jobs_unassigned_to(&self, user_id: &str) -> Result<Vec<Job>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT j.job_id, j.description, j.created_at
            FROM jobs j
            WHERE NOT EXISTS (
                SELECT 1 FROM job_assignments a
                WHERE a.job_id = j.job_id AND a.user_id = $1
            )
            ORDER BY j.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut list = Vec::new();
        for row in rows {
            list.push(job_from_row(&row)?);
        }
        Ok(list)
    }

    async fn assign(&self, job_id: Uuid, user_id: &str) -> Result<(), Error> {
        let res = sqlx::query(
            "INSERT INTO job_assignments (job_id, user_id) VALUES ($1, $2)",
        )
        .bind(job_id)
        .bind(user_id)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(Error::AlreadyAssigned)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn assign_sole(&self, job_id: Uuid, user_id: &str) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        // Serialize per user. Under READ COMMITTED two racing inserts for
        // the same user with different jobs would each pass the NOT EXISTS
        // guard against their own snapshot; their (job_id, user_id) keys
        // differ so the primary key stops neither. The transaction-scoped
        // advisory lock makes the guard and the insert one unit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let res = sqlx::query(
            r#"
            INSERT INTO job_assignments (job_id, user_id)
            SELECT $1, $2
            WHERE NOT EXISTS (
                SELECT 1 FROM job_assignments WHERE user_id = $2
            )
            "#,
        )
        .bind(job_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if res.rows_affected() == 0 {
            return Err(Error::AlreadyAssigned);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn user_assignment(&self, user_id: &str) -> Result<Option<Job>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT j.job_id, j.description, j.created_at
            FROM jobs j
            JOIN job_assignments a ON a.job_id = j.job_id
            WHERE a.user_id = $1
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(row) => Ok(Some(job_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn complete(&self, job_id: Uuid, user_id: &str, reward: i64) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM job_assignments WHERE job_id = $1 AND user_id = $2",
        )
        .bind(job_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if removed.rows_affected() == 0 {
            return Err(Error::NotAssigned);
        }

        if reward > 0 {
            sqlx::query(
                r#"
                INSERT INTO accounts (user_id, wallet, bank)
                VALUES ($1, $2, 0)
                ON CONFLICT (user_id)
                DO UPDATE SET wallet = accounts.wallet + EXCLUDED.wallet
                "#,
            )
            .bind(user_id)
            .bind(reward)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
