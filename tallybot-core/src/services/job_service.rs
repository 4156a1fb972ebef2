// File: tallybot-core/src/services/job_service.rs

use std::sync::Arc;

use chrono::Utc;
use tallybot_common::error::Error;
use tallybot_common::models::job::{Job, JobWithAssignees};
use tallybot_common::traits::repository_traits::JobRepository;
use tracing::info;
use uuid::Uuid;

use crate::rng::RandomSource;

/// Which assignment discipline a deployment runs. The two must never be
/// mixed against the same job table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentMode {
    /// A job can be held by many users at once; a user can hold many
    /// jobs, but each job at most once.
    Multi,
    /// At most one job per user system-wide.
    Single,
}

/// Job creation, assignment, and completion-with-reward. Jobs are
/// reusable quest templates: completing one removes only the (job, user)
/// link and pays the reward; the job row survives for reassignment.
pub struct JobService {
    jobs: Arc<dyn JobRepository>,
    rng: Arc<dyn RandomSource>,
    mode: AssignmentMode,
}

impl JobService {
    pub fn new(jobs: Arc<dyn JobRepository>, rng: Arc<dyn RandomSource>, mode: AssignmentMode) -> Self {
        Self { jobs, rng, mode }
    }

    pub fn mode(&self) -> AssignmentMode {
        self.mode
    }

    pub async fn add_job(&self, description: &str) -> Result<Job, Error> {
        let job = Job {
            job_id: Uuid::new_v4(),
            description: description.to_string(),
            created_at: Utc::now(),
        };
        self.jobs.create_job(&job).await?;
        Ok(job)
    }

    /// Every job with its current assignee set, both modes.
    pub async fn get_job_list(&self) -> Result<Vec<JobWithAssignees>, Error> {
        self.jobs.list_jobs().await
    }

    /// Admin removal; cascades the job's assignments. Returns false when
    /// the job did not exist.
    pub async fn remove_job(&self, job_id: Uuid) -> Result<bool, Error> {
        self.jobs.remove_job(job_id).await
    }

    /// Assigns a job to the user under the deployment's mode. `None`
    /// means no job was available (multi mode: the user is on every
    /// existing job; single mode: no jobs exist at all).
    pub async fn assign_job(&self, user_id: &str) -> Result<Option<Job>, Error> {
        match self.mode {
            AssignmentMode::Multi => self.assign_random_job(user_id).await,
            AssignmentMode::Single => self.assign_cycled_job(user_id).await,
        }
    }

    /// Multi mode: uniform pick among jobs the user is not yet on.
    async fn assign_random_job(&self, user_id: &str) -> Result<Option<Job>, Error> {
        let pool = self.jobs.jobs_unassigned_to(user_id).await?;
        if pool.is_empty() {
            return Ok(None);
        }
        let pick = self.rng.uniform_int(0, pool.len() as i64 - 1) as usize;
        let job = pool[pick].clone();
        self.jobs.assign(job.job_id, user_id).await?;
        info!("assigned job '{}' to {}", job.description, user_id);
        Ok(Some(job))
    }

    /// Single mode: random pick over all jobs, prior completions
    /// included; fails `AlreadyAssigned` when the user holds anything.
    async fn assign_cycled_job(&self, user_id: &str) -> Result<Option<Job>, Error> {
        let pool = self.jobs.all_jobs().await?;
        if pool.is_empty() {
            return Ok(None);
        }
        let pick = self.rng.uniform_int(0, pool.len() as i64 - 1) as usize;
        let job = pool[pick].clone();
        self.jobs.assign_sole(job.job_id, user_id).await?;
        info!("assigned job '{}' to {}", job.description, user_id);
        Ok(Some(job))
    }

    /// The job a user currently holds (single mode's query; in multi mode
    /// an arbitrary held job).
    pub async fn get_user_job(&self, user_id: &str) -> Result<Option<Job>, Error> {
        self.jobs.user_assignment(user_id).await
    }

    /// Multi-mode completion, keyed by (job, user). Pays the
    /// caller-specified reward (0 permitted) and removes exactly that
    /// link. Returns false, a soft failure rather than an error, when the
    /// user was not on that job.
    pub async fn complete_job(&self, job_id: Uuid, user_id: &str, reward: i64) -> Result<bool, Error> {
        if reward < 0 {
            return Err(Error::Parse("reward must not be negative".to_string()));
        }
        match self.jobs.complete(job_id, user_id, reward).await {
            Ok(()) => {
                info!("{} completed a job for {}", user_id, reward);
                Ok(true)
            }
            Err(Error::NotAssigned) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Single-mode completion, keyed by user only since at most one job
    /// is held. Reward 0 is "quit without reward".
    pub async fn complete_user_job(&self, user_id: &str, reward: i64) -> Result<Job, Error> {
        if reward < 0 {
            return Err(Error::Parse("reward must not be negative".to_string()));
        }
        let job = self
            .jobs
            .user_assignment(user_id)
            .await?
            .ok_or(Error::NotAssigned)?;
        self.jobs.complete(job.job_id, user_id, reward).await?;
        info!("{} completed '{}' for {}", user_id, job.description, reward);
        Ok(job)
    }
}
