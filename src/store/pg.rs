//! Postgres-backed job store.
//!
//! Shared connection pool, sqlx migrations, and the guarded-UPDATE
//! transition primitive. The WHERE-clause status guard is what settles
//! claim races: two workers can both observe an OPEN job, but only one
//! UPDATE matches the row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::event::{JobEvent, NewJobEvent};
use crate::model::{ActorId, Job, JobId, Status, Urgency};
use crate::store::{JobStore, StatusChange};

/// Postgres store handle. Owns the connection pool; construct once at
/// process start and inject.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Other(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Simple health check — run a SELECT 1.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_job(&self, id: JobId) -> Result<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as(
            "SELECT id, title, description, job_type, urgency, status, lat, lng, location_text,
                    price_min, price_max, locked_scope, created_by_id, assigned_worker_id,
                    created_at, updated_at
             FROM jobs WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::try_into_job).transpose()
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn insert_job(&self, job: &Job, event: NewJobEvent) -> Result<Job> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO jobs (id, title, description, job_type, urgency, status, lat, lng,
                               location_text, price_min, price_max, locked_scope, created_by_id,
                               assigned_worker_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NULL, $14, $14)",
        )
        .bind(job.id.0)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.job_type)
        .bind(job.urgency.to_string())
        .bind(job.status.to_string())
        .bind(job.lat)
        .bind(job.lng)
        .bind(&job.location_text)
        .bind(job.price_min)
        .bind(job.price_max)
        .bind(&job.locked_scope)
        .bind(job.created_by.0)
        .bind(job.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO job_events (job_id, kind, actor_id, note, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(job.id.0)
        .bind(event.kind.to_string())
        .bind(event.actor_id.0)
        .bind(&event.note)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.fetch_job(job.id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {}", job.id)))
    }

    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        self.fetch_job(id).await
    }

    async fn transition(
        &self,
        id: JobId,
        change: StatusChange,
        event: NewJobEvent,
    ) -> Result<Option<Job>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // The guard. Must be a single conditional UPDATE, not a
        // read-then-write pair: two concurrent claims can both read OPEN,
        // but only one of these statements matches the row.
        let rows_affected = sqlx::query(
            "UPDATE jobs
             SET status = $1,
                 assigned_worker_id = COALESCE($2, assigned_worker_id),
                 updated_at = $3
             WHERE id = $4 AND status = $5",
        )
        .bind(change.to.to_string())
        .bind(change.assign_worker.map(|w| w.0))
        .bind(now)
        .bind(id.0)
        .bind(change.expect.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        // Same transaction as the status change. If this insert fails the
        // whole unit rolls back — a locked job with no ACCEPTED event must
        // never be observable.
        sqlx::query(
            "INSERT INTO job_events (job_id, kind, actor_id, note, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id.0)
        .bind(event.kind.to_string())
        .bind(event.actor_id.0)
        .bind(&event.note)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        // Read after commit so the response reflects the winning state.
        self.fetch_job(id).await
    }

    async fn list_events(&self, job_id: JobId) -> Result<Vec<JobEvent>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT id, job_id, kind, actor_id, note, created_at
             FROM job_events WHERE job_id = $1
             ORDER BY created_at ASC, id ASC",
        )
        .bind(job_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EventRow::try_into_event).collect()
    }

    async fn list_open_emergencies(&self, limit: i64) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT id, title, description, job_type, urgency, status, lat, lng, location_text,
                    price_min, price_max, locked_scope, created_by_id, assigned_worker_id,
                    created_at, updated_at
             FROM jobs
             WHERE status = 'OPEN' AND urgency = 'EMERGENCY'
             ORDER BY created_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::try_into_job).collect()
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    title: String,
    description: String,
    job_type: String,
    urgency: String,
    status: String,
    lat: Option<f64>,
    lng: Option<f64>,
    location_text: Option<String>,
    price_min: Option<i64>,
    price_max: Option<i64>,
    locked_scope: Option<String>,
    created_by_id: Uuid,
    assigned_worker_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn try_into_job(self) -> Result<Job> {
        Ok(Job {
            id: JobId(self.id),
            title: self.title,
            description: self.description,
            job_type: self.job_type,
            urgency: self.urgency.parse::<Urgency>()?,
            status: self.status.parse::<Status>()?,
            lat: self.lat,
            lng: self.lng,
            location_text: self.location_text,
            price_min: self.price_min,
            price_max: self.price_max,
            locked_scope: self.locked_scope,
            created_by: ActorId(self.created_by_id),
            assigned_worker: self.assigned_worker_id.map(ActorId),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    job_id: Uuid,
    kind: String,
    actor_id: Uuid,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl EventRow {
    fn try_into_event(self) -> Result<JobEvent> {
        Ok(JobEvent {
            id: self.id,
            job_id: JobId(self.job_id),
            kind: self.kind.parse()?,
            actor_id: ActorId(self.actor_id),
            note: self.note,
            created_at: self.created_at,
        })
    }
}
