//! Durable job store contract.
//!
//! The engine is correct only if the store honors one rule: a status change
//! is a single conditional write ("set status WHERE id AND status = expected"),
//! indivisible with respect to other conditional writes on the same row, and
//! its audit event commits in the same transaction or not at all. Given that,
//! any number of stateless engine instances can share a store — no in-process
//! locking is involved anywhere.

pub mod memory;
pub mod pg;

use async_trait::async_trait;

use crate::error::Result;
use crate::event::{JobEvent, NewJobEvent};
use crate::model::{ActorId, Job, JobId, Status};

pub use memory::MemStore;
pub use pg::PgStore;

/// A guarded status write: applied only while the row still holds `expect`.
#[derive(Debug, Clone, Copy)]
pub struct StatusChange {
    pub expect: Status,
    pub to: Status,
    /// Set by the claim transition only. Never cleared; assignment is
    /// written exactly once per job.
    pub assign_worker: Option<ActorId>,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job and its CREATED event as one atomic unit.
    /// Returns the committed job.
    async fn insert_job(&self, job: &Job, event: NewJobEvent) -> Result<Job>;

    /// Point read by id.
    async fn get_job(&self, id: JobId) -> Result<Option<Job>>;

    /// The conditional-update-plus-event-append unit.
    ///
    /// Returns `Ok(None)` when the guard matched zero rows — the job was not
    /// in `change.expect` at the moment of the attempt — in which case
    /// nothing was written, the event included. On success the event is
    /// committed with the status change and the job is re-read after commit,
    /// so the returned value reflects the winning state rather than a stale
    /// snapshot.
    async fn transition(
        &self,
        id: JobId,
        change: StatusChange,
        event: NewJobEvent,
    ) -> Result<Option<Job>>;

    /// Events for one job, creation order ascending, ties broken by
    /// insertion order. Never re-sorted by kind or actor.
    async fn list_events(&self, job_id: JobId) -> Result<Vec<JobEvent>>;

    /// OPEN emergency jobs for the dispatch feed, newest first, bounded.
    async fn list_open_emergencies(&self, limit: i64) -> Result<Vec<Job>>;
}
