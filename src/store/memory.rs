//! In-memory job store.
//!
//! Backs the test suite and single-process dev setups. The guarded
//! transition runs its check-and-set under one mutex acquisition, which
//! gives the same indivisibility the Postgres store gets from its
//! WHERE-clause guard. Not suitable for multi-process deployments — nothing
//! here survives a restart or crosses a process boundary.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Error, Result};
use crate::event::{JobEvent, NewJobEvent};
use crate::model::{Job, JobId, Status, Urgency};
use crate::store::{JobStore, StatusChange};

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    /// Append-only, insertion order preserved.
    events: Vec<JobEvent>,
    next_event_id: i64,
}

impl Inner {
    fn append_event(&mut self, job_id: JobId, event: NewJobEvent) {
        self.next_event_id += 1;
        self.events.push(JobEvent {
            id: self.next_event_id,
            job_id,
            kind: event.kind,
            actor_id: event.actor_id,
            note: event.note,
            created_at: Utc::now(),
        });
    }
}

/// In-memory store for tests and dev.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Poisoned only if a holder panicked; propagate.
        self.inner.lock().expect("job store mutex poisoned")
    }
}

#[async_trait]
impl JobStore for MemStore {
    async fn insert_job(&self, job: &Job, event: NewJobEvent) -> Result<Job> {
        let mut inner = self.lock();
        if inner.jobs.contains_key(&job.id) {
            return Err(Error::Other(format!("duplicate job id {}", job.id)));
        }
        inner.jobs.insert(job.id, job.clone());
        inner.append_event(job.id, event);
        Ok(job.clone())
    }

    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.lock().jobs.get(&id).cloned())
    }

    async fn transition(
        &self,
        id: JobId,
        change: StatusChange,
        event: NewJobEvent,
    ) -> Result<Option<Job>> {
        let mut inner = self.lock();

        // Check and set under the same lock acquisition — the in-process
        // equivalent of the conditional UPDATE.
        let Some(job) = inner.jobs.get_mut(&id) else {
            return Ok(None);
        };
        if job.status != change.expect {
            return Ok(None);
        }

        job.status = change.to;
        if let Some(worker) = change.assign_worker {
            job.assigned_worker = Some(worker);
        }
        job.updated_at = Utc::now();
        let fresh = job.clone();

        inner.append_event(id, event);
        Ok(Some(fresh))
    }

    async fn list_events(&self, job_id: JobId) -> Result<Vec<JobEvent>> {
        Ok(self
            .lock()
            .events
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn list_open_emergencies(&self, limit: i64) -> Result<Vec<Job>> {
        let inner = self.lock();
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|j| j.status == Status::Open && j.urgency == Urgency::Emergency)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }
}
