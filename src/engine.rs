//! Job lifecycle engine. The public API for posting and moving jobs.
//!
//! All state transitions go through one guarded primitive: authorization is
//! checked against the job's persisted owner/assignee, the status
//! precondition is re-checked by the store's conditional write, and the
//! audit event commits atomically with the change. The accept path is the
//! same primitive driven without a pre-read — first guarded write to land
//! wins the claim, everyone else gets a conflict.

use opentelemetry::KeyValue;
use tracing::info;

use crate::error::{Error, Result};
use crate::event::{EventKind, JobEvent, NewJobEvent};
use crate::model::{ActorId, Job, JobId, NewJob, Status, Urgency};
use crate::store::{JobStore, StatusChange};
use crate::telemetry::{job as spans, metrics};

/// How many jobs the dispatch feed returns at most.
const FEED_LIMIT: i64 = 50;

/// Who may drive a given transition. Accept has no gate (any authenticated
/// actor may claim; a worker-only rule is a known extension) and drives the
/// guard directly instead of going through the table.
enum Gate {
    CreatorOnly,
    AssignedWorkerOnly,
}

/// One row of the transition table: everything that varies between
/// start/complete/cancel. The mechanism never does.
struct Rule {
    action: &'static str,
    from: Status,
    to: Status,
    kind: EventKind,
    gate: Gate,
    note: &'static str,
    forbid: &'static str,
}

const START: Rule = Rule {
    action: "start",
    from: Status::Locked,
    to: Status::InProgress,
    kind: EventKind::Started,
    gate: Gate::AssignedWorkerOnly,
    note: "Worker started job",
    forbid: "only the assigned worker can start this job",
};

const COMPLETE: Rule = Rule {
    action: "complete",
    from: Status::InProgress,
    to: Status::Completed,
    kind: EventKind::Completed,
    gate: Gate::AssignedWorkerOnly,
    note: "Worker completed job",
    forbid: "only the assigned worker can complete this job",
};

const CANCEL: Rule = Rule {
    action: "cancel",
    from: Status::Open,
    to: Status::Canceled,
    kind: EventKind::Canceled,
    gate: Gate::CreatorOnly,
    note: "Customer canceled job",
    forbid: "only the customer who created the job can cancel",
};

/// The lifecycle engine. Stateless apart from the injected store; run as
/// many instances as you like against one database.
pub struct Engine<S> {
    store: S,
}

impl<S: JobStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Post a new job. Status OPEN plus its CREATED event, one atomic unit.
    pub async fn create_job(&self, creator: ActorId, new: NewJob) -> Result<Job> {
        self.create(creator, new, "Job created").await
    }

    /// Post an emergency job: urgency is fixed to EMERGENCY regardless of
    /// what the builder carries.
    pub async fn create_emergency_job(&self, creator: ActorId, new: NewJob) -> Result<Job> {
        let new = new.urgency(Urgency::Emergency);
        self.create(creator, new, "Emergency job created").await
    }

    async fn create(&self, creator: ActorId, new: NewJob, note: &'static str) -> Result<Job> {
        new.validate()?;
        let job = Job::new(creator, new);
        let event = NewJobEvent::new(EventKind::Created, creator, note);
        let job = self.store.insert_job(&job, event).await?;

        metrics::jobs_created().add(
            1,
            &[KeyValue::new(
                "urgency",
                job.urgency.to_string(),
            )],
        );
        info!(job = %job.id, urgency = %job.urgency, "job created");
        Ok(job)
    }

    /// Atomic claim: OPEN → LOCKED, binding the worker. Exactly one caller
    /// can win; the rest observe a guard miss and get the conflict outcome.
    ///
    /// No pre-read: nothing to authorize (any authenticated actor may
    /// accept), and the guard is the only race-safe check. A missing job id
    /// surfaces as the same conflict; this operation has a single failure
    /// outcome.
    pub async fn accept_job(&self, job_id: JobId, worker: ActorId) -> Result<Job> {
        let span = spans::start_lifecycle_span("accept", &job_id.0);
        let started = std::time::Instant::now();
        let change = StatusChange {
            expect: Status::Open,
            to: Status::Locked,
            assign_worker: Some(worker),
        };
        let event = NewJobEvent::new(
            EventKind::Accepted,
            worker,
            "Worker accepted and locked the job",
        );

        match self.store.transition(job_id, change, event).await? {
            Some(job) => {
                spans::record_transition(&span, Status::Open, Status::Locked);
                metrics::job_transitions().add(
                    1,
                    &[
                        KeyValue::new("from", "OPEN"),
                        KeyValue::new("to", "LOCKED"),
                    ],
                );
                metrics::operation_duration_ms().record(
                    started.elapsed().as_secs_f64() * 1000.0,
                    &[KeyValue::new("operation", "job.accept")],
                );
                info!(job = %job.id, worker = %worker, "job claimed");
                Ok(job)
            }
            None => {
                metrics::claim_conflicts().add(1, &[]);
                Err(Error::AlreadyTaken)
            }
        }
    }

    /// LOCKED → IN_PROGRESS, assigned worker only.
    pub async fn start_job(&self, job_id: JobId, worker: ActorId) -> Result<Job> {
        self.apply_transition(job_id, worker, &START).await
    }

    /// IN_PROGRESS → COMPLETED, assigned worker only.
    pub async fn complete_job(&self, job_id: JobId, worker: ActorId) -> Result<Job> {
        self.apply_transition(job_id, worker, &COMPLETE).await
    }

    /// OPEN → CANCELED, creator only. Any other status conflicts — the v1
    /// rule is deliberately this strict.
    pub async fn cancel_job(&self, job_id: JobId, requester: ActorId) -> Result<Job> {
        self.apply_transition(job_id, requester, &CANCEL).await
    }

    /// Point read with visibility rules: creator and assigned worker always;
    /// anyone while the job is OPEN (it is published on the dispatch feed).
    pub async fn get_job(&self, job_id: JobId, requester: ActorId) -> Result<Job> {
        let job = self.load(job_id).await?;
        let visible = job.created_by == requester
            || job.assigned_worker == Some(requester)
            || job.status == Status::Open;
        if !visible {
            return Err(Error::Forbidden("not a party to this job"));
        }
        Ok(job)
    }

    /// The audit log, creation order. Creator or assigned worker only.
    pub async fn list_events(&self, job_id: JobId, requester: ActorId) -> Result<Vec<JobEvent>> {
        let job = self.load(job_id).await?;
        let can_view = job.created_by == requester || job.assigned_worker == Some(requester);
        if !can_view {
            return Err(Error::Forbidden("not a party to this job"));
        }
        self.store.list_events(job_id).await
    }

    /// Worker dispatch feed: OPEN emergencies, newest first, bounded.
    pub async fn list_open_emergencies(&self) -> Result<Vec<Job>> {
        self.store.list_open_emergencies(FEED_LIMIT).await
    }

    async fn load(&self, job_id: JobId) -> Result<Job> {
        self.store
            .get_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))
    }

    /// Generalized conditional transition. The table rows above are pure
    /// data driving this one mechanism.
    ///
    /// Authorization uses the persisted `created_by`/`assigned_worker`,
    /// never caller-supplied values, and is checked before the status
    /// precondition (a wrong actor gets Forbidden even on a job that has
    /// also moved on). The pre-read status check is advisory; the store's
    /// conditional write is the authority, so a stale read can lose the
    /// guard but can never corrupt state.
    async fn apply_transition(&self, job_id: JobId, actor: ActorId, rule: &Rule) -> Result<Job> {
        debug_assert!(rule.from.can_transition_to(rule.to));

        let span = spans::start_lifecycle_span(rule.action, &job_id.0);
        let started = std::time::Instant::now();
        let job = self.load(job_id).await?;

        let authorized = match rule.gate {
            Gate::CreatorOnly => job.created_by == actor,
            Gate::AssignedWorkerOnly => job.assigned_worker == Some(actor),
        };
        if !authorized {
            return Err(Error::Forbidden(rule.forbid));
        }

        if job.status != rule.from {
            return Err(Error::WrongStatus {
                action: rule.action,
                current: job.status,
            });
        }

        let change = StatusChange {
            expect: rule.from,
            to: rule.to,
            assign_worker: None,
        };
        let event = NewJobEvent::new(rule.kind, actor, rule.note);

        match self.store.transition(job_id, change, event).await? {
            Some(job) => {
                spans::record_transition(&span, rule.from, rule.to);
                metrics::job_transitions().add(
                    1,
                    &[
                        KeyValue::new("from", rule.from.to_string()),
                        KeyValue::new("to", rule.to.to_string()),
                    ],
                );
                metrics::operation_duration_ms().record(
                    started.elapsed().as_secs_f64() * 1000.0,
                    &[KeyValue::new("operation", rule.action)],
                );
                info!(job = %job.id, action = rule.action, "job transition");
                Ok(job)
            }
            None => {
                // Guard lost between our read and our write: report whatever
                // the job moved to so the caller can refresh.
                let current = self
                    .store
                    .get_job(job_id)
                    .await?
                    .map(|j| j.status)
                    .unwrap_or(job.status);
                Err(Error::WrongStatus {
                    action: rule.action,
                    current,
                })
            }
        }
    }
}
