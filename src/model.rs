//! Core data model.
//!
//! A job is a unit of requested service work with a lifecycle status. It has
//! identity, descriptive attributes captured at creation (the locked scope is
//! the contract both parties rely on and is immutable once set), and the two
//! contended lifecycle fields: `status` and `assigned_worker`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Newtype for job IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// Newtype for actor IDs (customers and workers). The engine treats actors
/// as opaque principals; identity verification lives elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a job.
///
/// `Open → Locked → InProgress → Completed`, with `Open → Canceled` as the
/// only branch. Everything past Open is terminal with respect to any other
/// edge: no un-complete, no re-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Posted, claimable by any worker.
    Open,
    /// Claimed by exactly one worker, not yet started.
    Locked,
    /// Assigned worker is on the job.
    InProgress,
    /// Work done. Terminal.
    Completed,
    /// Withdrawn by the creator before any claim. Terminal.
    Canceled,
}

impl Status {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (Open, Locked) | (Open, Canceled) | (Locked, InProgress) | (InProgress, Completed)
        )
    }

    /// Is this a terminal status? Only Open admits further transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Open)
    }

    /// Statuses in which a job must carry an assigned worker (and outside
    /// which it must not).
    pub fn requires_assignment(self) -> bool {
        matches!(self, Status::Locked | Status::InProgress | Status::Completed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Open => "OPEN",
            Status::Locked => "LOCKED",
            Status::InProgress => "IN_PROGRESS",
            Status::Completed => "COMPLETED",
            Status::Canceled => "CANCELED",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(Status::Open),
            "LOCKED" => Ok(Status::Locked),
            "IN_PROGRESS" => Ok(Status::InProgress),
            "COMPLETED" => Ok(Status::Completed),
            "CANCELED" => Ok(Status::Canceled),
            _ => Err(Error::Other(format!("unknown status: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Urgency
// ---------------------------------------------------------------------------

/// How urgent a job is. Emergency jobs feed the worker dispatch list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Normal,
    Emergency,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Urgency::Normal => "NORMAL",
            Urgency::Emergency => "EMERGENCY",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Urgency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NORMAL" => Ok(Urgency::Normal),
            "EMERGENCY" => Ok(Urgency::Emergency),
            _ => Err(Error::Other(format!("unknown urgency: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// The central entity: a posted service job and its lifecycle fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier. Assigned at creation, immutable.
    pub id: JobId,

    pub title: String,
    pub description: String,

    /// Trade category (e.g., "plumbing", "electrical").
    pub job_type: String,

    pub urgency: Urgency,

    /// Current lifecycle status. Mutated only through guarded transitions.
    pub status: Status,

    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub location_text: Option<String>,

    /// Price range in whole currency units.
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,

    /// Scope text captured at creation. Immutable once set — it is the
    /// contract both parties rely on.
    pub locked_scope: Option<String>,

    /// Owner. Immutable.
    pub created_by: ActorId,

    /// The single worker bound to this job once it leaves OPEN.
    /// Set exactly once, by the claim. Non-null iff status is one of
    /// LOCKED, IN_PROGRESS, COMPLETED.
    pub assigned_worker: Option<ActorId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Materialize a new OPEN job from creation attributes. The engine is
    /// the only caller that persists the result; it validates first.
    pub fn new(creator: ActorId, new: NewJob) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            title: new.title,
            description: new.description,
            job_type: new.job_type,
            urgency: new.urgency,
            status: Status::Open,
            lat: new.lat,
            lng: new.lng,
            location_text: new.location_text,
            price_min: new.price_min,
            price_max: new.price_max,
            locked_scope: new.locked_scope,
            created_by: creator,
            assigned_worker: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for job creation attributes. The engine's public API for posting.
pub struct NewJob {
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) job_type: String,
    pub(crate) urgency: Urgency,
    pub(crate) lat: Option<f64>,
    pub(crate) lng: Option<f64>,
    pub(crate) location_text: Option<String>,
    pub(crate) price_min: Option<i64>,
    pub(crate) price_max: Option<i64>,
    pub(crate) locked_scope: Option<String>,
}

impl NewJob {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        job_type: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            job_type: job_type.into(),
            urgency: Urgency::Normal,
            lat: None,
            lng: None,
            location_text: None,
            price_min: None,
            price_max: None,
            locked_scope: None,
        }
    }

    /// Emergency posting without an explicit title. The title defaults to
    /// "Emergency - {job_type}".
    pub fn emergency(description: impl Into<String>, job_type: impl Into<String>) -> Self {
        let job_type = job_type.into();
        let mut new = Self::new(
            format!("Emergency - {job_type}"),
            description,
            job_type,
        );
        new.urgency = Urgency::Emergency;
        new
    }

    pub fn urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }

    pub fn location_text(mut self, text: impl Into<String>) -> Self {
        self.location_text = Some(text.into());
        self
    }

    pub fn price_range(mut self, min: i64, max: i64) -> Self {
        self.price_min = Some(min);
        self.price_max = Some(max);
        self
    }

    pub fn locked_scope(mut self, scope: impl Into<String>) -> Self {
        self.locked_scope = Some(scope.into());
        self
    }

    /// Check creation-field constraints. Surfaced as Validation errors so
    /// they are never confused with lifecycle conflicts.
    pub(crate) fn validate(&self) -> Result<()> {
        fn len_between(
            field: &'static str,
            value: &str,
            min: usize,
            max: usize,
        ) -> Result<()> {
            let n = value.chars().count();
            if n < min || n > max {
                return Err(Error::Validation {
                    field,
                    reason: format!("length {n} outside {min}..={max}"),
                });
            }
            Ok(())
        }

        len_between("title", &self.title, 3, 120)?;
        len_between("description", &self.description, 10, 5000)?;
        len_between("job_type", &self.job_type, 2, 40)?;

        if let Some(ref text) = self.location_text {
            len_between("location_text", text, 0, 120)?;
        }
        if let Some(ref scope) = self.locked_scope {
            len_between("locked_scope", scope, 0, 1000)?;
        }

        for (field, price) in [("price_min", self.price_min), ("price_max", self.price_max)] {
            if let Some(p) = price
                && p < 0
            {
                return Err(Error::Validation {
                    field,
                    reason: format!("must be non-negative, got {p}"),
                });
            }
        }
        if let (Some(min), Some(max)) = (self.price_min, self.price_max)
            && min > max
        {
            return Err(Error::Validation {
                field: "price_min",
                reason: format!("exceeds price_max ({min} > {max})"),
            });
        }

        Ok(())
    }
}
