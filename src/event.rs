//! Immutable audit events, one per lifecycle transition.
//!
//! For a given job, the ordered sequence of event kinds is a valid path
//! through the state machine starting at CREATED. Events are written in the
//! same atomic unit as the status change they record and are never mutated
//! or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{ActorId, JobId};

/// What a lifecycle event records. Mirrors the transition that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Created,
    Accepted,
    Started,
    Completed,
    Canceled,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::Created => "CREATED",
            EventKind::Accepted => "ACCEPTED",
            EventKind::Started => "STARTED",
            EventKind::Completed => "COMPLETED",
            EventKind::Canceled => "CANCELED",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "CREATED" => Ok(EventKind::Created),
            "ACCEPTED" => Ok(EventKind::Accepted),
            "STARTED" => Ok(EventKind::Started),
            "COMPLETED" => Ok(EventKind::Completed),
            "CANCELED" => Ok(EventKind::Canceled),
            _ => Err(Error::Other(format!("unknown event kind: {s}"))),
        }
    }
}

/// An audit record of one lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    /// Store-assigned, insertion-ordered. Breaks creation-time ties when
    /// reading the log back.
    pub id: i64,
    pub job_id: JobId,
    pub kind: EventKind,
    /// The actor the transition is attributed to.
    pub actor_id: ActorId,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Event payload handed to the store alongside a status change.
#[derive(Debug, Clone)]
pub struct NewJobEvent {
    pub kind: EventKind,
    pub actor_id: ActorId,
    pub note: Option<String>,
}

impl NewJobEvent {
    pub fn new(kind: EventKind, actor_id: ActorId, note: impl Into<String>) -> Self {
        Self {
            kind,
            actor_id,
            note: Some(note.into()),
        }
    }
}
