//! Lifecycle span helpers.
//!
//! Provides span creation and transition recording for jobs flowing
//! through the engine.

use tracing::Span;
use uuid::Uuid;

use crate::model::Status;

/// Start a span for a lifecycle operation.
///
/// The `job.status` field is declared empty and can be updated via
/// [`record_transition`].
pub fn start_lifecycle_span(action: &str, job_id: &Uuid) -> Span {
    tracing::info_span!(
        "job.lifecycle",
        "job.action" = action,
        "job.id" = %job_id,
        "job.status" = tracing::field::Empty,
    )
}

/// Record a status transition event on the given span.
///
/// Emits a tracing `info` event scoped to the span.
pub fn record_transition(span: &Span, from: Status, to: Status) {
    span.in_scope(|| {
        tracing::info!(from = %from, to = %to, "status_transition");
    });
}
