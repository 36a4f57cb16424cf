//! Integration tests for the job lifecycle engine.

use reliserve::engine::Engine;
use reliserve::error::{Error, ErrorKind};
use reliserve::event::EventKind;
use reliserve::model::{ActorId, Job, JobId, NewJob, Status, Urgency};
use reliserve::store::MemStore;
use uuid::Uuid;

fn test_engine() -> Engine<MemStore> {
    Engine::new(MemStore::new())
}

fn actor() -> ActorId {
    ActorId(Uuid::new_v4())
}

fn sample_job() -> NewJob {
    NewJob::new(
        "No hot water",
        "Water heater completely out, family needs hot water ASAP",
        "plumbing",
    )
    .price_range(250, 350)
    .locked_scope("Diagnose and repair water heater or recommend replacement")
}

/// Status/assignment coupling: assigned iff the job is past the claim.
fn assert_coupling(job: &Job) {
    assert_eq!(
        job.assigned_worker.is_some(),
        job.status.requires_assignment(),
        "assignment/status coupling violated at {}",
        job.status
    );
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_job_opens_with_created_event() {
    let engine = test_engine();
    let customer = actor();

    let job = engine.create_job(customer, sample_job()).await.unwrap();
    assert_eq!(job.status, Status::Open);
    assert_eq!(job.urgency, Urgency::Normal);
    assert_eq!(job.created_by, customer);
    assert_coupling(&job);

    let events = engine.list_events(job.id, customer).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Created);
    assert_eq!(events[0].actor_id, customer);
}

#[tokio::test]
async fn emergency_job_forces_urgency() {
    let engine = test_engine();
    let customer = actor();

    // Even a builder left at Normal comes out EMERGENCY via this operation.
    let job = engine
        .create_emergency_job(customer, sample_job())
        .await
        .unwrap();
    assert_eq!(job.urgency, Urgency::Emergency);
    assert_eq!(job.status, Status::Open);
}

#[tokio::test]
async fn emergency_builder_defaults_title() {
    let engine = test_engine();
    let customer = actor();

    let job = engine
        .create_emergency_job(
            customer,
            NewJob::emergency("Water heater completely out, need help ASAP", "plumbing"),
        )
        .await
        .unwrap();
    assert_eq!(job.title, "Emergency - plumbing");
}

#[tokio::test]
async fn malformed_creation_input_is_a_validation_error() {
    let engine = test_engine();
    let customer = actor();

    let err = engine
        .create_job(customer, NewJob::new("ab", "too short", "plumbing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    // Never confused with a lifecycle conflict.
    assert_ne!(err.kind(), ErrorKind::Conflict);
}

// ---------------------------------------------------------------------------
// Full lifecycle: create → accept → start → complete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_lifecycle_walk() {
    let engine = test_engine();
    let customer = actor();
    let worker = actor();

    let job = engine.create_job(customer, sample_job()).await.unwrap();

    let job = engine.accept_job(job.id, worker).await.unwrap();
    assert_eq!(job.status, Status::Locked);
    assert_eq!(job.assigned_worker, Some(worker));
    assert_coupling(&job);

    let job = engine.start_job(job.id, worker).await.unwrap();
    assert_eq!(job.status, Status::InProgress);
    assert_eq!(job.assigned_worker, Some(worker));
    assert_coupling(&job);

    let job = engine.complete_job(job.id, worker).await.unwrap();
    assert_eq!(job.status, Status::Completed);
    assert_eq!(job.assigned_worker, Some(worker));
    assert_coupling(&job);

    // The audit trail is exactly the path walked, in creation order.
    let events = engine.list_events(job.id, customer).await.unwrap();
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Created,
            EventKind::Accepted,
            EventKind::Started,
            EventKind::Completed,
        ]
    );
    for window in events.windows(2) {
        assert!(window[0].id < window[1].id, "events out of insertion order");
    }
    assert_eq!(events[1].actor_id, worker);
}

// ---------------------------------------------------------------------------
// Accept / claim conflicts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_accept_conflicts_and_writes_nothing() {
    let engine = test_engine();
    let customer = actor();
    let worker_a = actor();
    let worker_b = actor();

    let job = engine.create_job(customer, sample_job()).await.unwrap();
    engine.accept_job(job.id, worker_a).await.unwrap();

    let err = engine.accept_job(job.id, worker_b).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyTaken));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Assignment untouched, exactly one ACCEPTED event.
    let job = engine.get_job(job.id, customer).await.unwrap();
    assert_eq!(job.assigned_worker, Some(worker_a));
    let events = engine.list_events(job.id, customer).await.unwrap();
    let accepted = events
        .iter()
        .filter(|e| e.kind == EventKind::Accepted)
        .count();
    assert_eq!(accepted, 1);
}

#[tokio::test]
async fn accept_on_unknown_job_is_a_conflict() {
    // The claim guard cannot tell "no such row" from "row not OPEN"; the
    // accept contract has a single failure outcome.
    let engine = test_engine();
    let err = engine.accept_job(JobId::new(), actor()).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyTaken));
}

#[tokio::test]
async fn any_authenticated_actor_may_accept() {
    // v1 behavior: no worker-role gate on accept, the creator included.
    let engine = test_engine();
    let customer = actor();
    let job = engine.create_job(customer, sample_job()).await.unwrap();

    let job = engine.accept_job(job.id, customer).await.unwrap();
    assert_eq!(job.status, Status::Locked);
    assert_eq!(job.assigned_worker, Some(customer));
}

// ---------------------------------------------------------------------------
// Start / complete authorization and preconditions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_by_non_assigned_worker_is_forbidden() {
    let engine = test_engine();
    let customer = actor();
    let worker_a = actor();
    let worker_b = actor();

    let job = engine.create_job(customer, sample_job()).await.unwrap();
    engine.accept_job(job.id, worker_a).await.unwrap();

    let err = engine.start_job(job.id, worker_b).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // Authorization comes from the stored assignment, and failing it
    // changes nothing.
    let job = engine.get_job(job.id, customer).await.unwrap();
    assert_eq!(job.status, Status::Locked);
    assert_eq!(engine.list_events(job.id, customer).await.unwrap().len(), 2);

    // The assigned worker still goes through.
    let job = engine.start_job(job.id, worker_a).await.unwrap();
    assert_eq!(job.status, Status::InProgress);
}

#[tokio::test]
async fn complete_before_start_conflicts_with_current_status() {
    let engine = test_engine();
    let customer = actor();
    let worker = actor();

    let job = engine.create_job(customer, sample_job()).await.unwrap();
    engine.accept_job(job.id, worker).await.unwrap();

    // Authorized actor, wrong status: conflict, not forbidden.
    let err = engine.complete_job(job.id, worker).await.unwrap_err();
    match err {
        Error::WrongStatus { current, .. } => assert_eq!(current, Status::Locked),
        other => panic!("expected WrongStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn start_on_missing_job_is_not_found() {
    let engine = test_engine();
    let err = engine.start_job(JobId::new(), actor()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn creator_cancels_open_job() {
    let engine = test_engine();
    let customer = actor();

    let job = engine.create_job(customer, sample_job()).await.unwrap();
    let job = engine.cancel_job(job.id, customer).await.unwrap();
    assert_eq!(job.status, Status::Canceled);
    assert_coupling(&job);

    let events = engine.list_events(job.id, customer).await.unwrap();
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Created, EventKind::Canceled]);
}

#[tokio::test]
async fn cancel_by_non_creator_is_forbidden() {
    let engine = test_engine();
    let customer = actor();
    let stranger = actor();

    let job = engine.create_job(customer, sample_job()).await.unwrap();
    let err = engine.cancel_job(job.id, stranger).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(
        engine.get_job(job.id, customer).await.unwrap().status,
        Status::Open
    );
}

#[tokio::test]
async fn cancel_conflicts_in_every_non_open_status() {
    let engine = test_engine();
    let customer = actor();
    let worker = actor();

    // Walk one job through LOCKED, IN_PROGRESS, COMPLETED, trying to cancel
    // at each stop; then a second job into CANCELED. State and event log
    // must be untouched by every failed attempt.
    let job = engine.create_job(customer, sample_job()).await.unwrap();
    engine.accept_job(job.id, worker).await.unwrap();

    for advance in [true, true, false] {
        let before = engine.list_events(job.id, customer).await.unwrap().len();
        let status = engine.get_job(job.id, customer).await.unwrap().status;

        let err = engine.cancel_job(job.id, customer).await.unwrap_err();
        match err {
            Error::WrongStatus { current, .. } => assert_eq!(current, status),
            other => panic!("expected WrongStatus at {status}, got {other:?}"),
        }
        let after = engine.get_job(job.id, customer).await.unwrap();
        assert_eq!(after.status, status);
        assert_eq!(
            engine.list_events(job.id, customer).await.unwrap().len(),
            before
        );

        if advance {
            if status == Status::Locked {
                engine.start_job(job.id, worker).await.unwrap();
            } else {
                engine.complete_job(job.id, worker).await.unwrap();
            }
        }
    }

    // Canceling a canceled job conflicts too.
    let job2 = engine.create_job(customer, sample_job()).await.unwrap();
    engine.cancel_job(job2.id, customer).await.unwrap();
    let err = engine.cancel_job(job2.id, customer).await.unwrap_err();
    match err {
        Error::WrongStatus { current, .. } => assert_eq!(current, Status::Canceled),
        other => panic!("expected WrongStatus, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Reads: get_job and the event log
// ---------------------------------------------------------------------------

#[tokio::test]
async fn open_jobs_are_visible_to_anyone_then_close_up() {
    let engine = test_engine();
    let customer = actor();
    let worker = actor();
    let stranger = actor();

    let job = engine.create_job(customer, sample_job()).await.unwrap();
    assert!(engine.get_job(job.id, stranger).await.is_ok());

    engine.accept_job(job.id, worker).await.unwrap();
    let err = engine.get_job(job.id, stranger).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // The parties still see it.
    assert!(engine.get_job(job.id, customer).await.is_ok());
    assert!(engine.get_job(job.id, worker).await.is_ok());
}

#[tokio::test]
async fn get_job_on_missing_id_is_not_found() {
    let engine = test_engine();
    let err = engine.get_job(JobId::new(), actor()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn event_log_is_parties_only() {
    let engine = test_engine();
    let customer = actor();
    let worker = actor();
    let stranger = actor();

    let job = engine.create_job(customer, sample_job()).await.unwrap();

    // Creator can read before any worker is assigned.
    assert!(engine.list_events(job.id, customer).await.is_ok());
    // A third actor cannot, even while the job itself is publicly OPEN.
    let err = engine.list_events(job.id, stranger).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    engine.accept_job(job.id, worker).await.unwrap();
    assert!(engine.list_events(job.id, worker).await.is_ok());
    assert!(
        engine.list_events(job.id, stranger).await.is_err(),
        "assignment must not widen access for strangers"
    );
}

// ---------------------------------------------------------------------------
// Dispatch feed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dispatch_feed_lists_open_emergencies_newest_first() {
    let engine = test_engine();
    let customer = actor();
    let worker = actor();

    let normal = engine.create_job(customer, sample_job()).await.unwrap();
    let older = engine
        .create_emergency_job(customer, sample_job())
        .await
        .unwrap();
    let claimed = engine
        .create_emergency_job(customer, sample_job())
        .await
        .unwrap();
    engine.accept_job(claimed.id, worker).await.unwrap();
    let newer = engine
        .create_emergency_job(customer, sample_job())
        .await
        .unwrap();

    let feed = engine.list_open_emergencies().await.unwrap();
    let ids: Vec<_> = feed.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
    assert!(!ids.contains(&normal.id), "normal jobs stay off the feed");
    assert!(!ids.contains(&claimed.id), "claimed jobs leave the feed");
}
