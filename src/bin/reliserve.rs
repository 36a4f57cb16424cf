//! reliserve CLI — operator interface to the job lifecycle engine.

use clap::{Parser, Subcommand};
use reliserve::config::Config;
use reliserve::engine::Engine;
use reliserve::error::ErrorKind;
use reliserve::event::JobEvent;
use reliserve::model::{ActorId, Job, JobId, NewJob};
use reliserve::store::PgStore;
use reliserve::telemetry::{TelemetryConfig, init_telemetry};
use secrecy::ExposeSecret;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "reliserve", about = "Job assignment and lifecycle engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Job operations
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
    /// Check database connectivity
    Health,
}

#[derive(Subcommand)]
enum JobAction {
    /// Post a new job
    Create {
        /// Acting customer ID
        #[arg(long)]
        actor: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// Trade category (e.g. plumbing)
        #[arg(long, name = "type")]
        job_type: String,
        #[arg(long)]
        emergency: bool,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        price_min: Option<i64>,
        #[arg(long)]
        price_max: Option<i64>,
        /// Scope text locked in at creation
        #[arg(long)]
        scope: Option<String>,
    },
    /// Post an emergency job (title defaults to "Emergency - <type>")
    Emergency {
        #[arg(long)]
        actor: Uuid,
        #[arg(long)]
        description: String,
        #[arg(long, name = "type")]
        job_type: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        price_min: Option<i64>,
        #[arg(long)]
        price_max: Option<i64>,
        #[arg(long)]
        scope: Option<String>,
    },
    /// Claim an open job (first to succeed wins)
    Accept {
        id: Uuid,
        #[arg(long)]
        actor: Uuid,
    },
    /// Start a claimed job (assigned worker only)
    Start {
        id: Uuid,
        #[arg(long)]
        actor: Uuid,
    },
    /// Complete a started job (assigned worker only)
    Complete {
        id: Uuid,
        #[arg(long)]
        actor: Uuid,
    },
    /// Cancel an open job (creator only)
    Cancel {
        id: Uuid,
        #[arg(long)]
        actor: Uuid,
    },
    /// Show a job
    Show {
        id: Uuid,
        #[arg(long)]
        actor: Uuid,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a job's event log
    Events {
        id: Uuid,
        #[arg(long)]
        actor: Uuid,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List open emergency jobs (dispatch feed, newest first)
    Requests,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "reliserve".to_string(),
    })?;

    let store = PgStore::connect(config.database_url.expose_secret()).await?;
    store.migrate().await?;

    match cli.command {
        Command::Health => {
            store.health_check().await?;
            println!("ok");
            Ok(())
        }
        Command::Job { action } => {
            let engine = Engine::new(store);
            match run_job_action(&engine, action).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    // Keep the outcome classes distinct for scripts.
                    let class = match e.kind() {
                        ErrorKind::NotFound => "not found",
                        ErrorKind::Forbidden => "forbidden",
                        ErrorKind::Conflict => "conflict",
                        ErrorKind::Validation => "invalid input",
                        ErrorKind::Unauthorized => "unauthorized",
                        ErrorKind::Internal => "error",
                    };
                    anyhow::bail!("{class}: {e}")
                }
            }
        }
    }
}

async fn run_job_action(
    engine: &Engine<PgStore>,
    action: JobAction,
) -> reliserve::error::Result<()> {
    match action {
        JobAction::Create {
            actor,
            title,
            description,
            job_type,
            emergency,
            location,
            price_min,
            price_max,
            scope,
        } => {
            let mut new = NewJob::new(title, description, job_type);
            new = apply_common(new, location, price_min, price_max, scope);
            let job = if emergency {
                engine.create_emergency_job(ActorId(actor), new).await?
            } else {
                engine.create_job(ActorId(actor), new).await?
            };
            println!("Created: {} (status: {})", job.id, job.status);
            Ok(())
        }
        JobAction::Emergency {
            actor,
            description,
            job_type,
            location,
            price_min,
            price_max,
            scope,
        } => {
            let mut new = NewJob::emergency(description, job_type);
            new = apply_common(new, location, price_min, price_max, scope);
            let job = engine.create_emergency_job(ActorId(actor), new).await?;
            println!("Created: {} (status: {})", job.id, job.status);
            Ok(())
        }
        JobAction::Accept { id, actor } => {
            let job = engine.accept_job(JobId(id), ActorId(actor)).await?;
            println!("Claimed: {} (status: {})", job.id, job.status);
            Ok(())
        }
        JobAction::Start { id, actor } => {
            let job = engine.start_job(JobId(id), ActorId(actor)).await?;
            println!("Started: {} (status: {})", job.id, job.status);
            Ok(())
        }
        JobAction::Complete { id, actor } => {
            let job = engine.complete_job(JobId(id), ActorId(actor)).await?;
            println!("Completed: {} (status: {})", job.id, job.status);
            Ok(())
        }
        JobAction::Cancel { id, actor } => {
            let job = engine.cancel_job(JobId(id), ActorId(actor)).await?;
            println!("Canceled: {} (status: {})", job.id, job.status);
            Ok(())
        }
        JobAction::Show { id, actor, json } => {
            let job = engine.get_job(JobId(id), ActorId(actor)).await?;
            if json {
                println!("{}", pretty(&job)?);
            } else {
                print_job(&job);
            }
            Ok(())
        }
        JobAction::Events { id, actor, json } => {
            let events = engine.list_events(JobId(id), ActorId(actor)).await?;
            if json {
                println!("{}", pretty(&events)?);
            } else {
                print_events(&events);
            }
            Ok(())
        }
        JobAction::Requests => {
            let jobs = engine.list_open_emergencies().await?;
            if jobs.is_empty() {
                println!("No open emergency jobs.");
                return Ok(());
            }
            println!(
                "{:<8}  {:<12}  {:<10}  {:<30}  CREATED",
                "ID", "TYPE", "STATUS", "TITLE"
            );
            println!("{}", "-".repeat(90));
            for job in &jobs {
                let title = if job.title.len() > 30 {
                    &job.title[..30]
                } else {
                    &job.title
                };
                println!(
                    "{:<8}  {:<12}  {:<10}  {:<30}  {}",
                    job.id,
                    job.job_type,
                    job.status,
                    title,
                    job.created_at.format("%Y-%m-%d %H:%M")
                );
            }
            println!("\n{} job(s)", jobs.len());
            Ok(())
        }
    }
}

fn pretty<T: serde::Serialize>(value: &T) -> reliserve::error::Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| reliserve::error::Error::Other(format!("serialize failed: {e}")))
}

fn apply_common(
    mut new: NewJob,
    location: Option<String>,
    price_min: Option<i64>,
    price_max: Option<i64>,
    scope: Option<String>,
) -> NewJob {
    if let Some(text) = location {
        new = new.location_text(text);
    }
    if let (Some(min), Some(max)) = (price_min, price_max) {
        new = new.price_range(min, max);
    }
    if let Some(scope) = scope {
        new = new.locked_scope(scope);
    }
    new
}

fn print_job(job: &Job) {
    println!("ID:         {}", job.id.0);
    println!("Title:      {}", job.title);
    println!("Type:       {}", job.job_type);
    println!("Urgency:    {}", job.urgency);
    println!("Status:     {}", job.status);
    println!("Creator:    {}", job.created_by.0);
    println!(
        "Worker:     {}",
        job.assigned_worker
            .map(|w| w.0.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    if let Some(ref text) = job.location_text {
        println!("Location:   {text}");
    }
    if let (Some(min), Some(max)) = (job.price_min, job.price_max) {
        println!("Price:      {min}-{max}");
    }
    if let Some(ref scope) = job.locked_scope {
        println!("Scope:      {scope}");
    }
    println!("Created:    {}", job.created_at);
    println!("Updated:    {}", job.updated_at);
}

fn print_events(events: &[JobEvent]) {
    if events.is_empty() {
        println!("No events.");
        return;
    }
    for event in events {
        println!(
            "{}  {:<10}  actor {}  {}",
            event.created_at.format("%Y-%m-%d %H:%M:%S"),
            event.kind.to_string(),
            event.actor_id,
            event.note.as_deref().unwrap_or("-")
        );
    }
}
