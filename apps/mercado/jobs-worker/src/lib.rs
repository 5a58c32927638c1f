//! Jobs Worker Service
//!
//! One process hosts one worker per queue, each with its own concurrency:
//!
//! ```text
//! Redis Streams (activity_log, notification_*, email)
//!   ↓ (consumer groups)
//! StreamWorker per queue
//!   ├─ activity_log            → Postgres insert + cache invalidation
//!   ├─ notification_created    → pub/sub fan-out (NEW_NOTIFICATION)
//!   ├─ notification_read       → pub/sub fan-out (NOTIFICATION_READ)
//!   ├─ notification_read_all   → pub/sub fan-out (ALL_NOTIFICATIONS_READ)
//!   ├─ notification_batch_...  → log-only terminal sink
//!   └─ email                   → pooled SMTP transport
//! ```
//!
//! SIGINT/SIGTERM stop all workers: each stops reading new entries and
//! drains its in-flight jobs before the process exits. A hard deadline, if
//! wanted, belongs to the supervisor (e.g. Kubernetes
//! terminationGracePeriodSeconds), not to the queues.

use axum::Router;
use cache::Cache;
use core_config::{Environment, FromEnv, app_info};
use core_config::database::PostgresConfig;
use core_config::redis::RedisConfig;
use core_config::smtp::SmtpConfig;
use domain_activity_log::{ActivityLogProcessor, ActivityLogStream, PgActivityLogRepository};
use domain_activity_log::models::ActivityLogJob;
use domain_notifications::{
    FanoutPublisher, NotificationBatchJob, NotificationBatchProcessor, NotificationBatchStream,
    NotificationCreatedJob, NotificationCreatedProcessor, NotificationCreatedStream,
    NotificationReadAllJob, NotificationReadAllProcessor, NotificationReadAllStream,
    NotificationReadJob, NotificationReadProcessor, NotificationReadStream,
};
use email::{EmailJob, EmailProcessor, EmailStream, SmtpProvider, TemplateEngine};
use eyre::{Result, WrapErr};
use stream_worker::{HealthState, StreamWorker, WorkerConfig, health_router, init_metrics};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Serve liveness/readiness probes, queue info, Prometheus metrics and the
/// DLQ admin endpoints.
async fn start_health_server(health_state: HealthState, port: u16) -> Result<()> {
    let app: Router = health_router(health_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(port = %port, "Health and admin server listening");

    axum::serve(listener, app)
        .await
        .wrap_err("Health server failed")?;

    Ok(())
}

/// Run the worker host.
///
/// # Errors
///
/// Returns an error if configuration is invalid, a backing connection
/// cannot be established, or a worker exits with a fatal error.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    init_metrics();

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, "Starting jobs worker service");
    info!("Environment: {:?}", environment);

    let health_port: u16 = std::env::var("HEALTH_PORT")
        .unwrap_or_else(|_| "8082".to_string())
        .parse()
        .unwrap_or(8082);

    // Backing connections, all established before any worker starts
    let redis_config = RedisConfig::from_env().wrap_err("Failed to load Redis configuration")?;
    info!("Connecting to Redis...");
    let redis = database::redis::connect_from_config_with_retry(&redis_config, None)
        .await
        .wrap_err("Failed to connect to Redis")?;

    let pg_config = PostgresConfig::from_env().wrap_err("Failed to load PostgreSQL configuration")?;
    info!("Connecting to PostgreSQL...");
    let db = database::postgres::connect_from_config_with_retry(&pg_config, None)
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;

    let smtp_config = SmtpConfig::from_env().wrap_err("Failed to load SMTP configuration")?;
    let smtp_provider =
        SmtpProvider::new(smtp_config).wrap_err("Failed to build SMTP transport")?;

    // Shared collaborators
    let cache = Cache::new(redis.clone());
    let publisher = FanoutPublisher::new(redis.clone());

    // Shutdown: first signal flips the watch channel for every worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    let health_state = HealthState::new(redis.clone(), app_info.name, app_info.version);
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, health_port).await {
            error!(error = %e, "Health server failed");
        }
    });

    // The explicit worker registry: every queue, its processor and its
    // concurrency, constructed in one place
    let mut workers: JoinSet<Result<()>> = JoinSet::new();

    {
        let processor =
            ActivityLogProcessor::new(PgActivityLogRepository::new(db.clone()), cache.clone());
        // Concurrency stays below the database pool to avoid exhausting it
        let config = WorkerConfig::from_stream_def::<ActivityLogStream>()
            .with_blocking(Some(1000))
            .with_batch_size(20)
            .with_max_concurrent_jobs(4);
        let worker = StreamWorker::<ActivityLogJob, _>::new(redis.clone(), processor, config);
        let shutdown = shutdown_rx.clone();
        workers.spawn(async move {
            worker.run(shutdown).await.wrap_err("activity_log worker failed")
        });
    }

    {
        let processor = NotificationCreatedProcessor::new(publisher.clone());
        let config = WorkerConfig::from_stream_def::<NotificationCreatedStream>()
            .with_blocking(Some(1000))
            .with_batch_size(50)
            .with_max_concurrent_jobs(8);
        let worker =
            StreamWorker::<NotificationCreatedJob, _>::new(redis.clone(), processor, config);
        let shutdown = shutdown_rx.clone();
        workers.spawn(async move {
            worker.run(shutdown).await.wrap_err("notification_created worker failed")
        });
    }

    {
        let processor = NotificationReadProcessor::new(publisher.clone());
        let config = WorkerConfig::from_stream_def::<NotificationReadStream>()
            .with_blocking(Some(1000))
            .with_batch_size(50)
            .with_max_concurrent_jobs(8);
        let worker = StreamWorker::<NotificationReadJob, _>::new(redis.clone(), processor, config);
        let shutdown = shutdown_rx.clone();
        workers.spawn(async move {
            worker.run(shutdown).await.wrap_err("notification_read worker failed")
        });
    }

    {
        let processor = NotificationReadAllProcessor::new(publisher.clone());
        let config = WorkerConfig::from_stream_def::<NotificationReadAllStream>()
            .with_blocking(Some(1000))
            .with_batch_size(50)
            .with_max_concurrent_jobs(8);
        let worker =
            StreamWorker::<NotificationReadAllJob, _>::new(redis.clone(), processor, config);
        let shutdown = shutdown_rx.clone();
        workers.spawn(async move {
            worker.run(shutdown).await.wrap_err("notification_read_all worker failed")
        });
    }

    {
        let processor = NotificationBatchProcessor::new();
        let config = WorkerConfig::from_stream_def::<NotificationBatchStream>()
            .with_blocking(Some(1000))
            .with_max_concurrent_jobs(1);
        let worker = StreamWorker::<NotificationBatchJob, _>::new(redis.clone(), processor, config);
        let shutdown = shutdown_rx.clone();
        workers.spawn(async move {
            worker.run(shutdown).await.wrap_err("notification_batch worker failed")
        });
    }

    {
        let processor = EmailProcessor::new(smtp_provider, TemplateEngine::new()?);
        // Claim idle above the worst-case backoff (5s * 2^3 = 40s) so a
        // waiting retry is not re-delivered to a sibling consumer
        let config = WorkerConfig::from_stream_def::<EmailStream>()
            .with_blocking(Some(1000))
            .with_batch_size(10)
            .with_max_concurrent_jobs(5)
            .with_claim_idle_ms(120_000);
        let worker = StreamWorker::<EmailJob, _>::new(redis.clone(), processor, config);
        let shutdown = shutdown_rx.clone();
        workers.spawn(async move {
            worker.run(shutdown).await.wrap_err("email worker failed")
        });
    }

    info!("All workers started");

    // Drain: every worker finishes its in-flight jobs before we exit
    while let Some(result) = workers.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Worker exited with error"),
            Err(e) => error!(error = %e, "Worker task panicked"),
        }
    }

    info!("Jobs worker service stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}
