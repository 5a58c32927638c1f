//! End-to-end email queue tests against a real Redis.

use std::time::{Duration, Instant};

use email::{EmailJob, EmailProcessor, EmailStream, MockSmtpProvider, TemplateEngine};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde_json::json;
use stream_worker::{JobDispatcher, StreamDef, StreamWorker, WorkerConfig};
use test_utils::TestRedis;
use tokio::sync::watch;

async fn connection_manager(redis: &TestRedis) -> ConnectionManager {
    let client = redis::Client::open(redis.connection_string()).expect("client");
    ConnectionManager::new(client).await.expect("manager")
}

fn spawn_email_worker(
    manager: ConnectionManager,
    provider: MockSmtpProvider,
) -> (tokio::task::JoinHandle<()>, watch::Sender<bool>) {
    let processor = EmailProcessor::new(provider, TemplateEngine::new().unwrap());

    // Worker concurrency mirrors production: five emails in flight
    let config = WorkerConfig::from_stream_def::<EmailStream>()
        .with_blocking(None)
        .with_poll_interval_ms(100)
        .with_max_concurrent_jobs(5);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = StreamWorker::new(manager, processor, config);
    let handle = tokio::spawn(async move {
        worker.run(shutdown_rx).await.expect("worker run");
    });

    (handle, shutdown_tx)
}

async fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_job_missing_recipient_completes_without_retry() {
    let redis = TestRedis::new().await;
    let manager = connection_manager(&redis).await;

    let provider = MockSmtpProvider::new();
    let (handle, shutdown) = spawn_email_worker(manager.clone(), provider.clone());

    let dispatcher = JobDispatcher::new(manager.clone());
    let job: EmailJob =
        serde_json::from_str(r#"{"template":"welcome","data":{"name":"Ana"}}"#).unwrap();
    dispatcher.enqueue(&job).await.expect("enqueue");

    // Removed per remove-on-complete, never sent, never dead-lettered
    let mut conn = manager.clone();
    assert!(
        wait_until(Duration::from_secs(10), || {
            let mut conn = conn.clone();
            tokio::task::block_in_place(|| {
                tokio::runtime::Handle::current().block_on(async move {
                    let len: i64 = conn.xlen(EmailStream::STREAM_NAME).await.unwrap_or(-1);
                    len == 0
                })
            })
        })
        .await,
        "skipped job was not removed"
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(provider.sent().is_empty());

    let dlq_len: i64 = conn.xlen(EmailStream::DLQ_STREAM).await.unwrap_or(0);
    assert_eq!(dlq_len, 0);

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_email_jobs_both_complete() {
    let redis = TestRedis::new().await;
    let manager = connection_manager(&redis).await;

    let provider = MockSmtpProvider::new();
    let (handle, shutdown) = spawn_email_worker(manager.clone(), provider.clone());

    let dispatcher = JobDispatcher::new(manager.clone());
    dispatcher
        .enqueue(&EmailJob::new(
            "welcome",
            "first@example.com",
            json!({"name": "First", "storeName": "Mercado"}),
        ))
        .await
        .expect("enqueue first");
    dispatcher
        .enqueue(&EmailJob::new(
            "order_confirmation",
            "second@example.com",
            json!({"name": "Second", "orderId": "o7", "total": "R$ 10,00"}),
        ))
        .await
        .expect("enqueue second");

    assert!(
        wait_until(Duration::from_secs(10), || provider.sent().len() == 2).await,
        "both sends should complete in either order"
    );

    let mut recipients: Vec<String> = provider.sent().iter().map(|e| e.to.clone()).collect();
    recipients.sort();
    assert_eq!(recipients, vec!["first@example.com", "second@example.com"]);

    shutdown.send(true).unwrap();
    handle.await.unwrap();
}
