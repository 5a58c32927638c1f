//! Jobs Worker Service - Entry Point
//!
//! Background worker host that drains every marketplace job queue.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    mercado_jobs_worker::run().await
}
