//! PostgreSQL implementation of the activity log repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::debug;

use crate::entity;
use crate::error::ActivityLogError;
use crate::models::{ActivityLogEntry, ActivityLogJob};
use crate::repository::ActivityLogRepository;

#[derive(Clone)]
pub struct PgActivityLogRepository {
    db: DatabaseConnection,
}

impl PgActivityLogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivityLogRepository for PgActivityLogRepository {
    async fn insert(&self, job: &ActivityLogJob) -> Result<ActivityLogEntry, ActivityLogError> {
        let model = entity::ActiveModel {
            id: Set(job.id),
            user_id: Set(job.user_id.clone()),
            session_id: Set(job.session_id.clone()),
            activity_type: Set(job.activity_type.clone()),
            entity_type: Set(job.entity_type.clone()),
            entity_id: Set(job.entity_id.clone()),
            description: Set(job.description.clone()),
            ip_address: Set(job.ip_address.clone()),
            user_agent: Set(job.user_agent.clone()),
            metadata: Set(job.metadata.clone()),
            created_at: Set(Utc::now()),
        };

        let inserted = model.insert(&self.db).await?;

        debug!(
            entry_id = %inserted.id,
            activity_type = %inserted.activity_type,
            "Inserted activity log row"
        );

        Ok(ActivityLogEntry {
            id: inserted.id,
            user_id: inserted.user_id,
            session_id: inserted.session_id,
            activity_type: inserted.activity_type,
            entity_type: inserted.entity_type,
            entity_id: inserted.entity_id,
            description: inserted.description,
            ip_address: inserted.ip_address,
            user_agent: inserted.user_agent,
            metadata: inserted.metadata,
            created_at: inserted.created_at,
        })
    }
}
