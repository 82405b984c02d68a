use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::DbError;

use crate::models::{BlockDraft, WeeklyAvailabilityBlock};
use super::{in_draft_order, ScheduleStore};

/// Process-local backend used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    blocks: RwLock<HashMap<Uuid, WeeklyAvailabilityBlock>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn list_blocks(&self, professional_id: Uuid) -> Result<Vec<WeeklyAvailabilityBlock>, DbError> {
        let blocks = self.blocks.read().await;
        let mut result: Vec<_> = blocks
            .values()
            .filter(|b| b.professional_id == professional_id)
            .cloned()
            .collect();
        result.sort_by_key(|b| b.day_of_week);
        Ok(result)
    }

    async fn active_blocks_for_day(
        &self,
        professional_id: Uuid,
        day_of_week: u8,
    ) -> Result<Vec<WeeklyAvailabilityBlock>, DbError> {
        let blocks = self.blocks.read().await;
        let mut result: Vec<_> = blocks
            .values()
            .filter(|b| b.professional_id == professional_id && b.day_of_week == day_of_week && b.is_available)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(result)
    }

    async fn upsert_blocks(
        &self,
        professional_id: Uuid,
        drafts: &[BlockDraft],
    ) -> Result<Vec<WeeklyAvailabilityBlock>, DbError> {
        let mut blocks = self.blocks.write().await;
        let mut written = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let existing_id = blocks
                .values()
                .find(|b| b.professional_id == professional_id && b.day_of_week == draft.day_of_week)
                .map(|b| b.id);

            let block = WeeklyAvailabilityBlock {
                id: existing_id.unwrap_or_else(Uuid::new_v4),
                professional_id,
                day_of_week: draft.day_of_week,
                start_time: draft.start_time.clone(),
                end_time: draft.end_time.clone(),
                is_available: draft.is_available,
            };
            blocks.insert(block.id, block.clone());
            written.push(block);
        }

        Ok(in_draft_order(drafts, written))
    }

    async fn find_block(&self, id: Uuid) -> Result<Option<WeeklyAvailabilityBlock>, DbError> {
        Ok(self.blocks.read().await.get(&id).cloned())
    }

    async fn update_block(&self, block: &WeeklyAvailabilityBlock) -> Result<WeeklyAvailabilityBlock, DbError> {
        let mut blocks = self.blocks.write().await;
        match blocks.get_mut(&block.id) {
            Some(slot) => {
                *slot = block.clone();
                Ok(block.clone())
            }
            None => Err(DbError::NotFound(format!("schedule block {}", block.id))),
        }
    }

    async fn delete_block(&self, id: Uuid) -> Result<(), DbError> {
        self.blocks.write().await.remove(&id);
        Ok(())
    }
}
