use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    BlockDraft, ScheduleError, UpdateBlockRequest, UpsertBlockRequest,
    WeeklyAvailabilityBlock, validate_range,
};
use crate::store::ScheduleStore;

/// Professional self-service over weekly availability blocks.
#[derive(Clone)]
pub struct ScheduleService {
    store: Arc<dyn ScheduleStore>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    pub async fn list_blocks(&self, professional_id: Uuid) -> Result<Vec<WeeklyAvailabilityBlock>, ScheduleError> {
        debug!("Listing schedule blocks for professional {}", professional_id);
        Ok(self.store.list_blocks(professional_id).await?)
    }

    /// Insert or replace one block per weekday. Every entry is validated
    /// before anything is written, so a bad entry leaves the schedule untouched.
    pub async fn upsert_blocks(
        &self,
        professional_id: Uuid,
        entries: Vec<UpsertBlockRequest>,
    ) -> Result<Vec<WeeklyAvailabilityBlock>, ScheduleError> {
        let drafts = validate_batch(&entries)?;

        let blocks = self.store.upsert_blocks(professional_id, &drafts).await?;
        info!("Saved {} schedule blocks for professional {}", blocks.len(), professional_id);
        Ok(blocks)
    }

    pub async fn update_block(
        &self,
        block_id: Uuid,
        requesting_user_id: Uuid,
        request: UpdateBlockRequest,
    ) -> Result<WeeklyAvailabilityBlock, ScheduleError> {
        let mut block = self.owned_block(block_id, requesting_user_id).await?;

        if let Some(start) = request.start_time {
            block.start_time = start;
        }
        if let Some(end) = request.end_time {
            block.end_time = end;
        }
        if let Some(available) = request.is_available {
            block.is_available = available;
        }
        validate_range(&block.start_time, &block.end_time)?;

        Ok(self.store.update_block(&block).await?)
    }

    pub async fn delete_block(&self, block_id: Uuid, requesting_user_id: Uuid) -> Result<(), ScheduleError> {
        self.owned_block(block_id, requesting_user_id).await?;
        self.store.delete_block(block_id).await?;
        info!("Deleted schedule block {}", block_id);
        Ok(())
    }

    async fn owned_block(
        &self,
        block_id: Uuid,
        requesting_user_id: Uuid,
    ) -> Result<WeeklyAvailabilityBlock, ScheduleError> {
        let block = self.store.find_block(block_id).await?.ok_or(ScheduleError::NotFound)?;

        if block.professional_id != requesting_user_id {
            warn!("User {} attempted to modify schedule block {} it does not own", requesting_user_id, block_id);
            return Err(ScheduleError::NotAuthorized);
        }
        Ok(block)
    }
}

fn validate_batch(entries: &[UpsertBlockRequest]) -> Result<Vec<BlockDraft>, ScheduleError> {
    let mut seen_days = HashSet::new();
    let mut drafts = Vec::with_capacity(entries.len());

    for entry in entries {
        let draft = entry.validate()?;
        if !seen_days.insert(draft.day_of_week) {
            return Err(ScheduleError::InvalidInput(format!(
                "Day of week {} appears more than once in the request",
                draft.day_of_week
            )));
        }
        drafts.push(draft);
    }

    Ok(drafts)
}
