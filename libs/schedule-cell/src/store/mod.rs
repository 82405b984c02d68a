use async_trait::async_trait;
use uuid::Uuid;

use shared_database::DbError;

use crate::models::{BlockDraft, WeeklyAvailabilityBlock};

mod memory;
mod supabase;

pub use memory::InMemoryScheduleStore;
pub use supabase::SupabaseScheduleStore;

/// Persistence boundary for weekly availability blocks. Backends must enforce
/// uniqueness of (professional_id, day_of_week).
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// All blocks of a professional, ordered by day of week.
    async fn list_blocks(&self, professional_id: Uuid) -> Result<Vec<WeeklyAvailabilityBlock>, DbError>;

    /// Active blocks for one weekday, ordered by start time.
    async fn active_blocks_for_day(
        &self,
        professional_id: Uuid,
        day_of_week: u8,
    ) -> Result<Vec<WeeklyAvailabilityBlock>, DbError>;

    /// Insert-or-replace every draft keyed on (professional_id, day_of_week)
    /// as one write. Rows come back in draft order.
    async fn upsert_blocks(
        &self,
        professional_id: Uuid,
        drafts: &[BlockDraft],
    ) -> Result<Vec<WeeklyAvailabilityBlock>, DbError>;

    async fn find_block(&self, id: Uuid) -> Result<Option<WeeklyAvailabilityBlock>, DbError>;

    async fn update_block(&self, block: &WeeklyAvailabilityBlock) -> Result<WeeklyAvailabilityBlock, DbError>;

    async fn delete_block(&self, id: Uuid) -> Result<(), DbError>;
}

/// Restore the caller's draft order on rows returned by a bulk write.
pub(crate) fn in_draft_order(
    drafts: &[BlockDraft],
    mut rows: Vec<WeeklyAvailabilityBlock>,
) -> Vec<WeeklyAvailabilityBlock> {
    rows.sort_by_key(|row| {
        drafts
            .iter()
            .position(|d| d.day_of_week == row.day_of_week)
            .unwrap_or(usize::MAX)
    });
    rows
}
