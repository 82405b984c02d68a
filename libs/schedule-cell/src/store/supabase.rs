use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DbError, SupabaseClient};

use crate::models::{truncate_to_hhmm, BlockDraft, WeeklyAvailabilityBlock};
use super::{in_draft_order, ScheduleStore};

const TABLE: &str = "/rest/v1/schedules";

/// Row shape of the `schedules` table, unique on (professional_id, day_of_week).
#[derive(Debug, Serialize, Deserialize)]
struct ScheduleRow {
    id: Uuid,
    professional_id: Uuid,
    day_of_week: u8,
    start_time: String,
    end_time: String,
    is_available: bool,
}

impl From<ScheduleRow> for WeeklyAvailabilityBlock {
    fn from(row: ScheduleRow) -> Self {
        Self {
            id: row.id,
            professional_id: row.professional_id,
            day_of_week: row.day_of_week,
            start_time: truncate_to_hhmm(row.start_time),
            end_time: truncate_to_hhmm(row.end_time),
            is_available: row.is_available,
        }
    }
}

fn into_blocks(rows: Vec<ScheduleRow>) -> Vec<WeeklyAvailabilityBlock> {
    rows.into_iter().map(WeeklyAvailabilityBlock::from).collect()
}

pub struct SupabaseScheduleStore {
    supabase: SupabaseClient,
}

impl SupabaseScheduleStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl ScheduleStore for SupabaseScheduleStore {
    async fn list_blocks(&self, professional_id: Uuid) -> Result<Vec<WeeklyAvailabilityBlock>, DbError> {
        debug!("Fetching schedule for professional: {}", professional_id);

        let path = format!("{}?professional_id=eq.{}&order=day_of_week.asc", TABLE, professional_id);
        let rows: Vec<ScheduleRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(into_blocks(rows))
    }

    async fn active_blocks_for_day(
        &self,
        professional_id: Uuid,
        day_of_week: u8,
    ) -> Result<Vec<WeeklyAvailabilityBlock>, DbError> {
        let path = format!(
            "{}?professional_id=eq.{}&day_of_week=eq.{}&is_available=eq.true&order=start_time.asc",
            TABLE, professional_id, day_of_week
        );
        let rows: Vec<ScheduleRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(into_blocks(rows))
    }

    async fn upsert_blocks(
        &self,
        professional_id: Uuid,
        drafts: &[BlockDraft],
    ) -> Result<Vec<WeeklyAvailabilityBlock>, DbError> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Upserting {} schedule blocks for professional {}", drafts.len(), professional_id);

        // A bulk upsert is a single statement, so the batch commits atomically.
        let body: Vec<Value> = drafts
            .iter()
            .map(|draft| json!({
                "professional_id": professional_id,
                "day_of_week": draft.day_of_week,
                "start_time": draft.start_time,
                "end_time": draft.end_time,
                "is_available": draft.is_available,
            }))
            .collect();

        let path = format!("{}?on_conflict=professional_id,day_of_week", TABLE);
        let rows: Vec<ScheduleRow> = self.supabase.request_with_headers(
            Method::POST,
            &path,
            Some(Value::Array(body)),
            Some(SupabaseClient::upsert_headers()),
        ).await?;

        Ok(in_draft_order(drafts, into_blocks(rows)))
    }

    async fn find_block(&self, id: Uuid) -> Result<Option<WeeklyAvailabilityBlock>, DbError> {
        let path = format!("{}?id=eq.{}", TABLE, id);
        let rows: Vec<ScheduleRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next().map(WeeklyAvailabilityBlock::from))
    }

    async fn update_block(&self, block: &WeeklyAvailabilityBlock) -> Result<WeeklyAvailabilityBlock, DbError> {
        let path = format!("{}?id=eq.{}", TABLE, block.id);
        let rows: Vec<ScheduleRow> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(json!({
                "start_time": block.start_time,
                "end_time": block.end_time,
                "is_available": block.is_available,
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        rows.into_iter()
            .next()
            .map(WeeklyAvailabilityBlock::from)
            .ok_or_else(|| DbError::NotFound(format!("schedule block {}", block.id)))
    }

    async fn delete_block(&self, id: Uuid) -> Result<(), DbError> {
        let path = format!("{}?id=eq.{}", TABLE, id);
        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;
        Ok(())
    }
}
