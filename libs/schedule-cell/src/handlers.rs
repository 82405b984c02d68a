use axum::{
    extract::{Path, State, Extension},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{ScheduleError, UpdateBlockRequest, UpsertBlockRequest, WeeklyAvailabilityBlock};
use crate::router::ScheduleState;

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::InvalidInput(msg) => AppError::ValidationError(msg),
            ScheduleError::NotFound => AppError::NotFound("Schedule block not found".to_string()),
            ScheduleError::NotAuthorized => AppError::Forbidden("Not authorized to modify this schedule block".to_string()),
            ScheduleError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

#[axum::debug_handler]
pub async fn get_my_schedule(
    State(state): State<ScheduleState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<WeeklyAvailabilityBlock>>, AppError> {
    require_role(&user, &[Role::Professional])?;

    let blocks = state.service.list_blocks(user.id).await?;
    Ok(Json(blocks))
}

#[axum::debug_handler]
pub async fn upsert_my_schedule(
    State(state): State<ScheduleState>,
    Extension(user): Extension<User>,
    Json(entries): Json<Vec<UpsertBlockRequest>>,
) -> Result<Json<Vec<WeeklyAvailabilityBlock>>, AppError> {
    require_role(&user, &[Role::Professional])?;

    let blocks = state.service.upsert_blocks(user.id, entries).await?;
    Ok(Json(blocks))
}

#[axum::debug_handler]
pub async fn update_schedule_block(
    State(state): State<ScheduleState>,
    Path(block_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateBlockRequest>,
) -> Result<Json<WeeklyAvailabilityBlock>, AppError> {
    require_role(&user, &[Role::Professional])?;

    let block = state.service.update_block(block_id, user.id, request).await?;
    Ok(Json(block))
}

#[axum::debug_handler]
pub async fn delete_schedule_block(
    State(state): State<ScheduleState>,
    Path(block_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Professional])?;

    state.service.delete_block(block_id, user.id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Schedule block deleted"
    })))
}
