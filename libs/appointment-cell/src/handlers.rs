// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{
    Appointment, AppointmentError, AvailabilityResponse, CreateAppointmentRequest,
    CreateGuestAppointmentRequest, DateCount, UpdateStatusRequest,
};
use crate::router::AppointmentState;
use crate::services::lifecycle::DEFAULT_UPCOMING_LIMIT;

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::InvalidInput(msg) => AppError::ValidationError(msg),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::NotAuthorized => AppError::Forbidden(message),
            AppointmentError::NotFound => AppError::NotFound(message),
            AppointmentError::SlotTaken | AppointmentError::StaleStatus => AppError::Conflict(message),
            AppointmentError::InvalidService
            | AppointmentError::InvalidClient
            | AppointmentError::InvalidProfessional
            | AppointmentError::InvalidStatusTransition { .. } => AppError::BadRequest(message),
            AppointmentError::Database(_) => AppError::Database(message),
        }
    }
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfessionalAppointmentsQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingAppointmentsQuery {
    pub limit: Option<usize>,
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<AppointmentState>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let date = query
        .date
        .ok_or_else(|| AppError::ValidationError("Query parameter 'date' is required".to_string()))?;

    let availability = state.slots.available_slots(professional_id, &date).await?;
    Ok(Json(availability))
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = state.booking.create_appointment(&user, request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn create_guest_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateGuestAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = state.booking.create_guest_appointment(&user, request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

// ==============================================================================
// STATUS MANAGEMENT
// ==============================================================================

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.lifecycle.update_status(&user, appointment_id, request.status).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    state.lifecycle.delete_appointment(&user, appointment_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    require_role(&user, &[Role::Professional, Role::Admin])?;

    let appointments = state.lifecycle.list_visible_to(&user).await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    require_role(&user, &[Role::Client])?;

    let appointments = state.lifecycle.list_for_client(user.id).await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn get_professional_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Query(query): Query<ProfessionalAppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    require_role(&user, &[Role::Professional])?;

    let appointments = state
        .lifecycle
        .list_for_professional(user.id, query.date.as_deref())
        .await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn get_upcoming_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Query(query): Query<UpcomingAppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    require_role(&user, &[Role::Professional])?;

    let limit = query.limit.unwrap_or(DEFAULT_UPCOMING_LIMIT);
    let appointments = state.lifecycle.upcoming_for_professional(user.id, limit).await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn get_appointment_stats(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<DateCount>>, AppError> {
    require_role(&user, &[Role::Professional])?;

    let stats = state.lifecycle.stats_for_professional(user.id).await?;
    Ok(Json(stats))
}
