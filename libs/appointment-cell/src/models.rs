// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use schedule_cell::{parse_hhmm, ScheduleError};
use shared_config::AppConfig;
use shared_database::DbError;
use shared_models::auth::Role;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booking of one 30-minute slot. Exactly one of `client_id` and
/// `guest_client_id` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub guest_client_id: Option<Uuid>,
    pub service_id: Uuid,
    pub professional_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Wall-clock `date + start_time` read in the given reference offset.
    pub fn scheduled_instant(&self, offset: &FixedOffset) -> Result<DateTime<Utc>, AppointmentError> {
        let time = parse_hhmm(&self.start_time)?;
        offset
            .from_local_datetime(&self.date.and_time(time))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| AppointmentError::InvalidInput(format!(
                "Cannot resolve {} {} in offset {}",
                self.date, self.start_time, offset
            )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::Completed => "COMPLETED",
        }
    }

    /// Statuses reachable in one step.
    pub fn valid_transitions(&self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentStatus::Pending => &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled],
            AppointmentStatus::Confirmed => &[AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            // Terminal states
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => &[],
        }
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields of an appointment about to be inserted. New rows always start PENDING.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub client_id: Option<Uuid>,
    pub guest_client_id: Option<Uuid>,
    pub service_id: Uuid,
    pub professional_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub notes: Option<String>,
}

// ==============================================================================
// COLLABORATOR RECORDS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub price: f64,
    pub professional_id: Uuid,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestClient {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestClientInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Read-only view of a platform user, used for cross-reference checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: Uuid,
    pub role: Role,
    pub name: Option<String>,
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub service_id: Uuid,
    pub professional_id: Uuid,
    pub date: String,
    pub start_time: String,
    pub notes: Option<String>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuestAppointmentRequest {
    pub service_id: Uuid,
    pub professional_id: Uuid,
    pub date: String,
    pub start_time: String,
    pub notes: Option<String>,
    pub guest_client: GuestClientInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub date: String,
    pub available_times: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCount {
    pub date: NaiveDate,
    pub count: usize,
}

// ==============================================================================
// SCHEDULING POLICY
// ==============================================================================

/// Time settings shared by the sweeps and the upcoming view.
#[derive(Debug, Clone, Copy)]
pub struct SchedulingPolicy {
    pub offset: FixedOffset,
    pub pending_grace: Duration,
}

impl SchedulingPolicy {
    pub fn new(offset: FixedOffset, pending_grace: Duration) -> Self {
        Self { offset, pending_grace }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let offset = FixedOffset::east_opt(config.scheduling_utc_offset_minutes * 60).unwrap_or_else(|| {
            warn!(
                "SCHEDULING_UTC_OFFSET_MINUTES={} is out of range, using UTC",
                config.scheduling_utc_offset_minutes
            );
            Utc.fix()
        });

        Self {
            offset,
            pending_grace: Duration::minutes(config.pending_grace_minutes),
        }
    }
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
            pending_grace: Duration::minutes(5),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service does not exist or does not belong to this professional")]
    InvalidService,

    #[error("Client does not exist or is not a CLIENT user")]
    InvalidClient,

    #[error("Professional does not exist or is not a PROFESSIONAL user")]
    InvalidProfessional,

    #[error("Appointment slot is already taken")]
    SlotTaken,

    #[error("Appointment not found")]
    NotFound,

    #[error("Not authorized to modify this appointment")]
    NotAuthorized,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment status changed concurrently, reload and retry")]
    StaleStatus,

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<ScheduleError> for AppointmentError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::InvalidInput(msg) => AppointmentError::InvalidInput(msg),
            ScheduleError::NotFound => AppointmentError::NotFound,
            ScheduleError::NotAuthorized => AppointmentError::NotAuthorized,
            ScheduleError::Database(e) => AppointmentError::Database(e),
        }
    }
}
