use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime, Datelike};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DbError;

static HHMM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("static time pattern compiles")
});

// ==============================================================================
// CORE SCHEDULE MODELS
// ==============================================================================

/// One recurring weekly interval of openness. At most one exists per
/// (professional, day of week).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyAvailabilityBlock {
    pub id: Uuid,
    pub professional_id: Uuid,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_available: bool,
}

impl WeeklyAvailabilityBlock {
    pub fn start(&self) -> Result<NaiveTime, ScheduleError> {
        parse_hhmm(&self.start_time)
    }

    pub fn end(&self) -> Result<NaiveTime, ScheduleError> {
        parse_hhmm(&self.end_time)
    }
}

/// Validated block contents, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDraft {
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_available: bool,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertBlockRequest {
    pub day_of_week: i32,
    pub start_time: String,
    pub end_time: String,
    pub is_available: Option<bool>,
}

impl UpsertBlockRequest {
    pub fn validate(&self) -> Result<BlockDraft, ScheduleError> {
        let day_of_week = validate_day_of_week(self.day_of_week)?;
        validate_range(&self.start_time, &self.end_time)?;

        Ok(BlockDraft {
            day_of_week,
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            is_available: self.is_available.unwrap_or(true),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlockRequest {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_available: Option<bool>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Schedule block not found")]
    NotFound,

    #[error("Not authorized to modify this schedule block")]
    NotAuthorized,

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

// ==============================================================================
// TIME HELPERS
// ==============================================================================

/// Parse a zero padded 24h "HH:MM" string.
pub fn parse_hhmm(value: &str) -> Result<NaiveTime, ScheduleError> {
    if !HHMM.is_match(value) {
        return Err(ScheduleError::InvalidInput(format!(
            "Time must use the HH:MM 24h format, got {:?}",
            value
        )));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| ScheduleError::InvalidInput(format!("Invalid time {:?}: {}", value, e)))
}

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Cut a stored time down to "HH:MM". Postgres `time` columns come back as
/// "HH:MM:SS".
pub fn truncate_to_hhmm(mut value: String) -> String {
    value.truncate(5);
    value
}

/// Parse a calendar date given as YYYY-MM-DD.
pub fn parse_date(value: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ScheduleError::InvalidInput(format!("Date must use YYYY-MM-DD, got {:?}", value)))
}

/// Day of week with Sunday as 0, from the calendar components only.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn validate_day_of_week(day: i32) -> Result<u8, ScheduleError> {
    if !(0..=6).contains(&day) {
        return Err(ScheduleError::InvalidInput(
            "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
        ));
    }
    Ok(day as u8)
}

pub(crate) fn validate_range(start: &str, end: &str) -> Result<(), ScheduleError> {
    if parse_hhmm(start)? >= parse_hhmm(end)? {
        return Err(ScheduleError::InvalidInput(
            "Start time must be before end time".to_string(),
        ));
    }
    Ok(())
}
