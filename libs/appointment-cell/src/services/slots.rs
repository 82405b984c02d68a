use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveTime, Timelike};
use tracing::debug;
use uuid::Uuid;

use schedule_cell::{day_of_week, format_hhmm, parse_date, ScheduleStore};

use crate::models::{AppointmentError, AvailabilityResponse};
use crate::store::AppointmentStore;

pub const SLOT_MINUTES: u32 = 30;

/// Turns weekly availability into the open slots of one calendar date.
#[derive(Clone)]
pub struct SlotService {
    schedules: Arc<dyn ScheduleStore>,
    appointments: Arc<dyn AppointmentStore>,
}

impl SlotService {
    pub fn new(schedules: Arc<dyn ScheduleStore>, appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { schedules, appointments }
    }

    pub async fn available_slots(
        &self,
        professional_id: Uuid,
        date: &str,
    ) -> Result<AvailabilityResponse, AppointmentError> {
        let day = parse_date(date)?;
        let weekday = day_of_week(day);

        let blocks = self.schedules.active_blocks_for_day(professional_id, weekday).await?;
        if blocks.is_empty() {
            debug!("Professional {} has no active block on weekday {}", professional_id, weekday);
            return Ok(AvailabilityResponse {
                date: date.to_string(),
                available_times: Vec::new(),
            });
        }

        // every status occupies its slot, cancelled included
        let taken: HashSet<String> = self
            .appointments
            .list_by_professional(professional_id, Some(day))
            .await?
            .into_iter()
            .map(|a| a.start_time)
            .collect();

        let mut available_times = Vec::new();
        for block in &blocks {
            let slots = slots_between(block.start()?, block.end()?);
            available_times.extend(slots.into_iter().filter(|slot| !taken.contains(slot)));
        }

        debug!(
            "{} open slots for professional {} on {}",
            available_times.len(),
            professional_id,
            date
        );

        Ok(AvailabilityResponse {
            date: date.to_string(),
            available_times,
        })
    }
}

/// Every slot start from `start` (inclusive) whose full slot fits before `end`.
pub fn slots_between(start: NaiveTime, end: NaiveTime) -> Vec<String> {
    let end_minutes = minutes_of_day(end);
    let mut cursor = minutes_of_day(start);
    let mut slots = Vec::new();

    while cursor + SLOT_MINUTES <= end_minutes {
        if let Some(time) = NaiveTime::from_hms_opt(cursor / 60, cursor % 60, 0) {
            slots.push(format_hhmm(time));
        }
        cursor += SLOT_MINUTES;
    }

    slots
}

fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
