// libs/appointment-cell/src/services/lifecycle.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use schedule_cell::parse_date;
use shared_models::auth::{Role, User};
use shared_utils::clock::Clock;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, DateCount, SchedulingPolicy};
use crate::store::AppointmentStore;

pub const DEFAULT_UPCOMING_LIMIT: usize = 5;

/// Human driven status changes and the read views over existing appointments.
#[derive(Clone)]
pub struct AppointmentLifecycleService {
    appointments: Arc<dyn AppointmentStore>,
    policy: SchedulingPolicy,
    clock: Arc<dyn Clock>,
}

impl AppointmentLifecycleService {
    pub fn new(appointments: Arc<dyn AppointmentStore>, policy: SchedulingPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { appointments, policy, clock }
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        current: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if !current.can_transition_to(next) {
            warn!("Invalid status transition attempted: {} -> {}", current, next);
            return Err(AppointmentError::InvalidStatusTransition { from: current, to: next });
        }
        Ok(())
    }

    pub async fn update_status(
        &self,
        requester: &User,
        appointment_id: Uuid,
        next: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.managed_appointment(requester, appointment_id).await?;
        Self::validate_status_transition(current.status, next)?;

        let updated = self
            .appointments
            .transition_status(appointment_id, current.status, next)
            .await?
            .ok_or_else(|| {
                warn!("Appointment {} changed status while {} was updating it", appointment_id, requester.id);
                AppointmentError::StaleStatus
            })?;

        info!("Appointment {} moved {} -> {} by {}", appointment_id, current.status, next, requester.id);
        Ok(updated)
    }

    pub async fn delete_appointment(&self, requester: &User, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.managed_appointment(requester, appointment_id).await?;

        if !self.appointments.delete(appointment_id).await? {
            return Err(AppointmentError::NotFound);
        }
        info!("Appointment {} deleted by {}", appointment_id, requester.id);
        Ok(())
    }

    pub async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.appointments.list_by_client(client_id).await?)
    }

    pub async fn list_for_professional(
        &self,
        professional_id: Uuid,
        date: Option<&str>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let date = date.map(parse_date).transpose()?;
        Ok(self.appointments.list_by_professional(professional_id, date).await?)
    }

    /// Admins see every appointment, professionals only their own.
    pub async fn list_visible_to(&self, requester: &User) -> Result<Vec<Appointment>, AppointmentError> {
        match requester.role {
            Role::Admin => Ok(self.appointments.list_all().await?),
            Role::Professional => Ok(self.appointments.list_by_professional(requester.id, None).await?),
            _ => Err(AppointmentError::Forbidden(format!(
                "Role {} cannot list appointments",
                requester.role
            ))),
        }
    }

    /// Open appointments that have not started yet, soonest first.
    pub async fn upcoming_for_professional(
        &self,
        professional_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let now = self.clock.now();
        let mut upcoming = Vec::new();

        for appointment in self.appointments.list_by_professional(professional_id, None).await? {
            if !matches!(appointment.status, AppointmentStatus::Pending | AppointmentStatus::Confirmed) {
                continue;
            }
            match appointment.scheduled_instant(&self.policy.offset) {
                Ok(instant) if instant >= now => upcoming.push((instant, appointment)),
                Ok(_) => {}
                Err(e) => warn!("Skipping appointment {} in upcoming view: {}", appointment.id, e),
            }
        }

        upcoming.sort_by_key(|(instant, _)| *instant);
        debug!("{} upcoming appointments for professional {}", upcoming.len(), professional_id);

        Ok(upcoming.into_iter().take(limit).map(|(_, a)| a).collect())
    }

    /// Number of appointments per calendar date, oldest date first.
    pub async fn stats_for_professional(&self, professional_id: Uuid) -> Result<Vec<DateCount>, AppointmentError> {
        let mut per_date = BTreeMap::new();
        for appointment in self.appointments.list_by_professional(professional_id, None).await? {
            *per_date.entry(appointment.date).or_insert(0usize) += 1;
        }

        Ok(per_date
            .into_iter()
            .map(|(date, count)| DateCount { date, count })
            .collect())
    }

    /// Fetch an appointment the requester is allowed to change.
    async fn managed_appointment(&self, requester: &User, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        if !requester.has_role(&[Role::Professional, Role::Admin]) {
            return Err(AppointmentError::Forbidden(format!(
                "Role {} cannot manage appointments",
                requester.role
            )));
        }

        let appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if requester.role == Role::Professional && appointment.professional_id != requester.id {
            warn!("Professional {} tried to manage appointment {} of another professional", requester.id, appointment_id);
            return Err(AppointmentError::Forbidden(
                "Professionals can only manage their own appointments".to_string(),
            ));
        }

        Ok(appointment)
    }
}
