// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use schedule_cell::{format_hhmm, parse_date, parse_hhmm};
use shared_models::auth::{Role, User};

use crate::models::{
    Appointment, AppointmentError, CreateAppointmentRequest, CreateGuestAppointmentRequest,
    GuestClientInput, NewAppointment,
};
use crate::store::{AppointmentStore, CatalogStore};

/// Sole writer of new appointments. Validates who may book what, then relies
/// on the storage slot constraint as the final word on double booking.
#[derive(Clone)]
pub struct AppointmentBookingService {
    appointments: Arc<dyn AppointmentStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl AppointmentBookingService {
    pub fn new(appointments: Arc<dyn AppointmentStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { appointments, catalog }
    }

    /// Book a slot for a registered client.
    pub async fn create_appointment(
        &self,
        requester: &User,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let client_id = match requester.role {
            Role::Client => {
                if request.client_id.is_some_and(|id| id != requester.id) {
                    debug!("Ignoring clientId supplied by client {}", requester.id);
                }
                requester.id
            }
            Role::Professional | Role::Admin => {
                ensure_books_for_self(requester, request.professional_id)?;
                request.client_id.ok_or_else(|| {
                    AppointmentError::InvalidInput("clientId is required when booking for a client".to_string())
                })?
            }
            Role::Unknown => {
                return Err(AppointmentError::Forbidden(format!(
                    "Role {} cannot book appointments",
                    requester.role
                )));
            }
        };

        let (date, start_time) = parse_slot(&request.date, &request.start_time)?;

        if requester.role != Role::Client {
            self.ensure_client(client_id).await?;
        }
        self.ensure_professional(requester, request.professional_id).await?;
        self.ensure_service(request.service_id, request.professional_id).await?;
        self.ensure_slot_free(request.professional_id, date, &start_time).await?;

        self.insert(NewAppointment {
            client_id: Some(client_id),
            guest_client_id: None,
            service_id: request.service_id,
            professional_id: request.professional_id,
            date,
            start_time,
            notes: request.notes,
        })
        .await
    }

    /// Book a slot for someone without an account. Staff only.
    pub async fn create_guest_appointment(
        &self,
        requester: &User,
        request: CreateGuestAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        if !requester.has_role(&[Role::Professional, Role::Admin]) {
            return Err(AppointmentError::Forbidden(
                "Only professionals and admins can book for guests".to_string(),
            ));
        }
        ensure_books_for_self(requester, request.professional_id)?;

        let guest = normalize_guest(request.guest_client)?;
        let (date, start_time) = parse_slot(&request.date, &request.start_time)?;

        self.ensure_professional(requester, request.professional_id).await?;
        self.ensure_service(request.service_id, request.professional_id).await?;
        self.ensure_slot_free(request.professional_id, date, &start_time).await?;

        // the guest row is only created once the slot looks free
        let guest = self.appointments.insert_guest_client(&guest).await?;
        debug!("Created guest client {} for booking", guest.id);

        self.insert(NewAppointment {
            client_id: None,
            guest_client_id: Some(guest.id),
            service_id: request.service_id,
            professional_id: request.professional_id,
            date,
            start_time,
            notes: request.notes,
        })
        .await
    }

    async fn ensure_client(&self, client_id: Uuid) -> Result<(), AppointmentError> {
        match self.catalog.find_user(client_id).await? {
            Some(user) if user.role == Role::Client => Ok(()),
            _ => {
                warn!("Booking rejected: {} is not a CLIENT user", client_id);
                Err(AppointmentError::InvalidClient)
            }
        }
    }

    async fn ensure_professional(&self, requester: &User, professional_id: Uuid) -> Result<(), AppointmentError> {
        if requester.role == Role::Professional {
            return Ok(());
        }
        match self.catalog.find_user(professional_id).await? {
            Some(user) if user.role == Role::Professional => Ok(()),
            _ => {
                warn!("Booking rejected: {} is not a PROFESSIONAL user", professional_id);
                Err(AppointmentError::InvalidProfessional)
            }
        }
    }

    async fn ensure_service(&self, service_id: Uuid, professional_id: Uuid) -> Result<(), AppointmentError> {
        match self.catalog.find_service(service_id).await? {
            Some(service) if service.professional_id == professional_id => Ok(()),
            _ => {
                warn!("Booking rejected: service {} is not offered by {}", service_id, professional_id);
                Err(AppointmentError::InvalidService)
            }
        }
    }

    async fn ensure_slot_free(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        start_time: &str,
    ) -> Result<(), AppointmentError> {
        if self.appointments.find_by_slot(professional_id, date, start_time).await?.is_some() {
            info!("Slot {} {} of professional {} is already taken", date, start_time, professional_id);
            return Err(AppointmentError::SlotTaken);
        }
        Ok(())
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentError> {
        match self.appointments.insert(&appointment).await {
            Ok(created) => {
                info!(
                    "Appointment {} booked with professional {} at {} {}",
                    created.id, created.professional_id, created.date, created.start_time
                );
                Ok(created)
            }
            Err(e) if e.is_unique_violation() => {
                warn!(
                    "Lost slot race for professional {} at {} {}",
                    appointment.professional_id, appointment.date, appointment.start_time
                );
                Err(AppointmentError::SlotTaken)
            }
            Err(e) => Err(AppointmentError::Database(e)),
        }
    }
}

fn ensure_books_for_self(requester: &User, professional_id: Uuid) -> Result<(), AppointmentError> {
    if requester.role == Role::Professional && requester.id != professional_id {
        warn!("Professional {} tried to book for professional {}", requester.id, professional_id);
        return Err(AppointmentError::Forbidden(
            "Professionals can only book into their own calendar".to_string(),
        ));
    }
    Ok(())
}

fn parse_slot(date: &str, start_time: &str) -> Result<(NaiveDate, String), AppointmentError> {
    let date = parse_date(date)?;
    let start_time = format_hhmm(parse_hhmm(start_time)?);
    Ok((date, start_time))
}

fn normalize_guest(guest: GuestClientInput) -> Result<GuestClientInput, AppointmentError> {
    let name = guest.name.trim();
    if name.is_empty() {
        return Err(AppointmentError::InvalidInput("Guest name is required".to_string()));
    }

    let non_blank = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(GuestClientInput {
        name: name.to_string(),
        email: non_blank(guest.email),
        phone: non_blank(guest.phone),
    })
}
