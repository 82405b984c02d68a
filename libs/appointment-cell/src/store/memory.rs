use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::DbError;

use crate::models::{
    Appointment, AppointmentStatus, DirectoryUser, GuestClient, GuestClientInput, NewAppointment, Service,
};
use super::{AppointmentStore, CatalogStore};

const SLOT_CONSTRAINT: &str = "appointments_professional_id_date_start_time_key";

/// Process-local appointment backend. The slot constraint is checked under
/// the same write guard as the insert.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    guests: RwLock<HashMap<Uuid, GuestClient>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn guest_count(&self) -> usize {
        self.guests.read().await.len()
    }

    async fn filtered<F>(&self, keep: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let appointments = self.appointments.read().await;
        let mut result: Vec<_> = appointments.values().filter(|a| keep(a)).cloned().collect();
        result.sort_by(|a, b| (a.date, &a.start_time).cmp(&(b.date, &b.start_time)));
        result
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_by_slot(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        start_time: &str,
    ) -> Result<Option<Appointment>, DbError> {
        let appointments = self.appointments.read().await;
        Ok(appointments
            .values()
            .find(|a| a.professional_id == professional_id && a.date == date && a.start_time == start_time)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, DbError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn insert(&self, new: &NewAppointment) -> Result<Appointment, DbError> {
        let mut appointments = self.appointments.write().await;

        let taken = appointments.values().any(|a| {
            a.professional_id == new.professional_id && a.date == new.date && a.start_time == new.start_time
        });
        if taken {
            return Err(DbError::UniqueViolation(SLOT_CONSTRAINT.to_string()));
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            client_id: new.client_id,
            guest_client_id: new.guest_client_id,
            service_id: new.service_id,
            professional_id: new.professional_id,
            date: new.date,
            start_time: new.start_time.clone(),
            status: AppointmentStatus::Pending,
            notes: new.notes.clone(),
            created_at: Utc::now(),
        };
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Option<Appointment>, DbError> {
        let mut appointments = self.appointments.write().await;
        Ok(appointments.get_mut(&id).map(|a| {
            a.status = status;
            a.clone()
        }))
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<Option<Appointment>, DbError> {
        let mut appointments = self.appointments.write().await;
        Ok(appointments
            .get_mut(&id)
            .filter(|a| a.status == expected)
            .map(|a| {
                a.status = next;
                a.clone()
            }))
    }

    async fn list_by_professional(
        &self,
        professional_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, DbError> {
        Ok(self
            .filtered(|a| a.professional_id == professional_id && date.map_or(true, |d| a.date == d))
            .await)
    }

    async fn list_by_status(&self, status: AppointmentStatus) -> Result<Vec<Appointment>, DbError> {
        Ok(self.filtered(|a| a.status == status).await)
    }

    async fn list_by_client(&self, client_id: Uuid) -> Result<Vec<Appointment>, DbError> {
        let mut result = self.filtered(|a| a.client_id == Some(client_id)).await;
        // stable sort keeps start time ascending within a date
        result.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(result)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, DbError> {
        Ok(self.filtered(|_| true).await)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        Ok(self.appointments.write().await.remove(&id).is_some())
    }

    async fn insert_guest_client(&self, guest: &GuestClientInput) -> Result<GuestClient, DbError> {
        let record = GuestClient {
            id: Uuid::new_v4(),
            name: guest.name.clone(),
            email: guest.email.clone(),
            phone: guest.phone.clone(),
            created_at: Utc::now(),
        };
        self.guests.write().await.insert(record.id, record.clone());
        Ok(record)
    }
}

/// Process-local catalog. Starts empty; callers seed it.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    services: RwLock<HashMap<Uuid, Service>>,
    users: RwLock<HashMap<Uuid, DirectoryUser>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_service(&self, service: Service) {
        self.services.write().await.insert(service.id, service);
    }

    pub async fn add_user(&self, user: DirectoryUser) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_service(&self, id: Uuid) -> Result<Option<Service>, DbError> {
        Ok(self.services.read().await.get(&id).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<DirectoryUser>, DbError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}
