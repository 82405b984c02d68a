use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use shared_database::DbError;

use crate::models::{
    Appointment, AppointmentStatus, DirectoryUser, GuestClient, GuestClientInput, NewAppointment, Service,
};

mod memory;
mod supabase;

pub use memory::{InMemoryAppointmentStore, InMemoryCatalogStore};
pub use supabase::{SupabaseAppointmentStore, SupabaseCatalogStore};

/// Persistence boundary for appointments and guest clients.
///
/// Backends must enforce uniqueness of (professional_id, date, start_time)
/// and report a collision on insert as [`DbError::UniqueViolation`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_slot(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        start_time: &str,
    ) -> Result<Option<Appointment>, DbError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, DbError>;

    /// Insert a new PENDING appointment.
    async fn insert(&self, appointment: &NewAppointment) -> Result<Appointment, DbError>;

    /// Unconditional status write. `None` when the row does not exist.
    async fn update_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Option<Appointment>, DbError>;

    /// Compare-and-set status write. `None` when the row is missing or its
    /// status is no longer `expected`.
    async fn transition_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<Option<Appointment>, DbError>;

    /// Ordered by date then start time.
    async fn list_by_professional(
        &self,
        professional_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, DbError>;

    async fn list_by_status(&self, status: AppointmentStatus) -> Result<Vec<Appointment>, DbError>;

    /// Newest date first.
    async fn list_by_client(&self, client_id: Uuid) -> Result<Vec<Appointment>, DbError>;

    async fn list_all(&self) -> Result<Vec<Appointment>, DbError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;

    async fn insert_guest_client(&self, guest: &GuestClientInput) -> Result<GuestClient, DbError>;
}

/// Read-only lookups into records owned by other parts of the platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_service(&self, id: Uuid) -> Result<Option<Service>, DbError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<DirectoryUser>, DbError>;
}
