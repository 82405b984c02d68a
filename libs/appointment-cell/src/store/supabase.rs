use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use schedule_cell::truncate_to_hhmm;
use shared_config::AppConfig;
use shared_database::{DbError, SupabaseClient};

use crate::models::{
    Appointment, AppointmentStatus, DirectoryUser, GuestClient, GuestClientInput, NewAppointment, Service,
};
use super::{AppointmentStore, CatalogStore};

const APPOINTMENTS: &str = "/rest/v1/appointments";
const GUEST_CLIENTS: &str = "/rest/v1/guest_clients";
const SERVICES: &str = "/rest/v1/services";
const USERS: &str = "/rest/v1/users";

const CHRONOLOGICAL: &str = "order=date.asc,start_time.asc";

/// Row shape of the `appointments` table, unique on (professional_id, date, start_time).
#[derive(Debug, Deserialize)]
struct AppointmentRow {
    id: Uuid,
    client_id: Option<Uuid>,
    guest_client_id: Option<Uuid>,
    service_id: Uuid,
    professional_id: Uuid,
    date: NaiveDate,
    start_time: String,
    status: AppointmentStatus,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Self {
            id: row.id,
            client_id: row.client_id,
            guest_client_id: row.guest_client_id,
            service_id: row.service_id,
            professional_id: row.professional_id,
            date: row.date,
            start_time: truncate_to_hhmm(row.start_time),
            status: row.status,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceRow {
    id: Uuid,
    name: String,
    duration_minutes: i32,
    price: f64,
    professional_id: Uuid,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            duration_minutes: row.duration_minutes,
            price: row.price,
            professional_id: row.professional_id,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GuestClientRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<GuestClientRow> for GuestClient {
    fn from(row: GuestClientRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
        }
    }
}

fn into_appointments(rows: Vec<AppointmentRow>) -> Vec<Appointment> {
    rows.into_iter().map(Appointment::from).collect()
}

fn first<T, R: Into<T>>(rows: Vec<R>) -> Option<T> {
    rows.into_iter().next().map(Into::into)
}

pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Appointment>, DbError> {
        let path = format!("{}?{}", APPOINTMENTS, query);
        let rows: Vec<AppointmentRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(into_appointments(rows))
    }

    async fn patch_status(&self, filter: &str, status: AppointmentStatus) -> Result<Option<Appointment>, DbError> {
        let path = format!("{}?{}", APPOINTMENTS, filter);
        let rows: Vec<AppointmentRow> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(json!({ "status": status })),
            Some(SupabaseClient::representation_headers()),
        ).await?;
        Ok(first(rows))
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_by_slot(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        start_time: &str,
    ) -> Result<Option<Appointment>, DbError> {
        let query = format!(
            "professional_id=eq.{}&date=eq.{}&start_time=eq.{}&limit=1",
            professional_id, date, start_time
        );
        Ok(self.fetch(&query).await?.into_iter().next())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, DbError> {
        Ok(self.fetch(&format!("id=eq.{}", id)).await?.into_iter().next())
    }

    async fn insert(&self, appointment: &NewAppointment) -> Result<Appointment, DbError> {
        debug!(
            "Inserting appointment for professional {} at {} {}",
            appointment.professional_id, appointment.date, appointment.start_time
        );

        let body = json!({
            "client_id": appointment.client_id,
            "guest_client_id": appointment.guest_client_id,
            "service_id": appointment.service_id,
            "professional_id": appointment.professional_id,
            "date": appointment.date,
            "start_time": appointment.start_time,
            "status": AppointmentStatus::Pending,
            "notes": appointment.notes,
        });

        let rows: Vec<AppointmentRow> = self.supabase.request_with_headers(
            Method::POST,
            APPOINTMENTS,
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        first(rows).ok_or_else(|| DbError::NotFound("inserted appointment was not returned".to_string()))
    }

    async fn update_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Option<Appointment>, DbError> {
        self.patch_status(&format!("id=eq.{}", id), status).await
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<Option<Appointment>, DbError> {
        // the status filter makes the PATCH a no-op when someone got there first
        self.patch_status(&format!("id=eq.{}&status=eq.{}", id, expected), next).await
    }

    async fn list_by_professional(
        &self,
        professional_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, DbError> {
        let query = match date {
            Some(date) => format!("professional_id=eq.{}&date=eq.{}&{}", professional_id, date, CHRONOLOGICAL),
            None => format!("professional_id=eq.{}&{}", professional_id, CHRONOLOGICAL),
        };
        self.fetch(&query).await
    }

    async fn list_by_status(&self, status: AppointmentStatus) -> Result<Vec<Appointment>, DbError> {
        self.fetch(&format!("status=eq.{}&{}", status, CHRONOLOGICAL)).await
    }

    async fn list_by_client(&self, client_id: Uuid) -> Result<Vec<Appointment>, DbError> {
        self.fetch(&format!("client_id=eq.{}&order=date.desc,start_time.asc", client_id)).await
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, DbError> {
        self.fetch(CHRONOLOGICAL).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, id);
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;
        Ok(!rows.is_empty())
    }

    async fn insert_guest_client(&self, guest: &GuestClientInput) -> Result<GuestClient, DbError> {
        let rows: Vec<GuestClientRow> = self.supabase.request_with_headers(
            Method::POST,
            GUEST_CLIENTS,
            Some(json!({
                "name": guest.name,
                "email": guest.email,
                "phone": guest.phone,
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        first(rows).ok_or_else(|| DbError::NotFound("inserted guest client was not returned".to_string()))
    }
}

pub struct SupabaseCatalogStore {
    supabase: SupabaseClient,
}

impl SupabaseCatalogStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl CatalogStore for SupabaseCatalogStore {
    async fn find_service(&self, id: Uuid) -> Result<Option<Service>, DbError> {
        let path = format!("{}?id=eq.{}", SERVICES, id);
        let rows: Vec<ServiceRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(first(rows))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<DirectoryUser>, DbError> {
        let path = format!("{}?id=eq.{}&select=id,role,name", USERS, id);
        let rows: Vec<DirectoryUser> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }
}
