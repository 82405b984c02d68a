use std::sync::Arc;

use axum::{
    Json, Router,
    routing::get,
};
use serde_json::{json, Value};
use tracing::warn;

use appointment_cell::{
    appointment_routes, AppointmentState, AppointmentStore, CatalogStore, InMemoryAppointmentStore,
    InMemoryCatalogStore, SupabaseAppointmentStore, SupabaseCatalogStore,
};
use schedule_cell::{schedule_routes, InMemoryScheduleStore, ScheduleState, ScheduleStore, SupabaseScheduleStore};
use shared_config::AppConfig;
use shared_utils::clock::Clock;

/// Storage backends the HTTP surface and the sweeper share.
#[derive(Clone)]
pub struct Stores {
    pub schedules: Arc<dyn ScheduleStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub catalog: Arc<dyn CatalogStore>,
}

pub fn build_stores(config: &AppConfig) -> Stores {
    if config.is_configured() {
        Stores {
            schedules: Arc::new(SupabaseScheduleStore::new(config)),
            appointments: Arc::new(SupabaseAppointmentStore::new(config)),
            catalog: Arc::new(SupabaseCatalogStore::new(config)),
        }
    } else {
        warn!(
            "Supabase is not configured, falling back to in-memory storage. \
             The service and user catalog is empty, so bookings will be rejected"
        );
        Stores {
            schedules: Arc::new(InMemoryScheduleStore::new()),
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            catalog: Arc::new(InMemoryCatalogStore::new()),
        }
    }
}

pub fn create_router(config: Arc<AppConfig>, stores: Stores, clock: Arc<dyn Clock>) -> Router {
    let schedule_state = ScheduleState::new(config.clone(), stores.schedules.clone());
    let appointment_state = AppointmentState::new(
        config,
        stores.schedules,
        stores.appointments,
        stores.catalog,
        clock,
    );

    Router::new()
        .route("/", get(|| async { "Practice booking API is running!" }))
        .route("/health", get(health))
        .nest("/schedule", schedule_routes(schedule_state))
        .nest("/appointments", appointment_routes(appointment_state))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
