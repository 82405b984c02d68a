// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
    middleware,
};

use schedule_cell::ScheduleStore;
use shared_config::AppConfig;
use shared_utils::clock::Clock;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::models::SchedulingPolicy;
use crate::services::{AppointmentBookingService, AppointmentLifecycleService, SlotService};
use crate::store::{AppointmentStore, CatalogStore};

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub slots: SlotService,
    pub booking: AppointmentBookingService,
    pub lifecycle: AppointmentLifecycleService,
}

impl AppointmentState {
    pub fn new(
        config: Arc<AppConfig>,
        schedules: Arc<dyn ScheduleStore>,
        appointments: Arc<dyn AppointmentStore>,
        catalog: Arc<dyn CatalogStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let policy = SchedulingPolicy::from_config(&config);

        Self {
            slots: SlotService::new(schedules, appointments.clone()),
            booking: AppointmentBookingService::new(appointments.clone(), catalog),
            lifecycle: AppointmentLifecycleService::new(appointments, policy, clock),
            config,
        }
    }
}

pub fn appointment_routes(state: AppointmentState) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        // Booking
        .route("/", post(handlers::create_appointment).get(handlers::list_appointments))
        .route("/guest", post(handlers::create_guest_appointment))
        .route("/availability/{professional_id}", get(handlers::get_availability))

        // Status management
        .route("/{appointment_id}/status", put(handlers::update_appointment_status))
        .route("/{appointment_id}", delete(handlers::delete_appointment))

        // Listings
        .route("/my", get(handlers::get_my_appointments))
        .route("/professional/my", get(handlers::get_professional_appointments))
        .route("/professional/upcoming", get(handlers::get_upcoming_appointments))
        .route("/professional/stats", get(handlers::get_appointment_stats))

        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
