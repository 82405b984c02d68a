use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::ScheduleService;
use crate::store::ScheduleStore;

#[derive(Clone)]
pub struct ScheduleState {
    pub config: Arc<AppConfig>,
    pub service: ScheduleService,
}

impl ScheduleState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            config,
            service: ScheduleService::new(store),
        }
    }
}

pub fn schedule_routes(state: ScheduleState) -> Router {
    // Schedules are professional self-service; every route is authenticated
    let protected_routes = Router::new()
        .route("/me", get(handlers::get_my_schedule).post(handlers::upsert_my_schedule))
        .route("/me/{block_id}", put(handlers::update_schedule_block))
        .route("/{block_id}", delete(handlers::delete_schedule_block))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
