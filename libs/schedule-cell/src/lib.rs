pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use services::ScheduleService;
pub use store::{InMemoryScheduleStore, ScheduleStore, SupabaseScheduleStore};
pub use router::{schedule_routes, ScheduleState};
