pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use router::{appointment_routes, AppointmentState};
pub use services::{
    AppointmentBookingService, AppointmentLifecycleService, LifecycleSweeper, SlotService, SweepReport,
    SweeperHandle,
};
pub use store::{
    AppointmentStore, CatalogStore, InMemoryAppointmentStore, InMemoryCatalogStore, SupabaseAppointmentStore,
    SupabaseCatalogStore,
};
