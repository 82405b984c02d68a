pub mod booking;
pub mod lifecycle;
pub mod slots;
pub mod sweeper;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use slots::SlotService;
pub use sweeper::{LifecycleSweeper, SweepKind, SweepReport, SweeperHandle};
