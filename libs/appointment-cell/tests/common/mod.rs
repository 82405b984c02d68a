#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::{
    AppointmentBookingService, AppointmentLifecycleService, AppointmentStore, CreateAppointmentRequest,
    DirectoryUser, InMemoryAppointmentStore, InMemoryCatalogStore, LifecycleSweeper, NewAppointment,
    SchedulingPolicy, Service, SlotService,
};
use schedule_cell::{BlockDraft, InMemoryScheduleStore, ScheduleStore};
use shared_utils::clock::ManualClock;
use shared_utils::test_utils::TestUser;

/// Costa Rica, UTC-6 without DST.
pub const OFFSET_MINUTES: i32 = -360;

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

pub fn policy() -> SchedulingPolicy {
    SchedulingPolicy::new(FixedOffset::east_opt(OFFSET_MINUTES * 60).unwrap(), Duration::minutes(5))
}

/// Instant of a wall-clock time on `date` in the reference offset.
pub fn local(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    policy()
        .offset
        .from_local_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

pub struct Fixture {
    pub schedules: Arc<InMemoryScheduleStore>,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub catalog: Arc<InMemoryCatalogStore>,
    pub clock: Arc<ManualClock>,
    pub professional: TestUser,
    pub client: TestUser,
    pub admin: TestUser,
    pub service: Service,
}

impl Fixture {
    pub async fn new() -> Self {
        let professional = TestUser::professional("pro@example.com");
        let client = TestUser::client("client@example.com");
        let admin = TestUser::admin("admin@example.com");

        let catalog = Arc::new(InMemoryCatalogStore::new());
        for user in [&professional, &client, &admin] {
            catalog
                .add_user(DirectoryUser { id: user.id, role: user.role, name: None })
                .await;
        }

        let service = Service {
            id: Uuid::new_v4(),
            name: "Consulta general".to_string(),
            duration_minutes: 60,
            price: 25000.0,
            professional_id: professional.id,
            is_active: true,
        };
        catalog.add_service(service.clone()).await;

        Self {
            schedules: Arc::new(InMemoryScheduleStore::new()),
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            catalog,
            clock: Arc::new(ManualClock::new(local(monday(), 7, 0))),
            professional,
            client,
            admin,
            service,
        }
    }

    pub async fn open_block(&self, day_of_week: u8, start: &str, end: &str) {
        self.schedules
            .upsert_blocks(
                self.professional.id,
                &[BlockDraft {
                    day_of_week,
                    start_time: start.to_string(),
                    end_time: end.to_string(),
                    is_available: true,
                }],
            )
            .await
            .unwrap();
    }

    pub fn slots(&self) -> SlotService {
        SlotService::new(self.schedules.clone(), self.appointments.clone())
    }

    pub fn booking(&self) -> AppointmentBookingService {
        AppointmentBookingService::new(self.appointments.clone(), self.catalog.clone())
    }

    pub fn lifecycle(&self) -> AppointmentLifecycleService {
        AppointmentLifecycleService::new(self.appointments.clone(), policy(), self.clock.clone())
    }

    pub fn sweeper(&self) -> LifecycleSweeper {
        LifecycleSweeper::new(self.appointments.clone(), self.catalog.clone(), policy(), self.clock.clone())
    }

    pub fn request(&self, date: &str, start_time: &str) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            service_id: self.service.id,
            professional_id: self.professional.id,
            date: date.to_string(),
            start_time: start_time.to_string(),
            notes: None,
            client_id: None,
        }
    }

    /// Insert a PENDING appointment directly, bypassing booking rules.
    pub async fn seed(&self, date: NaiveDate, start_time: &str) -> appointment_cell::Appointment {
        self.appointments
            .insert(&NewAppointment {
                client_id: Some(self.client.id),
                guest_client_id: None,
                service_id: self.service.id,
                professional_id: self.professional.id,
                date,
                start_time: start_time.to_string(),
                notes: None,
            })
            .await
            .unwrap()
    }
}
