mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use appointment_cell::{AppointmentError, AppointmentStatus, AppointmentStore};
use schedule_cell::ScheduleStore;

use common::{monday, Fixture};

#[tokio::test]
async fn test_taken_slot_is_excluded() {
    let fx = Fixture::new().await;
    fx.open_block(1, "09:00", "10:00").await;

    let open = fx.slots().available_slots(fx.professional.id, "2025-03-10").await.unwrap();
    assert_eq!(open.available_times, vec!["09:00", "09:30"]);

    fx.seed(monday(), "09:30").await;

    let open = fx.slots().available_slots(fx.professional.id, "2025-03-10").await.unwrap();
    assert_eq!(open.date, "2025-03-10");
    assert_eq!(open.available_times, vec!["09:00"]);
}

#[tokio::test]
async fn test_day_without_block_has_no_slots() {
    let fx = Fixture::new().await;
    fx.open_block(1, "09:00", "12:00").await;

    // 2025-03-11 is a Tuesday
    let open = fx.slots().available_slots(fx.professional.id, "2025-03-11").await.unwrap();
    assert_eq!(open.date, "2025-03-11");
    assert!(open.available_times.is_empty());
}

#[tokio::test]
async fn test_inactive_block_offers_nothing() {
    let fx = Fixture::new().await;
    fx.schedules
        .upsert_blocks(
            fx.professional.id,
            &[schedule_cell::BlockDraft {
                day_of_week: 1,
                start_time: "09:00".to_string(),
                end_time: "12:00".to_string(),
                is_available: false,
            }],
        )
        .await
        .unwrap();

    let open = fx.slots().available_slots(fx.professional.id, "2025-03-10").await.unwrap();
    assert!(open.available_times.is_empty());
}

#[tokio::test]
async fn test_cancelled_appointment_still_occupies_slot() {
    let fx = Fixture::new().await;
    fx.open_block(1, "09:00", "10:00").await;

    let appointment = fx.seed(monday(), "09:00").await;
    fx.appointments
        .update_status(appointment.id, AppointmentStatus::Cancelled)
        .await
        .unwrap();

    let open = fx.slots().available_slots(fx.professional.id, "2025-03-10").await.unwrap();
    assert_eq!(open.available_times, vec!["09:30"]);
}

#[tokio::test]
async fn test_other_professionals_bookings_do_not_interfere() {
    let fx = Fixture::new().await;
    fx.open_block(1, "09:00", "10:00").await;
    fx.appointments
        .insert(&appointment_cell::NewAppointment {
            client_id: Some(fx.client.id),
            guest_client_id: None,
            service_id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            date: monday(),
            start_time: "09:00".to_string(),
            notes: None,
        })
        .await
        .unwrap();

    let open = fx.slots().available_slots(fx.professional.id, "2025-03-10").await.unwrap();
    assert_eq!(open.available_times, vec!["09:00", "09:30"]);
}

#[tokio::test]
async fn test_invalid_date_is_rejected() {
    let fx = Fixture::new().await;

    assert_matches!(
        fx.slots().available_slots(fx.professional.id, "10-03-2025").await,
        Err(AppointmentError::InvalidInput(_))
    );
}
