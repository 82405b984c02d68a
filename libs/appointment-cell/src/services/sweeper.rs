// libs/appointment-cell/src/services/sweeper.rs
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use shared_utils::clock::Clock;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, SchedulingPolicy};
use crate::store::{AppointmentStore, CatalogStore};

const MIN_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(1);

/// Outcome of one sweep cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Candidates in the swept status.
    pub examined: usize,
    pub transitioned: usize,
    /// Due, but the row changed status before the write landed.
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    Expiry,
    Completion,
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepKind::Expiry => write!(f, "expiry"),
            SweepKind::Completion => write!(f, "completion"),
        }
    }
}

enum ItemOutcome {
    NotDue,
    Transitioned,
    Skipped,
}

/// Advances appointments that time alone decides: PENDING past its grace
/// window becomes CANCELLED, CONFIRMED past its service end becomes COMPLETED.
pub struct LifecycleSweeper {
    appointments: Arc<dyn AppointmentStore>,
    catalog: Arc<dyn CatalogStore>,
    policy: SchedulingPolicy,
    clock: Arc<dyn Clock>,
}

impl LifecycleSweeper {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        catalog: Arc<dyn CatalogStore>,
        policy: SchedulingPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { appointments, catalog, policy, clock }
    }

    pub async fn run(&self, kind: SweepKind) -> SweepReport {
        match kind {
            SweepKind::Expiry => self.run_expiry_sweep().await,
            SweepKind::Completion => self.run_completion_sweep().await,
        }
    }

    /// Cancel PENDING appointments whose start plus the grace window has passed.
    #[instrument(skip(self))]
    pub async fn run_expiry_sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let candidates = match self.appointments.list_by_status(AppointmentStatus::Pending).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Expiry sweep could not list pending appointments: {}", e);
                return SweepReport::default();
            }
        };

        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };

        for appointment in &candidates {
            let outcome = match appointment.scheduled_instant(&self.policy.offset) {
                Ok(start) if start + self.policy.pending_grace < now => {
                    self.transition(appointment, AppointmentStatus::Pending, AppointmentStatus::Cancelled).await
                }
                Ok(_) => Ok(ItemOutcome::NotDue),
                Err(e) => Err(e),
            };
            record(&mut report, SweepKind::Expiry, appointment.id, outcome);
        }

        log_report(SweepKind::Expiry, &report);
        report
    }

    /// Complete CONFIRMED appointments whose service duration has fully elapsed.
    #[instrument(skip(self))]
    pub async fn run_completion_sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let candidates = match self.appointments.list_by_status(AppointmentStatus::Confirmed).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Completion sweep could not list confirmed appointments: {}", e);
                return SweepReport::default();
            }
        };

        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };
        let mut durations: HashMap<Uuid, Duration> = HashMap::new();

        for appointment in &candidates {
            let outcome = match self.end_of(appointment, &mut durations).await {
                Ok(end) if end < now => {
                    self.transition(appointment, AppointmentStatus::Confirmed, AppointmentStatus::Completed).await
                }
                Ok(_) => Ok(ItemOutcome::NotDue),
                Err(e) => Err(e),
            };
            record(&mut report, SweepKind::Completion, appointment.id, outcome);
        }

        log_report(SweepKind::Completion, &report);
        report
    }

    /// Start both sweeps on their own timers. They keep running until the
    /// returned handle is shut down.
    pub fn start(self: Arc<Self>, expiry_every: StdDuration, completion_every: StdDuration) -> SweeperHandle {
        let (shutdown, signal) = watch::channel(false);

        info!(
            "Starting lifecycle sweeper (expiry every {:?}, completion every {:?})",
            expiry_every, completion_every
        );

        let tasks = vec![
            spawn_loop(
                Arc::clone(&self),
                SweepKind::Expiry,
                at_least_one_second(SweepKind::Expiry, expiry_every),
                signal.clone(),
            ),
            spawn_loop(
                self,
                SweepKind::Completion,
                at_least_one_second(SweepKind::Completion, completion_every),
                signal,
            ),
        ];

        SweeperHandle { shutdown, tasks }
    }

    async fn end_of(
        &self,
        appointment: &Appointment,
        durations: &mut HashMap<Uuid, Duration>,
    ) -> Result<DateTime<Utc>, AppointmentError> {
        let start = appointment.scheduled_instant(&self.policy.offset)?;

        let duration = match durations.get(&appointment.service_id) {
            Some(duration) => *duration,
            None => {
                let service = self
                    .catalog
                    .find_service(appointment.service_id)
                    .await?
                    .ok_or(AppointmentError::InvalidService)?;
                let duration = Duration::minutes(i64::from(service.duration_minutes));
                durations.insert(appointment.service_id, duration);
                duration
            }
        };

        Ok(start + duration)
    }

    async fn transition(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<ItemOutcome, AppointmentError> {
        match self.appointments.transition_status(appointment.id, expected, next).await? {
            Some(_) => {
                info!("Appointment {} moved {} -> {} by sweeper", appointment.id, expected, next);
                Ok(ItemOutcome::Transitioned)
            }
            None => {
                debug!("Appointment {} left {} before the sweeper reached it", appointment.id, expected);
                Ok(ItemOutcome::Skipped)
            }
        }
    }
}

fn record(
    report: &mut SweepReport,
    kind: SweepKind,
    appointment_id: Uuid,
    outcome: Result<ItemOutcome, AppointmentError>,
) {
    match outcome {
        Ok(ItemOutcome::NotDue) => {}
        Ok(ItemOutcome::Transitioned) => report.transitioned += 1,
        Ok(ItemOutcome::Skipped) => report.skipped += 1,
        Err(e) => {
            warn!("{} sweep failed on appointment {}: {}", kind, appointment_id, e);
            report.failed += 1;
        }
    }
}

fn log_report(kind: SweepKind, report: &SweepReport) {
    if report.transitioned > 0 || report.failed > 0 {
        info!(
            "{} sweep: examined={} transitioned={} skipped={} failed={}",
            kind, report.examined, report.transitioned, report.skipped, report.failed
        );
    } else {
        debug!("{} sweep: examined={} nothing to do", kind, report.examined);
    }
}

/// `tokio::time::interval` panics on a zero period.
fn at_least_one_second(kind: SweepKind, every: StdDuration) -> StdDuration {
    if every.is_zero() {
        warn!("{} sweep interval is zero, using 1s", kind);
        return MIN_SWEEP_INTERVAL;
    }
    every
}

fn spawn_loop(
    sweeper: Arc<LifecycleSweeper>,
    kind: SweepKind,
    every: StdDuration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    sweeper.run(kind).await;
                }
                _ = shutdown.changed() => {
                    info!("{} sweep stopped", kind);
                    break;
                }
            }
        }
    })
}

/// Owner of the running sweep tasks.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signal both loops and wait for them to finish their current cycle.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Sweep task ended abnormally: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    use shared_database::DbError;
    use shared_utils::clock::ManualClock;

    use crate::models::Service;
    use crate::store::{MockAppointmentStore, MockCatalogStore};

    fn pending_at(date: NaiveDate, start: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            client_id: Some(Uuid::new_v4()),
            guest_client_id: None,
            service_id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            date,
            start_time: start.to_string(),
            status: AppointmentStatus::Pending,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn policy() -> SchedulingPolicy {
        SchedulingPolicy::new(FixedOffset::east_opt(0).unwrap(), Duration::minutes(5))
    }

    fn clock_at(hour: u32, minute: u32) -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()))
    }

    #[tokio::test]
    async fn test_expiry_sweep_continues_after_item_failure() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let broken = pending_at(date, "08:00");
        let healthy = pending_at(date, "08:30");
        let broken_id = broken.id;
        let healthy_id = healthy.id;

        let mut store = MockAppointmentStore::new();
        store
            .expect_list_by_status()
            .returning(move |_| Ok(vec![broken.clone(), healthy.clone()]));
        store
            .expect_transition_status()
            .withf(move |id, _, _| *id == broken_id)
            .returning(|_, _, _| Err(DbError::Api { status: 503, message: "unavailable".to_string() }));
        store
            .expect_transition_status()
            .withf(move |id, expected, next| {
                *id == healthy_id
                    && *expected == AppointmentStatus::Pending
                    && *next == AppointmentStatus::Cancelled
            })
            .times(1)
            .returning(|id, _, next| {
                let mut cancelled = pending_at(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), "08:30");
                cancelled.id = id;
                cancelled.status = next;
                Ok(Some(cancelled))
            });

        let sweeper = LifecycleSweeper::new(
            Arc::new(store),
            Arc::new(MockCatalogStore::new()),
            policy(),
            clock_at(10, 0),
        );

        let report = sweeper.run_expiry_sweep().await;
        assert_eq!(report, SweepReport { examined: 2, transitioned: 1, skipped: 0, failed: 1 });
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_cycle() {
        let mut store = MockAppointmentStore::new();
        store
            .expect_list_by_status()
            .returning(|_| Err(DbError::Api { status: 500, message: "down".to_string() }));
        store.expect_transition_status().never();

        let sweeper = LifecycleSweeper::new(
            Arc::new(store),
            Arc::new(MockCatalogStore::new()),
            policy(),
            clock_at(10, 0),
        );

        assert_eq!(sweeper.run_completion_sweep().await, SweepReport::default());
    }

    #[tokio::test]
    async fn test_lost_race_is_skipped() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let appointment = pending_at(date, "08:00");

        let mut store = MockAppointmentStore::new();
        store
            .expect_list_by_status()
            .returning(move |_| Ok(vec![appointment.clone()]));
        store.expect_transition_status().returning(|_, _, _| Ok(None));

        let sweeper = LifecycleSweeper::new(
            Arc::new(store),
            Arc::new(MockCatalogStore::new()),
            policy(),
            clock_at(10, 0),
        );

        let report = sweeper.run_expiry_sweep().await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.transitioned, 0);
    }

    #[tokio::test]
    async fn test_completion_looks_up_each_service_once() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let service_id = Uuid::new_v4();
        let mut first = pending_at(date, "08:00");
        let mut second = pending_at(date, "08:30");
        for appointment in [&mut first, &mut second] {
            appointment.status = AppointmentStatus::Confirmed;
            appointment.service_id = service_id;
        }

        let mut store = MockAppointmentStore::new();
        store
            .expect_list_by_status()
            .returning(move |_| Ok(vec![first.clone(), second.clone()]));
        store.expect_transition_status().times(2).returning(|_, _, _| Ok(None));

        let mut catalog = MockCatalogStore::new();
        catalog.expect_find_service().times(1).returning(move |id| {
            Ok(Some(Service {
                id,
                name: "Consulta".to_string(),
                duration_minutes: 30,
                price: 0.0,
                professional_id: Uuid::new_v4(),
                is_active: true,
            }))
        });

        let sweeper = LifecycleSweeper::new(Arc::new(store), Arc::new(catalog), policy(), clock_at(10, 0));

        let report = sweeper.run_completion_sweep().await;
        assert_eq!(report.examined, 2);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn test_started_sweeper_stops_on_shutdown() {
        let mut store = MockAppointmentStore::new();
        store
            .expect_list_by_status()
            .withf(|status| *status == AppointmentStatus::Pending)
            .times(1..)
            .returning(|_| Ok(Vec::new()));
        store
            .expect_list_by_status()
            .withf(|status| *status == AppointmentStatus::Confirmed)
            .times(1..)
            .returning(|_| Ok(Vec::new()));

        let sweeper = Arc::new(LifecycleSweeper::new(
            Arc::new(store),
            Arc::new(MockCatalogStore::new()),
            policy(),
            clock_at(10, 0),
        ));

        let handle = sweeper.start(StdDuration::from_millis(10), StdDuration::from_millis(15));
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        handle.shutdown().await;
    }

    #[test]
    fn test_zero_interval_is_raised_to_minimum() {
        assert_eq!(at_least_one_second(SweepKind::Expiry, StdDuration::ZERO), MIN_SWEEP_INTERVAL);
        assert_eq!(
            at_least_one_second(SweepKind::Completion, StdDuration::from_secs(300)),
            StdDuration::from_secs(300)
        );
    }

    #[tokio::test]
    async fn test_zero_interval_still_sweeps() {
        let mut store = MockAppointmentStore::new();
        store
            .expect_list_by_status()
            .withf(|status| *status == AppointmentStatus::Pending)
            .times(1..)
            .returning(|_| Ok(Vec::new()));
        store
            .expect_list_by_status()
            .withf(|status| *status == AppointmentStatus::Confirmed)
            .times(1..)
            .returning(|_| Ok(Vec::new()));

        let sweeper = Arc::new(LifecycleSweeper::new(
            Arc::new(store),
            Arc::new(MockCatalogStore::new()),
            policy(),
            clock_at(10, 0),
        ));

        let handle = Arc::clone(&sweeper).start(StdDuration::ZERO, StdDuration::ZERO);
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        handle.shutdown().await;

        // last reference: the mock verifies both sweeps ran
        drop(sweeper);
    }
}
