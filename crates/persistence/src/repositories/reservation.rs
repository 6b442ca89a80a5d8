//! Reservation repository for database operations.
//!
//! Bookings are serialized per vehicle: every write that can introduce an
//! overlap first takes a row lock on the vehicle (`SELECT ... FOR UPDATE`)
//! and runs the conflict query inside the same transaction.

use chrono::NaiveDate;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use domain::models::date_range::{BoundaryPolicy, DateRange};
use domain::models::reservation::ReservationStatus;

use crate::entities::{ReservationEntity, RESERVATION_COLUMNS};
use crate::metrics::{record_booking_conflict, QueryTimer};

/// Values for a new reservation.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub vehicle_id: Uuid,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub range: DateRange,
    /// `false` when the caller sent no end date.
    pub has_end_date: bool,
    pub status: ReservationStatus,
    pub total_amount: Option<f64>,
}

/// Result of a write that is guarded by the conflict check.
#[derive(Debug)]
pub enum BookingOutcome {
    Booked(ReservationEntity),
    Conflicts(Vec<ReservationEntity>),
    VehicleNotFound,
    ReservationNotFound,
}

/// Repository for reservation-related database operations.
#[derive(Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find reservation by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_reservation_by_id");
        let sql = format!("SELECT {} FROM reservations WHERE id = $1", RESERVATION_COLUMNS);
        let result = sqlx::query_as::<_, ReservationEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// List reservations, optionally for a single vehicle, by start date.
    pub async fn list(
        &self,
        vehicle_id: Option<Uuid>,
    ) -> Result<Vec<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_reservations");
        let sql = format!(
            r#"
            SELECT {} FROM reservations
            WHERE ($1::uuid IS NULL OR vehicle_id = $1)
            ORDER BY start_date, created_at
            "#,
            RESERVATION_COLUMNS
        );
        let result = sqlx::query_as::<_, ReservationEntity>(&sql)
            .bind(vehicle_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Reservations of `vehicle_id` that overlap `range`.
    ///
    /// Read-only; use the `*_checked` methods to write.
    pub async fn find_conflicts(
        &self,
        vehicle_id: Uuid,
        range: DateRange,
        exclude_id: Option<Uuid>,
        policy: BoundaryPolicy,
    ) -> Result<Vec<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_reservation_conflicts");
        let result = conflicts_on(&self.pool, vehicle_id, range, exclude_id, policy).await;
        timer.record();
        result
    }

    /// Create a reservation if the vehicle is free for the requested period.
    pub async fn create_checked(
        &self,
        new: &NewReservation,
        policy: BoundaryPolicy,
    ) -> Result<BookingOutcome, sqlx::Error> {
        let timer = QueryTimer::new("create_reservation_checked");
        let mut tx = self.pool.begin().await?;

        if !lock_vehicle(&mut tx, new.vehicle_id).await? {
            timer.record();
            return Ok(BookingOutcome::VehicleNotFound);
        }

        if new.status.blocks_calendar() {
            let conflicts = conflicts_on(&mut *tx, new.vehicle_id, new.range, None, policy).await?;
            if !conflicts.is_empty() {
                record_booking_conflict();
                timer.record();
                return Ok(BookingOutcome::Conflicts(conflicts));
            }
        }

        let end_date = new.has_end_date.then(|| new.range.end());
        let sql = format!(
            r#"
            INSERT INTO reservations (vehicle_id, customer_id, driver_id, start_date,
                                      end_date, status, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7::numeric)
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        );
        let entity = sqlx::query_as::<_, ReservationEntity>(&sql)
            .bind(new.vehicle_id)
            .bind(new.customer_id)
            .bind(new.driver_id)
            .bind(new.range.start())
            .bind(end_date)
            .bind(new.status.as_str())
            .bind(new.total_amount)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(BookingOutcome::Booked(entity))
    }

    /// Move a reservation to another vehicle or period, excluding itself
    /// from the conflict check.
    pub async fn reschedule_checked(
        &self,
        id: Uuid,
        vehicle_id: Uuid,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        total_amount: Option<f64>,
        policy: BoundaryPolicy,
    ) -> Result<BookingOutcome, sqlx::Error> {
        let timer = QueryTimer::new("reschedule_reservation_checked");
        let mut tx = self.pool.begin().await?;

        let Some(current) = lock_reservation(&mut tx, id).await? else {
            timer.record();
            return Ok(BookingOutcome::ReservationNotFound);
        };

        if !lock_vehicle(&mut tx, vehicle_id).await? {
            timer.record();
            return Ok(BookingOutcome::VehicleNotFound);
        }

        let range = DateRange::clamped(start_date, end_date.unwrap_or(start_date));
        let blocks = ReservationStatus::parse(&current.status)
            .map(|s| s.blocks_calendar())
            .unwrap_or(true);
        if blocks {
            let conflicts = conflicts_on(&mut *tx, vehicle_id, range, Some(id), policy).await?;
            if !conflicts.is_empty() {
                record_booking_conflict();
                timer.record();
                return Ok(BookingOutcome::Conflicts(conflicts));
            }
        }

        let sql = format!(
            r#"
            UPDATE reservations SET
                vehicle_id = $2,
                start_date = $3,
                end_date = $4,
                total_amount = COALESCE($5::numeric, total_amount),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        );
        let entity = sqlx::query_as::<_, ReservationEntity>(&sql)
            .bind(id)
            .bind(vehicle_id)
            .bind(start_date)
            .bind(end_date)
            .bind(total_amount)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(BookingOutcome::Booked(entity))
    }

    /// Change a reservation's status.
    ///
    /// Re-activating a cancelled reservation re-runs the conflict check,
    /// since its days may have been booked in the meantime.
    pub async fn update_status_checked(
        &self,
        id: Uuid,
        status: ReservationStatus,
        policy: BoundaryPolicy,
    ) -> Result<BookingOutcome, sqlx::Error> {
        let timer = QueryTimer::new("update_reservation_status_checked");
        let mut tx = self.pool.begin().await?;

        let Some(current) = lock_reservation(&mut tx, id).await? else {
            timer.record();
            return Ok(BookingOutcome::ReservationNotFound);
        };

        let was_blocking = ReservationStatus::parse(&current.status)
            .map(|s| s.blocks_calendar())
            .unwrap_or(true);
        if status.blocks_calendar() && !was_blocking {
            if !lock_vehicle(&mut tx, current.vehicle_id).await? {
                timer.record();
                return Ok(BookingOutcome::VehicleNotFound);
            }
            let range = DateRange::clamped(
                current.start_date,
                current.end_date.unwrap_or(current.start_date),
            );
            let conflicts =
                conflicts_on(&mut *tx, current.vehicle_id, range, Some(id), policy).await?;
            if !conflicts.is_empty() {
                record_booking_conflict();
                timer.record();
                return Ok(BookingOutcome::Conflicts(conflicts));
            }
        }

        let sql = format!(
            r#"
            UPDATE reservations SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        );
        let entity = sqlx::query_as::<_, ReservationEntity>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(BookingOutcome::Booked(entity))
    }
}

/// Overlap predicate over `reservations`, with `$2` the candidate start and
/// `$3` the candidate end as produced by [`candidate_end`].
pub fn overlap_predicate(policy: BoundaryPolicy) -> &'static str {
    match policy {
        BoundaryPolicy::Inclusive => "start_date <= $3 AND COALESCE(end_date, start_date) >= $2",
        BoundaryPolicy::SameDayTurnover => {
            "start_date < $3 AND $2 < (CASE WHEN COALESCE(end_date, start_date) > start_date \
             THEN COALESCE(end_date, start_date) ELSE start_date + 1 END)"
        }
    }
}

/// The candidate end bound matching [`overlap_predicate`].
pub fn candidate_end(range: &DateRange, policy: BoundaryPolicy) -> NaiveDate {
    match policy {
        BoundaryPolicy::Inclusive => range.end(),
        BoundaryPolicy::SameDayTurnover => range.exclusive_end(),
    }
}

async fn conflicts_on<'e, E>(
    executor: E,
    vehicle_id: Uuid,
    range: DateRange,
    exclude_id: Option<Uuid>,
    policy: BoundaryPolicy,
) -> Result<Vec<ReservationEntity>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        SELECT {} FROM reservations
        WHERE vehicle_id = $1
          AND status <> 'cancelled'
          AND ($4::uuid IS NULL OR id <> $4)
          AND {}
        ORDER BY start_date
        "#,
        RESERVATION_COLUMNS,
        overlap_predicate(policy)
    );
    sqlx::query_as::<_, ReservationEntity>(&sql)
        .bind(vehicle_id)
        .bind(range.start())
        .bind(candidate_end(&range, policy))
        .bind(exclude_id)
        .fetch_all(executor)
        .await
}

/// Takes the per-vehicle booking lock. Returns false if the vehicle does not exist.
async fn lock_vehicle(conn: &mut PgConnection, vehicle_id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM vehicles WHERE id = $1 FOR UPDATE")
        .bind(vehicle_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

async fn lock_reservation(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<ReservationEntity>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM reservations WHERE id = $1 FOR UPDATE",
        RESERVATION_COLUMNS
    );
    sqlx::query_as::<_, ReservationEntity>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
}
