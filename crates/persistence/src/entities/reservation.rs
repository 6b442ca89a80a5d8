//! Reservation entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::reservation::{Reservation, ReservationStatus};

/// Column list for reservation queries; `total_amount` is read as float8.
pub const RESERVATION_COLUMNS: &str = "id, vehicle_id, customer_id, driver_id, start_date, \
     end_date, status, total_amount::float8 AS total_amount, created_at, updated_at";

/// Database row mapping for the reservations table.
#[derive(Debug, Clone, FromRow)]
pub struct ReservationEntity {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub total_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReservationEntity> for Reservation {
    fn from(entity: ReservationEntity) -> Self {
        let status = ReservationStatus::parse(&entity.status).unwrap_or_else(|| {
            tracing::warn!(
                reservation_id = %entity.id,
                status = %entity.status,
                "Unknown reservation status, treating as pending"
            );
            ReservationStatus::Pending
        });
        Self {
            id: entity.id,
            vehicle_id: entity.vehicle_id,
            customer_id: entity.customer_id,
            driver_id: entity.driver_id,
            start_date: entity.start_date,
            end_date: entity.end_date,
            status,
            total_amount: entity.total_amount,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
