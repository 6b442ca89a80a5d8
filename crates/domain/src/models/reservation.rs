//! Reservation domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::date_range::DateRange;

/// Represents a vehicle reservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub customer_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<Uuid>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub status: ReservationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Last day of the booking; a missing end date means a single-day booking.
    pub fn effective_end(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }

    /// The booked period. Stored rows with a reversed range collapse to the
    /// start day.
    pub fn range(&self) -> DateRange {
        DateRange::clamped(self.start_date, self.effective_end())
    }

    /// Whether this reservation occupies its vehicle's calendar.
    pub fn blocks_calendar(&self) -> bool {
        self.status.blocks_calendar()
    }
}

/// Reservation lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Active => "active",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReservationStatus::Pending),
            "confirmed" => Some(ReservationStatus::Confirmed),
            "active" => Some(ReservationStatus::Active),
            "completed" => Some(ReservationStatus::Completed),
            "cancelled" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }

    pub fn blocks_calendar(&self) -> bool {
        !matches!(self, ReservationStatus::Cancelled)
    }
}

fn default_status() -> ReservationStatus {
    ReservationStatus::Pending
}

/// Request payload for creating a reservation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub vehicle_id: Uuid,
    pub customer_id: Uuid,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_status")]
    pub status: ReservationStatus,
    #[validate(range(min = 0.0, message = "Total amount must be non-negative"))]
    pub total_amount: Option<f64>,
}

impl CreateReservationRequest {
    pub fn range(&self) -> Result<DateRange, DomainError> {
        DateRange::open_ended(self.start_date, self.end_date)
    }
}

/// Request payload for moving a reservation to another vehicle or period.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationRequest {
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 0.0, message = "Total amount must be non-negative"))]
    pub total_amount: Option<f64>,
}

impl UpdateReservationRequest {
    pub fn range(&self) -> Result<DateRange, DomainError> {
        DateRange::open_ended(self.start_date, self.end_date)
    }
}

/// Request payload for a status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationStatusRequest {
    pub status: ReservationStatus,
}

/// Query parameters for the availability check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAvailabilityQuery {
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Reservation being edited, ignored when looking for conflicts.
    #[serde(default)]
    pub exclude_id: Option<Uuid>,
}

impl CheckAvailabilityQuery {
    pub fn range(&self) -> Result<DateRange, DomainError> {
        DateRange::open_ended(self.start_date, self.end_date)
    }
}

/// Query parameters for listing reservations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReservationsQuery {
    #[serde(default)]
    pub vehicle_id: Option<Uuid>,
}

/// Response for listing reservations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReservationsResponse {
    pub reservations: Vec<Reservation>,
    pub total: usize,
}
