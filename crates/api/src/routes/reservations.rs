//! Reservation endpoint handlers.
//!
//! Every write goes through the repository's locked conflict check; the
//! handlers only validate input and translate outcomes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use persistence::repositories::{BookingOutcome, NewReservation, ReservationRepository};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::reservation::{
    CheckAvailabilityQuery, CreateReservationRequest, ListReservationsQuery,
    ListReservationsResponse, Reservation, UpdateReservationRequest,
    UpdateReservationStatusRequest,
};

/// List reservations that would collide with the requested period.
///
/// GET /api/reservations/check-availability?vehicleId&startDate&endDate[&excludeId]
///
/// An empty array means the vehicle is available.
pub async fn check_availability(
    State(state): State<AppState>,
    Query(query): Query<CheckAvailabilityQuery>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    let range = query.range()?;

    let repo = ReservationRepository::new(state.pool.clone());
    let conflicts: Vec<Reservation> = repo
        .find_conflicts(query.vehicle_id, range, query.exclude_id, state.boundary_policy)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    info!(
        vehicle_id = %query.vehicle_id,
        start_date = %range.start(),
        end_date = %range.end(),
        conflicts = conflicts.len(),
        "Availability checked"
    );

    Ok(Json(conflicts))
}

/// Create a reservation.
///
/// POST /api/reservations
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), ApiError> {
    request.validate()?;
    let range = request.range()?;

    let new = NewReservation {
        vehicle_id: request.vehicle_id,
        customer_id: request.customer_id,
        driver_id: request.driver_id,
        range,
        has_end_date: request.end_date.is_some(),
        status: request.status,
        total_amount: request.total_amount,
    };

    let repo = ReservationRepository::new(state.pool.clone());
    let outcome = repo.create_checked(&new, state.boundary_policy).await?;
    let reservation = booked(outcome)?;

    info!(
        reservation_id = %reservation.id,
        vehicle_id = %reservation.vehicle_id,
        start_date = %reservation.start_date,
        end_date = %reservation.effective_end(),
        "Reservation created"
    );

    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Move a reservation to another vehicle or period.
///
/// PUT /api/reservations/:reservation_id
pub async fn update_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Json(request): Json<UpdateReservationRequest>,
) -> Result<Json<Reservation>, ApiError> {
    request.validate()?;
    request.range()?;

    let repo = ReservationRepository::new(state.pool.clone());
    let outcome = repo
        .reschedule_checked(
            reservation_id,
            request.vehicle_id,
            request.start_date,
            request.end_date,
            request.total_amount,
            state.boundary_policy,
        )
        .await?;
    let reservation = booked(outcome)?;

    info!(
        reservation_id = %reservation.id,
        vehicle_id = %reservation.vehicle_id,
        "Reservation rescheduled"
    );

    Ok(Json(reservation))
}

/// Change a reservation's status.
///
/// PATCH /api/reservations/:reservation_id/status
pub async fn update_reservation_status(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Json(request): Json<UpdateReservationStatusRequest>,
) -> Result<Json<Reservation>, ApiError> {
    let repo = ReservationRepository::new(state.pool.clone());
    let outcome = repo
        .update_status_checked(reservation_id, request.status, state.boundary_policy)
        .await?;
    let reservation = booked(outcome)?;

    info!(
        reservation_id = %reservation.id,
        status = reservation.status.as_str(),
        "Reservation status changed"
    );

    Ok(Json(reservation))
}

/// Get a single reservation.
///
/// GET /api/reservations/:reservation_id
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<Reservation>, ApiError> {
    let repo = ReservationRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(reservation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;
    Ok(Json(entity.into()))
}

/// List reservations, optionally for one vehicle.
///
/// GET /api/reservations?vehicleId=<uuid>
pub async fn list_reservations(
    State(state): State<AppState>,
    Query(query): Query<ListReservationsQuery>,
) -> Result<Json<ListReservationsResponse>, ApiError> {
    let repo = ReservationRepository::new(state.pool.clone());
    let reservations: Vec<Reservation> = repo
        .list(query.vehicle_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = reservations.len();

    Ok(Json(ListReservationsResponse {
        reservations,
        total,
    }))
}

fn booked(outcome: BookingOutcome) -> Result<Reservation, ApiError> {
    match outcome {
        BookingOutcome::Booked(entity) => Ok(entity.into()),
        BookingOutcome::Conflicts(entities) => {
            let conflicts: Vec<Reservation> = entities.into_iter().map(Into::into).collect();
            warn!(
                vehicle_id = ?conflicts.first().map(|r| r.vehicle_id),
                conflicts = conflicts.len(),
                "Booking rejected: overlapping reservations"
            );
            Err(ApiError::ReservationConflict(conflicts))
        }
        BookingOutcome::VehicleNotFound => Err(ApiError::NotFound("Vehicle not found".to_string())),
        BookingOutcome::ReservationNotFound => {
            Err(ApiError::NotFound("Reservation not found".to_string()))
        }
    }
}
