//! Reservation lookups and booking submission.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use domain::models::date_range::BoundaryPolicy;
use domain::models::reservation::{CheckAvailabilityQuery, CreateReservationRequest, Reservation};
use domain::services::conflict::{find_conflicts, BookingCandidate};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::api::RentalApi;
use crate::cache::{QueryCache, QueryKey};
use crate::error::ClientError;
use crate::guard::InFlight;

/// Submits bookings only after the server confirms the vehicle is free.
pub struct ReservationSubmitter<A: RentalApi> {
    api: Arc<A>,
    cache: Arc<QueryCache>,
    submitting: AtomicBool,
}

impl<A: RentalApi> ReservationSubmitter<A> {
    pub fn new(api: Arc<A>, cache: Arc<QueryCache>) -> Self {
        Self {
            api,
            cache,
            submitting: AtomicBool::new(false),
        }
    }

    pub async fn reservations(&self) -> Result<Arc<Vec<Reservation>>, ClientError> {
        self.cache
            .get_or_fetch(QueryKey::Reservations, || self.api.list_reservations(None))
            .await
    }

    pub async fn vehicle_reservations(
        &self,
        vehicle_id: Uuid,
    ) -> Result<Arc<Vec<Reservation>>, ClientError> {
        self.cache
            .get_or_fetch(QueryKey::VehicleReservations(vehicle_id), || {
                self.api.list_reservations(Some(vehicle_id))
            })
            .await
    }

    /// Conflicting reservations for a period, cached until reservations change.
    pub async fn availability(
        &self,
        query: &CheckAvailabilityQuery,
    ) -> Result<Arc<Vec<Reservation>>, ClientError> {
        query.range()?;
        let key = QueryKey::Availability {
            vehicle_id: query.vehicle_id,
            start: query.start_date,
            end: query.end_date,
            exclude_id: query.exclude_id,
        };
        self.cache
            .get_or_fetch(key, || self.api.check_availability(query))
            .await
    }

    /// Checks a candidate against the vehicle's cached reservations without
    /// asking the server for a fresh answer.
    pub async fn preview_conflicts(
        &self,
        candidate: &BookingCandidate,
        policy: BoundaryPolicy,
    ) -> Result<Vec<Reservation>, ClientError> {
        let existing = self.vehicle_reservations(candidate.vehicle_id).await?;
        Ok(find_conflicts(candidate, &existing, policy)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Books a vehicle.
    ///
    /// A blocking booking is checked against the server first; if that check
    /// fails for any reason nothing is submitted.
    pub async fn submit(
        &self,
        request: &CreateReservationRequest,
    ) -> Result<Reservation, ClientError> {
        let _in_flight = InFlight::acquire(&self.submitting)?;
        request.validate()?;
        request.range()?;

        if request.status.blocks_calendar() {
            let query = CheckAvailabilityQuery {
                vehicle_id: request.vehicle_id,
                start_date: request.start_date,
                end_date: request.end_date,
                exclude_id: None,
            };
            let conflicts = self.api.check_availability(&query).await.map_err(|err| {
                warn!(
                    vehicle_id = %request.vehicle_id,
                    error = %err,
                    "Availability check failed, booking not submitted"
                );
                err
            })?;
            if !conflicts.is_empty() {
                return Err(ClientError::Conflict(conflicts));
            }
        }

        let created = self.api.create_reservation(request).await?;
        self.cache.invalidate(&QueryKey::Reservations).await;
        info!(
            reservation_id = %created.id,
            vehicle_id = %created.vehicle_id,
            "Reservation created"
        );
        Ok(created)
    }
}
