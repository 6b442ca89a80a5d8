//! Call-counting [`RentalApi`] used by unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use domain::models::report::{ReportConfiguration, ReportRow, SavedReport};
use domain::models::reservation::{
    CheckAvailabilityQuery, CreateReservationRequest, Reservation,
};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::api::{RemoteCatalog, RentalApi};
use crate::error::ClientError;

#[derive(Default)]
pub struct MockApi {
    pub(crate) calls: Mutex<Vec<&'static str>>,
    pub rows: Vec<ReportRow>,
    /// Grows on save and shrinks on delete.
    pub saved: Mutex<Vec<SavedReport>>,
    pub reservations: Vec<Reservation>,
    /// Returned by `check_availability`.
    pub conflicts: Vec<Reservation>,
    /// Returned by `create_reservation` as a server-side conflict.
    pub create_conflicts: Vec<Reservation>,
    /// Every call fails with this status when set.
    pub fail_status: Option<u16>,
    /// Only `check_availability` fails with this status when set.
    pub availability_status: Option<u16>,
    /// Mutating calls wait for a notification when set.
    pub gate: Option<Arc<Notify>>,
}

impl MockApi {
    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, name: &'static str) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(name);
        match self.fail_status {
            Some(status) => Err(server_error(status)),
            None => Ok(()),
        }
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

fn server_error(status: u16) -> ClientError {
    ClientError::Server {
        status,
        message: "unavailable".to_string(),
    }
}

pub fn reservation_for(request: &CreateReservationRequest) -> Reservation {
    Reservation {
        id: Uuid::new_v4(),
        vehicle_id: request.vehicle_id,
        customer_id: request.customer_id,
        driver_id: request.driver_id,
        start_date: request.start_date,
        end_date: request.end_date,
        status: request.status,
        total_amount: request.total_amount,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl RentalApi for MockApi {
    async fn fetch_catalog(&self) -> Result<RemoteCatalog, ClientError> {
        self.record("fetch_catalog")?;
        Ok(RemoteCatalog {
            data_sources: Vec::new(),
        })
    }

    async fn execute_report(
        &self,
        _configuration: &ReportConfiguration,
    ) -> Result<Vec<ReportRow>, ClientError> {
        self.record("execute_report")?;
        self.wait_for_gate().await;
        Ok(self.rows.clone())
    }

    async fn list_saved_reports(&self) -> Result<Vec<SavedReport>, ClientError> {
        self.record("list_saved_reports")?;
        Ok(self.saved.lock().unwrap().clone())
    }

    async fn save_report(
        &self,
        configuration: &ReportConfiguration,
    ) -> Result<SavedReport, ClientError> {
        self.record("save_report")?;
        self.wait_for_gate().await;
        let report = SavedReport {
            id: Uuid::new_v4(),
            name: configuration.name.trim().to_string(),
            description: configuration.description.clone(),
            configuration: configuration.clone(),
            created_by: "system".to_string(),
            created_at: Utc::now(),
        };
        self.saved.lock().unwrap().push(report.clone());
        Ok(report)
    }

    async fn delete_saved_report(&self, id: Uuid) -> Result<(), ClientError> {
        self.record("delete_saved_report")?;
        self.wait_for_gate().await;
        let mut saved = self.saved.lock().unwrap();
        let before = saved.len();
        saved.retain(|r| r.id != id);
        if saved.len() == before {
            return Err(ClientError::Server {
                status: 404,
                message: "Saved report not found".to_string(),
            });
        }
        Ok(())
    }

    async fn check_availability(
        &self,
        _query: &CheckAvailabilityQuery,
    ) -> Result<Vec<Reservation>, ClientError> {
        self.record("check_availability")?;
        if let Some(status) = self.availability_status {
            return Err(server_error(status));
        }
        Ok(self.conflicts.clone())
    }

    async fn create_reservation(
        &self,
        request: &CreateReservationRequest,
    ) -> Result<Reservation, ClientError> {
        self.record("create_reservation")?;
        self.wait_for_gate().await;
        if !self.create_conflicts.is_empty() {
            return Err(ClientError::Conflict(self.create_conflicts.clone()));
        }
        Ok(reservation_for(request))
    }

    async fn list_reservations(
        &self,
        vehicle_id: Option<Uuid>,
    ) -> Result<Vec<Reservation>, ClientError> {
        self.record("list_reservations")?;
        Ok(self
            .reservations
            .iter()
            .filter(|r| vehicle_id.map_or(true, |v| r.vehicle_id == v))
            .cloned()
            .collect())
    }
}
