//! HTTP access to the Fleetdesk API.

use async_trait::async_trait;
use domain::models::catalog::{FieldType, FilterOperator};
use domain::models::report::{ReportConfiguration, ReportRow, SavedReport};
use domain::models::reservation::{
    CheckAvailabilityQuery, CreateReservationRequest, ListReservationsQuery,
    ListReservationsResponse, Reservation,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;

/// Header carrying the acting user's id.
pub const USER_ID_HEADER: &str = "X-User-Id";

// ============================================================================
// Wire types
// ============================================================================

/// Catalog as served by `GET /api/reports/catalog`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCatalog {
    pub data_sources: Vec<RemoteDataSource>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDataSource {
    pub name: String,
    pub label: String,
    pub fields: Vec<RemoteField>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteField {
    pub table: String,
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub operators: Vec<FilterOperator>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    conflicts: Option<Vec<Reservation>>,
}

// ============================================================================
// Trait
// ============================================================================

/// Operations the client needs from the server.
#[async_trait]
pub trait RentalApi: Send + Sync {
    async fn fetch_catalog(&self) -> Result<RemoteCatalog, ClientError>;

    async fn execute_report(
        &self,
        configuration: &ReportConfiguration,
    ) -> Result<Vec<ReportRow>, ClientError>;

    async fn list_saved_reports(&self) -> Result<Vec<SavedReport>, ClientError>;

    async fn save_report(
        &self,
        configuration: &ReportConfiguration,
    ) -> Result<SavedReport, ClientError>;

    async fn delete_saved_report(&self, id: Uuid) -> Result<(), ClientError>;

    async fn check_availability(
        &self,
        query: &CheckAvailabilityQuery,
    ) -> Result<Vec<Reservation>, ClientError>;

    async fn create_reservation(
        &self,
        request: &CreateReservationRequest,
    ) -> Result<Reservation, ClientError>;

    async fn list_reservations(
        &self,
        vehicle_id: Option<Uuid>,
    ) -> Result<Vec<Reservation>, ClientError>;
}

// ============================================================================
// reqwest implementation
// ============================================================================

/// [`RentalApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRentalApi {
    client: Client,
    base_url: String,
    user_id: Option<String>,
}

impl HttpRentalApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: None,
        }
    }

    /// Sends `X-User-Id` on every request.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.user_id {
            Some(user_id) => builder.header(USER_ID_HEADER, user_id),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.request(builder).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await?;
    Err(error_from_response(status, &body))
}

/// Maps a non-success response to the matching [`ClientError`].
fn error_from_response(status: StatusCode, body: &[u8]) -> ClientError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    debug!(status = status.as_u16(), error = %parsed.error, "API request failed");

    match (status, parsed.conflicts) {
        (StatusCode::CONFLICT, Some(conflicts)) => ClientError::Conflict(conflicts),
        (StatusCode::BAD_REQUEST, _) => ClientError::Validation(parsed.message),
        _ => ClientError::Server {
            status: status.as_u16(),
            message: if parsed.message.is_empty() {
                String::from_utf8_lossy(body).into_owned()
            } else {
                parsed.message
            },
        },
    }
}

#[async_trait]
impl RentalApi for HttpRentalApi {
    async fn fetch_catalog(&self) -> Result<RemoteCatalog, ClientError> {
        self.send(self.client.get(self.url("/api/reports/catalog")))
            .await
    }

    async fn execute_report(
        &self,
        configuration: &ReportConfiguration,
    ) -> Result<Vec<ReportRow>, ClientError> {
        self.send(
            self.client
                .post(self.url("/api/reports/execute"))
                .json(configuration),
        )
        .await
    }

    async fn list_saved_reports(&self) -> Result<Vec<SavedReport>, ClientError> {
        self.send(self.client.get(self.url("/api/reports/saved")))
            .await
    }

    async fn save_report(
        &self,
        configuration: &ReportConfiguration,
    ) -> Result<SavedReport, ClientError> {
        self.send(
            self.client
                .post(self.url("/api/reports/saved"))
                .json(configuration),
        )
        .await
    }

    async fn delete_saved_report(&self, id: Uuid) -> Result<(), ClientError> {
        let url = self.url(&format!("/api/reports/saved/{}", id));
        let response = self.request(self.client.delete(url)).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn check_availability(
        &self,
        query: &CheckAvailabilityQuery,
    ) -> Result<Vec<Reservation>, ClientError> {
        self.send(
            self.client
                .get(self.url("/api/reservations/check-availability"))
                .query(query),
        )
        .await
    }

    async fn create_reservation(
        &self,
        request: &CreateReservationRequest,
    ) -> Result<Reservation, ClientError> {
        self.send(self.client.post(self.url("/api/reservations")).json(request))
            .await
    }

    async fn list_reservations(
        &self,
        vehicle_id: Option<Uuid>,
    ) -> Result<Vec<Reservation>, ClientError> {
        let response: ListReservationsResponse = self
            .send(
                self.client
                    .get(self.url("/api/reservations"))
                    .query(&ListReservationsQuery { vehicle_id }),
            )
            .await?;
        Ok(response.reservations)
    }
}
