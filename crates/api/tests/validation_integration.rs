//! Request validation tests that never reach the database.
//!
//! The app runs over a lazily-connected pool pointed at a closed port, so
//! any handler that passes validation and queries the database fails.

mod common;

use axum::http::{Method, StatusCode};
use common::{create_offline_app, get_request, json_request, parse_response_body};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_liveness_does_not_need_database() {
    let app = create_offline_app();
    let response = app.oneshot(get_request("/api/health/live")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let app = create_offline_app();
    let response = app.oneshot(get_request("/api/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let app = create_offline_app();
    let request = axum::http::Request::builder()
        .uri("/api/health/live")
        .header("X-Request-ID", "req-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-42");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_catalog_is_served_without_database() {
    let app = create_offline_app();
    let response = app.oneshot(get_request("/api/reports/catalog")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    let sources: Vec<&str> = body["dataSources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        sources,
        vec!["vehicles", "customers", "drivers", "reservations", "expenses", "maintenance"]
    );
    assert!(body["relations"].as_array().unwrap().len() >= 5);
}

#[tokio::test]
async fn test_execute_rejects_report_without_columns() {
    let app = create_offline_app();
    let request = json_request(
        Method::POST,
        "/api/reports/execute",
        json!({"dataSources": ["vehicles"], "columns": []}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["message"], "At least one column is required");
}

#[tokio::test]
async fn test_execute_rejects_unknown_data_source() {
    let app = create_offline_app();
    let request = json_request(
        Method::POST,
        "/api/reports/execute",
        json!({
            "dataSources": ["vehicles; DROP TABLE vehicles"],
            "columns": [{"field": "id", "table": "vehicles", "label": "Id"}]
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_execute_rejects_disallowed_operator() {
    let app = create_offline_app();
    let request = json_request(
        Method::POST,
        "/api/reports/execute",
        json!({
            "dataSources": ["vehicles"],
            "columns": [{"field": "licensePlate", "table": "vehicles", "label": "Plate"}],
            "filters": [
                {"table": "vehicles", "field": "licensePlate", "operator": "greaterThan", "value": "A"}
            ]
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert!(body["message"].as_str().unwrap().contains("greaterThan"));
}

#[tokio::test]
async fn test_save_requires_report_name() {
    let app = create_offline_app();
    let request = json_request(
        Method::POST,
        "/api/reports/saved",
        json!({
            "name": "",
            "dataSources": ["vehicles"],
            "columns": [{"field": "licensePlate", "table": "vehicles", "label": "Plate"}]
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["message"], "Report name is required");
}

#[tokio::test]
async fn test_create_reservation_rejects_reversed_dates() {
    let app = create_offline_app();
    let request = json_request(
        Method::POST,
        "/api/reservations",
        json!({
            "vehicleId": Uuid::new_v4(),
            "customerId": Uuid::new_v4(),
            "startDate": "2024-03-10",
            "endDate": "2024-03-01"
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_reservation_rejects_negative_amount() {
    let app = create_offline_app();
    let request = json_request(
        Method::POST,
        "/api/reservations",
        json!({
            "vehicleId": Uuid::new_v4(),
            "customerId": Uuid::new_v4(),
            "startDate": "2024-03-01",
            "totalAmount": -5.0
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_availability_rejects_reversed_dates() {
    let app = create_offline_app();
    let uri = format!(
        "/api/reservations/check-availability?vehicleId={}&startDate=2024-05-10&endDate=2024-05-01",
        Uuid::new_v4()
    );
    let response = app.oneshot(get_request(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_availability_requires_vehicle_id() {
    let app = create_offline_app();
    let response = app
        .oneshot(get_request(
            "/api/reservations/check-availability?startDate=2024-05-01",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_availability_fails_closed_when_database_is_down() {
    let app = create_offline_app();
    let uri = format!(
        "/api/reservations/check-availability?vehicleId={}&startDate=2024-05-01&endDate=2024-05-03",
        Uuid::new_v4()
    );
    let response = app.oneshot(get_request(&uri)).await.unwrap();
    assert!(response.status().is_server_error());
}

#[tokio::test]
async fn test_saving_with_overlong_user_id_is_rejected() {
    let app = create_offline_app();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/reports/saved")
        .header("content-type", "application/json")
        .header("X-User-Id", "u".repeat(101))
        .body(axum::body::Body::from(
            json!({
                "name": "Plates",
                "dataSources": ["vehicles"],
                "columns": [{"field": "licensePlate", "table": "vehicles", "label": "Plate"}]
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
