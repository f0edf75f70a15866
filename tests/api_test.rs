//! HTTP tests for the router with mocked services.
//!
//! Run with `cargo test --features test-utils`.

#![cfg(feature = "test-utils")]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use tea_logistics::api::{create_router, AppState};
use tea_logistics::domain::{
    Batch, BatchStatus, BatchType, DeliveryStatus, ExportFile, UserResponse, UserRole,
    UserStatus,
};
use tea_logistics::errors::AppError;
use tea_logistics::services::{
    AuthService, BatchService, DeliveryService, ExchangeService, InventoryService,
    MockAuthService, MockBatchService, MockDeliveryService, MockExchangeService,
    MockInventoryService, MockNotificationService, MockProductService, MockReceivingService,
    MockReportService, MockServiceContainer, MockUserService, NotificationService,
    ProductService, ReceivingService, ReportService, UserService,
};
use tea_logistics::types::Paginated;

/// Services a test wants to script; everything else is an empty mock
#[derive(Default)]
struct Mocks {
    products: MockProductService,
    inventory: MockInventoryService,
    deliveries: MockDeliveryService,
    batches: MockBatchService,
    exchange: MockExchangeService,
}

fn account_for(token: &str) -> Result<UserResponse, AppError> {
    let role = match token {
        "viewer-token" => UserRole::Viewer,
        "manager-token" => UserRole::Manager,
        "admin-token" => UserRole::Admin,
        _ => return Err(AppError::Unauthorized),
    };
    let now = Utc::now();
    Ok(UserResponse {
        id: Uuid::new_v4(),
        email: format!("{}@tea.example", role),
        name: "Mei Lin".to_string(),
        role,
        status: UserStatus::Active,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

fn app(mocks: Mocks) -> Router {
    let mut auth = MockAuthService::new();
    auth.expect_authenticate().returning(account_for);

    let auth: Arc<dyn AuthService> = Arc::new(auth);
    let users: Arc<dyn UserService> = Arc::new(MockUserService::new());
    let products: Arc<dyn ProductService> = Arc::new(mocks.products);
    let inventory: Arc<dyn InventoryService> = Arc::new(mocks.inventory);
    let deliveries: Arc<dyn DeliveryService> = Arc::new(mocks.deliveries);
    let receivings: Arc<dyn ReceivingService> = Arc::new(MockReceivingService::new());
    let notifications: Arc<dyn NotificationService> = Arc::new(MockNotificationService::new());
    let batches: Arc<dyn BatchService> = Arc::new(mocks.batches);
    let reports: Arc<dyn ReportService> = Arc::new(MockReportService::new());
    let exchange: Arc<dyn ExchangeService> = Arc::new(mocks.exchange);

    let mut container = MockServiceContainer::new();
    container.expect_auth().return_const(auth);
    container.expect_users().return_const(users);
    container.expect_products().return_const(products);
    container.expect_inventory().return_const(inventory);
    container.expect_deliveries().return_const(deliveries);
    container.expect_receivings().return_const(receivings);
    container.expect_notifications().return_const(notifications);
    container.expect_batches().return_const(batches);
    container.expect_reports().return_const(reports);
    container.expect_exchange().return_const(exchange);

    create_router(AppState::from_services(&container, None, None))
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn sencha() -> Value {
    json!({
        "sku": "GT-SENCHA-100",
        "name": "Sencha Superior",
        "category": "green_tea",
        "price": 24.5,
        "unit": "kg"
    })
}

fn pending_batch(id: Uuid) -> Batch {
    Batch {
        id,
        batch_type: BatchType::StockCheck,
        status: BatchStatus::Pending,
        schedule: None,
        retry_count: 0,
        timeout_seconds: 300,
        params: json!({}),
        started_at: None,
        finished_at: None,
        processed_items: 0,
        success_count: 0,
        error_count: 0,
        errors: Vec::new(),
        logs: Vec::new(),
        created_by: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn root_names_the_api() {
    let response = app(Mocks::default())
        .oneshot(request(Method::GET, "/", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Tea Logistics API");
}

#[tokio::test]
async fn health_is_degraded_without_backends() {
    let response = app(Mocks::default())
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["database"]["status"], "unavailable");
}

#[tokio::test]
async fn protected_route_requires_a_token() {
    let response = app(Mocks::default())
        .oneshot(request(Method::GET, "/products", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let response = app(Mocks::default())
        .oneshot(request(Method::GET, "/products", Some("forged"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn viewer_can_list_products() {
    let mut mocks = Mocks::default();
    mocks
        .products
        .expect_list()
        .returning(|_, params| Ok(Paginated::new(Vec::new(), &params, 0)));

    let response = app(mocks)
        .oneshot(request(Method::GET, "/products?page=1&per_page=10", Some("viewer-token"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
async fn viewer_cannot_create_products() {
    let mut mocks = Mocks::default();
    mocks.products.expect_create().never();

    let response = app(mocks)
        .oneshot(request(Method::POST, "/products", Some("viewer-token"), Some(sencha())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn malformed_sku_fails_validation() {
    let mut body = sencha();
    body["sku"] = json!("sencha 100");

    let response = app(Mocks::default())
        .oneshot(request(Method::POST, "/products", Some("manager-token"), Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn user_administration_is_admin_only() {
    let uri = format!("/users/{}", Uuid::new_v4());
    let response = app(Mocks::default())
        .oneshot(request(Method::DELETE, &uri, Some("manager-token"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_rejects_a_malformed_email() {
    let response = app(Mocks::default())
        .oneshot(request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "not-an-email", "password": "secret" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let response = app(Mocks::default())
        .oneshot(request(Method::GET, "/api-docs/openapi.json", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["info"]["title"], "Tea Logistics API");
}

#[tokio::test]
async fn short_transfer_is_a_conflict() {
    let mut mocks = Mocks::default();
    mocks
        .inventory
        .expect_transfer()
        .returning(|_, _| Err(AppError::insufficient_stock("MAIN has 3, 10 requested")));

    let response = app(mocks)
        .oneshot(request(
            Method::POST,
            "/inventory/transfer",
            Some("manager-token"),
            Some(json!({
                "product_id": Uuid::new_v4(),
                "from_location": "MAIN",
                "to_location": "SHOP-1",
                "quantity": 10
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");
}

#[tokio::test]
async fn export_sets_download_headers() {
    let mut mocks = Mocks::default();
    mocks.exchange.expect_export().returning(|_| {
        Ok(ExportFile {
            filename: "products_20261019.csv".to_string(),
            content_type: "text/csv",
            body: b"sku,name\nGT-SENCHA-100,Sencha Superior\n".to_vec(),
            total_records: 1,
        })
    });

    let response = app(mocks)
        .oneshot(request(
            Method::POST,
            "/export",
            Some("manager-token"),
            Some(json!({ "type": "product", "format": "csv" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"products_20261019.csv\""
    );
    assert_eq!(headers["x-total-records"], "1");
}

#[tokio::test]
async fn batch_execution_is_accepted() {
    let id = Uuid::new_v4();
    let mut mocks = Mocks::default();
    mocks
        .batches
        .expect_execute()
        .withf(move |batch_id| *batch_id == id)
        .returning(|id| Ok(pending_batch(id)));

    let uri = format!("/batches/{}/execute", id);
    let response = app(mocks)
        .oneshot(request(Method::POST, &uri, Some("manager-token"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["type"], "stock_check");
}

#[tokio::test]
async fn illegal_delivery_transition_is_a_bad_request() {
    let mut mocks = Mocks::default();
    mocks
        .deliveries
        .expect_update_status()
        .withf(|_, status, _| *status == DeliveryStatus::Pending)
        .returning(|_, _, _| {
            Err(AppError::invalid_transition(
                DeliveryStatus::Delivered,
                DeliveryStatus::Pending,
            ))
        });

    let uri = format!("/deliveries/{}/status", Uuid::new_v4());
    let response = app(mocks)
        .oneshot(request(
            Method::PUT,
            &uri,
            Some("manager-token"),
            Some(json!({ "status": "pending" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INVALID_STATUS_TRANSITION");
}
