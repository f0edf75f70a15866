//! Stock mutations against a real PostgreSQL database.
//!
//! These run every transactional stock path end to end and check the
//! on-hand counts, status changes and history rows they leave behind.
//! Each test works on its own freshly created product, so they can share
//! one scratch database.
//!
//! 1. Start PostgreSQL (e.g. `docker compose up -d db`)
//! 2. Export `DATABASE_URL` pointing at a scratch database
//! 3. Run: cargo test --test stock_flow_test -- --ignored

use uuid::Uuid;

use tea_logistics::domain::{
    DataFormat, DataType, DeliveryStatus, ImportOptions, MovementType, NewDelivery, NewProduct,
    NewReceiving, NewUser, Product, ProductCategory, ProductStatus, ReceivingStatus,
    StockAdjustment, StockChangeType, StockHistory, Transfer, UserRole,
};
use tea_logistics::errors::AppError;
use tea_logistics::infra::{
    Database, DeliveryRepository, Persistence, UnitOfWork, UserRepository,
};
use tea_logistics::services::{
    DeliveryService, ExchangeService, InventoryService, ProductService, ReceivingService,
    ServiceContainer, Services,
};
use tea_logistics::types::PaginationParams;
use tea_logistics::Config;

const TEST_SECRET: &str = "stock-flow-test-secret-0123456789abcdef";

struct Env {
    services: Services,
    uow: Persistence,
}

async fn env() -> Env {
    let mut config = Config::new(TEST_SECRET);
    config.database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
    let db = Database::connect(&config)
        .await
        .expect("database should connect and migrate");
    Env {
        uow: Persistence::new(db.get_connection()),
        services: Services::from_connection(db.get_connection(), None, config),
    }
}

fn unique(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}-{}", prefix, &id[..12])
}

async fn product(env: &Env) -> Product {
    env.services
        .products()
        .create(NewProduct {
            sku: unique("IT"),
            name: "Gyokuro Kin".to_string(),
            description: None,
            category: ProductCategory::GreenTea,
            price: 42.5,
            unit: "tin".to_string(),
            status: ProductStatus::Active,
            image_url: None,
        })
        .await
        .expect("product should be created")
}

/// Stored account, needed wherever a notification row references the actor
async fn operator(env: &Env) -> Uuid {
    env.uow
        .users()
        .create(NewUser {
            email: format!("{}@tea.example", unique("op").to_lowercase()),
            password_hash: "not-a-real-hash".to_string(),
            name: "Aiko Tanaka".to_string(),
            role: UserRole::Operator,
        })
        .await
        .expect("operator should be created")
        .id
}

async fn seed(env: &Env, product_id: Uuid, location: &str, quantity: i32, actor: Uuid) {
    env.services
        .products()
        .adjust_stock(
            product_id,
            StockAdjustment {
                location: location.to_string(),
                change_type: StockChangeType::In,
                quantity,
                reason: Some("Opening stock".to_string()),
            },
            actor,
        )
        .await
        .expect("seeding stock should succeed");
}

async fn on_hand(env: &Env, product_id: Uuid, location: &str) -> Option<i32> {
    env.services
        .inventory()
        .by_product(product_id)
        .await
        .expect("inventory should load")
        .into_iter()
        .find(|row| row.location == location)
        .map(|row| row.quantity)
}

async fn history(env: &Env, product_id: Uuid) -> Vec<StockHistory> {
    env.services
        .products()
        .stock_history(product_id, PaginationParams::new(1, 100))
        .await
        .expect("history should load")
        .data
}

/// `(location, previous, new, type)` for every history row, sorted
async fn history_steps(env: &Env, product_id: Uuid) -> Vec<(String, i32, i32, StockChangeType)> {
    let mut steps: Vec<_> = history(env, product_id)
        .await
        .into_iter()
        .map(|h| (h.location, h.previous_stock, h.new_stock, h.change_type))
        .collect();
    steps.sort_by(|a, b| (&a.0, a.1, a.2).cmp(&(&b.0, b.1, b.2)));
    steps
}

fn delivery(product_id: Uuid, order_number: &str, quantity: i32, from: &str) -> NewDelivery {
    NewDelivery {
        order_number: order_number.to_string(),
        product_id,
        quantity,
        from_location: from.to_string(),
        customer_name: "Hana Sato".to_string(),
        customer_address: "2-1 Marunouchi, Tokyo".to_string(),
        customer_phone: "+81 3 1234 5678".to_string(),
        estimated_delivery_date: None,
        note: None,
        status: DeliveryStatus::Pending,
        stock_reserved: true,
        created_by: None,
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn adjustments_add_take_and_set_stock() {
    let env = env().await;
    let actor = operator(&env).await;
    let tea = product(&env).await;
    let products = env.services.products();

    seed(&env, tea.id, "WH-TOKYO-A1", 50, actor).await;

    let taken = products
        .adjust_stock(
            tea.id,
            StockAdjustment {
                location: "WH-TOKYO-A1".to_string(),
                change_type: StockChangeType::Out,
                quantity: 20,
                reason: Some("Damaged tins".to_string()),
            },
            actor,
        )
        .await
        .unwrap();
    assert_eq!((taken.previous_stock, taken.new_stock), (50, 30));
    assert_eq!(taken.change_amount, -20);
    assert_eq!(taken.created_by, Some(actor));

    let too_many = products
        .adjust_stock(
            tea.id,
            StockAdjustment {
                location: "WH-TOKYO-A1".to_string(),
                change_type: StockChangeType::Out,
                quantity: 40,
                reason: None,
            },
            actor,
        )
        .await;
    assert!(matches!(too_many, Err(AppError::InsufficientStock(_))));
    assert_eq!(on_hand(&env, tea.id, "WH-TOKYO-A1").await, Some(30));

    products
        .adjust_stock(
            tea.id,
            StockAdjustment {
                location: "WH-TOKYO-A1".to_string(),
                change_type: StockChangeType::Adjustment,
                quantity: 12,
                reason: Some("Cycle count".to_string()),
            },
            actor,
        )
        .await
        .unwrap();
    assert_eq!(on_hand(&env, tea.id, "WH-TOKYO-A1").await, Some(12));

    // The refused take leaves no trace
    assert_eq!(
        history_steps(&env, tea.id).await,
        vec![
            ("WH-TOKYO-A1".to_string(), 0, 50, StockChangeType::In),
            ("WH-TOKYO-A1".to_string(), 30, 12, StockChangeType::Adjustment),
            ("WH-TOKYO-A1".to_string(), 50, 30, StockChangeType::Out),
        ]
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn delivery_reserves_stock_and_cancellation_returns_it() {
    let env = env().await;
    let actor = operator(&env).await;
    let tea = product(&env).await;
    let deliveries = env.services.deliveries();
    seed(&env, tea.id, "WH-OSAKA-B2", 30, actor).await;

    let order = unique("ORD");
    let created = deliveries
        .create(delivery(tea.id, &order, 8, "WH-OSAKA-B2"))
        .await
        .unwrap();
    assert_eq!(created.status, DeliveryStatus::Pending);
    assert!(created.stock_reserved);
    assert_eq!(on_hand(&env, tea.id, "WH-OSAKA-B2").await, Some(22));

    let oversized = deliveries
        .create(delivery(tea.id, &unique("ORD"), 500, "WH-OSAKA-B2"))
        .await;
    assert!(matches!(oversized, Err(AppError::InsufficientStock(_))));
    assert_eq!(on_hand(&env, tea.id, "WH-OSAKA-B2").await, Some(22));

    let cancelled = deliveries
        .update_status(created.id, DeliveryStatus::Cancelled, None)
        .await
        .unwrap();
    assert_eq!(cancelled.status, DeliveryStatus::Cancelled);
    assert_eq!(on_hand(&env, tea.id, "WH-OSAKA-B2").await, Some(30));

    let reasons: Vec<_> = history(&env, tea.id)
        .await
        .into_iter()
        .filter_map(|h| h.reason)
        .collect();
    assert!(reasons.contains(&format!("Reserved for delivery {}", order)));
    assert!(reasons.contains(&format!("Delivery {} cancelled", order)));

    let again = deliveries
        .update_status(created.id, DeliveryStatus::Pending, None)
        .await;
    assert!(matches!(again, Err(AppError::InvalidTransition(_))));
    assert_eq!(on_hand(&env, tea.id, "WH-OSAKA-B2").await, Some(30));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn cancelling_imported_deliveries_restocks_only_reserved_ones() {
    let env = env().await;
    let actor = operator(&env).await;
    let tea = product(&env).await;
    let exchange = env.services.exchange();
    let deliveries = env.services.deliveries();
    seed(&env, tea.id, "WH-KYOTO-C3", 30, actor).await;

    let import = |order: &str, quantity: i32| {
        serde_json::to_vec(&serde_json::json!([{
            "order_number": order,
            "sku": tea.sku,
            "quantity": quantity,
            "from_location": "WH-KYOTO-C3",
            "customer_name": "Ren Ito",
            "customer_address": "5-3 Gion, Kyoto",
            "customer_phone": "075-555-0100",
        }]))
        .unwrap()
    };
    let options = |reserve_stock| ImportOptions {
        data_type: DataType::Delivery,
        format: DataFormat::Json,
        reserve_stock,
    };

    let unreserved = unique("IMP");
    let result = exchange
        .import(options(false), import(&unreserved, 6), actor)
        .await
        .unwrap();
    assert_eq!(result.success_count, 1, "{:?}", result.errors);
    assert_eq!(on_hand(&env, tea.id, "WH-KYOTO-C3").await, Some(30));

    let stored = env
        .uow
        .deliveries()
        .find_by_order_number(&unreserved)
        .await
        .unwrap()
        .expect("imported delivery should exist");
    assert!(!stored.stock_reserved);
    deliveries
        .update_status(stored.id, DeliveryStatus::Cancelled, Some(actor))
        .await
        .unwrap();
    assert_eq!(on_hand(&env, tea.id, "WH-KYOTO-C3").await, Some(30));

    let reserved = unique("IMP");
    let result = exchange
        .import(options(true), import(&reserved, 5), actor)
        .await
        .unwrap();
    assert_eq!(result.success_count, 1, "{:?}", result.errors);
    assert_eq!(on_hand(&env, tea.id, "WH-KYOTO-C3").await, Some(25));

    let stored = env
        .uow
        .deliveries()
        .find_by_order_number(&reserved)
        .await
        .unwrap()
        .expect("imported delivery should exist");
    assert!(stored.stock_reserved);
    deliveries
        .update_status(stored.id, DeliveryStatus::Cancelled, Some(actor))
        .await
        .unwrap();
    assert_eq!(on_hand(&env, tea.id, "WH-KYOTO-C3").await, Some(30));

    // Seed, reservation and its return; the unreserved import wrote nothing
    assert_eq!(history(&env, tea.id).await.len(), 3);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn receiving_adds_stock_once_when_received() {
    let env = env().await;
    let actor = operator(&env).await;
    let tea = product(&env).await;
    let receivings = env.services.receivings();
    let order = unique("PO");

    let receiving = receivings
        .create(NewReceiving {
            order_number: order.clone(),
            supplier_name: "Uji Farms".to_string(),
            product_id: tea.id,
            quantity: 40,
            location: "WH-UJI-D4".to_string(),
            expected_date: None,
            note: None,
            created_by: Some(actor),
        })
        .await
        .unwrap();
    assert_eq!(receiving.status, ReceivingStatus::Pending);

    receivings
        .update_status(receiving.id, ReceivingStatus::InTransit, actor)
        .await
        .unwrap();
    assert_eq!(on_hand(&env, tea.id, "WH-UJI-D4").await, None);

    let received = receivings
        .update_status(receiving.id, ReceivingStatus::Received, actor)
        .await
        .unwrap();
    assert_eq!(received.status, ReceivingStatus::Received);
    assert!(received.received_date.is_some());
    assert_eq!(on_hand(&env, tea.id, "WH-UJI-D4").await, Some(40));

    let twice = receivings
        .update_status(receiving.id, ReceivingStatus::Received, actor)
        .await;
    assert!(matches!(twice, Err(AppError::InvalidTransition(_))));
    assert_eq!(on_hand(&env, tea.id, "WH-UJI-D4").await, Some(40));

    assert_eq!(
        history_steps(&env, tea.id).await,
        vec![("WH-UJI-D4".to_string(), 0, 40, StockChangeType::In)]
    );
    let movements = env
        .services
        .inventory()
        .list_movements(Some(tea.id), PaginationParams::new(1, 20))
        .await
        .unwrap();
    assert_eq!(movements.data.len(), 1);
    assert_eq!(movements.data[0].movement_type, MovementType::Inbound);
    assert_eq!(movements.data[0].reference_number.as_deref(), Some(order.as_str()));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn transfer_moves_stock_and_opens_the_destination() {
    let env = env().await;
    let actor = operator(&env).await;
    let tea = product(&env).await;
    let inventory = env.services.inventory();
    seed(&env, tea.id, "WH-TOKYO-A1", 25, actor).await;

    let transfer = |from: &str, to: &str, quantity| Transfer {
        product_id: tea.id,
        from_location: from.to_string(),
        to_location: to.to_string(),
        quantity,
        movement_type: MovementType::Transfer,
        reference_number: None,
        moved_at: None,
    };

    let movement = inventory
        .transfer(transfer("WH-TOKYO-A1", "WH-NAGOYA-E5", 10), actor)
        .await
        .unwrap();
    assert_eq!(movement.quantity, 10);
    assert_eq!(movement.movement_type, MovementType::Transfer);
    assert_eq!(on_hand(&env, tea.id, "WH-TOKYO-A1").await, Some(15));
    assert_eq!(on_hand(&env, tea.id, "WH-NAGOYA-E5").await, Some(10));

    let short = inventory
        .transfer(transfer("WH-TOKYO-A1", "WH-NAGOYA-E5", 100), actor)
        .await;
    assert!(matches!(short, Err(AppError::InsufficientStock(_))));

    let nowhere = inventory
        .transfer(transfer("WH-NOWHERE", "WH-NAGOYA-E5", 1), actor)
        .await;
    assert!(matches!(nowhere, Err(AppError::NotFound)));

    assert_eq!(on_hand(&env, tea.id, "WH-TOKYO-A1").await, Some(15));
    assert_eq!(on_hand(&env, tea.id, "WH-NAGOYA-E5").await, Some(10));
    assert_eq!(
        history_steps(&env, tea.id).await,
        vec![
            ("WH-NAGOYA-E5".to_string(), 0, 10, StockChangeType::In),
            ("WH-TOKYO-A1".to_string(), 0, 25, StockChangeType::In),
            ("WH-TOKYO-A1".to_string(), 25, 15, StockChangeType::Out),
        ]
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn inventory_import_sets_counts_and_reports_bad_rows() {
    let env = env().await;
    let actor = operator(&env).await;
    let tea = product(&env).await;
    let options = ImportOptions {
        data_type: DataType::Inventory,
        format: DataFormat::Json,
        reserve_stock: false,
    };

    let body = serde_json::to_vec(&serde_json::json!([
        { "sku": tea.sku, "location": "WH-SENDAI-F6", "quantity": 70 },
        { "sku": "NO-SUCH-SKU", "location": "WH-SENDAI-F6", "quantity": 5 },
        { "sku": tea.sku, "location": "WH-SENDAI-F6", "quantity": -1 },
    ]))
    .unwrap();
    let result = env
        .services
        .exchange()
        .import(options, body, actor)
        .await
        .unwrap();
    assert_eq!(result.total_records, 3);
    assert_eq!(result.success_count, 1);
    let failed_rows: Vec<_> = result.errors.iter().map(|e| e.row).collect();
    assert_eq!(failed_rows, vec![2, 3]);
    assert_eq!(on_hand(&env, tea.id, "WH-SENDAI-F6").await, Some(70));

    let body = serde_json::to_vec(&serde_json::json!([
        { "sku": tea.sku, "location": "WH-SENDAI-F6", "quantity": 55 },
    ]))
    .unwrap();
    env.services
        .exchange()
        .import(options, body, actor)
        .await
        .unwrap();
    assert_eq!(on_hand(&env, tea.id, "WH-SENDAI-F6").await, Some(55));

    let entries = history(&env, tea.id).await;
    assert!(entries
        .iter()
        .all(|h| h.reason.as_deref() == Some("Imported")
            && h.change_type == StockChangeType::Adjustment));
    assert_eq!(
        history_steps(&env, tea.id).await,
        vec![
            ("WH-SENDAI-F6".to_string(), 0, 70, StockChangeType::Adjustment),
            ("WH-SENDAI-F6".to_string(), 70, 55, StockChangeType::Adjustment),
        ]
    );
}
