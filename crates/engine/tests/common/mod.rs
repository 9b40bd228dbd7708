#![allow(dead_code)]

use std::time::Duration;

use chrono::Utc;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{
    CreatePurchaseOrderCmd, Engine, IngresoCmd, PurchaseOrderItem, PurchaseOrderReceipt,
    SaleItem, VaultId,
};
use migration::MigratorTrait;

pub const ACTOR: &str = "alice";

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// File backed database, so that several connections can contend for it.
pub async fn engine_with_file_db() -> (Engine, DatabaseConnection, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .max_attempts(50)
        .retry_backoff(Duration::from_millis(5))
        .build()
        .await
        .unwrap();

    (engine, db, path)
}

pub fn sale_item(product: &str, quantity: i64, sale: i64, cost: i64, freight: i64) -> SaleItem {
    SaleItem {
        product: product.to_string(),
        quantity,
        unit_sale_price: sale,
        unit_cost_price: cost,
        unit_freight_price: freight,
        source_purchase_order_id: None,
    }
}

pub fn order_item(product: &str, quantity: i64, cost: i64, freight: i64) -> PurchaseOrderItem {
    PurchaseOrderItem {
        product: product.to_string(),
        quantity,
        unit_cost: cost,
        unit_freight: freight,
    }
}

/// Put `quantity` units of `product` in stock on credit.
pub async fn stock_up(engine: &Engine, product: &str, quantity: i64) -> PurchaseOrderReceipt {
    let cmd = CreatePurchaseOrderCmd::new(
        "Almacén Central",
        ACTOR,
        vec![order_item(product, quantity, 30, 5)],
        Utc::now(),
    );
    engine.create_purchase_order(cmd).await.unwrap()
}

/// Seed an operational vault through a manual income.
pub async fn fund(engine: &Engine, account: VaultId, amount: i64) {
    let cmd = IngresoCmd::new(account, ACTOR, amount, "capital inicial", Utc::now());
    engine.registrar_ingreso(cmd).await.unwrap();
}
