//! Stock adjustment contract and the built-in product table.
//!
//! The orchestrator never touches stock directly: it calls a
//! [`StockAdjuster`] with its open transaction so stock changes commit or roll
//! back together with the sale or purchase that caused them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, entity::prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, util::normalize_required_name};

#[async_trait]
pub trait StockAdjuster: Send + Sync {
    /// Take `quantity` units of `product` out of stock.
    async fn decrement_stock(
        &self,
        db_tx: &DatabaseTransaction,
        product: &str,
        quantity: i64,
    ) -> ResultEngine<()>;

    /// Put `quantity` units of `product` into stock.
    async fn increment_stock(
        &self,
        db_tx: &DatabaseTransaction,
        product: &str,
        quantity: i64,
    ) -> ResultEngine<()>;

    /// Current units on hand, `None` for an unknown product.
    async fn stock_level(
        &self,
        db_tx: &DatabaseTransaction,
        product: &str,
    ) -> ResultEngine<Option<ProductStockLevel>>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStockLevel {
    pub name: String,
    pub stock: i64,
    pub updated_at: DateTime<Utc>,
}

/// Default adjuster backed by the `products` table, keyed by canonical
/// product name.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProductStock;

impl ProductStock {
    async fn find(db_tx: &DatabaseTransaction, name_norm: &str) -> ResultEngine<Option<Model>> {
        Ok(Entity::find()
            .filter(Column::NameNorm.eq(name_norm))
            .one(db_tx)
            .await?)
    }
}

#[async_trait]
impl StockAdjuster for ProductStock {
    async fn decrement_stock(
        &self,
        db_tx: &DatabaseTransaction,
        product: &str,
        quantity: i64,
    ) -> ResultEngine<()> {
        let (_, name_norm) = normalize_required_name(product, "product")?;
        let model = Self::find(db_tx, &name_norm)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("product {product}")))?;
        if model.stock < quantity {
            return Err(EngineError::Validation(format!(
                "insufficient stock for '{}': {} on hand, {} requested",
                model.name, model.stock, quantity
            )));
        }
        let active = ActiveModel {
            id: ActiveValue::Unchanged(model.id),
            stock: ActiveValue::Set(model.stock - quantity),
            updated_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        };
        active.update(db_tx).await?;
        Ok(())
    }

    async fn increment_stock(
        &self,
        db_tx: &DatabaseTransaction,
        product: &str,
        quantity: i64,
    ) -> ResultEngine<()> {
        let (display, name_norm) = normalize_required_name(product, "product")?;
        match Self::find(db_tx, &name_norm).await? {
            Some(model) => {
                let stock = model.stock.checked_add(quantity).ok_or_else(|| {
                    EngineError::Validation(format!("stock overflow for '{}'", model.name))
                })?;
                let active = ActiveModel {
                    id: ActiveValue::Unchanged(model.id),
                    stock: ActiveValue::Set(stock),
                    updated_at: ActiveValue::Set(Utc::now()),
                    ..Default::default()
                };
                active.update(db_tx).await?;
            }
            None => {
                let active = ActiveModel {
                    id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
                    name: ActiveValue::Set(display),
                    name_norm: ActiveValue::Set(name_norm),
                    stock: ActiveValue::Set(quantity),
                    updated_at: ActiveValue::Set(Utc::now()),
                };
                active.insert(db_tx).await?;
            }
        }
        Ok(())
    }

    async fn stock_level(
        &self,
        db_tx: &DatabaseTransaction,
        product: &str,
    ) -> ResultEngine<Option<ProductStockLevel>> {
        let (_, name_norm) = normalize_required_name(product, "product")?;
        Ok(Self::find(db_tx, &name_norm)
            .await?
            .map(|model| ProductStockLevel {
                name: model.name,
                stock: model.stock,
                updated_at: model.updated_at,
            }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(unique)]
    pub name_norm: String,
    pub stock: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
