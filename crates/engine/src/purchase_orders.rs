//! Purchase orders placed with distributors.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub product: String,
    pub quantity: i64,
    pub unit_cost: i64,
    #[serde(default)]
    pub unit_freight: i64,
}

/// Total owed for `items`: `Σ (unit_cost + unit_freight) × quantity`.
pub fn order_total(items: &[PurchaseOrderItem]) -> ResultEngine<i64> {
    if items.is_empty() {
        return Err(EngineError::Validation(
            "a purchase order needs at least one item".to_string(),
        ));
    }
    let overflow = || EngineError::Validation("purchase order amount overflow".to_string());
    let mut total = 0i64;
    for item in items {
        if item.product.trim().is_empty() {
            return Err(EngineError::Validation(
                "item product must not be empty".to_string(),
            ));
        }
        if item.quantity <= 0 {
            return Err(EngineError::Validation(format!(
                "quantity for '{}' must be > 0",
                item.product
            )));
        }
        if item.unit_cost < 0 || item.unit_freight < 0 {
            return Err(EngineError::Validation(format!(
                "costs for '{}' must be >= 0",
                item.product
            )));
        }
        let line = item
            .unit_cost
            .checked_add(item.unit_freight)
            .and_then(|unit| unit.checked_mul(item.quantity))
            .ok_or_else(overflow)?;
        total = total.checked_add(line).ok_or_else(overflow)?;
    }
    if total <= 0 {
        return Err(EngineError::Validation(
            "purchase order total must be > 0".to_string(),
        ));
    }
    Ok(total)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Pending,
    Partial,
    Paid,
    Cancelled,
}

impl OrderState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_amounts(amount_paid: i64, total_cost: i64) -> Self {
        if amount_paid >= total_cost {
            Self::Paid
        } else if amount_paid == 0 {
            Self::Pending
        } else {
            Self::Partial
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Partial)
    }
}

impl TryFrom<&str> for OrderState {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid purchase order state: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub distributor_id: Uuid,
    pub items: Vec<PurchaseOrderItem>,
    pub total_cost: i64,
    pub amount_paid: i64,
    pub amount_owed: i64,
    /// Debt written off the distributor when the order was cancelled.
    pub debt_released: i64,
    pub state: OrderState,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: String,
}

impl PurchaseOrder {
    pub(crate) fn to_active_model(&self) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            distributor_id: ActiveValue::Set(self.distributor_id.to_string()),
            total_cost: ActiveValue::Set(self.total_cost),
            amount_paid: ActiveValue::Set(self.amount_paid),
            amount_owed: ActiveValue::Set(self.amount_owed),
            debt_released: ActiveValue::Set(self.debt_released),
            state: ActiveValue::Set(self.state.as_str().to_string()),
            note: ActiveValue::Set(self.note.clone()),
            occurred_at: ActiveValue::Set(self.occurred_at),
            actor_id: ActiveValue::Set(self.actor_id.clone()),
        }
    }

    pub(crate) fn item_models(&self) -> Vec<items::ActiveModel> {
        self.items
            .iter()
            .enumerate()
            .map(|(position, item)| items::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                purchase_order_id: ActiveValue::Set(self.id.to_string()),
                position: ActiveValue::Set(position as i32),
                product: ActiveValue::Set(item.product.clone()),
                quantity: ActiveValue::Set(item.quantity),
                unit_cost: ActiveValue::Set(item.unit_cost),
                unit_freight: ActiveValue::Set(item.unit_freight),
            })
            .collect()
    }

    pub(crate) fn from_models(model: Model, mut item_rows: Vec<items::Model>) -> ResultEngine<Self> {
        item_rows.sort_by_key(|row| row.position);
        Ok(Self {
            id: parse_uuid(&model.id, "purchase order")?,
            distributor_id: parse_uuid(&model.distributor_id, "distributor")?,
            items: item_rows
                .into_iter()
                .map(|row| PurchaseOrderItem {
                    product: row.product,
                    quantity: row.quantity,
                    unit_cost: row.unit_cost,
                    unit_freight: row.unit_freight,
                })
                .collect(),
            total_cost: model.total_cost,
            amount_paid: model.amount_paid,
            amount_owed: model.amount_owed,
            debt_released: model.debt_released,
            state: OrderState::try_from(model.state.as_str())?,
            note: model.note,
            occurred_at: model.occurred_at,
            actor_id: model.actor_id,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub distributor_id: String,
    pub total_cost: i64,
    pub amount_paid: i64,
    pub amount_owed: i64,
    pub debt_released: i64,
    pub state: String,
    pub note: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub actor_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "items::Entity")]
    Items,
}

impl Related<items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub mod items {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "purchase_order_items")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub purchase_order_id: String,
        pub position: i32,
        pub product: String,
        pub quantity: i64,
        pub unit_cost: i64,
        pub unit_freight: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::Entity",
            from = "Column::PurchaseOrderId",
            to = "super::Column::Id",
            on_update = "NoAction",
            on_delete = "Cascade"
        )]
        PurchaseOrder,
    }

    impl Related<super::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::PurchaseOrder.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, unit_cost: i64, unit_freight: i64) -> PurchaseOrderItem {
        PurchaseOrderItem {
            product: "Caja 12ga".to_string(),
            quantity,
            unit_cost,
            unit_freight,
        }
    }

    #[test]
    fn total_includes_freight() {
        assert_eq!(order_total(&[item(10, 300, 20), item(2, 50, 0)]), Ok(3_300));
    }

    #[test]
    fn empty_or_zero_quantity_orders_are_rejected() {
        assert!(matches!(order_total(&[]), Err(EngineError::Validation(_))));
        assert!(matches!(
            order_total(&[item(0, 300, 0)]),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn state_follows_payments() {
        assert_eq!(OrderState::from_amounts(0, 100), OrderState::Pending);
        assert_eq!(OrderState::from_amounts(40, 100), OrderState::Partial);
        assert_eq!(OrderState::from_amounts(100, 100), OrderState::Paid);
        assert!(!OrderState::Cancelled.is_open());
    }
}
