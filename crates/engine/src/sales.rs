//! Sales and their line items.
//!
//! A sale's items and full distribution are written once. Later abonos only
//! move `amount_paid`, `amount_remaining`, `payment_state` and the effective
//! distribution forward.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Distribution, EngineError, ResultEngine, SaleItem, VaultId,
    util::{normalize_optional_text, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    Partial,
    Complete,
}

impl PaymentState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Complete => "complete",
        }
    }

    /// State implied by a cumulative payment.
    pub fn from_amounts(amount_paid: i64, total_revenue: i64) -> Self {
        if amount_paid >= total_revenue {
            Self::Complete
        } else if amount_paid == 0 {
            Self::Pending
        } else {
            Self::Partial
        }
    }

    /// Reconcile the declared state with the declared initial payment.
    ///
    /// `complete` with nothing paid is shorthand for "paid in full". Every
    /// other combination must agree with [`PaymentState::from_amounts`].
    pub fn resolve_initial_payment(self, amount_paid: i64, total_revenue: i64) -> ResultEngine<i64> {
        if amount_paid < 0 {
            return Err(EngineError::Validation(
                "amount paid must be >= 0".to_string(),
            ));
        }
        if amount_paid > total_revenue {
            return Err(EngineError::Overpayment(format!(
                "paid {amount_paid} exceeds sale total {total_revenue}"
            )));
        }
        let paid = match (self, amount_paid) {
            (Self::Complete, 0) => total_revenue,
            _ => amount_paid,
        };
        let implied = Self::from_amounts(paid, total_revenue);
        if implied != self {
            return Err(EngineError::Validation(format!(
                "payment state '{}' does not match amount paid {paid} of {total_revenue}",
                self.as_str()
            )));
        }
        Ok(paid)
    }
}

impl TryFrom<&str> for PaymentState {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "complete" => Ok(Self::Complete),
            other => Err(EngineError::Validation(format!(
                "invalid payment state: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Efectivo,
    Transferencia,
    Deposito,
    Mixto,
    TransferenciaUsa,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Efectivo => "efectivo",
            Self::Transferencia => "transferencia",
            Self::Deposito => "deposito",
            Self::Mixto => "mixto",
            Self::TransferenciaUsa => "transferencia_usa",
        }
    }

    /// Capital vault that receives the cost portion of a sale.
    pub fn cost_vault(self) -> VaultId {
        match self {
            Self::TransferenciaUsa => VaultId::BovedaUsa,
            _ => VaultId::BovedaMonte,
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "efectivo" => Ok(Self::Efectivo),
            "transferencia" => Ok(Self::Transferencia),
            "deposito" => Ok(Self::Deposito),
            "mixto" => Ok(Self::Mixto),
            "transferencia_usa" => Ok(Self::TransferenciaUsa),
            other => Err(EngineError::Validation(format!(
                "invalid payment method: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub client_id: Uuid,
    pub items: Vec<SaleItem>,
    pub total_revenue: i64,
    pub full_distribution: Distribution,
    pub effective_distribution: Distribution,
    pub amount_paid: i64,
    pub amount_remaining: i64,
    /// Part of `amount_paid` that arrived through abonos without a sale and
    /// was credited to a vault of the client's choosing instead of the split.
    #[serde(default)]
    pub settled_outside: i64,
    pub payment_state: PaymentState,
    pub payment_method: PaymentMethod,
    pub cost_vault: VaultId,
    pub freight_applies: bool,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: String,
}

impl Sale {
    /// Payments that went through the distribution split.
    pub fn distributed_paid(&self) -> i64 {
        self.amount_paid - self.settled_outside
    }

    /// Vault targets for each distribution component, in credit order.
    pub fn vault_targets(&self, credit: &Distribution) -> [(VaultId, i64, &'static str); 3] {
        [
            (self.cost_vault, credit.cost, "cost"),
            (VaultId::FleteSur, credit.freight, "freight"),
            (VaultId::Utilidades, credit.profit, "profit"),
        ]
    }

    pub(crate) fn to_active_model(&self) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            client_id: ActiveValue::Set(self.client_id.to_string()),
            total_revenue: ActiveValue::Set(self.total_revenue),
            full_cost: ActiveValue::Set(self.full_distribution.cost),
            full_freight: ActiveValue::Set(self.full_distribution.freight),
            full_profit: ActiveValue::Set(self.full_distribution.profit),
            effective_cost: ActiveValue::Set(self.effective_distribution.cost),
            effective_freight: ActiveValue::Set(self.effective_distribution.freight),
            effective_profit: ActiveValue::Set(self.effective_distribution.profit),
            amount_paid: ActiveValue::Set(self.amount_paid),
            amount_remaining: ActiveValue::Set(self.amount_remaining),
            settled_outside: ActiveValue::Set(self.settled_outside),
            payment_state: ActiveValue::Set(self.payment_state.as_str().to_string()),
            payment_method: ActiveValue::Set(self.payment_method.as_str().to_string()),
            cost_vault: ActiveValue::Set(self.cost_vault.as_str().to_string()),
            freight_applies: ActiveValue::Set(self.freight_applies),
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
                sale_id: ActiveValue::Set(self.id.to_string()),
                position: ActiveValue::Set(position as i32),
                product: ActiveValue::Set(item.product.clone()),
                quantity: ActiveValue::Set(item.quantity),
                unit_sale_price: ActiveValue::Set(item.unit_sale_price),
                unit_cost_price: ActiveValue::Set(item.unit_cost_price),
                unit_freight_price: ActiveValue::Set(item.unit_freight_price),
                source_purchase_order_id: ActiveValue::Set(
                    item.source_purchase_order_id.map(|id| id.to_string()),
                ),
            })
            .collect()
    }

    pub(crate) fn from_models(model: Model, mut item_rows: Vec<items::Model>) -> ResultEngine<Self> {
        item_rows.sort_by_key(|row| row.position);
        let items = item_rows
            .into_iter()
            .map(|row| {
                Ok(SaleItem {
                    product: row.product,
                    quantity: row.quantity,
                    unit_sale_price: row.unit_sale_price,
                    unit_cost_price: row.unit_cost_price,
                    unit_freight_price: row.unit_freight_price,
                    source_purchase_order_id: row
                        .source_purchase_order_id
                        .as_deref()
                        .map(|id| parse_uuid(id, "purchase order"))
                        .transpose()?,
                })
            })
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(Self {
            id: parse_uuid(&model.id, "sale")?,
            client_id: parse_uuid(&model.client_id, "client")?,
            items,
            total_revenue: model.total_revenue,
            full_distribution: Distribution {
                cost: model.full_cost,
                freight: model.full_freight,
                profit: model.full_profit,
            },
            effective_distribution: Distribution {
                cost: model.effective_cost,
                freight: model.effective_freight,
                profit: model.effective_profit,
            },
            amount_paid: model.amount_paid,
            amount_remaining: model.amount_remaining,
            settled_outside: model.settled_outside,
            payment_state: PaymentState::try_from(model.payment_state.as_str())?,
            payment_method: PaymentMethod::try_from(model.payment_method.as_str())?,
            cost_vault: VaultId::try_from(model.cost_vault.as_str())?,
            freight_applies: model.freight_applies,
            note: normalize_optional_text(model.note.as_deref()),
            occurred_at: model.occurred_at,
            actor_id: model.actor_id,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub client_id: String,
    pub total_revenue: i64,
    pub full_cost: i64,
    pub full_freight: i64,
    pub full_profit: i64,
    pub effective_cost: i64,
    pub effective_freight: i64,
    pub effective_profit: i64,
    pub amount_paid: i64,
    pub amount_remaining: i64,
    pub settled_outside: i64,
    pub payment_state: String,
    pub payment_method: String,
    pub cost_vault: String,
    pub freight_applies: bool,
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
    #[sea_orm(table_name = "sale_items")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub sale_id: String,
        pub position: i32,
        pub product: String,
        pub quantity: i64,
        pub unit_sale_price: i64,
        pub unit_cost_price: i64,
        pub unit_freight_price: i64,
        pub source_purchase_order_id: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::Entity",
            from = "Column::SaleId",
            to = "super::Column::Id",
            on_update = "NoAction",
            on_delete = "Cascade"
        )]
        Sale,
    }

    impl Related<super::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Sale.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_with_nothing_paid_means_paid_in_full() {
        let paid = PaymentState::Complete
            .resolve_initial_payment(0, 5_000)
            .unwrap();
        assert_eq!(paid, 5_000);
    }

    #[test]
    fn declared_state_must_match_amount() {
        assert_eq!(
            PaymentState::Partial.resolve_initial_payment(2_500, 5_000),
            Ok(2_500)
        );
        assert!(matches!(
            PaymentState::Pending.resolve_initial_payment(100, 5_000),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            PaymentState::Partial.resolve_initial_payment(0, 5_000),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            PaymentState::Partial.resolve_initial_payment(5_001, 5_000),
            Err(EngineError::Overpayment(_))
        ));
    }

    #[test]
    fn usa_transfers_route_cost_to_the_usa_vault() {
        assert_eq!(PaymentMethod::TransferenciaUsa.cost_vault(), VaultId::BovedaUsa);
        assert_eq!(PaymentMethod::Efectivo.cost_vault(), VaultId::BovedaMonte);
    }
}
