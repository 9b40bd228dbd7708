//! Operation registry.
//!
//! Every committed business operation leaves one row here. The row id is the
//! id of the operation's primary record and is stamped on every movement the
//! operation wrote. When the caller supplied an idempotency key, the row also
//! keeps the serialized receipt so a replay can answer without re-applying
//! anything.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Sale,
    PurchaseOrder,
    CancelPurchaseOrder,
    Abono,
    Pago,
    Transfer,
    Gasto,
    Ingreso,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::PurchaseOrder => "purchase_order",
            Self::CancelPurchaseOrder => "cancel_purchase_order",
            Self::Abono => "abono",
            Self::Pago => "pago",
            Self::Transfer => "transfer",
            Self::Gasto => "gasto",
            Self::Ingreso => "ingreso",
        }
    }
}

impl TryFrom<&str> for OperationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "sale" => Ok(Self::Sale),
            "purchase_order" => Ok(Self::PurchaseOrder),
            "cancel_purchase_order" => Ok(Self::CancelPurchaseOrder),
            "abono" => Ok(Self::Abono),
            "pago" => Ok(Self::Pago),
            "transfer" => Ok(Self::Transfer),
            "gasto" => Ok(Self::Gasto),
            "ingreso" => Ok(Self::Ingreso),
            other => Err(EngineError::Validation(format!(
                "invalid operation kind: {other}"
            ))),
        }
    }
}

/// Identity of the operation currently being applied, threaded through every
/// write it performs.
#[derive(Clone, Debug)]
pub struct OperationContext {
    pub id: Uuid,
    pub kind: OperationKind,
    pub actor_id: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "operations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub actor_id: String,
    pub idempotency_key: Option<String>,
    pub receipt: String,
    pub occurred_at: DateTimeUtc,
    pub committed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
