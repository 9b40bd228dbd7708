//! Movement journal.
//!
//! A [`Movement`] is the immutable record of one credit or debit applied to a
//! vault. The journal is append-only: rows are inserted in the same database
//! transaction as the balance change they describe and never updated or
//! deleted, so the balances can always be rebuilt from it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, OperationKind, VaultId, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Credit,
    Debit,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl TryFrom<&str> for MovementKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(EngineError::Validation(format!(
                "invalid movement kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub account_id: VaultId,
    pub kind: MovementKind,
    pub amount_minor: i64,
    pub concept: String,
    pub operation_id: Uuid,
    pub operation_kind: OperationKind,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: String,
}

/// Optional filters for reading the journal back.
#[derive(Clone, Debug, Default)]
pub struct MovementFilter {
    pub account_id: Option<VaultId>,
    pub operation_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub concept: String,
    pub operation_id: String,
    pub operation_kind: String,
    pub occurred_at: DateTimeUtc,
    pub actor_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vault::Entity",
        from = "Column::AccountId",
        to = "super::vault::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Account,
}

impl Related<super::vault::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Movement {
    pub(crate) fn to_active_model(&self) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            account_id: ActiveValue::Set(self.account_id.as_str().to_string()),
            kind: ActiveValue::Set(self.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(self.amount_minor),
            concept: ActiveValue::Set(self.concept.clone()),
            operation_id: ActiveValue::Set(self.operation_id.to_string()),
            operation_kind: ActiveValue::Set(self.operation_kind.as_str().to_string()),
            occurred_at: ActiveValue::Set(self.occurred_at),
            actor_id: ActiveValue::Set(self.actor_id.clone()),
        }
    }
}

impl TryFrom<Model> for Movement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "movement")?,
            account_id: VaultId::try_from(model.account_id.as_str())?,
            kind: MovementKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            concept: model.concept,
            operation_id: parse_uuid(&model.operation_id, "operation")?,
            operation_kind: OperationKind::try_from(model.operation_kind.as_str())?,
            occurred_at: model.occurred_at,
            actor_id: model.actor_id,
        })
    }
}
