//! Clients and distributors.
//!
//! Both live in one `counterparties` table discriminated by `kind`. Names are
//! matched through a canonical key (see [`crate::util`]), unique per kind, so
//! spelling variants of one name resolve to the same record.

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterpartyKind {
    Client,
    Distributor,
}

impl CounterpartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Distributor => "distributor",
        }
    }
}

impl TryFrom<&str> for CounterpartyKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "client" => Ok(Self::Client),
            "distributor" => Ok(Self::Distributor),
            other => Err(EngineError::Validation(format!(
                "invalid counterparty kind: {other}"
            ))),
        }
    }
}

/// How a caller points at a client or distributor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterpartyRef {
    Id(Uuid),
    Name(String),
}

impl fmt::Display for CounterpartyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<Uuid> for CounterpartyRef {
    fn from(value: Uuid) -> Self {
        Self::Id(value)
    }
}

impl From<&str> for CounterpartyRef {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for CounterpartyRef {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: Uuid,
    pub kind: CounterpartyKind,
    pub name: String,
    pub total_transacted: i64,
    pub total_paid: i64,
    pub total_debt: i64,
    pub transaction_count: i64,
    /// Only meaningful for clients.
    pub credit_limit: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Counterparty {
    pub(crate) fn to_active_model(&self, name_norm: &str) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            kind: ActiveValue::Set(self.kind.as_str().to_string()),
            name: ActiveValue::Set(self.name.clone()),
            name_norm: ActiveValue::Set(name_norm.to_string()),
            total_transacted: ActiveValue::Set(self.total_transacted),
            total_paid: ActiveValue::Set(self.total_paid),
            total_debt: ActiveValue::Set(self.total_debt),
            transaction_count: ActiveValue::Set(self.transaction_count),
            credit_limit: ActiveValue::Set(self.credit_limit),
            created_at: ActiveValue::Set(self.created_at),
            updated_at: ActiveValue::Set(self.updated_at),
        }
    }

    /// Active model that only rewrites the mutable aggregates.
    pub(crate) fn aggregates_model(&self) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Unchanged(self.id.to_string()),
            total_transacted: ActiveValue::Set(self.total_transacted),
            total_paid: ActiveValue::Set(self.total_paid),
            total_debt: ActiveValue::Set(self.total_debt),
            transaction_count: ActiveValue::Set(self.transaction_count),
            credit_limit: ActiveValue::Set(self.credit_limit),
            updated_at: ActiveValue::Set(self.updated_at),
            ..Default::default()
        }
    }
}

impl TryFrom<Model> for Counterparty {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "counterparty")?,
            kind: CounterpartyKind::try_from(model.kind.as_str())?,
            name: model.name,
            total_transacted: model.total_transacted,
            total_paid: model.total_paid,
            total_debt: model.total_debt,
            transaction_count: model.transaction_count,
            credit_limit: model.credit_limit,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

pub(crate) fn require_kind(counterparty: &Counterparty, kind: CounterpartyKind) -> ResultEngine<()> {
    if counterparty.kind != kind {
        return Err(EngineError::NotFound(format!(
            "{} {}",
            kind.as_str(),
            counterparty.id
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "counterparties")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub name: String,
    pub name_norm: String,
    pub total_transacted: i64,
    pub total_paid: i64,
    pub total_debt: i64,
    pub transaction_count: i64,
    pub credit_limit: Option<i64>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
