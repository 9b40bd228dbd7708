use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, prelude::*};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use uuid::Uuid;

use crate::{
    EngineError, OpMeta, OperationKind, ResultEngine,
    operations::{self, OperationContext},
    util::normalize_optional_text,
};

use super::Engine;

/// Outcome of opening an operation.
pub(crate) enum Begun<R> {
    /// The same `(actor, idempotency key)` already committed; here is its
    /// receipt.
    Replayed(R),
    Fresh(OperationContext),
}

impl Engine {
    /// Resolve idempotency and allocate the operation id.
    pub(crate) async fn begin_operation<R: DeserializeOwned>(
        &self,
        db_tx: &DatabaseTransaction,
        kind: OperationKind,
        actor_id: &str,
        meta: &OpMeta,
    ) -> ResultEngine<Begun<R>> {
        let actor_id = actor_id.trim();
        if actor_id.is_empty() {
            return Err(EngineError::Validation(
                "actor id must not be empty".to_string(),
            ));
        }

        if let Some(key) = normalize_optional_text(meta.idempotency_key.as_deref()) {
            let existing = operations::Entity::find()
                .filter(operations::Column::ActorId.eq(actor_id))
                .filter(operations::Column::IdempotencyKey.eq(key.as_str()))
                .one(db_tx)
                .await?;
            if let Some(model) = existing {
                let stored = OperationKind::try_from(model.kind.as_str())?;
                if stored != kind {
                    return Err(EngineError::Validation(format!(
                        "idempotency key '{key}' already used for a {} operation",
                        stored.as_str()
                    )));
                }
                debug!(operation_id = %model.id, kind = kind.as_str(), "replaying committed operation");
                return Ok(Begun::Replayed(serde_json::from_str(&model.receipt)?));
            }
        }

        Ok(Begun::Fresh(OperationContext {
            id: Uuid::new_v4(),
            kind,
            actor_id: actor_id.to_string(),
            occurred_at: meta.occurred_at,
        }))
    }

    /// Register the operation and its receipt. Must be the last write of the
    /// operation body.
    pub(crate) async fn finish_operation<R: Serialize>(
        &self,
        db_tx: &DatabaseTransaction,
        ctx: &OperationContext,
        meta: &OpMeta,
        receipt: &R,
    ) -> ResultEngine<()> {
        let model = operations::ActiveModel {
            id: ActiveValue::Set(ctx.id.to_string()),
            kind: ActiveValue::Set(ctx.kind.as_str().to_string()),
            actor_id: ActiveValue::Set(ctx.actor_id.clone()),
            idempotency_key: ActiveValue::Set(normalize_optional_text(
                meta.idempotency_key.as_deref(),
            )),
            receipt: ActiveValue::Set(serde_json::to_string(receipt)?),
            occurred_at: ActiveValue::Set(ctx.occurred_at),
            committed_at: ActiveValue::Set(Utc::now()),
        };
        model.insert(db_tx).await?;
        Ok(())
    }
}
