use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use tracing::debug;
use uuid::Uuid;

use crate::{
    Movement, MovementFilter, MovementKind, ResultEngine, Vault, VaultId, movements,
    operations::OperationContext, vault,
};

use super::Engine;

async fn find_vault<C: ConnectionTrait>(db: &C, id: VaultId) -> ResultEngine<Option<Vault>> {
    vault::Entity::find_by_id(id.as_str().to_string())
        .one(db)
        .await?
        .map(Vault::try_from)
        .transpose()
}

impl Engine {
    /// Make sure the balance row for `id` exists, creating it at zero.
    pub async fn ensure_account_exists(&self, id: VaultId) -> ResultEngine<Vault> {
        self.with_tx(move |engine, db_tx| {
            Box::pin(async move { engine.ensure_account_exists_tx(db_tx, id).await })
        })
        .await
    }

    pub(crate) async fn ensure_account_exists_tx(
        &self,
        db_tx: &DatabaseTransaction,
        id: VaultId,
    ) -> ResultEngine<Vault> {
        if let Some(vault) = find_vault(db_tx, id).await? {
            return Ok(vault);
        }
        let vault = Vault::empty(id, Utc::now());
        vault::ActiveModel::from(&vault).insert(db_tx).await?;
        debug!(account = %id, "account created");
        Ok(vault)
    }

    /// Credit or debit one vault and journal it.
    ///
    /// Debits are balance-checked: on `InsufficientFunds` nothing is written.
    pub(crate) async fn apply_movement(
        &self,
        db_tx: &DatabaseTransaction,
        ctx: &OperationContext,
        account: VaultId,
        kind: MovementKind,
        amount_minor: i64,
        concept: &str,
    ) -> ResultEngine<Vault> {
        let mut vault = self.ensure_account_exists_tx(db_tx, account).await?;
        vault.apply(kind == MovementKind::Credit, amount_minor)?;
        vault.updated_at = Utc::now();
        vault::ActiveModel::from(&vault).update(db_tx).await?;

        let movement = Movement {
            id: Uuid::new_v4(),
            account_id: account,
            kind,
            amount_minor,
            concept: concept.to_string(),
            operation_id: ctx.id,
            operation_kind: ctx.kind,
            occurred_at: ctx.occurred_at,
            actor_id: ctx.actor_id.clone(),
        };
        movement.to_active_model().insert(db_tx).await?;

        debug!(
            account = %account,
            kind = kind.as_str(),
            amount_minor,
            balance = vault.capital_actual,
            operation_id = %ctx.id,
            "movement applied"
        );
        Ok(vault)
    }

    /// Balance snapshot of one vault. A vault never touched reads as zero.
    pub async fn account(&self, id: VaultId) -> ResultEngine<Vault> {
        Ok(find_vault(&self.database, id)
            .await?
            .unwrap_or_else(|| Vault::empty(id, Utc::now())))
    }

    /// All seven vaults, in catalogue order.
    pub async fn accounts(&self) -> ResultEngine<Vec<Vault>> {
        let mut stored: HashMap<VaultId, Vault> = HashMap::new();
        for model in vault::Entity::find().all(&self.database).await? {
            let vault = Vault::try_from(model)?;
            stored.insert(vault.id, vault);
        }
        let now = Utc::now();
        Ok(VaultId::ALL
            .into_iter()
            .map(|id| stored.remove(&id).unwrap_or_else(|| Vault::empty(id, now)))
            .collect())
    }

    /// Journal entries, oldest first.
    pub async fn movements(&self, filter: MovementFilter) -> ResultEngine<Vec<Movement>> {
        let mut query = movements::Entity::find();
        if let Some(account) = filter.account_id {
            query = query.filter(movements::Column::AccountId.eq(account.as_str()));
        }
        if let Some(operation_id) = filter.operation_id {
            query = query.filter(movements::Column::OperationId.eq(operation_id.to_string()));
        }
        query
            .order_by_asc(movements::Column::OccurredAt)
            .order_by_asc(movements::Column::OperationId)
            .order_by_asc(movements::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Movement::try_from)
            .collect()
    }
}
