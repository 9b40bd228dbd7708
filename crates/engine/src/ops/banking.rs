use sea_orm::{ActiveValue, DatabaseTransaction, prelude::*};
use tracing::info;

use crate::{
    AccountEntryReceipt, EngineError, GastoCmd, IngresoCmd, MovementKind, OperationKind,
    ResultEngine, TransferCmd, TransferReceipt,
    records::{gastos, ingresos, transfers},
    util::{normalize_display, require_positive},
};

use super::{Engine, registry::Begun};

fn require_concept(concept: &str) -> ResultEngine<String> {
    normalize_display(concept)
        .ok_or_else(|| EngineError::Validation("concept must not be empty".to_string()))
}

impl Engine {
    /// Move money from one vault to another. The origin is balance-checked;
    /// both movements share the transfer id.
    pub async fn transferir_entre_bancos(&self, cmd: TransferCmd) -> ResultEngine<TransferReceipt> {
        let receipt = self
            .with_tx(move |engine, db_tx| {
                let cmd = cmd.clone();
                Box::pin(async move { engine.transfer_tx(db_tx, &cmd).await })
            })
            .await?;
        info!(
            operation_id = %receipt.transfer_id,
            kind = OperationKind::Transfer.as_str(),
            origin = %receipt.origin,
            destination = %receipt.destination,
            amount = receipt.amount,
            "transfer committed"
        );
        Ok(receipt)
    }

    async fn transfer_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &TransferCmd,
    ) -> ResultEngine<TransferReceipt> {
        let ctx = match self
            .begin_operation::<TransferReceipt>(
                db_tx,
                OperationKind::Transfer,
                &cmd.actor_id,
                &cmd.meta,
            )
            .await?
        {
            Begun::Replayed(receipt) => return Ok(receipt),
            Begun::Fresh(ctx) => ctx,
        };

        require_positive(cmd.amount_minor, "transfer amount")?;
        if cmd.origin == cmd.destination {
            return Err(EngineError::Validation(
                "origin and destination must differ".to_string(),
            ));
        }
        let concept = require_concept(&cmd.concept)?;

        let origin = self
            .apply_movement(
                db_tx,
                &ctx,
                cmd.origin,
                MovementKind::Debit,
                cmd.amount_minor,
                &format!("transfer to {}: {concept}", cmd.destination),
            )
            .await?;
        let destination = self
            .apply_movement(
                db_tx,
                &ctx,
                cmd.destination,
                MovementKind::Credit,
                cmd.amount_minor,
                &format!("transfer from {}: {concept}", cmd.origin),
            )
            .await?;

        let record = transfers::ActiveModel {
            id: ActiveValue::Set(ctx.id.to_string()),
            origin: ActiveValue::Set(cmd.origin.as_str().to_string()),
            destination: ActiveValue::Set(cmd.destination.as_str().to_string()),
            amount: ActiveValue::Set(cmd.amount_minor),
            concept: ActiveValue::Set(concept),
            occurred_at: ActiveValue::Set(ctx.occurred_at),
            actor_id: ActiveValue::Set(ctx.actor_id.clone()),
        };
        record.insert(db_tx).await?;

        let receipt = TransferReceipt {
            transfer_id: ctx.id,
            origin: cmd.origin,
            origin_balance: origin.capital_actual,
            destination: cmd.destination,
            destination_balance: destination.capital_actual,
            amount: cmd.amount_minor,
        };
        self.finish_operation(db_tx, &ctx, &cmd.meta, &receipt)
            .await?;
        Ok(receipt)
    }

    /// Record an expense paid out of a vault.
    pub async fn registrar_gasto(&self, cmd: GastoCmd) -> ResultEngine<AccountEntryReceipt> {
        let receipt = self
            .with_tx(move |engine, db_tx| {
                let cmd = cmd.clone();
                Box::pin(async move { engine.gasto_tx(db_tx, &cmd).await })
            })
            .await?;
        info!(
            operation_id = %receipt.id,
            kind = OperationKind::Gasto.as_str(),
            account = %receipt.account,
            amount = receipt.amount,
            "gasto committed"
        );
        Ok(receipt)
    }

    async fn gasto_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &GastoCmd,
    ) -> ResultEngine<AccountEntryReceipt> {
        let ctx = match self
            .begin_operation::<AccountEntryReceipt>(
                db_tx,
                OperationKind::Gasto,
                &cmd.actor_id,
                &cmd.meta,
            )
            .await?
        {
            Begun::Replayed(receipt) => return Ok(receipt),
            Begun::Fresh(ctx) => ctx,
        };

        require_positive(cmd.amount_minor, "gasto amount")?;
        let concept = require_concept(&cmd.concept)?;
        let vault = self
            .apply_movement(
                db_tx,
                &ctx,
                cmd.account,
                MovementKind::Debit,
                cmd.amount_minor,
                &concept,
            )
            .await?;

        let record = gastos::ActiveModel {
            id: ActiveValue::Set(ctx.id.to_string()),
            account: ActiveValue::Set(cmd.account.as_str().to_string()),
            amount: ActiveValue::Set(cmd.amount_minor),
            concept: ActiveValue::Set(concept),
            occurred_at: ActiveValue::Set(ctx.occurred_at),
            actor_id: ActiveValue::Set(ctx.actor_id.clone()),
        };
        record.insert(db_tx).await?;

        let receipt = AccountEntryReceipt {
            id: ctx.id,
            account: cmd.account,
            amount: cmd.amount_minor,
            balance: vault.capital_actual,
        };
        self.finish_operation(db_tx, &ctx, &cmd.meta, &receipt)
            .await?;
        Ok(receipt)
    }

    /// Record manual income. Only operational vaults accept it.
    pub async fn registrar_ingreso(&self, cmd: IngresoCmd) -> ResultEngine<AccountEntryReceipt> {
        let receipt = self
            .with_tx(move |engine, db_tx| {
                let cmd = cmd.clone();
                Box::pin(async move { engine.ingreso_tx(db_tx, &cmd).await })
            })
            .await?;
        info!(
            operation_id = %receipt.id,
            kind = OperationKind::Ingreso.as_str(),
            account = %receipt.account,
            amount = receipt.amount,
            "ingreso committed"
        );
        Ok(receipt)
    }

    async fn ingreso_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &IngresoCmd,
    ) -> ResultEngine<AccountEntryReceipt> {
        let ctx = match self
            .begin_operation::<AccountEntryReceipt>(
                db_tx,
                OperationKind::Ingreso,
                &cmd.actor_id,
                &cmd.meta,
            )
            .await?
        {
            Begun::Replayed(receipt) => return Ok(receipt),
            Begun::Fresh(ctx) => ctx,
        };

        if !cmd.account.accepts_manual_income() {
            return Err(EngineError::Permission(format!(
                "{} is a {} vault and cannot receive manual income",
                cmd.account,
                cmd.account.kind().as_str()
            )));
        }
        require_positive(cmd.amount_minor, "ingreso amount")?;
        let concept = require_concept(&cmd.concept)?;
        let vault = self
            .apply_movement(
                db_tx,
                &ctx,
                cmd.account,
                MovementKind::Credit,
                cmd.amount_minor,
                &concept,
            )
            .await?;

        let record = ingresos::ActiveModel {
            id: ActiveValue::Set(ctx.id.to_string()),
            account: ActiveValue::Set(cmd.account.as_str().to_string()),
            amount: ActiveValue::Set(cmd.amount_minor),
            concept: ActiveValue::Set(concept),
            occurred_at: ActiveValue::Set(ctx.occurred_at),
            actor_id: ActiveValue::Set(ctx.actor_id.clone()),
        };
        record.insert(db_tx).await?;

        let receipt = AccountEntryReceipt {
            id: ctx.id,
            account: cmd.account,
            amount: cmd.amount_minor,
            balance: vault.capital_actual,
        };
        self.finish_operation(db_tx, &ctx, &cmd.meta, &receipt)
            .await?;
        Ok(receipt)
    }
}
