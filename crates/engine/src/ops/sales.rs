use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    AbonoClienteCmd, AbonoReceipt, CounterpartyKind, CreateSaleCmd, Distribution, EngineError,
    MovementKind, OperationKind, PaymentState, ResultEngine, Sale, SalePaymentUpdate,
    SaleReceipt, WarehouseDirection, compute_effective_distribution, compute_full_distribution,
    incremental_distribution,
    operations::OperationContext,
    records::abonos,
    sales,
    util::{normalize_optional_text, parse_uuid, require_positive},
    warehouse,
};

use super::{Engine, registry::Begun};

pub(super) async fn load_sale<C: ConnectionTrait>(db: &C, sale_id: Uuid) -> ResultEngine<Sale> {
    let model = sales::Entity::find_by_id(sale_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("sale {sale_id}")))?;
    let items = sales::items::Entity::find()
        .filter(sales::items::Column::SaleId.eq(model.id.as_str()))
        .all(db)
        .await?;
    Sale::from_models(model, items)
}

impl Engine {
    /// Register a sale: split its revenue, credit the effective share of the
    /// split to the distribution vaults, take the goods out of stock and add
    /// the unpaid remainder to the client's debt.
    pub async fn create_sale(&self, cmd: CreateSaleCmd) -> ResultEngine<SaleReceipt> {
        let receipt = self
            .with_tx(move |engine, db_tx| {
                let cmd = cmd.clone();
                Box::pin(async move { engine.create_sale_tx(db_tx, &cmd).await })
            })
            .await?;
        info!(
            operation_id = %receipt.sale_id,
            kind = OperationKind::Sale.as_str(),
            total_revenue = receipt.total_revenue,
            amount_paid = receipt.amount_paid,
            "sale committed"
        );
        Ok(receipt)
    }

    async fn create_sale_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &CreateSaleCmd,
    ) -> ResultEngine<SaleReceipt> {
        let ctx = match self
            .begin_operation::<SaleReceipt>(db_tx, OperationKind::Sale, &cmd.actor_id, &cmd.meta)
            .await?
        {
            Begun::Replayed(receipt) => return Ok(receipt),
            Begun::Fresh(ctx) => ctx,
        };

        let breakdown = compute_full_distribution(&cmd.items, cmd.freight_applies)?;
        let total_revenue = breakdown.total_revenue;
        let amount_paid = cmd
            .payment_state
            .resolve_initial_payment(cmd.amount_paid, total_revenue)?;
        let effective =
            compute_effective_distribution(&breakdown.full, amount_paid, total_revenue)?;
        let amount_remaining = total_revenue - amount_paid;

        let now = Utc::now();
        let mut client = self
            .resolve_or_create_counterparty(db_tx, CounterpartyKind::Client, &cmd.client, now)
            .await?;
        let overflow = || EngineError::Validation("client totals overflow".to_string());
        let new_debt = client
            .total_debt
            .checked_add(amount_remaining)
            .ok_or_else(overflow)?;
        if let Some(limit) = client.credit_limit
            && amount_remaining > 0
            && new_debt > limit
        {
            return Err(EngineError::CreditLimit(format!(
                "client '{}' would owe {new_debt}, limit is {limit}",
                client.name
            )));
        }

        let sale = Sale {
            id: ctx.id,
            client_id: client.id,
            items: cmd.items.clone(),
            total_revenue,
            full_distribution: breakdown.full,
            effective_distribution: effective,
            amount_paid,
            amount_remaining,
            settled_outside: 0,
            payment_state: PaymentState::from_amounts(amount_paid, total_revenue),
            payment_method: cmd.payment_method,
            cost_vault: cmd.payment_method.cost_vault(),
            freight_applies: cmd.freight_applies,
            note: normalize_optional_text(cmd.meta.note.as_deref()),
            occurred_at: cmd.meta.occurred_at,
            actor_id: ctx.actor_id.clone(),
        };
        sale.to_active_model().insert(db_tx).await?;
        sales::items::Entity::insert_many(sale.item_models())
            .exec(db_tx)
            .await?;

        self.credit_distribution(db_tx, &ctx, &sale, &effective)
            .await?;

        for item in &sale.items {
            self.record_warehouse_movement(
                db_tx,
                &ctx,
                WarehouseDirection::Exit,
                &item.product,
                item.quantity,
            )
            .await?;
            self.stock
                .decrement_stock(db_tx, &item.product, item.quantity)
                .await?;
        }

        client.total_transacted = client
            .total_transacted
            .checked_add(total_revenue)
            .ok_or_else(overflow)?;
        client.total_paid = client
            .total_paid
            .checked_add(amount_paid)
            .ok_or_else(overflow)?;
        client.total_debt = new_debt;
        client.transaction_count += 1;
        client.updated_at = now;
        self.save_counterparty(db_tx, &client).await?;

        let receipt = SaleReceipt {
            sale_id: sale.id,
            client_id: client.id,
            total_revenue,
            full_distribution: sale.full_distribution,
            effective_distribution: effective,
            amount_paid,
            amount_remaining,
            payment_state: sale.payment_state,
            client_debt: client.total_debt,
        };
        self.finish_operation(db_tx, &ctx, &cmd.meta, &receipt)
            .await?;
        Ok(receipt)
    }

    /// Credit each non-zero component of `credit` to the sale's vaults.
    async fn credit_distribution(
        &self,
        db_tx: &DatabaseTransaction,
        ctx: &OperationContext,
        sale: &Sale,
        credit: &Distribution,
    ) -> ResultEngine<()> {
        for (account, amount, portion) in sale.vault_targets(credit) {
            if amount > 0 {
                let concept = format!("sale {} {portion}", sale.id);
                self.apply_movement(db_tx, ctx, account, MovementKind::Credit, amount, &concept)
                    .await?;
            }
        }
        Ok(())
    }

    pub(super) async fn record_warehouse_movement(
        &self,
        db_tx: &DatabaseTransaction,
        ctx: &OperationContext,
        direction: WarehouseDirection,
        product: &str,
        quantity: i64,
    ) -> ResultEngine<()> {
        let model = warehouse::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            direction: ActiveValue::Set(direction.as_str().to_string()),
            product: ActiveValue::Set(product.trim().to_string()),
            quantity: ActiveValue::Set(quantity),
            operation_id: ActiveValue::Set(ctx.id.to_string()),
            operation_kind: ActiveValue::Set(ctx.kind.as_str().to_string()),
            occurred_at: ActiveValue::Set(ctx.occurred_at),
            actor_id: ActiveValue::Set(ctx.actor_id.clone()),
        };
        model.insert(db_tx).await?;
        Ok(())
    }

    /// Receive a payment from a client.
    ///
    /// Linked to a sale, the payment advances the sale and credits the
    /// increment of its effective distribution. Unlinked, it credits
    /// `destination_account` directly and settles the client's open sales
    /// oldest first, outside their split. Either way the client's debt drops
    /// by the amount and still equals what its sales have outstanding.
    pub async fn abono_cliente(&self, cmd: AbonoClienteCmd) -> ResultEngine<AbonoReceipt> {
        let receipt = self
            .with_tx(move |engine, db_tx| {
                let cmd = cmd.clone();
                Box::pin(async move { engine.abono_cliente_tx(db_tx, &cmd).await })
            })
            .await?;
        info!(
            operation_id = %receipt.abono_id,
            kind = OperationKind::Abono.as_str(),
            amount = receipt.amount,
            debt_after = receipt.debt_after,
            "abono committed"
        );
        Ok(receipt)
    }

    async fn abono_cliente_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &AbonoClienteCmd,
    ) -> ResultEngine<AbonoReceipt> {
        let ctx = match self
            .begin_operation::<AbonoReceipt>(db_tx, OperationKind::Abono, &cmd.actor_id, &cmd.meta)
            .await?
        {
            Begun::Replayed(receipt) => return Ok(receipt),
            Begun::Fresh(ctx) => ctx,
        };

        require_positive(cmd.amount_minor, "abono amount")?;
        let mut client = self
            .require_counterparty_tx(db_tx, CounterpartyKind::Client, &cmd.client)
            .await?;
        if cmd.amount_minor > client.total_debt {
            return Err(EngineError::Overpayment(format!(
                "abono of {} exceeds client debt {}",
                cmd.amount_minor, client.total_debt
            )));
        }

        let mut settled = Vec::new();
        let sale_update = match cmd.sale_id {
            Some(sale_id) => {
                if cmd.destination_account.is_some() {
                    return Err(EngineError::Validation(
                        "an abono linked to a sale is credited to the sale's vaults; \
                         destination account must be empty"
                            .to_string(),
                    ));
                }
                Some(
                    self.apply_abono_to_sale(db_tx, &ctx, client.id, sale_id, cmd.amount_minor)
                        .await?,
                )
            }
            None => {
                let account = cmd.destination_account.ok_or_else(|| {
                    EngineError::Validation(
                        "destination account is required for an abono without a sale"
                            .to_string(),
                    )
                })?;
                let concept = format!("abono {} from {}", ctx.id, client.name);
                self.apply_movement(
                    db_tx,
                    &ctx,
                    account,
                    MovementKind::Credit,
                    cmd.amount_minor,
                    &concept,
                )
                .await?;
                settled = self
                    .settle_open_sales(db_tx, client.id, cmd.amount_minor)
                    .await?;
                None
            }
        };

        let debt_before = client.total_debt;
        client.total_paid += cmd.amount_minor;
        client.total_debt -= cmd.amount_minor;
        client.updated_at = Utc::now();
        self.save_counterparty(db_tx, &client).await?;

        let record = abonos::ActiveModel {
            id: ActiveValue::Set(ctx.id.to_string()),
            client_id: ActiveValue::Set(client.id.to_string()),
            amount: ActiveValue::Set(cmd.amount_minor),
            destination_account: ActiveValue::Set(
                cmd.destination_account.map(|id| id.as_str().to_string()),
            ),
            sale_id: ActiveValue::Set(cmd.sale_id.map(|id| id.to_string())),
            debt_before: ActiveValue::Set(debt_before),
            debt_after: ActiveValue::Set(client.total_debt),
            note: ActiveValue::Set(normalize_optional_text(cmd.meta.note.as_deref())),
            occurred_at: ActiveValue::Set(ctx.occurred_at),
            actor_id: ActiveValue::Set(ctx.actor_id.clone()),
        };
        record.insert(db_tx).await?;

        let receipt = AbonoReceipt {
            abono_id: ctx.id,
            client_id: client.id,
            amount: cmd.amount_minor,
            destination_account: cmd.destination_account,
            debt_before,
            debt_after: client.total_debt,
            sale: sale_update,
            settled,
        };
        self.finish_operation(db_tx, &ctx, &cmd.meta, &receipt)
            .await?;
        Ok(receipt)
    }

    async fn apply_abono_to_sale(
        &self,
        db_tx: &DatabaseTransaction,
        ctx: &OperationContext,
        client_id: Uuid,
        sale_id: Uuid,
        amount_minor: i64,
    ) -> ResultEngine<SalePaymentUpdate> {
        let sale = load_sale(db_tx, sale_id).await?;
        if sale.client_id != client_id {
            return Err(EngineError::Validation(format!(
                "sale {sale_id} does not belong to client {client_id}"
            )));
        }
        if amount_minor > sale.amount_remaining {
            return Err(EngineError::Overpayment(format!(
                "abono of {amount_minor} exceeds the {} still owed on sale {sale_id}",
                sale.amount_remaining
            )));
        }

        let new_paid = sale.amount_paid + amount_minor;
        let distributed = sale.distributed_paid();
        let credited = incremental_distribution(
            &sale.full_distribution,
            sale.total_revenue,
            distributed,
            distributed + amount_minor,
        )?;
        let effective = compute_effective_distribution(
            &sale.full_distribution,
            distributed + amount_minor,
            sale.total_revenue,
        )?;
        let amount_remaining = sale.total_revenue - new_paid;
        let payment_state = PaymentState::from_amounts(new_paid, sale.total_revenue);

        self.credit_distribution(db_tx, ctx, &sale, &credited)
            .await?;

        let model = sales::ActiveModel {
            id: ActiveValue::Unchanged(sale.id.to_string()),
            amount_paid: ActiveValue::Set(new_paid),
            amount_remaining: ActiveValue::Set(amount_remaining),
            payment_state: ActiveValue::Set(payment_state.as_str().to_string()),
            effective_cost: ActiveValue::Set(effective.cost),
            effective_freight: ActiveValue::Set(effective.freight),
            effective_profit: ActiveValue::Set(effective.profit),
            ..Default::default()
        };
        model.update(db_tx).await?;

        Ok(SalePaymentUpdate {
            sale_id,
            amount_paid: new_paid,
            amount_remaining,
            payment_state,
            credited,
        })
    }

    /// Spread a payment that bypassed the split over the client's open sales,
    /// oldest first. Nothing is credited: the money already sits in the
    /// abono's destination account.
    async fn settle_open_sales(
        &self,
        db_tx: &DatabaseTransaction,
        client_id: Uuid,
        amount_minor: i64,
    ) -> ResultEngine<Vec<SalePaymentUpdate>> {
        let open = sales::Entity::find()
            .filter(sales::Column::ClientId.eq(client_id.to_string()))
            .filter(sales::Column::AmountRemaining.gt(0))
            .order_by_asc(sales::Column::OccurredAt)
            .order_by_asc(sales::Column::Id)
            .all(db_tx)
            .await?;
        let outstanding: i64 = open.iter().map(|sale| sale.amount_remaining).sum();
        if amount_minor > outstanding {
            return Err(EngineError::Overpayment(format!(
                "abono of {amount_minor} exceeds the {outstanding} outstanding on the client's sales"
            )));
        }

        let mut left = amount_minor;
        let mut updates = Vec::new();
        for sale in open {
            if left == 0 {
                break;
            }
            let applied = left.min(sale.amount_remaining);
            left -= applied;

            let amount_paid = sale.amount_paid + applied;
            let amount_remaining = sale.total_revenue - amount_paid;
            let payment_state = PaymentState::from_amounts(amount_paid, sale.total_revenue);
            let model = sales::ActiveModel {
                id: ActiveValue::Unchanged(sale.id.clone()),
                amount_paid: ActiveValue::Set(amount_paid),
                amount_remaining: ActiveValue::Set(amount_remaining),
                settled_outside: ActiveValue::Set(sale.settled_outside + applied),
                payment_state: ActiveValue::Set(payment_state.as_str().to_string()),
                ..Default::default()
            };
            model.update(db_tx).await?;

            updates.push(SalePaymentUpdate {
                sale_id: parse_uuid(&sale.id, "sale")?,
                amount_paid,
                amount_remaining,
                payment_state,
                credited: Distribution::default(),
            });
        }
        Ok(updates)
    }

    /// A sale with its items.
    pub async fn sale(&self, sale_id: Uuid) -> ResultEngine<Sale> {
        load_sale(&self.database, sale_id).await
    }
}
