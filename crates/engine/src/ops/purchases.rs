use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    CancelPurchaseOrderCmd, CancelPurchaseOrderReceipt, CounterpartyKind, CounterpartyRef,
    CreatePurchaseOrderCmd, EngineError, MovementKind, OperationKind, OrderPaymentUpdate,
    OrderState, PagoDistribuidorCmd, PagoReceipt, PurchaseOrder, PurchaseOrderReceipt,
    ResultEngine, WarehouseDirection, order_total,
    purchase_orders,
    records::pagos,
    util::{normalize_optional_text, parse_uuid, require_positive},
};

use super::{Engine, registry::Begun};

async fn load_purchase_order<C: ConnectionTrait>(
    db: &C,
    purchase_order_id: Uuid,
) -> ResultEngine<PurchaseOrder> {
    let model = purchase_orders::Entity::find_by_id(purchase_order_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("purchase order {purchase_order_id}")))?;
    let items = purchase_orders::items::Entity::find()
        .filter(purchase_orders::items::Column::PurchaseOrderId.eq(model.id.as_str()))
        .all(db)
        .await?;
    PurchaseOrder::from_models(model, items)
}

impl Engine {
    /// Place a purchase order: the goods enter stock, the distributor is owed
    /// the unpaid part and an initial payment is debited from `source_account`.
    pub async fn create_purchase_order(
        &self,
        cmd: CreatePurchaseOrderCmd,
    ) -> ResultEngine<PurchaseOrderReceipt> {
        let receipt = self
            .with_tx(move |engine, db_tx| {
                let cmd = cmd.clone();
                Box::pin(async move { engine.create_purchase_order_tx(db_tx, &cmd).await })
            })
            .await?;
        info!(
            operation_id = %receipt.purchase_order_id,
            kind = OperationKind::PurchaseOrder.as_str(),
            total_cost = receipt.total_cost,
            amount_paid = receipt.amount_paid,
            "purchase order committed"
        );
        Ok(receipt)
    }

    async fn create_purchase_order_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &CreatePurchaseOrderCmd,
    ) -> ResultEngine<PurchaseOrderReceipt> {
        let ctx = match self
            .begin_operation::<PurchaseOrderReceipt>(
                db_tx,
                OperationKind::PurchaseOrder,
                &cmd.actor_id,
                &cmd.meta,
            )
            .await?
        {
            Begun::Replayed(receipt) => return Ok(receipt),
            Begun::Fresh(ctx) => ctx,
        };

        let total_cost = order_total(&cmd.items)?;
        if cmd.initial_payment < 0 {
            return Err(EngineError::Validation(
                "initial payment must be >= 0".to_string(),
            ));
        }
        if cmd.initial_payment > total_cost {
            return Err(EngineError::Overpayment(format!(
                "initial payment {} exceeds order total {total_cost}",
                cmd.initial_payment
            )));
        }
        let source_account = match (cmd.initial_payment, cmd.source_account) {
            (0, _) => None,
            (_, Some(account)) => Some(account),
            (_, None) => {
                return Err(EngineError::Validation(
                    "source account is required for an initial payment".to_string(),
                ));
            }
        };

        let now = Utc::now();
        let mut distributor = self
            .resolve_or_create_counterparty(
                db_tx,
                CounterpartyKind::Distributor,
                &cmd.distributor,
                now,
            )
            .await?;

        let amount_owed = total_cost - cmd.initial_payment;
        let order = PurchaseOrder {
            id: ctx.id,
            distributor_id: distributor.id,
            items: cmd.items.clone(),
            total_cost,
            amount_paid: cmd.initial_payment,
            amount_owed,
            debt_released: 0,
            state: OrderState::from_amounts(cmd.initial_payment, total_cost),
            note: normalize_optional_text(cmd.meta.note.as_deref()),
            occurred_at: cmd.meta.occurred_at,
            actor_id: ctx.actor_id.clone(),
        };
        order.to_active_model().insert(db_tx).await?;
        purchase_orders::items::Entity::insert_many(order.item_models())
            .exec(db_tx)
            .await?;

        if let Some(account) = source_account {
            let concept = format!("purchase order {} to {}", order.id, distributor.name);
            self.apply_movement(
                db_tx,
                &ctx,
                account,
                MovementKind::Debit,
                cmd.initial_payment,
                &concept,
            )
            .await?;
        }

        for item in &order.items {
            self.record_warehouse_movement(
                db_tx,
                &ctx,
                WarehouseDirection::Entry,
                &item.product,
                item.quantity,
            )
            .await?;
            self.stock
                .increment_stock(db_tx, &item.product, item.quantity)
                .await?;
        }

        let overflow = || EngineError::Validation("distributor totals overflow".to_string());
        distributor.total_transacted = distributor
            .total_transacted
            .checked_add(total_cost)
            .ok_or_else(overflow)?;
        distributor.total_paid = distributor
            .total_paid
            .checked_add(cmd.initial_payment)
            .ok_or_else(overflow)?;
        distributor.total_debt = distributor
            .total_debt
            .checked_add(amount_owed)
            .ok_or_else(overflow)?;
        distributor.transaction_count += 1;
        distributor.updated_at = now;
        self.save_counterparty(db_tx, &distributor).await?;

        let receipt = PurchaseOrderReceipt {
            purchase_order_id: order.id,
            distributor_id: distributor.id,
            total_cost,
            amount_paid: order.amount_paid,
            amount_owed,
            state: order.state,
            distributor_debt: distributor.total_debt,
        };
        self.finish_operation(db_tx, &ctx, &cmd.meta, &receipt)
            .await?;
        Ok(receipt)
    }

    /// Pay a distributor from `source_account`, against one order or, without
    /// an order, against the open orders oldest first.
    pub async fn pago_distribuidor(&self, cmd: PagoDistribuidorCmd) -> ResultEngine<PagoReceipt> {
        let receipt = self
            .with_tx(move |engine, db_tx| {
                let cmd = cmd.clone();
                Box::pin(async move { engine.pago_distribuidor_tx(db_tx, &cmd).await })
            })
            .await?;
        info!(
            operation_id = %receipt.pago_id,
            kind = OperationKind::Pago.as_str(),
            amount = receipt.amount,
            debt_after = receipt.debt_after,
            "pago committed"
        );
        Ok(receipt)
    }

    async fn pago_distribuidor_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &PagoDistribuidorCmd,
    ) -> ResultEngine<PagoReceipt> {
        let ctx = match self
            .begin_operation::<PagoReceipt>(db_tx, OperationKind::Pago, &cmd.actor_id, &cmd.meta)
            .await?
        {
            Begun::Replayed(receipt) => return Ok(receipt),
            Begun::Fresh(ctx) => ctx,
        };

        require_positive(cmd.amount_minor, "pago amount")?;
        let mut distributor = self
            .require_counterparty_tx(db_tx, CounterpartyKind::Distributor, &cmd.distributor)
            .await?;
        if cmd.amount_minor > distributor.total_debt {
            return Err(EngineError::Overpayment(format!(
                "pago of {} exceeds debt {} owed to the distributor",
                cmd.amount_minor, distributor.total_debt
            )));
        }

        let order_update = match cmd.purchase_order_id {
            Some(order_id) => {
                let order = load_purchase_order(db_tx, order_id).await?;
                if order.distributor_id != distributor.id {
                    return Err(EngineError::Validation(format!(
                        "purchase order {order_id} does not belong to distributor {}",
                        distributor.id
                    )));
                }
                if !order.state.is_open() {
                    return Err(EngineError::Validation(format!(
                        "purchase order {order_id} is {} and takes no payments",
                        order.state.as_str()
                    )));
                }
                if cmd.amount_minor > order.amount_owed {
                    return Err(EngineError::Overpayment(format!(
                        "pago of {} exceeds the {} still owed on order {order_id}",
                        cmd.amount_minor, order.amount_owed
                    )));
                }
                let amount_paid = order.amount_paid + cmd.amount_minor;
                let amount_owed = order.total_cost - amount_paid;
                let state = OrderState::from_amounts(amount_paid, order.total_cost);
                let model = purchase_orders::ActiveModel {
                    id: ActiveValue::Unchanged(order.id.to_string()),
                    amount_paid: ActiveValue::Set(amount_paid),
                    amount_owed: ActiveValue::Set(amount_owed),
                    state: ActiveValue::Set(state.as_str().to_string()),
                    ..Default::default()
                };
                model.update(db_tx).await?;
                Some(OrderPaymentUpdate {
                    purchase_order_id: order.id,
                    amount_paid,
                    amount_owed,
                    state,
                })
            }
            None => None,
        };
        let settled = if cmd.purchase_order_id.is_none() {
            self.settle_open_orders(db_tx, distributor.id, cmd.amount_minor)
                .await?
        } else {
            Vec::new()
        };

        let concept = format!("pago {} to {}", ctx.id, distributor.name);
        let source = self
            .apply_movement(
                db_tx,
                &ctx,
                cmd.source_account,
                MovementKind::Debit,
                cmd.amount_minor,
                &concept,
            )
            .await?;

        let debt_before = distributor.total_debt;
        distributor.total_paid += cmd.amount_minor;
        distributor.total_debt -= cmd.amount_minor;
        distributor.updated_at = Utc::now();
        self.save_counterparty(db_tx, &distributor).await?;

        let record = pagos::ActiveModel {
            id: ActiveValue::Set(ctx.id.to_string()),
            distributor_id: ActiveValue::Set(distributor.id.to_string()),
            amount: ActiveValue::Set(cmd.amount_minor),
            source_account: ActiveValue::Set(cmd.source_account.as_str().to_string()),
            purchase_order_id: ActiveValue::Set(cmd.purchase_order_id.map(|id| id.to_string())),
            debt_before: ActiveValue::Set(debt_before),
            debt_after: ActiveValue::Set(distributor.total_debt),
            note: ActiveValue::Set(normalize_optional_text(cmd.meta.note.as_deref())),
            occurred_at: ActiveValue::Set(ctx.occurred_at),
            actor_id: ActiveValue::Set(ctx.actor_id.clone()),
        };
        record.insert(db_tx).await?;

        let receipt = PagoReceipt {
            pago_id: ctx.id,
            distributor_id: distributor.id,
            amount: cmd.amount_minor,
            source_account: cmd.source_account,
            source_balance: source.capital_actual,
            debt_before,
            debt_after: distributor.total_debt,
            purchase_order: order_update,
            settled,
        };
        self.finish_operation(db_tx, &ctx, &cmd.meta, &receipt)
            .await?;
        Ok(receipt)
    }

    /// Spread a pago without an order over the distributor's open orders,
    /// oldest first.
    async fn settle_open_orders(
        &self,
        db_tx: &DatabaseTransaction,
        distributor_id: Uuid,
        amount_minor: i64,
    ) -> ResultEngine<Vec<OrderPaymentUpdate>> {
        let open = purchase_orders::Entity::find()
            .filter(purchase_orders::Column::DistributorId.eq(distributor_id.to_string()))
            .filter(purchase_orders::Column::State.is_in([
                OrderState::Pending.as_str(),
                OrderState::Partial.as_str(),
            ]))
            .order_by_asc(purchase_orders::Column::OccurredAt)
            .order_by_asc(purchase_orders::Column::Id)
            .all(db_tx)
            .await?;
        let outstanding: i64 = open.iter().map(|order| order.amount_owed).sum();
        if amount_minor > outstanding {
            return Err(EngineError::Overpayment(format!(
                "pago of {amount_minor} exceeds the {outstanding} outstanding on open orders"
            )));
        }

        let mut left = amount_minor;
        let mut updates = Vec::new();
        for order in open {
            if left == 0 {
                break;
            }
            let applied = left.min(order.amount_owed);
            left -= applied;

            let amount_paid = order.amount_paid + applied;
            let amount_owed = order.total_cost - amount_paid;
            let state = OrderState::from_amounts(amount_paid, order.total_cost);
            let model = purchase_orders::ActiveModel {
                id: ActiveValue::Unchanged(order.id.clone()),
                amount_paid: ActiveValue::Set(amount_paid),
                amount_owed: ActiveValue::Set(amount_owed),
                state: ActiveValue::Set(state.as_str().to_string()),
                ..Default::default()
            };
            model.update(db_tx).await?;

            updates.push(OrderPaymentUpdate {
                purchase_order_id: parse_uuid(&order.id, "purchase order")?,
                amount_paid,
                amount_owed,
                state,
            });
        }
        Ok(updates)
    }

    /// Cancel a pending or partially paid order.
    ///
    /// What is still owed on the order is written off the distributor's debt.
    /// Payments already posted stay posted.
    pub async fn cancel_purchase_order(
        &self,
        cmd: CancelPurchaseOrderCmd,
    ) -> ResultEngine<CancelPurchaseOrderReceipt> {
        let receipt = self
            .with_tx(move |engine, db_tx| {
                let cmd = cmd.clone();
                Box::pin(async move { engine.cancel_purchase_order_tx(db_tx, &cmd).await })
            })
            .await?;
        info!(
            operation_id = %receipt.cancellation_id,
            kind = OperationKind::CancelPurchaseOrder.as_str(),
            purchase_order_id = %receipt.purchase_order_id,
            debt_released = receipt.debt_released,
            "purchase order cancelled"
        );
        Ok(receipt)
    }

    async fn cancel_purchase_order_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &CancelPurchaseOrderCmd,
    ) -> ResultEngine<CancelPurchaseOrderReceipt> {
        let ctx = match self
            .begin_operation::<CancelPurchaseOrderReceipt>(
                db_tx,
                OperationKind::CancelPurchaseOrder,
                &cmd.actor_id,
                &cmd.meta,
            )
            .await?
        {
            Begun::Replayed(receipt) => return Ok(receipt),
            Begun::Fresh(ctx) => ctx,
        };

        let order = load_purchase_order(db_tx, cmd.purchase_order_id).await?;
        if !order.state.is_open() {
            return Err(EngineError::Validation(format!(
                "purchase order {} is {} and cannot be cancelled",
                order.id,
                order.state.as_str()
            )));
        }
        let mut distributor = self
            .require_counterparty_tx(
                db_tx,
                CounterpartyKind::Distributor,
                &CounterpartyRef::Id(order.distributor_id),
            )
            .await?;

        let debt_released = order.amount_owed.min(distributor.total_debt).max(0);
        let model = purchase_orders::ActiveModel {
            id: ActiveValue::Unchanged(order.id.to_string()),
            state: ActiveValue::Set(OrderState::Cancelled.as_str().to_string()),
            debt_released: ActiveValue::Set(debt_released),
            ..Default::default()
        };
        model.update(db_tx).await?;

        distributor.total_debt -= debt_released;
        distributor.updated_at = Utc::now();
        self.save_counterparty(db_tx, &distributor).await?;

        let receipt = CancelPurchaseOrderReceipt {
            cancellation_id: ctx.id,
            purchase_order_id: order.id,
            distributor_id: distributor.id,
            debt_released,
            distributor_debt: distributor.total_debt,
        };
        self.finish_operation(db_tx, &ctx, &cmd.meta, &receipt)
            .await?;
        Ok(receipt)
    }

    /// A purchase order with its items.
    pub async fn purchase_order(&self, purchase_order_id: Uuid) -> ResultEngine<PurchaseOrder> {
        load_purchase_order(&self.database, purchase_order_id).await
    }
}
