use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, prelude::*};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    CounterpartyKind, Distribution, Movement, MovementKind, OrderState, ResultEngine, Vault,
    VaultId, compute_effective_distribution, counterparties, movements, purchase_orders,
    records::abonos,
    sales,
    util::parse_uuid,
    vault,
};

use super::Engine;

/// Account sums, either cached on the row or replayed from the journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JournalTotals {
    pub historico_ingresos: i64,
    pub historico_gastos: i64,
    pub capital_actual: i64,
}

impl From<&Vault> for JournalTotals {
    fn from(value: &Vault) -> Self {
        Self {
            historico_ingresos: value.historico_ingresos,
            historico_gastos: value.historico_gastos,
            capital_actual: value.capital_actual,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccountDrift {
    pub account: VaultId,
    pub cached: JournalTotals,
    pub journal: JournalTotals,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AggregateTotals {
    pub total_transacted: i64,
    pub total_paid: i64,
    pub total_debt: i64,
    pub transaction_count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CounterpartyDrift {
    pub id: Uuid,
    pub kind: CounterpartyKind,
    pub name: String,
    pub cached: AggregateTotals,
    pub recomputed: AggregateTotals,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SaleDrift {
    pub sale_id: Uuid,
    /// Effective share implied by what the sale received through the split.
    pub expected: Distribution,
    /// Effective share cached on the sale row.
    pub recorded: Distribution,
    /// What the journal actually credited for the sale and its abonos.
    pub journal: Distribution,
}

/// Everything [`Engine::reconcile`] found out of line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub accounts_checked: usize,
    pub counterparties_checked: usize,
    pub sales_checked: usize,
    pub accounts: Vec<AccountDrift>,
    /// Vaults whose replayed balance is below zero. Not repairable.
    pub negative_balances: Vec<VaultId>,
    pub counterparties: Vec<CounterpartyDrift>,
    pub sales: Vec<SaleDrift>,
    pub repaired: bool,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.accounts.is_empty()
            && self.negative_balances.is_empty()
            && self.counterparties.is_empty()
            && self.sales.is_empty()
    }
}

fn replay_accounts(journal: &[Movement]) -> BTreeMap<VaultId, JournalTotals> {
    let mut totals: BTreeMap<VaultId, JournalTotals> = BTreeMap::new();
    for movement in journal {
        let entry = totals.entry(movement.account_id).or_default();
        match movement.kind {
            MovementKind::Credit => entry.historico_ingresos += movement.amount_minor,
            MovementKind::Debit => entry.historico_gastos += movement.amount_minor,
        }
        entry.capital_actual = entry.historico_ingresos - entry.historico_gastos;
    }
    totals
}

impl Engine {
    /// Recompute every cached aggregate from its source of truth and report
    /// the differences.
    ///
    /// - Vault sums are replayed from the movement journal.
    /// - Client aggregates come from sales and unlinked abonos, distributor
    ///   aggregates from purchase orders. A counterparty's debt must equal
    ///   what its sales or open orders still have outstanding.
    /// - Each sale's effective distribution is checked against the part of
    ///   its paid amount that went through the split and against what the
    ///   journal credited for it.
    ///
    /// With `repair` the cached values are overwritten in the same
    /// transaction. Journal-side problems (negative replayed balances, journal
    /// credits that disagree with a sale) are reported but cannot be repaired.
    pub async fn reconcile(&self, repair: bool) -> ResultEngine<ReconciliationReport> {
        let report = self
            .with_tx(move |engine, db_tx| {
                Box::pin(async move { engine.reconcile_tx(db_tx, repair).await })
            })
            .await?;
        info!(
            consistent = report.is_consistent(),
            account_drifts = report.accounts.len(),
            counterparty_drifts = report.counterparties.len(),
            sale_drifts = report.sales.len(),
            repaired = report.repaired,
            "reconciliation finished"
        );
        Ok(report)
    }

    async fn reconcile_tx(
        &self,
        db_tx: &DatabaseTransaction,
        repair: bool,
    ) -> ResultEngine<ReconciliationReport> {
        let mut report = ReconciliationReport {
            repaired: repair,
            ..ReconciliationReport::default()
        };

        let journal = movements::Entity::find()
            .all(db_tx)
            .await?
            .into_iter()
            .map(Movement::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        // Accounts.
        let mut cached_vaults: HashMap<VaultId, Vault> = HashMap::new();
        for model in vault::Entity::find().all(db_tx).await? {
            let vault = Vault::try_from(model)?;
            cached_vaults.insert(vault.id, vault);
        }
        let replayed = replay_accounts(&journal);
        let now = Utc::now();
        for id in VaultId::ALL {
            let stored = cached_vaults.get(&id);
            report.accounts_checked += 1;
            let journal_totals = replayed.get(&id).copied().unwrap_or_default();
            if journal_totals.capital_actual < 0 {
                warn!(account = %id, balance = journal_totals.capital_actual, "negative replayed balance");
                report.negative_balances.push(id);
            }
            let cached_totals = stored.map(JournalTotals::from).unwrap_or_default();
            if cached_totals != journal_totals {
                warn!(account = %id, ?cached_totals, ?journal_totals, "account drift");
                report.accounts.push(AccountDrift {
                    account: id,
                    cached: cached_totals,
                    journal: journal_totals,
                });
                if repair {
                    let mut vault = stored.cloned().unwrap_or_else(|| Vault::empty(id, now));
                    vault.historico_ingresos = journal_totals.historico_ingresos;
                    vault.historico_gastos = journal_totals.historico_gastos;
                    vault.capital_actual = journal_totals.capital_actual;
                    vault.updated_at = now;
                    let model = vault::ActiveModel::from(&vault);
                    if stored.is_some() {
                        model.update(db_tx).await?;
                    } else {
                        model.insert(db_tx).await?;
                    }
                }
            }
        }

        // Counterparties.
        let sale_models = sales::Entity::find().all(db_tx).await?;
        let abono_models = abonos::Entity::find().all(db_tx).await?;
        let order_models = purchase_orders::Entity::find().all(db_tx).await?;

        let mut recomputed: HashMap<String, AggregateTotals> = HashMap::new();
        for sale in &sale_models {
            let totals = recomputed.entry(sale.client_id.clone()).or_default();
            totals.total_transacted += sale.total_revenue;
            totals.total_paid += sale.amount_paid - sale.settled_outside;
            totals.total_debt += sale.amount_remaining;
            totals.transaction_count += 1;
        }
        for abono in abono_models.iter().filter(|abono| abono.sale_id.is_none()) {
            recomputed.entry(abono.client_id.clone()).or_default().total_paid += abono.amount;
        }
        let open = [OrderState::Pending.as_str(), OrderState::Partial.as_str()];
        for order in &order_models {
            let totals = recomputed.entry(order.distributor_id.clone()).or_default();
            totals.total_transacted += order.total_cost;
            totals.total_paid += order.amount_paid;
            if open.contains(&order.state.as_str()) {
                totals.total_debt += order.amount_owed;
            }
            totals.transaction_count += 1;
        }

        for model in counterparties::Entity::find().all(db_tx).await? {
            report.counterparties_checked += 1;
            let expected = recomputed.get(&model.id).copied().unwrap_or_default();
            let cached = AggregateTotals {
                total_transacted: model.total_transacted,
                total_paid: model.total_paid,
                total_debt: model.total_debt,
                transaction_count: model.transaction_count,
            };
            if cached == expected {
                continue;
            }
            warn!(counterparty_id = %model.id, ?cached, ?expected, "counterparty drift");
            report.counterparties.push(CounterpartyDrift {
                id: parse_uuid(&model.id, "counterparty")?,
                kind: CounterpartyKind::try_from(model.kind.as_str())?,
                name: model.name.clone(),
                cached,
                recomputed: expected,
            });
            if repair {
                let active = counterparties::ActiveModel {
                    id: ActiveValue::Unchanged(model.id.clone()),
                    total_transacted: ActiveValue::Set(expected.total_transacted),
                    total_paid: ActiveValue::Set(expected.total_paid),
                    total_debt: ActiveValue::Set(expected.total_debt),
                    transaction_count: ActiveValue::Set(expected.transaction_count),
                    updated_at: ActiveValue::Set(now),
                    ..Default::default()
                };
                active.update(db_tx).await?;
            }
        }

        // Sale distributions.
        let mut abono_sale: HashMap<String, String> = HashMap::new();
        for abono in &abono_models {
            if let Some(sale_id) = &abono.sale_id {
                abono_sale.insert(abono.id.clone(), sale_id.clone());
            }
        }
        let mut credited: HashMap<String, Vec<&Movement>> = HashMap::new();
        for movement in journal.iter().filter(|m| m.kind == MovementKind::Credit) {
            let operation_id = movement.operation_id.to_string();
            let sale_id = abono_sale
                .get(&operation_id)
                .cloned()
                .unwrap_or(operation_id);
            credited.entry(sale_id).or_default().push(movement);
        }

        for sale in &sale_models {
            report.sales_checked += 1;
            let full = Distribution {
                cost: sale.full_cost,
                freight: sale.full_freight,
                profit: sale.full_profit,
            };
            let recorded = Distribution {
                cost: sale.effective_cost,
                freight: sale.effective_freight,
                profit: sale.effective_profit,
            };
            let expected = compute_effective_distribution(
                &full,
                sale.amount_paid - sale.settled_outside,
                sale.total_revenue,
            )?;
            let cost_vault = VaultId::try_from(sale.cost_vault.as_str())?;
            let mut journal_credit = Distribution::default();
            for movement in credited.get(&sale.id).into_iter().flatten() {
                match movement.account_id {
                    id if id == cost_vault => journal_credit.cost += movement.amount_minor,
                    VaultId::FleteSur => journal_credit.freight += movement.amount_minor,
                    VaultId::Utilidades => journal_credit.profit += movement.amount_minor,
                    _ => {}
                }
            }
            if recorded == expected && journal_credit == expected {
                continue;
            }
            warn!(sale_id = %sale.id, ?expected, ?recorded, journal = ?journal_credit, "sale distribution drift");
            report.sales.push(SaleDrift {
                sale_id: parse_uuid(&sale.id, "sale")?,
                expected,
                recorded,
                journal: journal_credit,
            });
            if repair && recorded != expected {
                let active = sales::ActiveModel {
                    id: ActiveValue::Unchanged(sale.id.clone()),
                    effective_cost: ActiveValue::Set(expected.cost),
                    effective_freight: ActiveValue::Set(expected.freight),
                    effective_profit: ActiveValue::Set(expected.profit),
                    ..Default::default()
                };
                active.update(db_tx).await?;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(account_id: VaultId, kind: MovementKind, amount_minor: i64) -> Movement {
        Movement {
            id: Uuid::new_v4(),
            account_id,
            kind,
            amount_minor,
            concept: "test".to_string(),
            operation_id: Uuid::new_v4(),
            operation_kind: crate::OperationKind::Transfer,
            occurred_at: Utc::now(),
            actor_id: "tester".to_string(),
        }
    }

    #[test]
    fn replay_sums_credits_and_debits_per_account() {
        let journal = vec![
            movement(VaultId::Azteca, MovementKind::Credit, 1_000),
            movement(VaultId::Azteca, MovementKind::Debit, 300),
            movement(VaultId::Leftie, MovementKind::Credit, 300),
        ];
        let totals = replay_accounts(&journal);
        assert_eq!(
            totals[&VaultId::Azteca],
            JournalTotals {
                historico_ingresos: 1_000,
                historico_gastos: 300,
                capital_actual: 700
            }
        );
        assert_eq!(totals[&VaultId::Leftie].capital_actual, 300);
        assert!(!totals.contains_key(&VaultId::Utilidades));
    }
}
