use chrono::Utc;
use sea_orm::{ConnectionTrait, Statement};

use engine::{
    AbonoClienteCmd, CancelPurchaseOrderCmd, CreatePurchaseOrderCmd, CreateSaleCmd, Engine,
    GastoCmd, PagoDistribuidorCmd, PaymentState, TransferCmd, VaultId,
};

mod common;

use common::{ACTOR, engine_with_db, fund, order_item, sale_item};

async fn mixed_workload(engine: &Engine) {
    fund(engine, VaultId::Azteca, 10_000).await;

    let order = engine
        .create_purchase_order(
            CreatePurchaseOrderCmd::new(
                "Cementos del Sur",
                ACTOR,
                vec![order_item("Cemento", 200, 30, 5)],
                Utc::now(),
            )
            .initial_payment(2_000, VaultId::Azteca),
        )
        .await
        .unwrap();
    engine
        .pago_distribuidor(
            PagoDistribuidorCmd::new("Cementos del Sur", ACTOR, 1_000, VaultId::Azteca, Utc::now())
                .purchase_order_id(order.purchase_order_id),
        )
        .await
        .unwrap();
    let second = engine
        .create_purchase_order(CreatePurchaseOrderCmd::new(
            "Cementos del Sur",
            ACTOR,
            vec![order_item("Cal", 10, 20, 0)],
            Utc::now(),
        ))
        .await
        .unwrap();
    engine
        .cancel_purchase_order(CancelPurchaseOrderCmd::new(
            second.purchase_order_id,
            ACTOR,
            Utc::now(),
        ))
        .await
        .unwrap();

    let sale = engine
        .create_sale(CreateSaleCmd::new(
            "Juan Pérez",
            ACTOR,
            vec![sale_item("Cemento", 70, 47, 30, 5)],
            PaymentState::Partial,
            1_111,
            Utc::now(),
        ))
        .await
        .unwrap();
    engine
        .abono_cliente(
            AbonoClienteCmd::new("Juan Pérez", ACTOR, 777, Utc::now()).sale_id(sale.sale_id),
        )
        .await
        .unwrap();
    engine
        .abono_cliente(
            AbonoClienteCmd::new("Juan Pérez", ACTOR, 300, Utc::now())
                .destination_account(VaultId::Leftie),
        )
        .await
        .unwrap();
    engine
        .create_sale(CreateSaleCmd::new(
            "María López",
            ACTOR,
            vec![sale_item("Cemento", 30, 60, 30, 5)],
            PaymentState::Complete,
            0,
            Utc::now(),
        ))
        .await
        .unwrap();

    engine
        .transferir_entre_bancos(TransferCmd::new(
            VaultId::Utilidades,
            VaultId::Profit,
            ACTOR,
            500,
            "retiro de utilidades",
            Utc::now(),
        ))
        .await
        .unwrap();
    engine
        .registrar_gasto(GastoCmd::new(VaultId::Profit, ACTOR, 200, "comida", Utc::now()))
        .await
        .unwrap();
}

#[tokio::test]
async fn journal_agrees_with_cached_state_after_a_busy_day() {
    let (engine, _db) = engine_with_db().await;
    mixed_workload(&engine).await;

    let report = engine.reconcile(false).await.unwrap();

    assert!(report.is_consistent(), "{report:?}");
    assert_eq!(report.accounts_checked, 7);
    assert_eq!(report.counterparties_checked, 3);
    assert_eq!(report.sales_checked, 2);
    assert!(!report.repaired);
}

#[tokio::test]
async fn repair_restores_cached_state() {
    let (engine, db) = engine_with_db().await;
    mixed_workload(&engine).await;
    let azteca = engine.account(VaultId::Azteca).await.unwrap();
    let client = engine.client("Juan Pérez").await.unwrap();

    let backend = db.get_database_backend();
    for sql in [
        "UPDATE accounts SET capital_actual = capital_actual + 77, historico_ingresos = 0 WHERE id = 'azteca'",
        "UPDATE counterparties SET total_debt = 1, transaction_count = 9 WHERE kind = 'client'",
        "UPDATE sales SET effective_profit = effective_profit + 3",
    ] {
        db.execute(Statement::from_string(backend, sql.to_string()))
            .await
            .unwrap();
    }

    let report = engine.reconcile(false).await.unwrap();
    assert!(!report.is_consistent());
    assert_eq!(report.accounts.len(), 1);
    assert_eq!(report.accounts[0].account, VaultId::Azteca);
    assert_eq!(report.accounts[0].journal.capital_actual, azteca.capital_actual);
    assert_eq!(report.counterparties.len(), 2);
    assert_eq!(report.sales.len(), 2);
    // A dry run writes nothing.
    assert_eq!(
        engine.account(VaultId::Azteca).await.unwrap().capital_actual,
        azteca.capital_actual + 77
    );

    let repaired = engine.reconcile(true).await.unwrap();
    assert!(repaired.repaired);
    assert_eq!(repaired.accounts, report.accounts);

    let restored_vault = engine.account(VaultId::Azteca).await.unwrap();
    assert_eq!(restored_vault.capital_actual, azteca.capital_actual);
    assert_eq!(restored_vault.historico_ingresos, azteca.historico_ingresos);
    assert_eq!(restored_vault.historico_gastos, azteca.historico_gastos);
    let restored = engine.client("Juan Pérez").await.unwrap();
    assert_eq!(restored.total_debt, client.total_debt);
    assert_eq!(restored.transaction_count, client.transaction_count);
    assert!(engine.reconcile(false).await.unwrap().is_consistent());
}

#[tokio::test]
async fn client_debt_must_match_what_its_sales_still_owe() {
    let (engine, db) = engine_with_db().await;
    common::stock_up(&engine, "Cemento", 100).await;
    let sale = engine
        .create_sale(CreateSaleCmd::new(
            "Juan Pérez",
            ACTOR,
            vec![sale_item("Cemento", 100, 50, 30, 5)],
            PaymentState::Partial,
            2_500,
            Utc::now(),
        ))
        .await
        .unwrap();
    engine
        .abono_cliente(
            AbonoClienteCmd::new("Juan Pérez", ACTOR, 1_000, Utc::now())
                .destination_account(VaultId::Azteca),
        )
        .await
        .unwrap();

    // Undo the settlement on the sale: the client's totals still add up, but
    // its debt no longer matches the sale's balance.
    let backend = db.get_database_backend();
    db.execute(Statement::from_string(
        backend,
        "UPDATE sales SET amount_paid = 2500, amount_remaining = 2500, settled_outside = 0"
            .to_string(),
    ))
    .await
    .unwrap();

    let report = engine.reconcile(false).await.unwrap();
    assert!(!report.is_consistent());
    assert_eq!(report.counterparties.len(), 1);
    assert_eq!(report.counterparties[0].cached.total_debt, 1_500);
    assert_eq!(report.counterparties[0].recomputed.total_debt, 2_500);
    assert!(report.sales.is_empty());

    engine.reconcile(true).await.unwrap();
    assert_eq!(engine.client("Juan Pérez").await.unwrap().total_debt, 2_500);
    let receipt = engine
        .abono_cliente(
            AbonoClienteCmd::new("Juan Pérez", ACTOR, 2_500, Utc::now()).sale_id(sale.sale_id),
        )
        .await
        .unwrap();
    assert_eq!(receipt.sale.unwrap().payment_state, PaymentState::Complete);
}
