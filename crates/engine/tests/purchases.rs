use chrono::Utc;

use engine::{
    CancelPurchaseOrderCmd, CreatePurchaseOrderCmd, EngineError, MovementFilter, OrderState,
    PagoDistribuidorCmd, VaultId,
};

mod common;

use common::{ACTOR, engine_with_db, fund, order_item};

fn order(initial_payment: i64) -> CreatePurchaseOrderCmd {
    let cmd = CreatePurchaseOrderCmd::new(
        "Cementos del Sur",
        ACTOR,
        vec![order_item("Cemento", 100, 30, 5), order_item("Cal", 10, 20, 0)],
        Utc::now(),
    );
    if initial_payment > 0 {
        cmd.initial_payment(initial_payment, VaultId::Azteca)
    } else {
        cmd
    }
}

#[tokio::test]
async fn purchase_order_books_debt_and_stock() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Azteca, 2_000).await;

    let receipt = engine.create_purchase_order(order(1_000)).await.unwrap();

    assert_eq!(receipt.total_cost, 3_700);
    assert_eq!(receipt.amount_paid, 1_000);
    assert_eq!(receipt.amount_owed, 2_700);
    assert_eq!(receipt.state, OrderState::Partial);
    assert_eq!(receipt.distributor_debt, 2_700);

    assert_eq!(engine.account(VaultId::Azteca).await.unwrap().capital_actual, 1_000);
    assert_eq!(engine.product_stock("Cemento").await.unwrap().stock, 100);
    assert_eq!(engine.product_stock("cal").await.unwrap().stock, 10);

    let stored = engine
        .purchase_order(receipt.purchase_order_id)
        .await
        .unwrap();
    assert_eq!(stored.items.len(), 2);
    assert_eq!(stored.items[1].product, "Cal");

    let distributor = engine.distributor("cementos del sur").await.unwrap();
    assert_eq!(distributor.total_transacted, 3_700);
    assert_eq!(distributor.total_paid, 1_000);
    assert_eq!(distributor.transaction_count, 1);
}

#[tokio::test]
async fn initial_payment_needs_funds_and_a_source() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Azteca, 500).await;

    let err = engine.create_purchase_order(order(1_000)).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert!(matches!(
        engine.product_stock("Cemento").await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        engine.distributor("Cementos del Sur").await,
        Err(EngineError::NotFound(_))
    ));

    let mut cmd = order(0);
    cmd.initial_payment = 100;
    let err = engine.create_purchase_order(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine.create_purchase_order(order(5_000)).await.unwrap_err();
    assert!(matches!(err, EngineError::Overpayment(_)));
}

#[tokio::test]
async fn pagos_settle_an_order() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Leftie, 5_000).await;
    let placed = engine.create_purchase_order(order(0)).await.unwrap();
    assert_eq!(placed.state, OrderState::Pending);

    let pago = engine
        .pago_distribuidor(
            PagoDistribuidorCmd::new("Cementos del Sur", ACTOR, 3_000, VaultId::Leftie, Utc::now())
                .purchase_order_id(placed.purchase_order_id),
        )
        .await
        .unwrap();
    assert_eq!(pago.source_balance, 2_000);
    assert_eq!(pago.debt_before, 3_700);
    assert_eq!(pago.debt_after, 700);
    let update = pago.purchase_order.unwrap();
    assert_eq!(update.state, OrderState::Partial);
    assert_eq!(update.amount_owed, 700);

    // More than is owed on the order.
    let err = engine
        .pago_distribuidor(
            PagoDistribuidorCmd::new("Cementos del Sur", ACTOR, 701, VaultId::Leftie, Utc::now())
                .purchase_order_id(placed.purchase_order_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Overpayment(_)));

    let pago = engine
        .pago_distribuidor(
            PagoDistribuidorCmd::new("Cementos del Sur", ACTOR, 700, VaultId::Leftie, Utc::now())
                .purchase_order_id(placed.purchase_order_id),
        )
        .await
        .unwrap();
    assert_eq!(pago.purchase_order.unwrap().state, OrderState::Paid);
    assert_eq!(pago.debt_after, 0);

    let journal = engine
        .movements(MovementFilter {
            account_id: Some(VaultId::Leftie),
            ..MovementFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(journal.len(), 3);
    assert!(engine.reconcile(false).await.unwrap().is_consistent());
}

#[tokio::test]
async fn pago_is_checked_against_balance_and_debt() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Azteca, 100).await;
    engine.create_purchase_order(order(0)).await.unwrap();

    let err = engine
        .pago_distribuidor(PagoDistribuidorCmd::new(
            "Cementos del Sur",
            ACTOR,
            500,
            VaultId::Azteca,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(
        engine.distributor("Cementos del Sur").await.unwrap().total_debt,
        3_700
    );

    let err = engine
        .pago_distribuidor(PagoDistribuidorCmd::new(
            "Cementos del Sur",
            ACTOR,
            3_701,
            VaultId::Azteca,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Overpayment(_)));

    // Pagos never create a distributor.
    let err = engine
        .pago_distribuidor(PagoDistribuidorCmd::new(
            "Otro Proveedor",
            ACTOR,
            50,
            VaultId::Azteca,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let pago = engine
        .pago_distribuidor(PagoDistribuidorCmd::new(
            "Cementos del Sur",
            ACTOR,
            100,
            VaultId::Azteca,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert!(pago.purchase_order.is_none());
    assert_eq!(pago.debt_after, 3_600);
    assert_eq!(pago.settled.len(), 1);
    assert_eq!(pago.settled[0].amount_owed, 3_600);
    assert!(engine.reconcile(false).await.unwrap().is_consistent());
}

#[tokio::test]
async fn unlinked_pago_settles_oldest_orders_first() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Azteca, 5_000).await;
    let mut older = order(0);
    older.meta.occurred_at = Utc::now() - chrono::Duration::hours(1);
    let older = engine.create_purchase_order(older).await.unwrap();
    let newer = engine.create_purchase_order(order(0)).await.unwrap();

    let pago = engine
        .pago_distribuidor(PagoDistribuidorCmd::new(
            "Cementos del Sur",
            ACTOR,
            5_000,
            VaultId::Azteca,
            Utc::now(),
        ))
        .await
        .unwrap();
    let settled: Vec<_> = pago
        .settled
        .iter()
        .map(|update| (update.purchase_order_id, update.amount_owed, update.state))
        .collect();
    assert_eq!(
        settled,
        vec![
            (older.purchase_order_id, 0, OrderState::Paid),
            (newer.purchase_order_id, 2_400, OrderState::Partial),
        ]
    );

    let cancelled = engine
        .cancel_purchase_order(CancelPurchaseOrderCmd::new(
            newer.purchase_order_id,
            ACTOR,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_eq!(cancelled.debt_released, 2_400);
    assert_eq!(cancelled.distributor_debt, 0);
    assert!(engine.reconcile(false).await.unwrap().is_consistent());
}

#[tokio::test]
async fn cancelling_releases_what_is_still_owed() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Azteca, 1_000).await;
    let placed = engine.create_purchase_order(order(1_000)).await.unwrap();

    let receipt = engine
        .cancel_purchase_order(CancelPurchaseOrderCmd::new(
            placed.purchase_order_id,
            ACTOR,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_eq!(receipt.debt_released, 2_700);
    assert_eq!(receipt.distributor_debt, 0);
    assert_ne!(receipt.cancellation_id, placed.purchase_order_id);

    let stored = engine
        .purchase_order(placed.purchase_order_id)
        .await
        .unwrap();
    assert_eq!(stored.state, OrderState::Cancelled);
    assert_eq!(stored.debt_released, 2_700);
    // The initial payment stays posted.
    assert_eq!(engine.account(VaultId::Azteca).await.unwrap().capital_actual, 0);

    let err = engine
        .cancel_purchase_order(CancelPurchaseOrderCmd::new(
            placed.purchase_order_id,
            ACTOR,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert!(engine.reconcile(false).await.unwrap().is_consistent());
}

#[tokio::test]
async fn replayed_pago_is_applied_once() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Azteca, 1_000).await;
    engine.create_purchase_order(order(0)).await.unwrap();

    let cmd = PagoDistribuidorCmd::new("Cementos del Sur", ACTOR, 400, VaultId::Azteca, Utc::now())
        .idempotency_key("pago-7");
    let first = engine.pago_distribuidor(cmd.clone()).await.unwrap();
    let second = engine.pago_distribuidor(cmd).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.account(VaultId::Azteca).await.unwrap().capital_actual, 600);
    assert_eq!(
        engine.distributor("Cementos del Sur").await.unwrap().total_debt,
        3_300
    );
}
