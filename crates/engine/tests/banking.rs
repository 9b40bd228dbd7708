use std::collections::HashSet;

use chrono::Utc;
use sea_orm::ConnectionTrait;

use engine::{
    EngineError, GastoCmd, IngresoCmd, MovementFilter, MovementKind, OperationKind, TransferCmd,
    VaultId,
};

mod common;

use common::{ACTOR, engine_with_db, engine_with_file_db, fund};

#[tokio::test]
async fn accounts_start_at_zero_in_catalogue_order() {
    let (engine, _db) = engine_with_db().await;

    let accounts = engine.accounts().await.unwrap();

    assert_eq!(
        accounts.iter().map(|a| a.id).collect::<Vec<_>>(),
        VaultId::ALL.to_vec()
    );
    assert!(accounts.iter().all(|a| a.capital_actual == 0));
}

#[tokio::test]
async fn transfer_moves_money_under_one_id() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Azteca, 1_000).await;

    let receipt = engine
        .transferir_entre_bancos(TransferCmd::new(
            VaultId::Azteca,
            VaultId::BovedaMonte,
            ACTOR,
            1_000,
            "depósito a bóveda",
            Utc::now(),
        ))
        .await
        .unwrap();

    assert_eq!(receipt.origin_balance, 0);
    assert_eq!(receipt.destination_balance, 1_000);

    let azteca = engine.account(VaultId::Azteca).await.unwrap();
    assert_eq!(azteca.historico_ingresos, 1_000);
    assert_eq!(azteca.historico_gastos, 1_000);
    assert_eq!(azteca.capital_actual, 0);

    let journal = engine
        .movements(MovementFilter {
            operation_id: Some(receipt.transfer_id),
            ..MovementFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(journal.len(), 2);
    assert!(
        journal
            .iter()
            .all(|m| m.operation_kind == OperationKind::Transfer)
    );
    let debit = journal
        .iter()
        .find(|m| m.kind == MovementKind::Debit)
        .unwrap();
    assert_eq!(debit.account_id, VaultId::Azteca);
    let credit = journal
        .iter()
        .find(|m| m.kind == MovementKind::Credit)
        .unwrap();
    assert_eq!(credit.account_id, VaultId::BovedaMonte);
}

#[tokio::test]
async fn transfer_rules() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Azteca, 100).await;

    let same = TransferCmd::new(VaultId::Azteca, VaultId::Azteca, ACTOR, 50, "x", Utc::now());
    assert!(matches!(
        engine.transferir_entre_bancos(same).await,
        Err(EngineError::Validation(_))
    ));

    let blank = TransferCmd::new(VaultId::Azteca, VaultId::Leftie, ACTOR, 50, "   ", Utc::now());
    assert!(matches!(
        engine.transferir_entre_bancos(blank).await,
        Err(EngineError::Validation(_))
    ));

    let too_much = TransferCmd::new(VaultId::Azteca, VaultId::Leftie, ACTOR, 101, "x", Utc::now());
    assert!(matches!(
        engine.transferir_entre_bancos(too_much).await,
        Err(EngineError::InsufficientFunds(_))
    ));

    assert_eq!(engine.account(VaultId::Azteca).await.unwrap().capital_actual, 100);
    assert_eq!(engine.account(VaultId::Leftie).await.unwrap().capital_actual, 0);
    assert_eq!(
        engine.movements(MovementFilter::default()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn overdrawing_gasto_changes_nothing() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Profit, 200).await;
    let before = engine.account(VaultId::Profit).await.unwrap();

    let err = engine
        .registrar_gasto(GastoCmd::new(VaultId::Profit, ACTOR, 500, "renta", Utc::now()))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(engine.account(VaultId::Profit).await.unwrap(), before);
    assert_eq!(
        engine.movements(MovementFilter::default()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn gasto_debits_the_vault() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Leftie, 800).await;

    let receipt = engine
        .registrar_gasto(GastoCmd::new(VaultId::Leftie, ACTOR, 300, "gasolina", Utc::now()))
        .await
        .unwrap();

    assert_eq!(receipt.balance, 500);
    let leftie = engine.account(VaultId::Leftie).await.unwrap();
    assert_eq!(leftie.historico_gastos, 300);
    assert_eq!(leftie.capital_actual, 500);
}

#[tokio::test]
async fn manual_income_only_reaches_operational_vaults() {
    let (engine, _db) = engine_with_db().await;

    for account in [
        VaultId::BovedaMonte,
        VaultId::BovedaUsa,
        VaultId::Utilidades,
        VaultId::FleteSur,
    ] {
        let err = engine
            .registrar_ingreso(IngresoCmd::new(account, ACTOR, 100, "aporte", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Permission(_)), "{account}");
    }
    assert!(
        engine
            .movements(MovementFilter::default())
            .await
            .unwrap()
            .is_empty()
    );

    let receipt = engine
        .registrar_ingreso(IngresoCmd::new(VaultId::Azteca, ACTOR, 100, "aporte", Utc::now()))
        .await
        .unwrap();
    assert_eq!(receipt.balance, 100);
}

#[tokio::test]
async fn empty_actor_is_rejected() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .registrar_ingreso(IngresoCmd::new(VaultId::Azteca, " ", 100, "aporte", Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn replayed_transfer_is_applied_once() {
    let (engine, _db) = engine_with_db().await;
    fund(&engine, VaultId::Azteca, 1_000).await;

    let cmd = TransferCmd::new(VaultId::Azteca, VaultId::Leftie, ACTOR, 400, "caja", Utc::now())
        .idempotency_key("tr-1");
    let first = engine.transferir_entre_bancos(cmd.clone()).await.unwrap();
    let second = engine.transferir_entre_bancos(cmd).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.account(VaultId::Azteca).await.unwrap().capital_actual, 600);
    assert_eq!(engine.account(VaultId::Leftie).await.unwrap().capital_actual, 400);
}

#[tokio::test]
async fn concurrent_transfers_never_overdraw() {
    let (engine, _db, path) = engine_with_file_db().await;
    fund(&engine, VaultId::Azteca, 1_000).await;

    let mut tasks = tokio::task::JoinSet::new();
    for n in 0..15 {
        let engine = engine.clone();
        tasks.spawn(async move {
            engine
                .transferir_entre_bancos(TransferCmd::new(
                    VaultId::Azteca,
                    VaultId::Leftie,
                    ACTOR,
                    100,
                    format!("lote {n}"),
                    Utc::now(),
                ))
                .await
        });
    }

    let mut committed = HashSet::new();
    let mut rejected = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(receipt) => {
                committed.insert(receipt.transfer_id);
            }
            Err(EngineError::InsufficientFunds(_)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(committed.len(), 10);
    assert_eq!(rejected, 5);
    assert_eq!(engine.account(VaultId::Azteca).await.unwrap().capital_actual, 0);
    assert_eq!(engine.account(VaultId::Leftie).await.unwrap().capital_actual, 1_000);
    assert!(engine.reconcile(false).await.unwrap().is_consistent());

    drop(engine);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn unique_violations_are_retried_only_for_create_races() {
    let (engine, db) = engine_with_db().await;
    fund(&engine, VaultId::Azteca, 100).await;

    let account_race = db
        .execute_unprepared("INSERT INTO accounts SELECT * FROM accounts WHERE id = 'azteca'")
        .await
        .unwrap_err();
    assert!(EngineError::from(account_race).is_transient());

    db.execute_unprepared("CREATE TABLE receipts_log (folio TEXT NOT NULL UNIQUE)")
        .await
        .unwrap();
    db.execute_unprepared("INSERT INTO receipts_log (folio) VALUES ('A-1')")
        .await
        .unwrap();
    let duplicate_folio = db
        .execute_unprepared("INSERT INTO receipts_log (folio) VALUES ('A-1')")
        .await
        .unwrap_err();
    assert!(!EngineError::from(duplicate_folio).is_transient());
}
