use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use engine::{
    AbonoClienteCmd, CancelPurchaseOrderCmd, Engine, EngineError, GastoCmd, IngresoCmd,
    MovementFilter, PagoDistribuidorCmd, TransferCmd,
};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;
use serde_json::{Value, json};

use cli::{Cli, Command, counterparty_ref, purchase_payload, sale_payload};

mod cli;
mod settings;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "flowdistributor={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let db = connect(&settings.database).await?;
    let engine = Engine::builder()
        .database(db)
        .max_attempts(settings.engine.max_attempts)
        .retry_backoff(settings.engine.retry_backoff())
        .build()
        .await?;

    match run(&engine, &cli.actor, cli.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!("command failed: {err}");
            let body = json!({ "error": err.kind(), "message": err.to_string() });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn connect(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

fn to_json(value: &impl Serialize) -> Result<Value, EngineError> {
    Ok(serde_json::to_value(value)?)
}

async fn run(engine: &Engine, actor: &str, command: Command) -> Result<Value, EngineError> {
    let now = Utc::now();
    match command {
        Command::Accounts => to_json(&engine.accounts().await?),
        Command::Movements(args) => {
            let filter = MovementFilter {
                account_id: args.account,
                operation_id: args.operation,
            };
            to_json(&engine.movements(filter).await?)
        }
        Command::Sale(args) => {
            to_json(&engine.create_sale(sale_payload(&args.payload, actor)?).await?)
        }
        Command::Purchase(args) => to_json(
            &engine
                .create_purchase_order(purchase_payload(&args.payload, actor)?)
                .await?,
        ),
        Command::Abono(args) => {
            let mut cmd = AbonoClienteCmd::new(counterparty_ref(&args.client), actor, args.amount, now);
            if let Some(sale_id) = args.sale {
                cmd = cmd.sale_id(sale_id);
            }
            if let Some(account) = args.account {
                cmd = cmd.destination_account(account);
            }
            cmd.meta.idempotency_key = args.key;
            to_json(&engine.abono_cliente(cmd).await?)
        }
        Command::Pago(args) => {
            let mut cmd = PagoDistribuidorCmd::new(
                counterparty_ref(&args.distributor),
                actor,
                args.amount,
                args.account,
                now,
            );
            if let Some(order_id) = args.order {
                cmd = cmd.purchase_order_id(order_id);
            }
            cmd.meta.idempotency_key = args.key;
            to_json(&engine.pago_distribuidor(cmd).await?)
        }
        Command::CancelOrder(args) => {
            let mut cmd = CancelPurchaseOrderCmd::new(args.order, actor, now);
            cmd.meta.idempotency_key = args.key;
            to_json(&engine.cancel_purchase_order(cmd).await?)
        }
        Command::Transfer(args) => {
            let mut cmd = TransferCmd::new(args.from, args.to, actor, args.amount, args.concept, now);
            cmd.meta.idempotency_key = args.key;
            to_json(&engine.transferir_entre_bancos(cmd).await?)
        }
        Command::Gasto(args) => {
            let mut cmd = GastoCmd::new(args.account, actor, args.amount, args.concept, now);
            cmd.meta.idempotency_key = args.key;
            to_json(&engine.registrar_gasto(cmd).await?)
        }
        Command::Ingreso(args) => {
            let mut cmd = IngresoCmd::new(args.account, actor, args.amount, args.concept, now);
            cmd.meta.idempotency_key = args.key;
            to_json(&engine.registrar_ingreso(cmd).await?)
        }
        Command::CreditLimit(args) => to_json(
            &engine
                .set_client_credit_limit(counterparty_ref(&args.client), args.limit)
                .await?,
        ),
        Command::Reconcile(args) => to_json(&engine.reconcile(args.repair).await?),
        Command::Client(args) => to_json(&engine.client(counterparty_ref(&args.reference)).await?),
        Command::Distributor(args) => {
            to_json(&engine.distributor(counterparty_ref(&args.reference)).await?)
        }
        Command::ShowSale(args) => to_json(&engine.sale(args.id).await?),
        Command::ShowOrder(args) => to_json(&engine.purchase_order(args.id).await?),
        Command::Stock(args) => to_json(&engine.product_stock(&args.product).await?),
    }
}
