use clap::{Args, Parser, Subcommand};
use engine::{CounterpartyRef, CreatePurchaseOrderCmd, CreateSaleCmd, Money, VaultId};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "flowdistributor")]
#[command(about = "Sales, purchases and bank vaults of the distribution business")]
pub struct Cli {
    /// Settings file (defaults to `./settings.toml` when present).
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Identity stamped on every record written by this invocation.
    #[arg(long, global = true, env = "FLOWDISTRIBUTOR_ACTOR", default_value = "cli")]
    pub actor: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Balances of the seven vaults.
    Accounts,
    /// Movement journal, oldest first.
    Movements(MovementsArgs),
    /// Register a sale from a JSON payload (amounts in cents).
    Sale(PayloadArgs),
    /// Place a purchase order from a JSON payload (amounts in cents).
    Purchase(PayloadArgs),
    /// Receive a payment from a client.
    Abono(AbonoArgs),
    /// Pay a distributor.
    Pago(PagoArgs),
    /// Cancel a pending or partial purchase order.
    CancelOrder(CancelOrderArgs),
    /// Move money between two vaults.
    Transfer(TransferArgs),
    /// Record an expense.
    Gasto(EntryArgs),
    /// Record manual income into an operational vault.
    Ingreso(EntryArgs),
    /// Set or clear a client's credit limit.
    CreditLimit(CreditLimitArgs),
    /// Recompute cached aggregates and report drift.
    Reconcile(ReconcileArgs),
    /// Show a client.
    Client(CounterpartyArgs),
    /// Show a distributor.
    Distributor(CounterpartyArgs),
    /// Show a sale with its items.
    ShowSale(IdArgs),
    /// Show a purchase order with its items.
    ShowOrder(IdArgs),
    /// Units on hand for a product.
    Stock(StockArgs),
}

#[derive(Args, Debug)]
pub struct MovementsArgs {
    #[arg(long, value_parser = parse_vault)]
    pub account: Option<VaultId>,
    #[arg(long)]
    pub operation: Option<Uuid>,
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Command as JSON. Any `actor_id` in it is replaced by `--actor`.
    #[arg(long)]
    pub payload: String,
}

#[derive(Args, Debug)]
pub struct AbonoArgs {
    /// Client id or name.
    #[arg(long)]
    pub client: String,
    #[arg(long, value_parser = parse_amount)]
    pub amount: i64,
    /// Vault credited when no sale is given.
    #[arg(long, value_parser = parse_vault)]
    pub account: Option<VaultId>,
    #[arg(long)]
    pub sale: Option<Uuid>,
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Args, Debug)]
pub struct PagoArgs {
    /// Distributor id or name.
    #[arg(long)]
    pub distributor: String,
    #[arg(long, value_parser = parse_amount)]
    pub amount: i64,
    #[arg(long, value_parser = parse_vault)]
    pub account: VaultId,
    #[arg(long)]
    pub order: Option<Uuid>,
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Args, Debug)]
pub struct CancelOrderArgs {
    #[arg(long)]
    pub order: Uuid,
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    #[arg(long, value_parser = parse_vault)]
    pub from: VaultId,
    #[arg(long, value_parser = parse_vault)]
    pub to: VaultId,
    #[arg(long, value_parser = parse_amount)]
    pub amount: i64,
    #[arg(long)]
    pub concept: String,
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Args, Debug)]
pub struct EntryArgs {
    #[arg(long, value_parser = parse_vault)]
    pub account: VaultId,
    #[arg(long, value_parser = parse_amount)]
    pub amount: i64,
    #[arg(long)]
    pub concept: String,
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreditLimitArgs {
    /// Client id or name.
    #[arg(long)]
    pub client: String,
    /// New limit; omit to remove the limit.
    #[arg(long, value_parser = parse_limit)]
    pub limit: Option<i64>,
}

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Overwrite cached aggregates with the recomputed values.
    #[arg(long)]
    pub repair: bool,
}

#[derive(Args, Debug)]
pub struct CounterpartyArgs {
    /// Id or name.
    pub reference: String,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    pub id: Uuid,
}

#[derive(Args, Debug)]
pub struct StockArgs {
    pub product: String,
}

fn parse_amount(raw: &str) -> Result<i64, String> {
    Money::parse_positive(raw)
        .map(Money::cents)
        .map_err(|err| err.to_string())
}

fn parse_limit(raw: &str) -> Result<i64, String> {
    let money: Money = raw.parse().map_err(|err: engine::EngineError| err.to_string())?;
    if money.cents() < 0 {
        return Err("credit limit must be >= 0".to_string());
    }
    Ok(money.cents())
}

fn parse_vault(raw: &str) -> Result<VaultId, String> {
    raw.parse::<VaultId>().map_err(|err| err.to_string())
}

/// A UUID selects by id, anything else by name.
pub fn counterparty_ref(raw: &str) -> CounterpartyRef {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => CounterpartyRef::Id(id),
        Err(_) => CounterpartyRef::Name(raw.to_string()),
    }
}

/// The actor always comes from `--actor`, never from the payload.
pub fn sale_payload(raw: &str, actor: &str) -> Result<CreateSaleCmd, serde_json::Error> {
    let mut cmd: CreateSaleCmd = serde_json::from_str(raw)?;
    cmd.actor_id = actor.to_string();
    Ok(cmd)
}

pub fn purchase_payload(
    raw: &str,
    actor: &str,
) -> Result<CreatePurchaseOrderCmd, serde_json::Error> {
    let mut cmd: CreatePurchaseOrderCmd = serde_json::from_str(raw)?;
    cmd.actor_id = actor.to_string();
    Ok(cmd)
}
