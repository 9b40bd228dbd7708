//! Financial distribution and ledger engine.
//!
//! Seven fixed bank vaults, a journal of every credit and debit applied to
//! them, and the business operations that move money between them: sales
//! (split into cost, freight and profit), purchase orders, client abonos,
//! distributor pagos, transfers, expenses and manual income. Every operation
//! runs in one database transaction and either posts completely or not at all.

pub use commands::{
    AbonoClienteCmd, CancelPurchaseOrderCmd, CreatePurchaseOrderCmd, CreateSaleCmd, GastoCmd,
    IngresoCmd, OpMeta, PagoDistribuidorCmd, TransferCmd,
};
pub use counterparties::{Counterparty, CounterpartyKind, CounterpartyRef};
pub use distribution::{
    Distribution, SaleBreakdown, SaleItem, compute_effective_distribution,
    compute_full_distribution, incremental_distribution,
};
pub use error::{EngineError, ErrorKind};
pub use inventory::{ProductStock, ProductStockLevel, StockAdjuster};
pub use money::Money;
pub use movements::{Movement, MovementFilter, MovementKind};
pub use operations::OperationKind;
pub use ops::{
    AccountDrift, AggregateTotals, CounterpartyDrift, Engine, EngineBuilder, JournalTotals,
    ReconciliationReport, SaleDrift,
};
pub use purchase_orders::{OrderState, PurchaseOrder, PurchaseOrderItem, order_total};
pub use receipts::{
    AbonoReceipt, AccountEntryReceipt, CancelPurchaseOrderReceipt, OrderPaymentUpdate,
    PagoReceipt, PurchaseOrderReceipt, SalePaymentUpdate, SaleReceipt, TransferReceipt,
};
pub use sales::{PaymentMethod, PaymentState, Sale};
pub use vault::{Vault, VaultId, VaultKind};
pub use warehouse::WarehouseDirection;

mod commands;
mod counterparties;
mod distribution;
mod error;
mod inventory;
mod money;
mod movements;
mod operations;
mod ops;
mod purchase_orders;
mod receipts;
mod records;
mod sales;
mod util;
mod vault;
mod warehouse;

type ResultEngine<T> = Result<T, EngineError>;
