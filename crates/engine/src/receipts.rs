//! What each operation returns on success.
//!
//! Receipts are also what the operation registry stores, so replaying an
//! idempotent command returns exactly the receipt of the original commit.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Distribution, OrderState, PaymentState, VaultId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub sale_id: Uuid,
    pub client_id: Uuid,
    pub total_revenue: i64,
    pub full_distribution: Distribution,
    pub effective_distribution: Distribution,
    pub amount_paid: i64,
    pub amount_remaining: i64,
    pub payment_state: PaymentState,
    pub client_debt: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderReceipt {
    pub purchase_order_id: Uuid,
    pub distributor_id: Uuid,
    pub total_cost: i64,
    pub amount_paid: i64,
    pub amount_owed: i64,
    pub state: OrderState,
    pub distributor_debt: i64,
}

/// Effect of an abono on a sale it was applied to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalePaymentUpdate {
    pub sale_id: Uuid,
    pub amount_paid: i64,
    pub amount_remaining: i64,
    pub payment_state: PaymentState,
    /// Incremental credit posted to the sale's distribution vaults. Zero when
    /// the money went to the abono's destination account.
    pub credited: Distribution,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbonoReceipt {
    pub abono_id: Uuid,
    pub client_id: Uuid,
    pub amount: i64,
    pub destination_account: Option<VaultId>,
    pub debt_before: i64,
    pub debt_after: i64,
    pub sale: Option<SalePaymentUpdate>,
    /// Open sales an abono without a sale was settled against, oldest first.
    #[serde(default)]
    pub settled: Vec<SalePaymentUpdate>,
}

/// Effect of a pago on a purchase order it was applied to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaymentUpdate {
    pub purchase_order_id: Uuid,
    pub amount_paid: i64,
    pub amount_owed: i64,
    pub state: OrderState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagoReceipt {
    pub pago_id: Uuid,
    pub distributor_id: Uuid,
    pub amount: i64,
    pub source_account: VaultId,
    pub source_balance: i64,
    pub debt_before: i64,
    pub debt_after: i64,
    pub purchase_order: Option<OrderPaymentUpdate>,
    /// Open orders a pago without an order was settled against, oldest first.
    #[serde(default)]
    pub settled: Vec<OrderPaymentUpdate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPurchaseOrderReceipt {
    pub cancellation_id: Uuid,
    pub purchase_order_id: Uuid,
    pub distributor_id: Uuid,
    pub debt_released: i64,
    pub distributor_debt: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: Uuid,
    pub origin: VaultId,
    pub origin_balance: i64,
    pub destination: VaultId,
    pub destination_balance: i64,
    pub amount: i64,
}

/// Receipt shared by gastos and ingresos: one vault, one movement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntryReceipt {
    pub id: Uuid,
    pub account: VaultId,
    pub amount: i64,
    pub balance: i64,
}
