//! Command structs for engine operations.
//!
//! One command per operation. Each carries the acting user and an [`OpMeta`]
//! with the business timestamp and an optional idempotency key. Commands are
//! `Deserialize` so a front end can accept them as JSON payloads; `actor_id`
//! is usually filled in afterwards from the caller's identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CounterpartyRef, PaymentMethod, PaymentState, PurchaseOrderItem, SaleItem, VaultId,
};

/// Common metadata for every operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpMeta {
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Default for OpMeta {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl OpMeta {
    #[must_use]
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            occurred_at,
            idempotency_key: None,
            note: None,
        }
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

fn default_true() -> bool {
    true
}

/// Register a sale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSaleCmd {
    pub client: CounterpartyRef,
    pub items: Vec<SaleItem>,
    pub payment_state: PaymentState,
    #[serde(default)]
    pub amount_paid: i64,
    pub payment_method: PaymentMethod,
    #[serde(default = "default_true")]
    pub freight_applies: bool,
    #[serde(default)]
    pub meta: OpMeta,
    #[serde(default)]
    pub actor_id: String,
}

impl CreateSaleCmd {
    #[must_use]
    pub fn new(
        client: impl Into<CounterpartyRef>,
        actor_id: impl Into<String>,
        items: Vec<SaleItem>,
        payment_state: PaymentState,
        amount_paid: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client: client.into(),
            items,
            payment_state,
            amount_paid,
            payment_method: PaymentMethod::Efectivo,
            freight_applies: true,
            meta: OpMeta::new(occurred_at),
            actor_id: actor_id.into(),
        }
    }

    #[must_use]
    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    #[must_use]
    pub fn freight_applies(mut self, applies: bool) -> Self {
        self.freight_applies = applies;
        self
    }

    #[must_use]
    pub fn meta(mut self, meta: OpMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.meta.note = Some(note.into());
        self
    }
}

/// Place a purchase order with a distributor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrderCmd {
    pub distributor: CounterpartyRef,
    pub items: Vec<PurchaseOrderItem>,
    #[serde(default)]
    pub initial_payment: i64,
    #[serde(default)]
    pub source_account: Option<VaultId>,
    #[serde(default)]
    pub meta: OpMeta,
    #[serde(default)]
    pub actor_id: String,
}

impl CreatePurchaseOrderCmd {
    #[must_use]
    pub fn new(
        distributor: impl Into<CounterpartyRef>,
        actor_id: impl Into<String>,
        items: Vec<PurchaseOrderItem>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            distributor: distributor.into(),
            items,
            initial_payment: 0,
            source_account: None,
            meta: OpMeta::new(occurred_at),
            actor_id: actor_id.into(),
        }
    }

    #[must_use]
    pub fn initial_payment(mut self, amount_minor: i64, source_account: VaultId) -> Self {
        self.initial_payment = amount_minor;
        self.source_account = Some(source_account);
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.meta.note = Some(note.into());
        self
    }
}

/// Receive a payment from a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbonoClienteCmd {
    pub client: CounterpartyRef,
    pub amount_minor: i64,
    /// Required when no sale is referenced.
    #[serde(default)]
    pub destination_account: Option<VaultId>,
    #[serde(default)]
    pub sale_id: Option<Uuid>,
    #[serde(default)]
    pub meta: OpMeta,
    #[serde(default)]
    pub actor_id: String,
}

impl AbonoClienteCmd {
    #[must_use]
    pub fn new(
        client: impl Into<CounterpartyRef>,
        actor_id: impl Into<String>,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client: client.into(),
            amount_minor,
            destination_account: None,
            sale_id: None,
            meta: OpMeta::new(occurred_at),
            actor_id: actor_id.into(),
        }
    }

    #[must_use]
    pub fn sale_id(mut self, sale_id: Uuid) -> Self {
        self.sale_id = Some(sale_id);
        self
    }

    #[must_use]
    pub fn destination_account(mut self, account: VaultId) -> Self {
        self.destination_account = Some(account);
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.meta.note = Some(note.into());
        self
    }
}

/// Pay a distributor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagoDistribuidorCmd {
    pub distributor: CounterpartyRef,
    pub amount_minor: i64,
    pub source_account: VaultId,
    #[serde(default)]
    pub purchase_order_id: Option<Uuid>,
    #[serde(default)]
    pub meta: OpMeta,
    #[serde(default)]
    pub actor_id: String,
}

impl PagoDistribuidorCmd {
    #[must_use]
    pub fn new(
        distributor: impl Into<CounterpartyRef>,
        actor_id: impl Into<String>,
        amount_minor: i64,
        source_account: VaultId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            distributor: distributor.into(),
            amount_minor,
            source_account,
            purchase_order_id: None,
            meta: OpMeta::new(occurred_at),
            actor_id: actor_id.into(),
        }
    }

    #[must_use]
    pub fn purchase_order_id(mut self, purchase_order_id: Uuid) -> Self {
        self.purchase_order_id = Some(purchase_order_id);
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.meta.note = Some(note.into());
        self
    }
}

/// Cancel an open purchase order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPurchaseOrderCmd {
    pub purchase_order_id: Uuid,
    #[serde(default)]
    pub meta: OpMeta,
    #[serde(default)]
    pub actor_id: String,
}

impl CancelPurchaseOrderCmd {
    #[must_use]
    pub fn new(
        purchase_order_id: Uuid,
        actor_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            purchase_order_id,
            meta: OpMeta::new(occurred_at),
            actor_id: actor_id.into(),
        }
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }
}

/// Move money between two vaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCmd {
    pub origin: VaultId,
    pub destination: VaultId,
    pub amount_minor: i64,
    pub concept: String,
    #[serde(default)]
    pub meta: OpMeta,
    #[serde(default)]
    pub actor_id: String,
}

impl TransferCmd {
    #[must_use]
    pub fn new(
        origin: VaultId,
        destination: VaultId,
        actor_id: impl Into<String>,
        amount_minor: i64,
        concept: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            origin,
            destination,
            amount_minor,
            concept: concept.into(),
            meta: OpMeta::new(occurred_at),
            actor_id: actor_id.into(),
        }
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }
}

/// Record an expense paid from a vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GastoCmd {
    pub account: VaultId,
    pub amount_minor: i64,
    pub concept: String,
    #[serde(default)]
    pub meta: OpMeta,
    #[serde(default)]
    pub actor_id: String,
}

impl GastoCmd {
    #[must_use]
    pub fn new(
        account: VaultId,
        actor_id: impl Into<String>,
        amount_minor: i64,
        concept: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account,
            amount_minor,
            concept: concept.into(),
            meta: OpMeta::new(occurred_at),
            actor_id: actor_id.into(),
        }
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }
}

/// Record manual income into an operational vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngresoCmd {
    pub account: VaultId,
    pub amount_minor: i64,
    pub concept: String,
    #[serde(default)]
    pub meta: OpMeta,
    #[serde(default)]
    pub actor_id: String,
}

impl IngresoCmd {
    #[must_use]
    pub fn new(
        account: VaultId,
        actor_id: impl Into<String>,
        amount_minor: i64,
        concept: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account,
            amount_minor,
            concept: concept.into(),
            meta: OpMeta::new(occurred_at),
            actor_id: actor_id.into(),
        }
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }
}
