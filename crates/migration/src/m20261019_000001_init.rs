//! Initial schema migration - creates all tables from scratch.
//!
//! - `accounts`: the seven bank vaults and their cached sums
//! - `movements`: append-only credit/debit journal
//! - `operations`: one row per committed operation, with its receipt
//! - `counterparties`: clients and distributors with running aggregates
//! - `sales` / `sale_items`
//! - `purchase_orders` / `purchase_order_items`
//! - `abonos`, `pagos`, `transfers`, `gastos`, `ingresos`: write-once records
//! - `warehouse_movements`: entry/exit log
//! - `products`: stock on hand

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Name,
    Kind,
    HistoricoIngresos,
    HistoricoGastos,
    CapitalActual,
    UpdatedAt,
}

#[derive(Iden)]
enum Movements {
    Table,
    Id,
    AccountId,
    Kind,
    AmountMinor,
    Concept,
    OperationId,
    OperationKind,
    OccurredAt,
    ActorId,
}

#[derive(Iden)]
enum Operations {
    Table,
    Id,
    Kind,
    ActorId,
    IdempotencyKey,
    Receipt,
    OccurredAt,
    CommittedAt,
}

#[derive(Iden)]
enum Counterparties {
    Table,
    Id,
    Kind,
    Name,
    NameNorm,
    TotalTransacted,
    TotalPaid,
    TotalDebt,
    TransactionCount,
    CreditLimit,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Sales {
    Table,
    Id,
    ClientId,
    TotalRevenue,
    FullCost,
    FullFreight,
    FullProfit,
    EffectiveCost,
    EffectiveFreight,
    EffectiveProfit,
    AmountPaid,
    AmountRemaining,
    SettledOutside,
    PaymentState,
    PaymentMethod,
    CostVault,
    FreightApplies,
    Note,
    OccurredAt,
    ActorId,
}

#[derive(Iden)]
enum SaleItems {
    Table,
    Id,
    SaleId,
    Position,
    Product,
    Quantity,
    UnitSalePrice,
    UnitCostPrice,
    UnitFreightPrice,
    SourcePurchaseOrderId,
}

#[derive(Iden)]
enum PurchaseOrders {
    Table,
    Id,
    DistributorId,
    TotalCost,
    AmountPaid,
    AmountOwed,
    DebtReleased,
    State,
    Note,
    OccurredAt,
    ActorId,
}

#[derive(Iden)]
enum PurchaseOrderItems {
    Table,
    Id,
    PurchaseOrderId,
    Position,
    Product,
    Quantity,
    UnitCost,
    UnitFreight,
}

#[derive(Iden)]
enum Abonos {
    Table,
    Id,
    ClientId,
    Amount,
    DestinationAccount,
    SaleId,
    DebtBefore,
    DebtAfter,
    Note,
    OccurredAt,
    ActorId,
}

#[derive(Iden)]
enum Pagos {
    Table,
    Id,
    DistributorId,
    Amount,
    SourceAccount,
    PurchaseOrderId,
    DebtBefore,
    DebtAfter,
    Note,
    OccurredAt,
    ActorId,
}

#[derive(Iden)]
enum Transfers {
    Table,
    Id,
    Origin,
    Destination,
    Amount,
    Concept,
    OccurredAt,
    ActorId,
}

#[derive(Iden)]
enum Gastos {
    Table,
    Id,
    Account,
    Amount,
    Concept,
    OccurredAt,
    ActorId,
}

#[derive(Iden)]
enum Ingresos {
    Table,
    Id,
    Account,
    Amount,
    Concept,
    OccurredAt,
    ActorId,
}

#[derive(Iden)]
enum WarehouseMovements {
    Table,
    Id,
    Direction,
    Product,
    Quantity,
    OperationId,
    OperationKind,
    OccurredAt,
    ActorId,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
    Name,
    NameNorm,
    Stock,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::HistoricoIngresos)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Accounts::HistoricoGastos)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Accounts::CapitalActual)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Movements
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Movements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Movements::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Movements::AccountId).string().not_null())
                    .col(ColumnDef::new(Movements::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Movements::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Movements::Concept).string().not_null())
                    .col(ColumnDef::new(Movements::OperationId).string().not_null())
                    .col(ColumnDef::new(Movements::OperationKind).string().not_null())
                    .col(ColumnDef::new(Movements::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Movements::ActorId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-movements-account_id")
                            .from(Movements::Table, Movements::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-movements-account_id-occurred_at")
                    .table(Movements::Table)
                    .col(Movements::AccountId)
                    .col(Movements::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-movements-operation_id")
                    .table(Movements::Table)
                    .col(Movements::OperationId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Operations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Operations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Operations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Operations::Kind).string().not_null())
                    .col(ColumnDef::new(Operations::ActorId).string().not_null())
                    .col(ColumnDef::new(Operations::IdempotencyKey).string())
                    .col(ColumnDef::new(Operations::Receipt).text().not_null())
                    .col(ColumnDef::new(Operations::OccurredAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(Operations::CommittedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-operations-actor_id-idempotency_key-unique")
                    .table(Operations::Table)
                    .col(Operations::ActorId)
                    .col(Operations::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Counterparties
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Counterparties::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Counterparties::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Counterparties::Kind).string().not_null())
                    .col(ColumnDef::new(Counterparties::Name).string().not_null())
                    .col(ColumnDef::new(Counterparties::NameNorm).string().not_null())
                    .col(
                        ColumnDef::new(Counterparties::TotalTransacted)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Counterparties::TotalPaid)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Counterparties::TotalDebt)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Counterparties::TransactionCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Counterparties::CreditLimit).big_integer())
                    .col(
                        ColumnDef::new(Counterparties::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Counterparties::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-counterparties-kind-name_norm-unique")
                    .table(Counterparties::Table)
                    .col(Counterparties::Kind)
                    .col(Counterparties::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Sales
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sales::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Sales::ClientId).string().not_null())
                    .col(ColumnDef::new(Sales::TotalRevenue).big_integer().not_null())
                    .col(ColumnDef::new(Sales::FullCost).big_integer().not_null())
                    .col(ColumnDef::new(Sales::FullFreight).big_integer().not_null())
                    .col(ColumnDef::new(Sales::FullProfit).big_integer().not_null())
                    .col(ColumnDef::new(Sales::EffectiveCost).big_integer().not_null())
                    .col(
                        ColumnDef::new(Sales::EffectiveFreight)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sales::EffectiveProfit)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sales::AmountPaid).big_integer().not_null())
                    .col(
                        ColumnDef::new(Sales::AmountRemaining)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sales::SettledOutside)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Sales::PaymentState).string().not_null())
                    .col(ColumnDef::new(Sales::PaymentMethod).string().not_null())
                    .col(ColumnDef::new(Sales::CostVault).string().not_null())
                    .col(ColumnDef::new(Sales::FreightApplies).boolean().not_null())
                    .col(ColumnDef::new(Sales::Note).string())
                    .col(ColumnDef::new(Sales::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Sales::ActorId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sales-client_id")
                            .from(Sales::Table, Sales::ClientId)
                            .to(Counterparties::Table, Counterparties::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sales-client_id")
                    .table(Sales::Table)
                    .col(Sales::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SaleItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SaleItems::SaleId).string().not_null())
                    .col(ColumnDef::new(SaleItems::Position).integer().not_null())
                    .col(ColumnDef::new(SaleItems::Product).string().not_null())
                    .col(ColumnDef::new(SaleItems::Quantity).big_integer().not_null())
                    .col(
                        ColumnDef::new(SaleItems::UnitSalePrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SaleItems::UnitCostPrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SaleItems::UnitFreightPrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SaleItems::SourcePurchaseOrderId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_items-sale_id")
                            .from(SaleItems::Table, SaleItems::SaleId)
                            .to(Sales::Table, Sales::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sale_items-sale_id")
                    .table(SaleItems::Table)
                    .col(SaleItems::SaleId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Purchase orders
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrders::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::DistributorId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::TotalCost)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::AmountPaid)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::AmountOwed)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::DebtReleased)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PurchaseOrders::State).string().not_null())
                    .col(ColumnDef::new(PurchaseOrders::Note).string())
                    .col(
                        ColumnDef::new(PurchaseOrders::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::ActorId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_orders-distributor_id")
                            .from(PurchaseOrders::Table, PurchaseOrders::DistributorId)
                            .to(Counterparties::Table, Counterparties::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-purchase_orders-distributor_id")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::DistributorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::PurchaseOrderId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrderItems::Product).string().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::UnitCost)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::UnitFreight)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_order_items-purchase_order_id")
                            .from(
                                PurchaseOrderItems::Table,
                                PurchaseOrderItems::PurchaseOrderId,
                            )
                            .to(PurchaseOrders::Table, PurchaseOrders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-purchase_order_items-purchase_order_id")
                    .table(PurchaseOrderItems::Table)
                    .col(PurchaseOrderItems::PurchaseOrderId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Abonos / Pagos
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Abonos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Abonos::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Abonos::ClientId).string().not_null())
                    .col(ColumnDef::new(Abonos::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Abonos::DestinationAccount).string())
                    .col(ColumnDef::new(Abonos::SaleId).string())
                    .col(ColumnDef::new(Abonos::DebtBefore).big_integer().not_null())
                    .col(ColumnDef::new(Abonos::DebtAfter).big_integer().not_null())
                    .col(ColumnDef::new(Abonos::Note).string())
                    .col(ColumnDef::new(Abonos::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Abonos::ActorId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-abonos-client_id")
                            .from(Abonos::Table, Abonos::ClientId)
                            .to(Counterparties::Table, Counterparties::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-abonos-client_id")
                    .table(Abonos::Table)
                    .col(Abonos::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Pagos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Pagos::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Pagos::DistributorId).string().not_null())
                    .col(ColumnDef::new(Pagos::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Pagos::SourceAccount).string().not_null())
                    .col(ColumnDef::new(Pagos::PurchaseOrderId).string())
                    .col(ColumnDef::new(Pagos::DebtBefore).big_integer().not_null())
                    .col(ColumnDef::new(Pagos::DebtAfter).big_integer().not_null())
                    .col(ColumnDef::new(Pagos::Note).string())
                    .col(ColumnDef::new(Pagos::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Pagos::ActorId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-pagos-distributor_id")
                            .from(Pagos::Table, Pagos::DistributorId)
                            .to(Counterparties::Table, Counterparties::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-pagos-distributor_id")
                    .table(Pagos::Table)
                    .col(Pagos::DistributorId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Transfers / Gastos / Ingresos
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transfers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transfers::Origin).string().not_null())
                    .col(ColumnDef::new(Transfers::Destination).string().not_null())
                    .col(ColumnDef::new(Transfers::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Transfers::Concept).string().not_null())
                    .col(ColumnDef::new(Transfers::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Transfers::ActorId).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Gastos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Gastos::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Gastos::Account).string().not_null())
                    .col(ColumnDef::new(Gastos::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Gastos::Concept).string().not_null())
                    .col(ColumnDef::new(Gastos::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Gastos::ActorId).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ingresos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ingresos::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ingresos::Account).string().not_null())
                    .col(ColumnDef::new(Ingresos::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Ingresos::Concept).string().not_null())
                    .col(ColumnDef::new(Ingresos::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Ingresos::ActorId).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 9. Warehouse / Products
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(WarehouseMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WarehouseMovements::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WarehouseMovements::Direction)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WarehouseMovements::Product).string().not_null())
                    .col(
                        ColumnDef::new(WarehouseMovements::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WarehouseMovements::OperationId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WarehouseMovements::OperationKind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WarehouseMovements::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WarehouseMovements::ActorId).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-warehouse_movements-operation_id")
                    .table(WarehouseMovements::Table)
                    .col(WarehouseMovements::OperationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::NameNorm).string().not_null())
                    .col(
                        ColumnDef::new(Products::Stock)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Products::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-products-name_norm-unique")
                    .table(Products::Table)
                    .col(Products::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WarehouseMovements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ingresos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Gastos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transfers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Pagos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Abonos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaleItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Counterparties::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Operations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Movements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
