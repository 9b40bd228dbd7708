//! Write-once records of payments and banking operations.
//!
//! Each record's id is the id of the operation that wrote it. The rows are
//! inserted once and never updated.

pub mod abonos {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "abonos")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub client_id: String,
        pub amount: i64,
        /// Vault credited directly. `None` when the abono was spread over a
        /// sale's distribution vaults.
        pub destination_account: Option<String>,
        pub sale_id: Option<String>,
        pub debt_before: i64,
        pub debt_after: i64,
        pub note: Option<String>,
        pub occurred_at: DateTimeUtc,
        pub actor_id: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod pagos {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "pagos")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub distributor_id: String,
        pub amount: i64,
        pub source_account: String,
        pub purchase_order_id: Option<String>,
        pub debt_before: i64,
        pub debt_after: i64,
        pub note: Option<String>,
        pub occurred_at: DateTimeUtc,
        pub actor_id: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod transfers {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "transfers")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub origin: String,
        pub destination: String,
        pub amount: i64,
        pub concept: String,
        pub occurred_at: DateTimeUtc,
        pub actor_id: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod gastos {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "gastos")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub account: String,
        pub amount: i64,
        pub concept: String,
        pub occurred_at: DateTimeUtc,
        pub actor_id: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod ingresos {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "ingresos")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub account: String,
        pub amount: i64,
        pub concept: String,
        pub occurred_at: DateTimeUtc,
        pub actor_id: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
