//! The fixed catalogue of bank vaults and their balance rows.
//!
//! A vault's balance is never written directly: it is derived from the two
//! historical sums, `capital_actual = historico_ingresos - historico_gastos`,
//! and every change to those sums is paired with one journal
//! [`Movement`](crate::Movement).

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// What a vault is used for. Drives which operations may touch it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultKind {
    /// Receives the cost portion of sales.
    Capital,
    /// Receives the profit portion of sales.
    Profit,
    /// Receives the freight portion of sales.
    Freight,
    /// General purpose; the only kind allowed to receive manual income.
    Operational,
}

impl VaultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Capital => "capital",
            Self::Profit => "profit",
            Self::Freight => "freight",
            Self::Operational => "operational",
        }
    }
}

/// The seven vault ids. The set is closed: vaults are never created by name
/// at runtime nor deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultId {
    BovedaMonte,
    BovedaUsa,
    Utilidades,
    FleteSur,
    Azteca,
    Leftie,
    Profit,
}

impl VaultId {
    pub const ALL: [VaultId; 7] = [
        VaultId::BovedaMonte,
        VaultId::BovedaUsa,
        VaultId::Utilidades,
        VaultId::FleteSur,
        VaultId::Azteca,
        VaultId::Leftie,
        VaultId::Profit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BovedaMonte => "boveda_monte",
            Self::BovedaUsa => "boveda_usa",
            Self::Utilidades => "utilidades",
            Self::FleteSur => "flete_sur",
            Self::Azteca => "azteca",
            Self::Leftie => "leftie",
            Self::Profit => "profit",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::BovedaMonte => "Bóveda Monte",
            Self::BovedaUsa => "Bóveda USA",
            Self::Utilidades => "Utilidades",
            Self::FleteSur => "Flete Sur",
            Self::Azteca => "Azteca",
            Self::Leftie => "Leftie",
            Self::Profit => "Profit",
        }
    }

    pub fn kind(self) -> VaultKind {
        match self {
            Self::BovedaMonte | Self::BovedaUsa => VaultKind::Capital,
            Self::Utilidades => VaultKind::Profit,
            Self::FleteSur => VaultKind::Freight,
            Self::Azteca | Self::Leftie | Self::Profit => VaultKind::Operational,
        }
    }

    pub fn accepts_manual_income(self) -> bool {
        self.kind() == VaultKind::Operational
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for VaultId {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        VaultId::ALL
            .into_iter()
            .find(|id| id.as_str() == value)
            .ok_or_else(|| EngineError::Validation(format!("unknown vault: {value}")))
    }
}

impl std::str::FromStr for VaultId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VaultId::try_from(s.trim())
    }
}

/// Balance snapshot of one vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub id: VaultId,
    pub name: String,
    pub kind: VaultKind,
    pub historico_ingresos: i64,
    pub historico_gastos: i64,
    pub capital_actual: i64,
    pub updated_at: DateTime<Utc>,
}

impl Vault {
    pub fn empty(id: VaultId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: id.display_name().to_string(),
            kind: id.kind(),
            historico_ingresos: 0,
            historico_gastos: 0,
            capital_actual: 0,
            updated_at: now,
        }
    }

    /// Apply a credit (to ingresos) or a debit (to gastos) and recompute the
    /// derived balance. The vault is left untouched on error.
    pub(crate) fn apply(&mut self, credit: bool, amount_minor: i64) -> ResultEngine<()> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "movement amount must be > 0".to_string(),
            ));
        }
        let overflow = || EngineError::Validation("vault balance overflow".to_string());
        let (ingresos, gastos) = if credit {
            (
                self.historico_ingresos
                    .checked_add(amount_minor)
                    .ok_or_else(overflow)?,
                self.historico_gastos,
            )
        } else {
            if self.capital_actual < amount_minor {
                return Err(EngineError::InsufficientFunds(format!(
                    "{} has {} available, {} requested",
                    self.id, self.capital_actual, amount_minor
                )));
            }
            (
                self.historico_ingresos,
                self.historico_gastos
                    .checked_add(amount_minor)
                    .ok_or_else(overflow)?,
            )
        };
        self.historico_ingresos = ingresos;
        self.historico_gastos = gastos;
        self.capital_actual = ingresos - gastos;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub kind: String,
    pub historico_ingresos: i64,
    pub historico_gastos: i64,
    pub capital_actual: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::movements::Entity")]
    Movements,
}

impl Related<super::movements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Vault> for ActiveModel {
    fn from(value: &Vault) -> Self {
        Self {
            id: ActiveValue::Set(value.id.as_str().to_string()),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            historico_ingresos: ActiveValue::Set(value.historico_ingresos),
            historico_gastos: ActiveValue::Set(value.historico_gastos),
            capital_actual: ActiveValue::Set(value.capital_actual),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Vault {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let id = VaultId::try_from(model.id.as_str())?;
        Ok(Self {
            id,
            name: model.name,
            kind: id.kind(),
            historico_ingresos: model.historico_ingresos,
            historico_gastos: model.historico_gastos,
            capital_actual: model.capital_actual,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_operational_vaults_take_manual_income() {
        let allowed: Vec<_> = VaultId::ALL
            .into_iter()
            .filter(|id| id.accepts_manual_income())
            .collect();
        assert_eq!(allowed, vec![VaultId::Azteca, VaultId::Leftie, VaultId::Profit]);
    }

    #[test]
    fn slugs_round_trip() {
        for id in VaultId::ALL {
            assert_eq!(VaultId::try_from(id.as_str()).unwrap(), id);
        }
        assert!(VaultId::try_from("banco_x").is_err());
    }

    #[test]
    fn debit_beyond_capital_leaves_vault_untouched() {
        let mut vault = Vault::empty(VaultId::Azteca, Utc::now());
        vault.apply(true, 200).unwrap();
        let before = vault.clone();

        let err = vault.apply(false, 500).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds(_)));
        assert_eq!(vault, before);
    }

    #[test]
    fn balance_is_ingresos_minus_gastos() {
        let mut vault = Vault::empty(VaultId::Leftie, Utc::now());
        vault.apply(true, 1_000).unwrap();
        vault.apply(false, 400).unwrap();
        vault.apply(true, 50).unwrap();
        assert_eq!(vault.historico_ingresos, 1_050);
        assert_eq!(vault.historico_gastos, 400);
        assert_eq!(vault.capital_actual, 650);
    }
}
