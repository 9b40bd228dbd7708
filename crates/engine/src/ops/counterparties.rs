use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseTransaction, QueryFilter, prelude::*};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    Counterparty, CounterpartyKind, CounterpartyRef, EngineError, ResultEngine,
    counterparties::{self, require_kind},
    util::normalize_required_name,
};

use super::Engine;

async fn find_counterparty<C: ConnectionTrait>(
    db: &C,
    kind: CounterpartyKind,
    reference: &CounterpartyRef,
) -> ResultEngine<Option<Counterparty>> {
    let model = match reference {
        CounterpartyRef::Id(id) => {
            counterparties::Entity::find_by_id(id.to_string())
                .one(db)
                .await?
        }
        CounterpartyRef::Name(name) => {
            let (_, name_norm) = normalize_required_name(name, kind.as_str())?;
            counterparties::Entity::find()
                .filter(counterparties::Column::Kind.eq(kind.as_str()))
                .filter(counterparties::Column::NameNorm.eq(name_norm))
                .one(db)
                .await?
        }
    };
    let Some(model) = model else {
        return Ok(None);
    };
    let counterparty = Counterparty::try_from(model)?;
    require_kind(&counterparty, kind)?;
    Ok(Some(counterparty))
}

async fn require_counterparty<C: ConnectionTrait>(
    db: &C,
    kind: CounterpartyKind,
    reference: &CounterpartyRef,
) -> ResultEngine<Counterparty> {
    find_counterparty(db, kind, reference)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("{} {reference}", kind.as_str())))
}

impl Engine {
    /// Find a counterparty by id or canonical name; names not seen before
    /// create a new record. Ids must exist.
    pub(crate) async fn resolve_or_create_counterparty(
        &self,
        db_tx: &DatabaseTransaction,
        kind: CounterpartyKind,
        reference: &CounterpartyRef,
        now: DateTime<Utc>,
    ) -> ResultEngine<Counterparty> {
        if let Some(found) = find_counterparty(db_tx, kind, reference).await? {
            return Ok(found);
        }
        let CounterpartyRef::Name(name) = reference else {
            return Err(EngineError::NotFound(format!(
                "{} {reference}",
                kind.as_str()
            )));
        };

        let (display, name_norm) = normalize_required_name(name, kind.as_str())?;
        let counterparty = Counterparty {
            id: Uuid::new_v4(),
            kind,
            name: display,
            total_transacted: 0,
            total_paid: 0,
            total_debt: 0,
            transaction_count: 0,
            credit_limit: None,
            created_at: now,
            updated_at: now,
        };
        counterparty
            .to_active_model(&name_norm)
            .insert(db_tx)
            .await?;
        debug!(
            kind = kind.as_str(),
            counterparty_id = %counterparty.id,
            name = %counterparty.name,
            "counterparty created"
        );
        Ok(counterparty)
    }

    pub(crate) async fn require_counterparty_tx(
        &self,
        db_tx: &DatabaseTransaction,
        kind: CounterpartyKind,
        reference: &CounterpartyRef,
    ) -> ResultEngine<Counterparty> {
        require_counterparty(db_tx, kind, reference).await
    }

    pub(crate) async fn save_counterparty(
        &self,
        db_tx: &DatabaseTransaction,
        counterparty: &Counterparty,
    ) -> ResultEngine<()> {
        counterparty.aggregates_model().update(db_tx).await?;
        Ok(())
    }

    pub async fn client(&self, client: impl Into<CounterpartyRef>) -> ResultEngine<Counterparty> {
        require_counterparty(&self.database, CounterpartyKind::Client, &client.into()).await
    }

    pub async fn distributor(
        &self,
        distributor: impl Into<CounterpartyRef>,
    ) -> ResultEngine<Counterparty> {
        require_counterparty(
            &self.database,
            CounterpartyKind::Distributor,
            &distributor.into(),
        )
        .await
    }

    /// Set (or clear with `None`) the maximum debt a client may carry.
    ///
    /// Lowering the limit below the current debt is allowed; it only blocks
    /// further sales on credit.
    pub async fn set_client_credit_limit(
        &self,
        client: impl Into<CounterpartyRef>,
        limit_minor: Option<i64>,
    ) -> ResultEngine<Counterparty> {
        if limit_minor.is_some_and(|limit| limit < 0) {
            return Err(EngineError::Validation(
                "credit limit must be >= 0".to_string(),
            ));
        }
        let reference = client.into();
        let updated = self
            .with_tx(move |engine, db_tx| {
                let reference = reference.clone();
                Box::pin(async move {
                    let mut client = engine
                        .require_counterparty_tx(db_tx, CounterpartyKind::Client, &reference)
                        .await?;
                    client.credit_limit = limit_minor;
                    client.updated_at = Utc::now();
                    engine.save_counterparty(db_tx, &client).await?;
                    Ok(client)
                })
            })
            .await?;
        info!(client_id = %updated.id, credit_limit = ?updated.credit_limit, "credit limit updated");
        Ok(updated)
    }
}
