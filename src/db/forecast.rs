//! The forecast-cost accumulator.
//!
//! `projects.custo_previsto_atual` caches `custo_inicial` plus the sum of the
//! project's ledger cost deltas, so reads never replay the ledger. It has a
//! single writer on the revision path, [`apply_revision`], which only accepts
//! an open transaction.

use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::{fetch_project, ledger, Database};
use crate::error::{CustosError, CustosResult};
use crate::models::{validate_initial_values, Project};

/// Cached forecast next to the value replayed from the ledger.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ForecastCheck {
    pub project_id: i64,
    pub cached: Decimal,
    pub replayed: Decimal,
}

impl ForecastCheck {
    /// Cached minus replayed. Non-zero after an initial-values edit on a
    /// project that already had revisions.
    pub fn drift(&self) -> Decimal {
        self.cached.saturating_sub(self.replayed)
    }

    pub fn is_consistent(&self) -> bool {
        self.drift().is_zero()
    }
}

/// Adds `custo_adicional` to the cached forecast and returns the new value.
///
/// Must run inside the transaction that inserts the matching ledger row. A
/// sum that does not fit a `Decimal` is rejected before anything is written.
pub(super) fn apply_revision(
    tx: &Transaction<'_>,
    project_id: i64,
    custo_adicional: Decimal,
) -> CustosResult<Decimal> {
    let current = read_forecast(tx, project_id)?
        .ok_or_else(|| CustosError::project_not_found(project_id))?;
    let updated = current.checked_add(custo_adicional).ok_or_else(|| {
        CustosError::Validation(format!(
            "custoAdicional {custo_adicional} would overflow the forecast cost of project {project_id}"
        ))
    })?;
    tx.execute(
        "UPDATE projects SET custo_previsto_atual = ?1 WHERE id = ?2",
        params![updated.to_string(), project_id],
    )?;
    debug!(project_id, %current, %updated, "forecast updated");
    Ok(updated)
}

fn read_forecast(conn: &Connection, project_id: i64) -> CustosResult<Option<Decimal>> {
    let result = conn.query_row(
        "SELECT custo_previsto_atual FROM projects WHERE id = ?1",
        params![project_id],
        |row| row.get::<_, String>(0),
    );
    let text = match result {
        Ok(t) => t,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Decimal::from_str(&text).map(Some).map_err(|e| {
        CustosError::Persistence(format!(
            "corrupt custo_previsto_atual for project {project_id}: {e}"
        ))
    })
}

impl Database {
    /// The cached forecast cost. Does not touch the ledger.
    pub(crate) fn current_forecast(&self, project_id: i64) -> CustosResult<Decimal> {
        read_forecast(&self.conn, project_id)?
            .ok_or_else(|| CustosError::project_not_found(project_id))
    }

    /// Overwrites the contractual values and resets the forecast cost to the
    /// new `custo_inicial`.
    ///
    /// Revisions already in the ledger are kept and still show up in the
    /// cumulative series, but their cost deltas are no longer part of the
    /// forecast. They are not replayed. [`Database::check_forecast`] reports
    /// the resulting drift.
    pub(crate) fn reset_initial(
        &mut self,
        project_id: i64,
        venda_inicial: Decimal,
        custo_inicial: Decimal,
    ) -> CustosResult<Project> {
        validate_initial_values(venda_inicial, custo_inicial)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE projects SET venda_inicial = ?1, custo_inicial = ?2, custo_previsto_atual = ?2
             WHERE id = ?3",
            params![
                venda_inicial.to_string(),
                custo_inicial.to_string(),
                project_id
            ],
        )?;
        if changed == 0 {
            return Err(CustosError::project_not_found(project_id));
        }
        let project = fetch_project(&tx, project_id)?
            .ok_or_else(|| CustosError::project_not_found(project_id))?;
        let orphaned = ledger::custo_adicional_total(&tx, project_id)?;
        tx.commit()?;

        if !orphaned.is_zero() {
            warn!(
                project_id,
                %orphaned,
                "initial values reset; recorded revisions no longer count toward the forecast"
            );
        }
        info!(project_id, %venda_inicial, %custo_inicial, "initial values reset");
        Ok(project)
    }

    /// `custo_inicial` plus every recorded cost delta, replayed from the
    /// ledger.
    pub(crate) fn ledger_forecast(&self, project_id: i64) -> CustosResult<Decimal> {
        let project = self.require_project(project_id)?;
        project
            .custo_inicial
            .checked_add(ledger::custo_adicional_total(&self.conn, project_id)?)
            .ok_or_else(|| CustosError::out_of_range(format!("ledger forecast of project {project_id}")))
    }

    pub(crate) fn check_forecast(&self, project_id: i64) -> CustosResult<ForecastCheck> {
        Ok(ForecastCheck {
            project_id,
            cached: self.current_forecast(project_id)?,
            replayed: self.ledger_forecast(project_id)?,
        })
    }
}
