//! Append-only ledger of budget revisions ("reorçamentos").
//!
//! Rows are only ever inserted, and only by [`Database::append_revision`],
//! which applies the revision's cost to the project's forecast inside the
//! same transaction. There is no update or delete path; a correction is a
//! new offsetting revision.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::{date_column, decimal_column, fetch_project, forecast, Database};
use crate::error::{CustosError, CustosResult};
use crate::models::*;

/// Outcome of a successful append: the stored row, the new forecast cost and
/// the project as it stands after the commit.
#[derive(Debug, Clone)]
pub(crate) struct AppliedRevision {
    pub revision: Revision,
    pub novo_custo_previsto: Decimal,
    pub project: Project,
}

const REVISION_COLUMNS: &str =
    "id, project_id, data, descricao, motivo, venda_adicional, custo_adicional, created_at";

impl Database {
    /// Records a revision and adds its `custo_adicional` to the project's
    /// forecast cost, atomically.
    ///
    /// The transaction is opened IMMEDIATE so the forecast read-modify-write
    /// holds the write lock from the start; a concurrent append on the same
    /// file waits for it instead of reading a stale forecast. Any error drops
    /// the transaction, leaving neither the row nor the forecast change
    /// behind.
    ///
    /// SQLite's write lock covers the whole database, not a row, so appends
    /// to different projects also queue behind each other for the length of
    /// one transaction. They never read or change each other's data.
    pub(crate) fn append_revision(&mut self, new: &NewRevision) -> CustosResult<AppliedRevision> {
        let data = new.validate().inspect_err(|e| {
            warn!(project_id = new.project_id, error = %e, "revision rejected");
        })?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if fetch_project(&tx, new.project_id)?.is_none() {
            warn!(project_id = new.project_id, "revision for unknown project");
            return Err(CustosError::project_not_found(new.project_id));
        }

        let revision = insert_revision(&tx, new, data)?;
        let novo_custo_previsto =
            forecast::apply_revision(&tx, new.project_id, new.custo_adicional)?;
        let project = fetch_project(&tx, new.project_id)?
            .ok_or_else(|| CustosError::project_not_found(new.project_id))?;
        tx.commit()?;

        info!(
            project_id = new.project_id,
            revision_id = revision.id,
            custo_adicional = %new.custo_adicional,
            novo_custo_previsto = %novo_custo_previsto,
            "revision recorded"
        );
        Ok(AppliedRevision {
            revision,
            novo_custo_previsto,
            project,
        })
    }

    /// Revisions for display: most recent date first, later insertions first
    /// within a date. An unknown project simply has no rows.
    pub(crate) fn list_revisions(&self, project_id: i64) -> CustosResult<Vec<Revision>> {
        self.query_revisions(project_id, "data DESC, id DESC")
    }

    /// Revisions in the order their deltas accumulate: oldest date first,
    /// ties broken by insertion order.
    pub(crate) fn revisions_in_accumulation_order(
        &self,
        project_id: i64,
    ) -> CustosResult<Vec<Revision>> {
        self.query_revisions(project_id, "data ASC, id ASC")
    }

    fn query_revisions(&self, project_id: i64, order_by: &str) -> CustosResult<Vec<Revision>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVISION_COLUMNS} FROM reorcamentos WHERE project_id = ?1 ORDER BY {order_by}"
        ))?;
        let rows = stmt.query_map(params![project_id], revision_from_row)?;
        let revisions = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(project_id, count = revisions.len(), "revisions loaded");
        Ok(revisions)
    }

    /// Rebuilds the cumulative sale/cost/margin table from the contractual
    /// values and the full ledger. Never cached.
    pub(crate) fn cumulative_series(&self, project_id: i64) -> CustosResult<Vec<SeriesPoint>> {
        let project = self.require_project(project_id)?;
        let revisions = self.revisions_in_accumulation_order(project_id)?;
        cumulative_series(project.venda_inicial, project.custo_inicial, &revisions).collect()
    }

    pub(crate) fn revision_count(&self, project_id: i64) -> CustosResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM reorcamentos WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?)
    }
}

fn insert_revision(
    tx: &Transaction<'_>,
    new: &NewRevision,
    data: NaiveDate,
) -> CustosResult<Revision> {
    let created_at = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO reorcamentos (project_id, data, descricao, motivo, venda_adicional, custo_adicional, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.project_id,
            data.format(DATE_FORMAT).to_string(),
            new.descricao.trim(),
            new.motivo.trim(),
            new.venda_adicional.to_string(),
            new.custo_adicional.to_string(),
            created_at,
        ],
    )?;
    Ok(Revision {
        id: tx.last_insert_rowid(),
        project_id: new.project_id,
        data,
        descricao: new.descricao.trim().to_string(),
        motivo: new.motivo.trim().to_string(),
        venda_adicional: new.venda_adicional,
        custo_adicional: new.custo_adicional,
        created_at,
    })
}

/// Sum of every recorded cost delta for a project.
pub(super) fn custo_adicional_total(conn: &Connection, project_id: i64) -> CustosResult<Decimal> {
    let mut stmt =
        conn.prepare("SELECT custo_adicional FROM reorcamentos WHERE project_id = ?1")?;
    let rows = stmt.query_map(params![project_id], |row| decimal_column(row, 0))?;
    let mut total = Decimal::ZERO;
    for amount in rows {
        total = total
            .checked_add(amount?)
            .ok_or_else(|| CustosError::out_of_range(format!("cost total of project {project_id}")))?;
    }
    Ok(total)
}

fn revision_from_row(row: &Row<'_>) -> rusqlite::Result<Revision> {
    Ok(Revision {
        id: row.get(0)?,
        project_id: row.get(1)?,
        data: date_column(row, 2)?,
        descricao: row.get(3)?,
        motivo: row.get(4)?,
        venda_adicional: decimal_column(row, 5)?,
        custo_adicional: decimal_column(row, 6)?,
        created_at: row.get(7)?,
    })
}
