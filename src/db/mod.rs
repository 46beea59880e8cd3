mod forecast;
mod ledger;
mod schema;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row, TransactionBehavior};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{CustosError, CustosResult};
use crate::models::*;

/// Storage client for projects and their revision ledger.
///
/// Constructed once at startup and handed to whatever needs it; each
/// instance owns a single SQLite connection. Several instances may point at
/// the same file, writers serialize on SQLite's write lock.
pub(crate) struct Database {
    conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.busy_timeout(busy_timeout)
            .context("Failed to set busy timeout")?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        let mut db = Self { conn };
        db.migrate().context("Database migration failed")?;
        debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Closes the underlying connection, surfacing any error SQLite reports
    /// while finalizing.
    pub(crate) fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("Failed to close database")
    }

    /// Brings the schema up to date. The version check runs inside the
    /// IMMEDIATE transaction, so two processes opening a fresh file create
    /// the schema once.
    fn migrate(&mut self) -> Result<()> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let has_version_table: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            tx.execute_batch(schema::SCHEMA_V1)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            tx.commit()?;
            return Ok(());
        }

        let current: i32 = tx
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                tx.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            tx.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    // ── Projects ──────────────────────────────────────────────

    /// Creates a project with its forecast cost equal to the initial cost.
    pub(crate) fn insert_project(&self, project: &NewProject) -> CustosResult<Project> {
        project.validate()?;
        self.conn.execute(
            "INSERT INTO projects (nome, obra_numero, dono, arquiteto, empresa_nome, empresa_nif,
                                   empresa_morada, cliente_nome, cliente_nif, cliente_morada,
                                   venda_inicial, custo_inicial, custo_previsto_atual, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12, ?13)",
            params![
                project.nome.trim(),
                project.obra_numero,
                project.dono,
                project.arquiteto,
                project.empresa_nome,
                project.empresa_nif,
                project.empresa_morada,
                project.cliente_nome,
                project.cliente_nif,
                project.cliente_morada,
                project.venda_inicial.to_string(),
                project.custo_inicial.to_string(),
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(project_id = id, nome = %project.nome, "project created");
        self.require_project(id)
    }

    pub(crate) fn get_project(&self, id: i64) -> CustosResult<Option<Project>> {
        fetch_project(&self.conn, id)
    }

    pub(crate) fn require_project(&self, id: i64) -> CustosResult<Project> {
        self.get_project(id)?
            .ok_or_else(|| CustosError::project_not_found(id))
    }

    pub(crate) fn get_projects(&self) -> CustosResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY nome, id"
        ))?;
        let rows = stmt.query_map([], project_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

const PROJECT_COLUMNS: &str = "id, nome, obra_numero, dono, arquiteto, empresa_nome, empresa_nif,
     empresa_morada, cliente_nome, cliente_nif, cliente_morada, venda_inicial, custo_inicial,
     custo_previsto_atual, created_at";

fn fetch_project(conn: &Connection, id: i64) -> CustosResult<Option<Project>> {
    let result = conn.query_row(
        &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
        params![id],
        project_from_row,
    );
    match result {
        Ok(p) => Ok(Some(p)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        nome: row.get(1)?,
        obra_numero: row.get(2)?,
        dono: row.get(3)?,
        arquiteto: row.get(4)?,
        empresa_nome: row.get(5)?,
        empresa_nif: row.get(6)?,
        empresa_morada: row.get(7)?,
        cliente_nome: row.get(8)?,
        cliente_nif: row.get(9)?,
        cliente_morada: row.get(10)?,
        venda_inicial: decimal_column(row, 11)?,
        custo_inicial: decimal_column(row, 12)?,
        custo_previsto_atual: decimal_column(row, 13)?,
        created_at: row.get(14)?,
    })
}

/// Amounts are stored as TEXT; a value that no longer parses is a storage
/// fault, not a zero.
fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
