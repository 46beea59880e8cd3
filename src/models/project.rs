use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CustosError, CustosResult};

/// A construction project ("obra") and its contractual values.
///
/// `custo_previsto_atual` is a cache of `custo_inicial` plus every recorded
/// revision's `custo_adicional`. It is only written by the revision append
/// path and by [`crate::db::Database::reset_initial`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub nome: String,
    pub obra_numero: String,
    pub dono: String,
    pub arquiteto: String,
    pub empresa_nome: String,
    #[serde(rename = "empresaNIF")]
    pub empresa_nif: String,
    pub empresa_morada: String,
    pub cliente_nome: String,
    #[serde(rename = "clienteNIF")]
    pub cliente_nif: String,
    pub cliente_morada: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub venda_inicial: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub custo_inicial: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub custo_previsto_atual: Decimal,
    pub created_at: String,
}

impl Project {
    /// Contractual margin before any revision, in percent. `None` when it
    /// does not fit a `Decimal`.
    pub fn initial_margin_pct(&self) -> Option<Decimal> {
        super::series::margin_pct(self.venda_inicial, self.custo_inicial)
    }
}

/// Input for project creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub nome: String,
    #[serde(default)]
    pub obra_numero: String,
    #[serde(default)]
    pub dono: String,
    #[serde(default)]
    pub arquiteto: String,
    #[serde(default)]
    pub empresa_nome: String,
    #[serde(default, rename = "empresaNIF")]
    pub empresa_nif: String,
    #[serde(default)]
    pub empresa_morada: String,
    #[serde(default)]
    pub cliente_nome: String,
    #[serde(default, rename = "clienteNIF")]
    pub cliente_nif: String,
    #[serde(default)]
    pub cliente_morada: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub venda_inicial: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub custo_inicial: Decimal,
}

impl NewProject {
    pub fn new(nome: String, venda_inicial: Decimal, custo_inicial: Decimal) -> Self {
        Self {
            nome,
            venda_inicial,
            custo_inicial,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> CustosResult<()> {
        if self.nome.trim().is_empty() {
            return Err(CustosError::Validation("nome is required".into()));
        }
        validate_initial_values(self.venda_inicial, self.custo_inicial)
    }
}

/// Body of an initial-values edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialValues {
    #[serde(with = "rust_decimal::serde::float")]
    pub venda_inicial: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub custo_inicial: Decimal,
}

/// Largest magnitude accepted for any single amount: 10^15 euros.
///
/// Keeps every sum and margin of a realistic ledger far inside the range of
/// a `Decimal`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

pub(crate) fn ensure_amount_in_range(field: &str, value: Decimal) -> CustosResult<()> {
    if value.abs() > MAX_AMOUNT {
        return Err(CustosError::Validation(format!(
            "{field} must be within ±{MAX_AMOUNT} (got {value})"
        )));
    }
    Ok(())
}

pub(crate) fn validate_initial_values(venda: Decimal, custo: Decimal) -> CustosResult<()> {
    ensure_amount_in_range("vendaInicial", venda)?;
    ensure_amount_in_range("custoInicial", custo)?;
    if venda < Decimal::ZERO {
        return Err(CustosError::Validation(format!(
            "vendaInicial must not be negative (got {venda})"
        )));
    }
    if custo < Decimal::ZERO {
        return Err(CustosError::Validation(format!(
            "custoInicial must not be negative (got {custo})"
        )));
    }
    Ok(())
}
