use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ensure_amount_in_range;
use crate::error::{CustosError, CustosResult};

/// Storage and wire format for revision dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A budget revision ("reorçamento"). Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub id: i64,
    pub project_id: i64,
    pub data: NaiveDate,
    pub descricao: String,
    pub motivo: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub venda_adicional: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub custo_adicional: Decimal,
    pub created_at: String,
}

impl Revision {
    /// Row label used by the cumulative table, e.g. `2024-03-01 - Piso extra`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.data.format(DATE_FORMAT), self.descricao)
    }
}

/// A revision request as received from the caller, before validation.
///
/// `vendaAdicional` and `custoAdicional` default to zero when absent; a zero
/// cost is then rejected by [`NewRevision::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRevision {
    pub project_id: i64,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub descricao: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub venda_adicional: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub custo_adicional: Decimal,
    #[serde(default)]
    pub motivo: String,
}

impl NewRevision {
    pub fn new(
        project_id: i64,
        data: &str,
        descricao: &str,
        venda_adicional: Decimal,
        custo_adicional: Decimal,
    ) -> Self {
        Self {
            project_id,
            data: data.to_string(),
            descricao: descricao.to_string(),
            venda_adicional,
            custo_adicional,
            motivo: String::new(),
        }
    }

    pub fn with_motivo(mut self, motivo: &str) -> Self {
        self.motivo = motivo.to_string();
        self
    }

    /// Checks the required fields and returns the parsed effective date.
    pub fn validate(&self) -> CustosResult<NaiveDate> {
        if self.descricao.trim().is_empty() {
            return Err(CustosError::Validation("descricao is required".into()));
        }
        let data = NaiveDate::parse_from_str(self.data.trim(), DATE_FORMAT).map_err(|_| {
            CustosError::Validation(format!(
                "data must be a valid YYYY-MM-DD date (got '{}')",
                self.data
            ))
        })?;
        ensure_amount_in_range("vendaAdicional", self.venda_adicional)?;
        ensure_amount_in_range("custoAdicional", self.custo_adicional)?;
        if self.custo_adicional <= Decimal::ZERO {
            return Err(CustosError::Validation(format!(
                "custoAdicional must be greater than zero (got {})",
                self.custo_adicional
            )));
        }
        Ok(data)
    }
}
