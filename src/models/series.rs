//! Cumulative sale/cost/margin series, rebuilt by replaying the revision
//! ledger on top of the contractual values.
//!
//! The series is recomputed on every read and never stored. Callers must
//! pass revisions in accumulation order (`data` ascending, then `id`
//! ascending), which is what
//! [`crate::db::Database::revisions_in_accumulation_order`] returns.

use rust_decimal::Decimal;
use serde::Serialize;

use super::Revision;
use crate::error::{CustosError, CustosResult};

/// Label of the synthetic first point holding the un-revised contract.
pub const CONTRACTUAL_LABEL: &str = "CONTRATUAL";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub accumulated_sale: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub accumulated_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub margin_pct: Decimal,
}

impl SeriesPoint {
    fn new(label: String, sale: Decimal, cost: Decimal) -> CustosResult<Self> {
        let margin_pct = margin_pct(sale, cost)
            .ok_or_else(|| CustosError::out_of_range(format!("margin at '{label}'")))?;
        Ok(Self {
            label,
            accumulated_sale: sale,
            accumulated_cost: cost,
            margin_pct,
        })
    }

    /// Margin rounded to two decimal places for display.
    pub fn margin_display(&self) -> Decimal {
        self.margin_pct.round_dp(2)
    }

    pub fn is_contractual(&self) -> bool {
        self.label == CONTRACTUAL_LABEL
    }
}

/// `(sale - cost) / sale * 100`, or zero when there is no sale value.
///
/// `None` when the result does not fit a `Decimal`, e.g. a sale value of a
/// few hundredths of a cent against a large cost.
pub fn margin_pct(sale: Decimal, cost: Decimal) -> Option<Decimal> {
    if sale.is_zero() {
        return Some(Decimal::ZERO);
    }
    sale.checked_sub(cost)?
        .checked_div(sale)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Lazily yields the contractual point followed by one running-total point
/// per revision.
///
/// A running total or margin that overflows yields one error and ends the
/// series.
pub fn cumulative_series(
    venda_inicial: Decimal,
    custo_inicial: Decimal,
    revisions: &[Revision],
) -> impl Iterator<Item = CustosResult<SeriesPoint>> + '_ {
    let contractual = SeriesPoint::new(CONTRACTUAL_LABEL.to_string(), venda_inicial, custo_inicial);
    let running = revisions
        .iter()
        .scan(Some((venda_inicial, custo_inicial)), |totals, rev| {
            let (sale, cost) = (*totals)?;
            let next = sale
                .checked_add(rev.venda_adicional)
                .zip(cost.checked_add(rev.custo_adicional));
            *totals = next;
            Some(match next {
                Some((sale, cost)) => SeriesPoint::new(rev.label(), sale, cost),
                None => Err(CustosError::out_of_range(format!(
                    "running totals at '{}'",
                    rev.label()
                ))),
            })
        });
    std::iter::once(contractual).chain(running)
}
