#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;
use crate::error::CustosResult;

fn make_revision(id: i64, data: &str, venda: Decimal, custo: Decimal) -> Revision {
    Revision {
        id,
        project_id: 1,
        data: NaiveDate::parse_from_str(data, DATE_FORMAT).unwrap(),
        descricao: format!("Rev {id}"),
        motivo: String::new(),
        venda_adicional: venda,
        custo_adicional: custo,
        created_at: String::new(),
    }
}

// ── Revision validation ───────────────────────────────────────

#[test]
fn test_valid_revision() {
    let rev = NewRevision::new(1, "2024-03-01", "Piso extra", dec!(5000), dec!(3000));
    let data = rev.validate().unwrap();
    assert_eq!(data, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
}

#[test]
fn test_blank_descricao_rejected() {
    let rev = NewRevision::new(1, "2024-03-01", "   ", dec!(0), dec!(3000));
    let err = rev.validate().unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("descricao"));
}

#[test]
fn test_zero_cost_rejected() {
    let rev = NewRevision::new(1, "2024-03-01", "Só venda", dec!(5000), Decimal::ZERO);
    assert!(rev.validate().unwrap_err().is_validation());
}

#[test]
fn test_negative_cost_rejected() {
    let rev = NewRevision::new(1, "2024-03-01", "Correção", dec!(0), dec!(-100));
    assert!(rev.validate().unwrap_err().is_validation());
}

#[test]
fn test_amounts_beyond_limit_rejected() {
    let at_limit = NewRevision::new(1, "2024-03-01", "Ampliação", -MAX_AMOUNT, MAX_AMOUNT);
    assert!(at_limit.validate().is_ok());

    let over = MAX_AMOUNT + dec!(0.01);
    let big_cost = NewRevision::new(1, "2024-03-01", "Ampliação", dec!(0), over);
    assert!(big_cost.validate().unwrap_err().is_validation());

    let big_sale_cut = NewRevision::new(1, "2024-03-01", "Ampliação", -over, dec!(10));
    assert!(big_sale_cut.validate().unwrap_err().is_validation());

    let huge: NewRevision = serde_json::from_str(
        r#"{"projectId": 1, "data": "2024-03-01", "descricao": "Torre", "custoAdicional": 5e28}"#,
    )
    .unwrap();
    assert!(huge.validate().unwrap_err().is_validation());
}

#[test]
fn test_invalid_dates_rejected() {
    for bad in ["", "2024-13-01", "2024-02-30", "01/03/2024", "amanhã"] {
        let rev = NewRevision::new(1, bad, "Piso extra", dec!(0), dec!(10));
        assert!(rev.validate().unwrap_err().is_validation(), "accepted {bad:?}");
    }
}

#[test]
fn test_negative_sale_delta_allowed() {
    let rev = NewRevision::new(1, "2024-03-01", "Desconto", dec!(-2000), dec!(1));
    assert!(rev.validate().is_ok());
}

#[test]
fn test_revision_request_defaults() {
    let rev: NewRevision = serde_json::from_str(
        r#"{"projectId": 7, "data": "2024-05-10", "descricao": "Caixilharia", "custoAdicional": 1250.5}"#,
    )
    .unwrap();
    assert_eq!(rev.project_id, 7);
    assert_eq!(rev.venda_adicional, Decimal::ZERO);
    assert_eq!(rev.custo_adicional, dec!(1250.5));
    assert!(rev.motivo.is_empty());
}

#[test]
fn test_revision_label() {
    let rev = make_revision(3, "2024-06-15", dec!(0), dec!(10));
    assert_eq!(rev.label(), "2024-06-15 - Rev 3");
}

// ── Project ───────────────────────────────────────────────────

#[test]
fn test_new_project_validation() {
    assert!(NewProject::new("Moradia T3".into(), dec!(100000), dec!(80000))
        .validate()
        .is_ok());
    assert!(NewProject::new(" ".into(), dec!(100000), dec!(80000))
        .validate()
        .unwrap_err()
        .is_validation());
    assert!(NewProject::new("Moradia".into(), dec!(-1), dec!(80000))
        .validate()
        .unwrap_err()
        .is_validation());
    assert!(NewProject::new("Moradia".into(), dec!(100000), dec!(-0.01))
        .validate()
        .unwrap_err()
        .is_validation());
    assert!(NewProject::new("Torre".into(), dec!(1e27), dec!(1))
        .validate()
        .unwrap_err()
        .is_validation());
    assert!(NewProject::new("Torre".into(), MAX_AMOUNT, MAX_AMOUNT)
        .validate()
        .is_ok());
}

#[test]
fn test_new_project_from_json() {
    let p: NewProject = serde_json::from_str(
        r#"{"nome": "Edifício Sol", "obraNumero": "O-12", "empresaNIF": "500100200",
            "vendaInicial": 100000, "custoInicial": 80000}"#,
    )
    .unwrap();
    assert_eq!(p.obra_numero, "O-12");
    assert_eq!(p.empresa_nif, "500100200");
    assert_eq!(p.custo_inicial, dec!(80000));
    assert!(p.cliente_nome.is_empty());
}

// ── Cumulative series ─────────────────────────────────────────

#[test]
fn test_margin_pct() {
    assert_eq!(margin_round(dec!(100000), dec!(80000)), dec!(20.00));
    assert_eq!(margin_round(dec!(100), dec!(150)), dec!(-50.00));
    assert_eq!(series::margin_pct(Decimal::ZERO, dec!(500)), Some(Decimal::ZERO));
}

#[test]
fn test_margin_pct_at_range_limits() {
    // Largest representable sale: the quotient is taken before scaling.
    let margin = series::margin_pct(Decimal::MAX, dec!(1)).unwrap();
    assert_eq!(margin.round_dp(2), dec!(100.00));

    assert_eq!(margin_round(MAX_AMOUNT, MAX_AMOUNT), dec!(0.00));
    assert!(series::margin_pct(dec!(0.0000000000000000000000000001), dec!(1000)).is_none());
}

fn margin_round(sale: Decimal, cost: Decimal) -> Decimal {
    series::margin_pct(sale, cost).unwrap().round_dp(2)
}

#[test]
fn test_series_reconstruction() {
    let revisions = vec![
        make_revision(1, "2024-02-01", dec!(5000), dec!(3000)),
        make_revision(2, "2024-04-01", dec!(0), dec!(2000)),
    ];
    let points: Vec<SeriesPoint> =
        cumulative_series(dec!(100000), dec!(80000), &revisions)
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(points.len(), 3);

    assert!(points[0].is_contractual());
    assert_eq!(points[0].accumulated_sale, dec!(100000));
    assert_eq!(points[0].accumulated_cost, dec!(80000));
    assert_eq!(points[0].margin_display(), dec!(20.00));

    assert_eq!(points[1].label, "2024-02-01 - Rev 1");
    assert_eq!(points[1].accumulated_sale, dec!(105000));
    assert_eq!(points[1].accumulated_cost, dec!(83000));
    assert_eq!(points[1].margin_display(), dec!(20.95));

    assert_eq!(points[2].accumulated_sale, dec!(105000));
    assert_eq!(points[2].accumulated_cost, dec!(85000));
    assert_eq!(points[2].margin_display(), dec!(19.05));
}

#[test]
fn test_series_without_revisions() {
    let points: Vec<SeriesPoint> = cumulative_series(dec!(50000), dec!(40000), &[])
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].label, series::CONTRACTUAL_LABEL);
}

#[test]
fn test_series_zero_sale_margin() {
    let revisions = vec![make_revision(1, "2024-01-10", dec!(0), dec!(1000))];
    let points: Vec<SeriesPoint> = cumulative_series(Decimal::ZERO, Decimal::ZERO, &revisions)
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(points.iter().all(|p| p.margin_pct.is_zero()));
    assert_eq!(points[1].accumulated_cost, dec!(1000));
}

#[test]
fn test_series_overflow_ends_with_error() {
    let revisions = vec![
        make_revision(1, "2024-01-10", dec!(0), dec!(1)),
        make_revision(2, "2024-02-10", dec!(0), dec!(1)),
    ];
    let points: Vec<CustosResult<SeriesPoint>> =
        cumulative_series(dec!(100), Decimal::MAX, &revisions).collect();

    assert_eq!(points.len(), 2);
    assert!(points[0].is_ok());
    let err = points[1].as_ref().unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(err.to_string().contains("2024-01-10 - Rev 1"));
}

#[test]
fn test_series_point_json_shape() {
    let points: Vec<SeriesPoint> = cumulative_series(dec!(100), dec!(50), &[])
        .collect::<Result<_, _>>()
        .unwrap();
    let json = serde_json::to_value(&points[0]).unwrap();
    assert_eq!(json["label"], "CONTRATUAL");
    assert_eq!(json["accumulatedSale"].as_f64(), Some(100.0));
    assert_eq!(json["marginPct"].as_f64(), Some(50.0));
}
