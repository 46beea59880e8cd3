use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use crate::api;
use crate::db::Database;
use crate::models::{InitialValues, NewProject, NewRevision};

pub(crate) fn as_cli(args: &[String], db: &mut Database) -> Result<()> {
    match args.get(1).map(String::as_str).unwrap_or("help") {
        "project" => cli_project(&args[2..], db),
        "projects" => cli_projects(db),
        "revision" | "reorcamento" => cli_revision(&args[2..], db),
        "revisions" | "reorcamentos" => cli_revisions(&args[2..], db),
        "series" | "acumulado" => cli_series(&args[2..], db),
        "export" => cli_export(&args[2..], db),
        "verify" => cli_verify(&args[2..], db),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("gestao-custos {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("Gestão de Custos — budget revisions and forecast cost per project");
    println!();
    println!("Usage: gestao-custos <command>");
    println!();
    println!("Commands:");
    println!("  project new <nome> --venda <v> --custo <c>   Create a project");
    println!("    [--obra <n>] [--dono <x>] [--arquiteto <x>] [--cliente <x>] [--cliente-nif <x>]");
    println!("    [--empresa <x>] [--empresa-nif <x>]         Optional project details");
    println!("  project show <id>                            Print a project (JSON)");
    println!("  project edit <id> --venda <v> --custo <c>    Replace initial values (resets forecast)");
    println!("  projects                                     List all projects");
    println!("  revision add <project-id> --data <YYYY-MM-DD> --descricao <text> --custo <c>");
    println!("    [--venda <v>] [--motivo <text>]            Record a budget revision");
    println!("  revision add --json '<body>'                 Record a revision from a JSON body");
    println!("  revisions <project-id>                       List revisions, newest first (JSON)");
    println!("  series <project-id>                          Cumulative sale/cost/margin table");
    println!("  export <project-id> [path]                   Export the cumulative table to CSV");
    println!("  verify [project-id]                          Compare forecast cost with the ledger");
    println!("  --help, -h                                   Show this help");
    println!("  --version, -V                                Show version");
    println!();
    println!("Environment: GESTAO_CUSTOS_DB, GESTAO_CUSTOS_BUSY_TIMEOUT_MS, RUST_LOG");
}

// ── Projects ──────────────────────────────────────────────────

fn cli_project(args: &[String], db: &mut Database) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("new") => cli_project_new(&args[1..], db),
        Some("show") => {
            let id = parse_id(args.get(1), "gestao-custos project show <id>")?;
            print_response(&api::get_project(db, id))
        }
        Some("edit") => cli_project_edit(&args[1..], db),
        _ => anyhow::bail!("Usage: gestao-custos project <new|show|edit> ..."),
    }
}

fn cli_project_new(args: &[String], db: &mut Database) -> Result<()> {
    let request: NewProject = if let Some(raw) = flag(args, "--json") {
        api::parse_body(raw)?
    } else {
        let nome = args
            .first()
            .filter(|a| !a.starts_with('-'))
            .ok_or_else(|| {
                anyhow::anyhow!("Usage: gestao-custos project new <nome> --venda <v> --custo <c>")
            })?;
        let mut request = NewProject::new(
            nome.clone(),
            required_amount(args, "--venda")?,
            required_amount(args, "--custo")?,
        );
        let text = |name: &str| flag(args, name).unwrap_or_default().to_string();
        request.obra_numero = text("--obra");
        request.dono = text("--dono");
        request.arquiteto = text("--arquiteto");
        request.empresa_nome = text("--empresa");
        request.empresa_nif = text("--empresa-nif");
        request.empresa_morada = text("--empresa-morada");
        request.cliente_nome = text("--cliente");
        request.cliente_nif = text("--cliente-nif");
        request.cliente_morada = text("--cliente-morada");
        request
    };
    print_response(&api::create_project(db, &request))
}

fn cli_project_edit(args: &[String], db: &mut Database) -> Result<()> {
    let usage = "gestao-custos project edit <id> --venda <v> --custo <c>";
    let id = parse_id(args.first(), usage)?;
    let request = InitialValues {
        venda_inicial: required_amount(args, "--venda")?,
        custo_inicial: required_amount(args, "--custo")?,
    };
    let response = api::update_project(db, id, &request);
    print_response(&response)?;

    let recorded = db.revision_count(id)?;
    if recorded > 0 {
        eprintln!(
            "Note: forecast cost reset to the new initial cost; {recorded} recorded revision(s) no longer count toward it"
        );
    }
    Ok(())
}

fn cli_projects(db: &Database) -> Result<()> {
    let projects = db.get_projects()?;
    if projects.is_empty() {
        println!("No projects");
        return Ok(());
    }

    println!(
        "{:<4} {:<28} {:<10} {:>16} {:>16} {:>9} {:>16}",
        "ID", "Nome", "Obra", "Venda inicial", "Custo inicial", "Margem", "Custo previsto"
    );
    println!("{}", "─".repeat(105));
    for p in &projects {
        let margin = p
            .initial_margin_pct()
            .map_or_else(|| "-".to_string(), |m| format!("{:.2}%", m.round_dp(2)));
        println!(
            "{:<4} {:<28} {:<10} {:>16} {:>16} {:>9} {:>16}",
            p.id,
            truncate(&p.nome, 28),
            p.obra_numero,
            euros(p.venda_inicial),
            euros(p.custo_inicial),
            margin,
            euros(p.custo_previsto_atual),
        );
    }
    Ok(())
}

// ── Revisions ─────────────────────────────────────────────────

fn cli_revision(args: &[String], db: &mut Database) -> Result<()> {
    if args.first().map(String::as_str) != Some("add") {
        anyhow::bail!("Usage: gestao-custos revision add <project-id> --data <YYYY-MM-DD> --descricao <text> --custo <c>");
    }
    let args = &args[1..];

    let request: api::AppendRevisionRequest = if let Some(raw) = flag(args, "--json") {
        api::parse_body(raw)?
    } else {
        let project_id = parse_id(args.first(), "gestao-custos revision add <project-id> ...")?;
        let venda = match flag(args, "--venda") {
            Some(raw) => parse_amount(raw)?,
            None => Decimal::ZERO,
        };
        // A missing cost is left at zero and rejected by validation.
        let custo = match flag(args, "--custo") {
            Some(raw) => parse_amount(raw)?,
            None => Decimal::ZERO,
        };
        NewRevision::new(
            project_id,
            flag(args, "--data").unwrap_or_default(),
            flag(args, "--descricao").unwrap_or_default(),
            venda,
            custo,
        )
        .with_motivo(flag(args, "--motivo").unwrap_or_default())
    };

    print_response(&api::append_revision(db, &request))
}

fn cli_revisions(args: &[String], db: &Database) -> Result<()> {
    let id = parse_id(args.first(), "gestao-custos revisions <project-id>")?;
    print_response(&api::list_revisions(db, id))
}

fn cli_series(args: &[String], db: &Database) -> Result<()> {
    let id = parse_id(args.first(), "gestao-custos series <project-id>")?;
    let project = db.require_project(id)?;
    let series = db.cumulative_series(id)?;

    println!("Obra: {} {}", project.nome, project.obra_numero);
    println!("{}", "─".repeat(84));
    println!(
        "{:<40} {:>16} {:>16} {:>9}",
        "Reorçamento", "Venda", "Custo", "Margem"
    );
    println!("{}", "─".repeat(84));
    for point in &series {
        let margin = point.margin_display();
        let marker = if margin < Decimal::ZERO { "▼" } else { " " };
        println!(
            "{:<40} {:>16} {:>16} {:>8.2}%{marker}",
            if point.is_contractual() {
                "CONTRATUAL (Inicial)".to_string()
            } else {
                truncate(&point.label, 40)
            },
            euros(point.accumulated_sale),
            euros(point.accumulated_cost),
            margin,
        );
    }
    println!("{}", "─".repeat(84));
    println!("  Custo previsto atual: {}", euros(db.current_forecast(id)?));
    Ok(())
}

fn cli_export(args: &[String], db: &Database) -> Result<()> {
    let id = parse_id(args.first(), "gestao-custos export <project-id> [path]")?;
    let series = db.cumulative_series(id)?;

    let output_path = args
        .get(1)
        .filter(|a| !a.starts_with('-'))
        .map(|a| shellexpand(a))
        .unwrap_or_else(|| format!("reorcamentos-{id}.csv"));

    let count = crate::export::export_series_to_path(Path::new(&output_path), &series)?;
    println!("Exported {count} rows to {output_path}");
    Ok(())
}

fn cli_verify(args: &[String], db: &Database) -> Result<()> {
    let ids: Vec<i64> = match args.first() {
        Some(_) => vec![parse_id(args.first(), "gestao-custos verify [project-id]")?],
        None => db.get_projects()?.iter().map(|p| p.id).collect(),
    };
    if ids.is_empty() {
        println!("No projects");
        return Ok(());
    }

    println!(
        "{:<4} {:>16} {:>16} {:>14}  Status",
        "ID", "Previsto", "Ledger", "Diferença"
    );
    println!("{}", "─".repeat(66));
    for id in ids {
        let check = db.check_forecast(id)?;
        let status = if check.is_consistent() {
            "ok"
        } else {
            "initial values edited after revisions"
        };
        println!(
            "{:<4} {:>16} {:>16} {:>14}  {status}",
            check.project_id,
            euros(check.cached),
            euros(check.replayed),
            euros(check.drift()),
        );
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────

fn print_response(response: &api::Response) -> Result<()> {
    let pretty = serde_json::to_string_pretty(&response.body)?;
    println!("{pretty}");
    if !response.is_success() {
        let message = response.body["error"].as_str().unwrap_or("request failed");
        anyhow::bail!("{message} (status {})", response.status);
    }
    Ok(())
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn required_amount(args: &[String], name: &str) -> Result<Decimal> {
    let raw = flag(args, name).ok_or_else(|| anyhow::anyhow!("Missing {name} <amount>"))?;
    parse_amount(raw)
}

fn parse_id(raw: Option<&String>, usage: &str) -> Result<i64> {
    let raw = raw.ok_or_else(|| anyhow::anyhow!("Usage: {usage}"))?;
    raw.parse()
        .with_context(|| format!("'{raw}' is not a valid id. Usage: {usage}"))
}

/// Parses a money amount as typed by a user: `1234.56`, `1 234,56`,
/// `€ 1234`. A single comma with no dot is the decimal separator.
fn parse_amount(s: &str) -> Result<Decimal> {
    let compact: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .collect();
    let cleaned = if !compact.contains('.') && compact.matches(',').count() == 1 {
        compact.replace(',', ".")
    } else {
        compact.replace(',', "")
    };
    if cleaned.is_empty() {
        anyhow::bail!("Empty amount");
    }
    Decimal::from_str(&cleaned).with_context(|| format!("Failed to parse '{s}' as an amount"))
}

fn euros(amount: Decimal) -> String {
    format!("€ {:.2}", amount)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use rust_decimal_macros::dec;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("3000").unwrap(), dec!(3000));
        assert_eq!(parse_amount("-200.5").unwrap(), dec!(-200.5));
        assert_eq!(parse_amount("1234,56").unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("€ 1 234,56").unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("1,234.56").unwrap(), dec!(1234.56));
        assert!(parse_amount("").is_err());
        assert!(parse_amount("muito").is_err());
    }

    #[test]
    fn test_flag_lookup() {
        let a = args(&["7", "--data", "2024-01-01", "--custo", "10"]);
        assert_eq!(flag(&a, "--data"), Some("2024-01-01"));
        assert_eq!(flag(&a, "--venda"), None);
        assert_eq!(required_amount(&a, "--custo").unwrap(), dec!(10));
        assert!(required_amount(&a, "--venda").is_err());
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(Some(&"12".to_string()), "usage").unwrap(), 12);
        assert!(parse_id(Some(&"doze".to_string()), "usage").is_err());
        assert!(parse_id(None, "usage").is_err());
    }

    #[test]
    fn test_revision_add_records_and_rejects() {
        let mut db = Database::open_in_memory().unwrap();
        as_cli(
            &args(&["gestao-custos", "project", "new", "Moradia", "--venda", "100000", "--custo", "80000"]),
            &mut db,
        )
        .unwrap();
        let id = db.get_projects().unwrap()[0].id.to_string();

        as_cli(
            &args(&[
                "gestao-custos", "revision", "add", &id, "--data", "2024-02-01",
                "--descricao", "Piso extra", "--venda", "5000", "--custo", "3000,00",
            ]),
            &mut db,
        )
        .unwrap();
        let pid = id.parse().unwrap();
        assert_eq!(db.current_forecast(pid).unwrap(), dec!(83000));

        let rejected = as_cli(
            &args(&["gestao-custos", "revision", "add", &id, "--data", "2024-02-02", "--descricao", "Sem custo"]),
            &mut db,
        );
        assert!(rejected.unwrap_err().to_string().contains("status 400"));
        assert_eq!(db.revision_count(pid).unwrap(), 1);
    }

    #[test]
    fn test_unknown_command() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(as_cli(&args(&["gestao-custos", "frobnicate"]), &mut db).is_err());
        assert!(as_cli(&args(&["gestao-custos"]), &mut db).is_ok());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("curto", 10), "curto");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
