pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    nome                  TEXT NOT NULL,
    obra_numero           TEXT NOT NULL DEFAULT '',
    dono                  TEXT NOT NULL DEFAULT '',
    arquiteto             TEXT NOT NULL DEFAULT '',
    empresa_nome          TEXT NOT NULL DEFAULT '',
    empresa_nif           TEXT NOT NULL DEFAULT '',
    empresa_morada        TEXT NOT NULL DEFAULT '',
    cliente_nome          TEXT NOT NULL DEFAULT '',
    cliente_nif           TEXT NOT NULL DEFAULT '',
    cliente_morada        TEXT NOT NULL DEFAULT '',
    venda_inicial         TEXT NOT NULL,
    custo_inicial         TEXT NOT NULL,
    custo_previsto_atual  TEXT NOT NULL,
    created_at            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reorcamentos (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id       INTEGER NOT NULL REFERENCES projects(id),
    data             TEXT NOT NULL,
    descricao        TEXT NOT NULL,
    motivo           TEXT NOT NULL DEFAULT '',
    venda_adicional  TEXT NOT NULL DEFAULT '0',
    custo_adicional  TEXT NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reorcamentos_project_data ON reorcamentos(project_id, data);
"#;

pub(crate) const CURRENT_VERSION: i32 = 1;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[];
