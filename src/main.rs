mod api;
mod config;
mod db;
mod error;
mod export;
mod logging;
mod models;
mod run;

use anyhow::{Context, Result};

fn main() -> Result<()> {
    logging::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let config = config::Config::from_env()?;
    let mut db = db::Database::open(&config.db_path, config.busy_timeout)
        .with_context(|| format!("Could not open {}", config.db_path.display()))?;

    let result = run::as_cli(&args, &mut db);
    db.close()?;
    result
}
