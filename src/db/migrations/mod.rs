use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::error::Error;

/// Apply every `.sql` file in `migrations_dir` in dependency order.
///
/// All scripts are written to be re-runnable (`IF NOT EXISTS`, guarded
/// constraint blocks), so the whole set is replayed on each startup.
pub async fn run_migrations(pool: &PgPool, migrations_dir: &Path) -> Result<usize> {
    let entries = ordered_migration_files(migrations_dir)?;

    for path in &entries {
        execute_migration_file(pool, path).await?;
        info!("Applied migration: {}", path.display());
    }

    Ok(entries.len())
}

/// Collect `.sql` files sorted so tables come before foreign keys and indexes
pub fn ordered_migration_files(migrations_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(migrations_dir)
        .with_context(|| format!("Failed to read migrations dir {}", migrations_dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|ext| ext == "sql").unwrap_or(false))
        .collect::<Vec<_>>();

    entries.sort_by(|a, b| {
        let a_name = a.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let b_name = b.file_name().and_then(|n| n.to_str()).unwrap_or("");

        migration_order(a_name)
            .cmp(&migration_order(b_name))
            .then_with(|| a_name.cmp(b_name))
    });

    Ok(entries)
}

fn migration_order(name: &str) -> usize {
    if name.starts_with("add_foreign_keys") {
        1000
    } else if name.starts_with("add_indexes") {
        2000
    } else {
        name.split('_')
            .next()
            .and_then(|prefix| prefix.parse::<usize>().ok())
            .unwrap_or(usize::MAX)
    }
}

async fn execute_migration_file(pool: &PgPool, path: &Path) -> Result<()> {
    let sql = fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;

    pool.execute(&*sql).await.map_err(|e| {
        Error::Database(format!("Migration {} failed: {}", path.display(), e))
    })?;

    Ok(())
}
