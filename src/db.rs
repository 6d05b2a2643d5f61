use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection,
    sqlx::sqlite::{SqliteJournalMode, SqliteSynchronous},
};

use crate::error::AppResult;

pub async fn connect_and_migrate(
    database_url: &str,
    max_connections: u32,
) -> AppResult<DatabaseConnection> {
    let mut opts = ConnectOptions::new(database_url.to_string());
    opts.max_connections(max_connections).sqlx_logging(false).map_sqlx_sqlite_opts(|o| {
        o.journal_mode(SqliteJournalMode::Wal).synchronous(SqliteSynchronous::Normal)
    });

    let db = Database::connect(opts).await?;

    Migrator::up(&db, None).await?;
    tracing::debug!(url = database_url, "database ready");
    Ok(db)
}

/// Fresh in-memory database; one pooled connection so every query sees the same data.
#[cfg(test)]
pub async fn memory() -> DatabaseConnection {
    connect_and_migrate("sqlite::memory:", 1).await.expect("in-memory database")
}

/// File-backed database in the temp dir, removed on drop. Needed when a test wants
/// several pooled connections sharing one database.
#[cfg(test)]
pub struct Scratch {
    pub db: DatabaseConnection,
    path: std::path::PathBuf,
}

#[cfg(test)]
impl Scratch {
    fn remove(path: &std::path::Path) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}

#[cfg(test)]
impl Drop for Scratch {
    fn drop(&mut self) {
        Self::remove(&self.path);
    }
}

#[cfg(test)]
pub async fn scratch(name: &str, max_connections: u32) -> Scratch {
    let path = std::env::temp_dir().join(format!("moviedb-{name}-{}.db", std::process::id()));
    Scratch::remove(&path);

    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = connect_and_migrate(&url, max_connections).await.expect("scratch database");
    Scratch { db, path }
}
