use anyhow::Result;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sqlite::SqliteConnection;

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

/// Per-connection SQLite settings. The busy timeout lets a second assignment
/// run wait on the first run's write lock instead of failing outright.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions {
    pub busy_timeout_ms: u32,
}

impl ConnectionOptions {
    pub fn apply(&self, conn: &mut SqliteConnection) -> diesel::QueryResult<()> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON;",
            self.busy_timeout_ms
        ))
    }
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        self.apply(conn).map_err(r2d2::Error::QueryError)
    }
}

/// Accepts both `sqlite://path.db` and a bare path.
fn database_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .unwrap_or(database_url)
}

pub fn create_pool(database_url: &str, options: ConnectionOptions) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_path(database_url));
    let pool = r2d2::Pool::builder()
        .connection_customizer(Box::new(options))
        .build(manager)?;
    Ok(pool)
}

pub fn run_migrations(conn: &mut SqliteConnection) -> Result<()> {
    use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("Migration error: {}", e))
}

/// Fresh in-memory database with the schema applied.
#[cfg(test)]
pub fn test_connection() -> SqliteConnection {
    use diesel::Connection;

    let mut conn = SqliteConnection::establish(":memory:").unwrap();
    ConnectionOptions { busy_timeout_ms: 0 }
        .apply(&mut conn)
        .unwrap();
    run_migrations(&mut conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path_strips_scheme() {
        assert_eq!(database_path("sqlite://aulas.db"), "aulas.db");
        assert_eq!(database_path("/var/lib/aulas.db"), "/var/lib/aulas.db");
    }

    #[test]
    fn test_connection_enforces_foreign_keys() {
        use diesel::prelude::*;

        let mut conn = test_connection();
        let result = diesel::sql_query(
            "INSERT INTO subjects (period_id, name, user_id, career_id) VALUES (99, 'x', 99, 99)",
        )
        .execute(&mut conn);
        assert!(result.is_err());
    }
}
