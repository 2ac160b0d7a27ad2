use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::AppConfig;

pub type OrmConn = DatabaseConnection;

/// Create a SeaORM connection with default pool settings.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    connect(ConnectOptions::new(database_url.to_owned())).await
}

/// Create a SeaORM connection sized and bounded by the application config.
pub async fn create_orm_conn_with(config: &AppConfig) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.db_max_connections)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(config.request_timeout_secs));
    connect(options).await
}

async fn connect(mut options: ConnectOptions) -> Result<DatabaseConnection> {
    options.sqlx_logging(false);
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Apply the SQL migrations embedded from `migrations/`.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(conn.get_postgres_connection_pool())
        .await?;
    Ok(())
}
