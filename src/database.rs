use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::time::Duration;

use crate::config::DatabaseConfig;

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let lock_timeout_ms = config.lock_timeout.as_millis() as i64;
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max_open)
            .min_connections(config.pool_min_idle)
            .max_lifetime(config.conn_max_lifetime)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    conn.execute(format!("SET lock_timeout = '{lock_timeout_ms}ms'").as_str())
                        .await?;
                    Ok(())
                })
            })
            .connect(&config.url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}
