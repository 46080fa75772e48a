use async_trait::async_trait;
use sqlx::PgPool;

use crate::middleware::audit::{AuditSink, API_LOG_TABLE};
use crate::models::audit::AuditEntry;

/// Resource log tables created by the migrations. Table names are never
/// taken from request input; anything else is refused before hitting SQL.
const RESOURCE_TABLES: [&str; 4] = ["pedidos_log", "entidades_log", "produtos_log", "ordens_servico_log"];

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for PgStore {
    async fn insert_resource_log(&self, table: &'static str, entry: &AuditEntry) -> anyhow::Result<()> {
        if !RESOURCE_TABLES.contains(&table) {
            anyhow::bail!("unknown audit table {}", table);
        }

        let sql = format!(
            "INSERT INTO {} (codigo, payload, operacao, status, data_operacao) VALUES ($1, $2, $3, $4, $5)",
            table
        );
        sqlx::query(&sql)
            .bind(&entry.record_code)
            .bind(&entry.payload)
            .bind(entry.operation.as_str())
            .bind(entry.status.as_str())
            .bind(entry.timestamp)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_api_log(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO api_logs (
                codigo, payload, operacao, status, data_operacao, recurso, rota, metodo
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&entry.record_code)
        .bind(&entry.payload)
        .bind(entry.operation.as_str())
        .bind(entry.status.as_str())
        .bind(entry.timestamp)
        .bind(entry.resource_or_unknown())
        .bind(&entry.route)
        .bind(&entry.method)
        .execute(&self.pool)
        .await?;

        tracing::trace!(table = API_LOG_TABLE, "audit row inserted");
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
