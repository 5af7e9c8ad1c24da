//! SQLite-backed token persistence
//!
//! A single `tokens` table maps issued access tokens to character identity.
//! The unique index on `access_token` is what makes the refresh lookup
//! well-defined: there is at most one live row per access token value.
//! Rows carry a soft-delete marker; no handler sets it, but lookups exclude
//! soft-deleted rows so the column stays meaningful for operators.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// A persisted token row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub character_id: i64,
    pub character_name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for a new row; the store assigns id and timestamps.
#[derive(Debug)]
pub struct NewToken {
    pub access_token: String,
    pub refresh_token: String,
    pub character_id: i64,
    pub character_name: String,
}

/// Thread-safe store handle. Cheap to clone; the pool is shared.
#[derive(Clone)]
pub struct TokenStore {
    pool: SqlitePool,
}

impl TokenStore {
    /// Open the database and run the schema migration.
    ///
    /// `mode=rwc` makes SQLite create the database file on first start.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let connection_options = if database_url.starts_with("sqlite:") && !database_url.contains('?')
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_string()
        };

        let pool = SqlitePool::connect(&connection_options).await?;
        let store = Self { pool };
        store.migrate().await?;
        info!(url = database_url, "token store ready");
        Ok(store)
    }

    /// Create the tokens table and its unique access-token index.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                character_id INTEGER NOT NULL,
                character_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_access_token ON tokens(access_token)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new token row and return it with id and timestamps filled in.
    pub async fn create(&self, token: NewToken) -> Result<TokenRecord, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO tokens (access_token, refresh_token, character_id, character_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(token.character_id)
        .bind(&token.character_name)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(TokenRecord {
            id: result.last_insert_rowid(),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            character_id: token.character_id,
            character_name: token.character_name,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Point lookup by access token value. Soft-deleted rows are invisible.
    pub async fn find_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<TokenRecord>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, access_token, refresh_token, character_id, character_name, created_at, updated_at
            FROM tokens
            WHERE access_token = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| TokenRecord {
            id: r.get("id"),
            access_token: r.get("access_token"),
            refresh_token: r.get("refresh_token"),
            character_id: r.get("character_id"),
            character_name: r.get("character_name"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }

    /// Overwrite a row's access token after a successful refresh.
    ///
    /// Only `access_token` and `updated_at` change; the refresh token and
    /// character identity are left intact.
    pub async fn update_access_token(
        &self,
        id: i64,
        access_token: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tokens SET access_token = $1, updated_at = $2 WHERE id = $3")
            .bind(access_token)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Number of live rows. Test-only observability for handler assertions.
    #[cfg(test)]
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM tokens WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}
