use std::path::Path;

use log::info;
use rust_decimal::prelude::ToPrimitive;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::EtlError;
use crate::model::RateRecord;

pub const TABLE_NAME: &str = "exchange_rates";

/// Stored in place of an absent date so the `(currency, date)` key stays unique;
/// SQLite would treat NULL key parts as distinct.
const NO_DATE: &str = "";

/// A row as it sits in the `exchange_rates` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredRate {
    pub currency: String,
    pub rate: Option<f64>,
    pub base_currency: Option<String>,
    pub date: Option<String>,
    pub loaded_at: Option<String>,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the SQLite file at `path`, creating it when missing.
    pub async fn connect<P: AsRef<Path>>(path: P) -> Result<Self, EtlError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), EtlError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS exchange_rates (
                currency TEXT NOT NULL,
                rate REAL,
                base_currency TEXT,
                date TEXT NOT NULL DEFAULT '',
                loaded_at TEXT,
                PRIMARY KEY (currency, date)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes every row in one transaction, replacing rows that share
    /// `(currency, date)`. Nothing is kept if any statement fails.
    pub async fn upsert(&self, rows: &[RateRecord]) -> Result<u64, EtlError> {
        info!("Upserting {} rows into {TABLE_NAME}.", rows.len());
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for row in rows {
            let result = sqlx::query(
                "INSERT OR REPLACE INTO exchange_rates (currency, rate, base_currency, date, loaded_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&row.currency)
            .bind(row.rate.to_f64())
            .bind(&row.base_currency)
            .bind(row.date.as_deref().unwrap_or(NO_DATE))
            .bind(&row.loaded_at)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        info!("Data saved to {TABLE_NAME} successfully (upsert).");
        Ok(written)
    }

    pub async fn count(&self) -> Result<i64, EtlError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exchange_rates")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn all_rates(&self) -> Result<Vec<StoredRate>, EtlError> {
        let rows = sqlx::query_as::<_, StoredRate>(
            "SELECT currency, rate, base_currency, NULLIF(date, '') AS date, loaded_at FROM exchange_rates ORDER BY rate DESC, currency ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(
        &self,
        currency: &str,
        date: Option<&str>,
    ) -> Result<Option<StoredRate>, EtlError> {
        let row = sqlx::query_as::<_, StoredRate>(
            "SELECT currency, rate, base_currency, NULLIF(date, '') AS date, loaded_at FROM exchange_rates WHERE currency = ? AND date = ?",
        )
        .bind(currency)
        .bind(date.unwrap_or(NO_DATE))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
