use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::error::ErrorKind;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{Grouping, Store};
use crate::error::StoreError;
use crate::models::{
    CategoryTotal, GroupTotal, NewReport, NewTransaction, NewUser, Report, Transaction,
    TransactionKind, User, UserCredentials, UserSettings,
};
use crate::period::Period;

const USER_COLUMNS: &str =
    "id, name, email, phone, password_hash, language, currency, notifications_enabled, created_at";
const TRANSACTION_COLUMNS: &str = "id, user_id, amount, currency, kind, category, occurred_at, \
     source, raw_message, processed, ai_confidence, created_at";
const REPORT_COLUMNS: &str =
    "id, user_id, period, total_income, total_expenses, balance, top_categories, created_at";

/// PostgreSQL-backed store. Schema lives in `backend/migrations`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique-constraint violation onto `StoreError::Duplicate`.
fn unique_as_duplicate(e: sqlx::Error, what: &'static str) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.kind() == ErrorKind::UniqueViolation => {
            StoreError::Duplicate(what)
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (id, name, email, phone, password_hash, language, currency, notifications_enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(&user.settings.language)
        .bind(&user.settings.currency)
        .bind(user.settings.notifications_enabled)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_as_duplicate(e, "email"))?;
        Ok(row.into())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| {
            let password_hash = r.password_hash.clone();
            UserCredentials {
                user: r.into(),
                password_hash,
            }
        }))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_all_users(&self) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(res.rows_affected())
    }

    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction, StoreError> {
        let row: TransactionRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO transactions
                (id, user_id, amount, currency, kind, category, occurred_at, source, raw_message, processed, ai_confidence)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(tx.user_id)
        .bind(tx.amount)
        .bind(&tx.currency)
        .bind(tx.kind.as_str())
        .bind(&tx.category)
        .bind(tx.date)
        .bind(&tx.source)
        .bind(&tx.raw_message)
        .bind(tx.processed)
        .bind(tx.ai_confidence)
        .fetch_one(&self.pool)
        .await?;
        Ok(Transaction::try_from(row)?)
    }

    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE user_id = $1
            ORDER BY occurred_at DESC, created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        let txs = rows
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(txs)
    }

    async fn delete_transaction(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_all_transactions(&self) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM transactions")
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn sum_by(
        &self,
        user_id: Uuid,
        period: &Period,
        grouping: Grouping,
    ) -> Result<Vec<GroupTotal>, StoreError> {
        let column = match grouping {
            Grouping::Kind => "kind",
            Grouping::Category => "category",
        };
        let rows: Vec<GroupTotalRow> = sqlx::query_as(&format!(
            r#"
            SELECT {column} AS key, SUM(amount) AS total
            FROM transactions
            WHERE user_id = $1 AND occurred_at >= $2 AND occurred_at < $3
            GROUP BY {column}
            "#
        ))
        .bind(user_id)
        .bind(period.start())
        .bind(period.end())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| GroupTotal {
                key: r.key,
                total: r.total.unwrap_or(Decimal::ZERO),
            })
            .collect())
    }

    async fn find_report(
        &self,
        user_id: Uuid,
        period: &str,
    ) -> Result<Option<Report>, StoreError> {
        let row: Option<ReportRow> = sqlx::query_as(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE user_id = $1 AND period = $2"
        ))
        .bind(user_id)
        .bind(period)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Report::from))
    }

    async fn insert_report(&self, report: NewReport) -> Result<Report, StoreError> {
        let row: ReportRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO reports (id, user_id, period, total_income, total_expenses, balance, top_categories)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(report.user_id)
        .bind(&report.period)
        .bind(report.total_income)
        .bind(report.total_expenses)
        .bind(report.balance)
        .bind(Json(&report.top_categories))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_as_duplicate(e, "reporte"))?;
        Ok(row.into())
    }

    async fn list_reports(&self) -> Result<Vec<Report>, StoreError> {
        let rows: Vec<ReportRow> = sqlx::query_as(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Report::from).collect())
    }

    async fn count_reports(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    language: String,
    currency: String,
    notifications_enabled: bool,
    created_at: DateTime<Utc>, // TIMESTAMPTZ
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            created_at: r.created_at,
            settings: UserSettings {
                language: r.language,
                currency: r.currency,
                notifications_enabled: r.notifications_enabled,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: Uuid,
    amount: Decimal, // NUMERIC
    currency: String,
    kind: String, // CHECK-constrained TEXT
    category: String,
    occurred_at: DateTime<Utc>,
    source: Option<String>,
    raw_message: Option<String>,
    processed: bool,
    ai_confidence: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = sqlx::Error;

    fn try_from(r: TransactionRow) -> Result<Self, Self::Error> {
        let kind: TransactionKind = r.kind.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
            index: "kind".to_string(),
            source: e.into(),
        })?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            amount: r.amount,
            currency: r.currency,
            kind,
            category: r.category,
            date: r.occurred_at,
            source: r.source,
            raw_message: r.raw_message,
            processed: r.processed,
            ai_confidence: r.ai_confidence,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReportRow {
    id: Uuid,
    user_id: Uuid,
    period: String,
    total_income: Decimal,
    total_expenses: Decimal,
    balance: Decimal,
    top_categories: Json<Vec<CategoryTotal>>, // JSONB
    created_at: DateTime<Utc>,
}

impl From<ReportRow> for Report {
    fn from(r: ReportRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            period: r.period,
            total_income: r.total_income,
            total_expenses: r.total_expenses,
            balance: r.balance,
            top_categories: r.top_categories.0,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct GroupTotalRow {
    key: String,
    total: Option<Decimal>,
}
