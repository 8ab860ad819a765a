use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Grouping, Store};
use crate::error::StoreError;
use crate::models::{
    GroupTotal, NewReport, NewTransaction, NewUser, Report, Transaction, User, UserCredentials,
};
use crate::period::Period;

#[derive(Default)]
struct Tables {
    users: Vec<UserCredentials>,
    transactions: Vec<Transaction>,
    reports: Vec<Report>,
}

/// In-process store. Uniqueness checks and inserts happen under one lock, so
/// they behave like the database constraints.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|c| c.user.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            phone: user.phone,
            created_at: Utc::now(),
            settings: user.settings,
        };
        t.users.push(UserCredentials {
            user: created.clone(),
            password_hash: user.password_hash,
        });
        Ok(created)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().map(|c| c.user.clone()).collect())
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|c| c.user.email == email).cloned())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.lock().await;
        let before = t.users.len();
        t.users.retain(|c| c.user.id != id);
        Ok(t.users.len() != before)
    }

    async fn delete_all_users(&self) -> Result<u64, StoreError> {
        let mut t = self.tables.lock().await;
        let n = t.users.len() as u64;
        t.users.clear();
        Ok(n)
    }

    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction, StoreError> {
        let created = Transaction {
            id: Uuid::new_v4(),
            user_id: tx.user_id,
            amount: tx.amount,
            currency: tx.currency,
            kind: tx.kind,
            category: tx.category,
            date: tx.date,
            source: tx.source,
            raw_message: tx.raw_message,
            processed: tx.processed,
            ai_confidence: tx.ai_confidence,
            created_at: Utc::now(),
        };
        self.tables.lock().await.transactions.push(created.clone());
        Ok(created)
    }

    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Transaction> = t
            .transactions
            .iter()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(rows)
    }

    async fn delete_transaction(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.lock().await;
        let before = t.transactions.len();
        t.transactions.retain(|tx| tx.id != id);
        Ok(t.transactions.len() != before)
    }

    async fn delete_all_transactions(&self) -> Result<u64, StoreError> {
        let mut t = self.tables.lock().await;
        let n = t.transactions.len() as u64;
        t.transactions.clear();
        Ok(n)
    }

    async fn sum_by(
        &self,
        user_id: Uuid,
        period: &Period,
        grouping: Grouping,
    ) -> Result<Vec<GroupTotal>, StoreError> {
        let t = self.tables.lock().await;
        let mut sums: HashMap<String, Decimal> = HashMap::new();
        for tx in t
            .transactions
            .iter()
            .filter(|tx| tx.user_id == user_id && period.contains(tx.date))
        {
            let key = match grouping {
                Grouping::Kind => tx.kind.as_str().to_string(),
                Grouping::Category => tx.category.clone(),
            };
            *sums.entry(key).or_insert(Decimal::ZERO) += tx.amount;
        }
        Ok(sums
            .into_iter()
            .map(|(key, total)| GroupTotal { key, total })
            .collect())
    }

    async fn find_report(
        &self,
        user_id: Uuid,
        period: &str,
    ) -> Result<Option<Report>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t
            .reports
            .iter()
            .find(|r| r.user_id == user_id && r.period == period)
            .cloned())
    }

    async fn insert_report(&self, report: NewReport) -> Result<Report, StoreError> {
        let mut t = self.tables.lock().await;
        if t
            .reports
            .iter()
            .any(|r| r.user_id == report.user_id && r.period == report.period)
        {
            return Err(StoreError::Duplicate("reporte"));
        }
        let created = Report {
            id: Uuid::new_v4(),
            user_id: report.user_id,
            period: report.period,
            total_income: report.total_income,
            total_expenses: report.total_expenses,
            balance: report.balance,
            top_categories: report.top_categories,
            created_at: Utc::now(),
        };
        t.reports.push(created.clone());
        Ok(created)
    }

    async fn list_reports(&self) -> Result<Vec<Report>, StoreError> {
        Ok(self.tables.lock().await.reports.clone())
    }

    async fn count_reports(&self) -> Result<u64, StoreError> {
        Ok(self.tables.lock().await.reports.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TransactionKind, UserSettings};
    use chrono::TimeZone;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ana".to_string(),
            email: email.to_string(),
            phone: None,
            password_hash: "hash".to_string(),
            settings: UserSettings::default(),
        }
    }

    fn new_tx(
        user_id: Uuid,
        kind: TransactionKind,
        category: &str,
        amount: i64,
        day: u32,
    ) -> NewTransaction {
        NewTransaction {
            user_id,
            amount: Decimal::from(amount),
            currency: "COP".to_string(),
            kind,
            category: category.to_string(),
            date: Utc.with_ymd_and_hms(2025, 9, day, 12, 0, 0).unwrap(),
            source: None,
            raw_message: None,
            processed: false,
            ai_confidence: 0.0,
        }
    }

    fn total(key: &str, amount: i64) -> GroupTotal {
        GroupTotal {
            key: key.to_string(),
            total: Decimal::from(amount),
        }
    }

    #[tokio::test]
    async fn email_is_unique() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@x.co")).await.unwrap();
        let err = store.create_user(new_user("a@x.co")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn report_key_is_unique() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let report = NewReport {
            user_id,
            period: "2025-09".to_string(),
            total_income: Decimal::ZERO,
            total_expenses: Decimal::ZERO,
            balance: Decimal::ZERO,
            top_categories: Vec::new(),
        };
        store.insert_report(report.clone()).await.unwrap();
        let err = store.insert_report(report).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.count_reports().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sums_group_within_period_for_one_user() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        for tx in [
            new_tx(user, TransactionKind::Egreso, "comida", 40, 3),
            new_tx(user, TransactionKind::Egreso, "comida", 10, 4),
            new_tx(user, TransactionKind::Ingreso, "salario", 100, 1),
            new_tx(other, TransactionKind::Egreso, "comida", 999, 4),
        ] {
            store.create_transaction(tx).await.unwrap();
        }

        let september: Period = "2025-09".parse().unwrap();
        let mut by_kind = store.sum_by(user, &september, Grouping::Kind).await.unwrap();
        by_kind.sort_by(|a, b| a.key.cmp(&b.key));
        assert_eq!(by_kind, vec![total("egreso", 50), total("ingreso", 100)]);

        let by_cat = store
            .sum_by(user, &september, Grouping::Category)
            .await
            .unwrap();
        assert_eq!(by_cat.len(), 2);
        assert!(by_cat.contains(&total("comida", 50)));

        let august: Period = "2025-08".parse().unwrap();
        assert!(store
            .sum_by(user, &august, Grouping::Kind)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn delete_transaction_reports_whether_a_row_matched() {
        let store = MemoryStore::new();
        let tx = store
            .create_transaction(new_tx(Uuid::new_v4(), TransactionKind::Egreso, "ocio", 5, 2))
            .await
            .unwrap();
        assert!(store.delete_transaction(tx.id).await.unwrap());
        assert!(!store.delete_transaction(tx.id).await.unwrap());
        assert_eq!(store.delete_all_transactions().await.unwrap(), 0);
    }
}
