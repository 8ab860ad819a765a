mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    GroupTotal, NewReport, NewTransaction, NewUser, Report, Transaction, User, UserCredentials,
};
use crate::period::Period;

/// Field a transaction sum is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Kind,
    Category,
}

/// Document storage for users, transactions and reports.
///
/// `insert_report` must reject a second report for the same `(user_id, period)`
/// with `StoreError::Duplicate`, and `create_user` must do the same for a
/// repeated email.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str {
        "unknown"
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, StoreError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn delete_all_users(&self) -> Result<u64, StoreError>;

    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction, StoreError>;
    /// Newest first.
    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, StoreError>;
    async fn delete_transaction(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn delete_all_transactions(&self) -> Result<u64, StoreError>;

    /// Sums `amount` of the user's transactions dated inside `period`, one
    /// entry per distinct value of `grouping`. Order is unspecified.
    async fn sum_by(
        &self,
        user_id: Uuid,
        period: &Period,
        grouping: Grouping,
    ) -> Result<Vec<GroupTotal>, StoreError>;

    async fn find_report(&self, user_id: Uuid, period: &str)
        -> Result<Option<Report>, StoreError>;
    async fn insert_report(&self, report: NewReport) -> Result<Report, StoreError>;
    async fn list_reports(&self) -> Result<Vec<Report>, StoreError>;
    async fn count_reports(&self) -> Result<u64, StoreError>;

    /// Releases backend resources on shutdown.
    async fn close(&self) {}
}
