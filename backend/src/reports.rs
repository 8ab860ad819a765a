//! Monthly report aggregation.
//!
//! A report is computed once per `(user, period)` and then served from the
//! store; later changes to that month's transactions do not refresh it.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{CategoryTotal, GroupTotal, NewReport, Report, TransactionKind};
use crate::period::Period;
use crate::store::{Grouping, Store};

pub const TOP_CATEGORY_LIMIT: usize = 5;

/// Returns the stored report for `(user_id, period)`, computing and
/// persisting it on first request.
pub async fn monthly_report(
    store: &dyn Store,
    user_id: Uuid,
    period: &Period,
) -> Result<Report, StoreError> {
    let key = period.to_string();
    if let Some(existing) = store.find_report(user_id, &key).await? {
        tracing::debug!(%user_id, period = %key, "report cache hit");
        return Ok(existing);
    }

    let by_kind = store.sum_by(user_id, period, Grouping::Kind).await?;
    let (total_income, total_expenses) = split_totals(&by_kind);
    let by_category = store.sum_by(user_id, period, Grouping::Category).await?;

    let report = NewReport {
        user_id,
        period: key,
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
        top_categories: rank_categories(by_category, TOP_CATEGORY_LIMIT),
    };
    insert_or_fetch(store, report).await
}

/// Persists `report`; when another request stored the same key first, the
/// stored one wins.
pub async fn insert_or_fetch(store: &dyn Store, report: NewReport) -> Result<Report, StoreError> {
    let (user_id, key) = (report.user_id, report.period.clone());
    match store.insert_report(report).await {
        Ok(created) => {
            tracing::info!(
                %user_id,
                period = %key,
                income = %created.total_income,
                expenses = %created.total_expenses,
                "report created"
            );
            Ok(created)
        }
        Err(StoreError::Duplicate(what)) => {
            tracing::debug!(%user_id, period = %key, "report stored concurrently, re-fetching");
            store
                .find_report(user_id, &key)
                .await?
                .ok_or(StoreError::Duplicate(what))
        }
        Err(e) => Err(e),
    }
}

/// Income and expense totals from per-type sums. Other types are ignored.
pub fn split_totals(groups: &[GroupTotal]) -> (Decimal, Decimal) {
    let mut income = Decimal::ZERO;
    let mut expenses = Decimal::ZERO;
    for g in groups {
        if g.key == TransactionKind::Ingreso.as_str() {
            income += g.total;
        } else if g.key == TransactionKind::Egreso.as_str() {
            expenses += g.total;
        }
    }
    (income, expenses)
}

/// Highest signed sums first, category name ascending on ties.
pub fn rank_categories(mut groups: Vec<GroupTotal>, limit: usize) -> Vec<CategoryTotal> {
    groups.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
    groups
        .into_iter()
        .take(limit)
        .map(|g| CategoryTotal {
            category: g.key,
            amount: g.total,
        })
        .collect()
}
