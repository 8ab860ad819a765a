use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub language: String,
    pub currency: String,
    pub notifications_enabled: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            language: "es".to_string(),
            currency: "COP".to_string(),
            notifications_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub settings: UserSettings,
}

/// A user together with the stored argon2 hash. Never serialized.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub settings: UserSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Ingreso, // income
    #[default]
    Egreso, // expense
    Transferencia,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Ingreso => "ingreso",
            TransactionKind::Egreso => "egreso",
            TransactionKind::Transferencia => "transferencia",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingreso" => Ok(TransactionKind::Ingreso),
            "egreso" => Ok(TransactionKind::Egreso),
            "transferencia" => Ok(TransactionKind::Transferencia),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub date: DateTime<Utc>,
    pub source: Option<String>,
    pub raw_message: Option<String>,
    pub processed: bool,
    pub ai_confidence: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub kind: TransactionKind,
    pub category: String,
    pub date: DateTime<Utc>,
    pub source: Option<String>,
    pub raw_message: Option<String>,
    pub processed: bool,
    pub ai_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    pub period: String, // "YYYY-MM"
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub balance: Decimal,
    pub top_categories: Vec<CategoryTotal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: Uuid,
    pub period: String,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub balance: Decimal,
    pub top_categories: Vec<CategoryTotal>,
}

/// Summed amount for one group key (a transaction type or a category).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotal {
    pub key: String,
    pub total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transaction_kind_uses_original_wire_names() {
        let kind: TransactionKind = serde_json::from_value(json!("transferencia")).unwrap();
        assert_eq!(kind, TransactionKind::Transferencia);
        assert_eq!(serde_json::to_value(TransactionKind::Ingreso).unwrap(), json!("ingreso"));
        assert_eq!(TransactionKind::default(), TransactionKind::Egreso);
        assert_eq!("egreso".parse::<TransactionKind>(), Ok(TransactionKind::Egreso));
        assert!("gasto".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn report_serializes_camel_case_numbers() {
        let report = Report {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            period: "2025-09".to_string(),
            total_income: Decimal::from(100),
            total_expenses: Decimal::from(60),
            balance: Decimal::from(40),
            top_categories: vec![CategoryTotal {
                category: "salario".to_string(),
                amount: Decimal::from(100),
            }],
            created_at: Utc::now(),
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["totalIncome"].as_f64(), Some(100.0));
        assert_eq!(v["balance"].as_f64(), Some(40.0));
        assert_eq!(v["topCategories"][0]["category"], json!("salario"));
        assert!(v.get("userId").is_some());
    }
}
