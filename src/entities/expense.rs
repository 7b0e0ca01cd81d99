// 💸 Expense Entity - plain record, no coop coupling

use super::text_enum;
use crate::config::FarmConfig;
use crate::schema::{FieldChecks, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum ExpenseCategory {
        #[serde(alias = "mantenimiento")]
        Maintenance => "maintenance",
        #[serde(alias = "servicios")]
        Utilities => "utilities",
        #[serde(alias = "transporte")]
        Transport => "transport",
        #[serde(alias = "salarios")]
        Salaries => "salaries",
        #[serde(alias = "otros")]
        Other => "other",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i64,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: f64,
}

impl NewExpense {
    pub fn validate(&self, config: &FarmConfig) -> ValidationResult {
        FieldChecks::new("Expense", config)
            .required_text("description", &self.description)
            .amount("amount", self.amount)
            .finish()
    }
}
