use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct SubcontractorEntry {
    pub subcontractor_entry_id: i64,
    pub project_id: i64,
    pub category_id: Option<i64>,
    pub company_name: String,
    pub entry_date: NaiveDate,
    pub cost: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubcontractorEntry {
    pub category_id: Option<i64>,
    pub company_name: String,
    pub entry_date: NaiveDate,
    pub cost: Decimal,
    pub description: Option<String>,
}
