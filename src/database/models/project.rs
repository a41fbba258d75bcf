use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub project_id: i64,
    pub project_name: String,
    pub client_name: Option<String>,
    pub address: Option<String>,
    pub total_budget: Decimal,
    pub labor_budget: Decimal,
    pub materials_budget: Decimal,
    pub equipment_budget: Decimal,
    pub subcontractors_budget: Decimal,
    pub overhead_budget: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String, // 'active', 'on_hold' or 'completed'
    pub created_at: DateTime<Utc>,
}

/// Creation payload. Budgets are fixed at creation; there is no update path
/// for them afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub project_name: String,
    pub client_name: Option<String>,
    pub address: Option<String>,
    pub total_budget: Decimal,
    #[serde(default)]
    pub labor_budget: Decimal,
    #[serde(default)]
    pub materials_budget: Decimal,
    #[serde(default)]
    pub equipment_budget: Decimal,
    #[serde(default)]
    pub subcontractors_budget: Decimal,
    #[serde(default)]
    pub overhead_budget: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProject {
    pub project_name: Option<String>,
    pub client_name: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub end_date: Option<NaiveDate>,
}
