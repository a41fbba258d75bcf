use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub report_id: i64,
    pub project_id: i64,
    pub report_date: NaiveDate,
    pub percent_complete: i32, // 0..=100
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Creation payload. The report and its material lines are inserted in one
/// transaction; a failed material insert rolls back the report.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProgressReport {
    pub report_date: NaiveDate,
    pub percent_complete: i32,
    pub notes: Option<String>,
    #[serde(default)]
    pub materials: Vec<NewMaterial>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMaterial {
    pub category_id: Option<i64>,
    pub material_name: String,
    pub quantity: Option<rust_decimal::Decimal>,
    pub unit: Option<String>,
    pub cost: rust_decimal::Decimal,
}
