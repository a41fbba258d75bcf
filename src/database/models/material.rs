use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A material line belonging to a progress report. `report_date` is joined in
/// from the owning report so spend can be bucketed by calendar day.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub material_id: i64,
    pub report_id: i64,
    pub category_id: Option<i64>,
    pub material_name: String,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub cost: Decimal,
    pub report_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}
