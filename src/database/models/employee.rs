use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: i64,
    pub employee_name: String,
    pub trade: Option<String>,
    pub hourly_rate: Decimal, // default pay rate for new timesheets
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEmployee {
    pub employee_name: String,
    pub trade: Option<String>,
    #[serde(default)]
    pub hourly_rate: Decimal,
}
