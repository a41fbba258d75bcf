use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct ChangeOrder {
    pub change_order_id: i64,
    pub project_id: i64,
    pub description: String,
    pub amount: Decimal, // may be negative for a deductive change
    pub status: String,  // 'pending', 'approved' or 'rejected'
    pub order_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChangeOrder {
    pub description: String,
    pub amount: Decimal,
    pub order_date: NaiveDate,
}
