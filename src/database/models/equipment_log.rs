use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentLog {
    pub equipment_log_id: i64,
    pub project_id: i64,
    pub category_id: Option<i64>,
    pub equipment_name: String,
    pub log_date: NaiveDate,
    pub fuel_cost: Decimal,
    pub rental_cost: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EquipmentLog {
    pub fn amount(&self) -> Decimal {
        self.fuel_cost + self.rental_cost
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEquipmentLog {
    pub category_id: Option<i64>,
    pub equipment_name: String,
    pub log_date: NaiveDate,
    #[serde(default)]
    pub fuel_cost: Decimal,
    #[serde(default)]
    pub rental_cost: Decimal,
    pub notes: Option<String>,
}
