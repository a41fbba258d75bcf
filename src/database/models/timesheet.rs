use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Timesheet {
    pub timesheet_id: i64,
    pub project_id: i64,
    pub employee_id: i64,
    pub category_id: Option<i64>,
    pub work_date: NaiveDate,
    pub hours: Decimal,
    pub pay_rate: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Timesheet {
    /// Monetary contribution of this entry to the project's spend.
    pub fn amount(&self) -> Decimal {
        self.hours * self.pay_rate
    }
}

/// Creation payload. When `pay_rate` is omitted the employee's current hourly
/// rate is copied in, so later rate changes don't rewrite old timesheets.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTimesheet {
    pub employee_id: i64,
    pub category_id: Option<i64>,
    pub work_date: NaiveDate,
    pub hours: Decimal,
    pub pay_rate: Option<Decimal>,
    pub notes: Option<String>,
}
