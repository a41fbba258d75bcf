use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_id: i64,
    pub project_id: i64,
    pub source: String, // 'upload' or 'gmail'
    pub file_path: String,
    pub original_filename: Option<String>,
    pub gmail_message_id: Option<String>,
    pub status: String,
    pub vendor: Option<String>,
    pub receipt_date: Option<NaiveDate>,
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub total: Option<Decimal>,
    pub line_items: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Pending,
    Processed,
    Error,
}

impl ReceiptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "pending",
            ReceiptStatus::Processed => "processed",
            ReceiptStatus::Error => "error",
        }
    }
}
