use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub category_id: i64,
    pub project_id: i64,
    pub category_name: String,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub category_name: String,
    pub color: Option<String>,
}
