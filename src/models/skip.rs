use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Skip {
    pub id: i32,
    pub flat_no: String,
    pub item: String,
    pub skip_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub flat_no: String,
    pub item: String,
    pub skip_date: NaiveDate,
}
