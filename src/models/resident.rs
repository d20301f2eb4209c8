use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Resident {
    pub resident_id: String,
    pub name: String,
    pub flat_no: String,
    pub phone: String,
    pub age: i32,
    pub number_of_members: i32,
    pub gender: String,
    pub designation: String,
    pub approved: bool,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub name: String,
    pub flat_no: String,
    pub phone: String,
    pub age: i32,
    pub number_of_members: i32,
    pub gender: String,
    pub designation: String,
}
