use serde::{Deserialize, Serialize};

/// A pet in the store
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: i64,
    pub pet_name: String,
    pub tag: Option<String>,
    pub category: Category,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Available,
    Pending,
    Sold,
}

pub struct Unused {
    pub value: String,
}
