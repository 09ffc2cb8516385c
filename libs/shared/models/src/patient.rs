use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Shared with the owning account.
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub favorites: Vec<Uuid>,
    #[serde(default)]
    pub medical_history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub fn new(id: Uuid, name: String, email: Option<String>) -> Self {
        Self {
            id,
            name,
            email,
            contact: None,
            age: None,
            gender: None,
            address: None,
            blood_group: None,
            image_url: None,
            favorites: Vec::new(),
            medical_history: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
}
