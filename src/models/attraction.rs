use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Read-only view of an attraction, used for enrichment and ticket ownership.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attraction {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Attraction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}
