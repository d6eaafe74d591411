use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

/// Catalog ids are small integers assigned by the store.
pub type CategoryId = i64;

/// A kind of recyclable material and what the bank pays for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasteCategory {
    pub id: CategoryId,
    pub name: String,
    pub price_per_kg: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
