use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A sender's request to have a parcel carried.
///
/// There is no stored "posted" display date: clients render it from
/// `created_at`, which is the only source of truth for when it was posted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAnnouncement {
    pub id: String,
    pub user_id: String,
    /// Owner's name as it was when the request was published.
    pub user_name: String,
    pub from_country: String,
    pub to_country: String,
    pub weight: f64,
    pub date: NaiveDate,
    pub product_type: String,
    pub description: Option<String>,
    pub contact_info: String,
    pub created_at: DateTime<Utc>,
}
