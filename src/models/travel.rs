use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelAnnouncement {
    pub id: String,
    pub gp_id: String,
    pub from_country: String,
    pub to_country: String,
    pub departure_date: NaiveDate,
    pub max_weight: f64,
    pub price_per_kg: f64,
    pub available_space: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
