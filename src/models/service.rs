use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A bookable service. Belongs to exactly one barber; `barber_id` never
/// changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub barber_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}
