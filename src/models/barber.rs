use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A barber offering services. `working_hours` is a free-form JSON string
/// kept for display only; the slot generator uses a fixed shop-wide window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barber {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub working_hours: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}
