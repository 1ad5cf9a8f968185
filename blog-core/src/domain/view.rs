use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub id: i64,
    pub post_id: i64,
    pub viewer_id: i64,
    pub created_at: DateTime<Utc>,
}
