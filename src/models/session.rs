use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub task_name: String,
    #[serde(rename = "startTime")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "endTime")]
    pub ended_at: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    pub completed_cycles: u32,
    pub is_completed: bool,
}
