use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job input. The address is opaque: never parsed, only required non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInput {
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failed,
}

/// Terminal artifact of one job. Exactly one is produced per executed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub address: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ResultRecord {
    pub fn success(address: &str, wind_speed: String) -> Self {
        Self {
            address: address.to_string(),
            status: JobStatus::Success,
            wind_speed: Some(wind_speed),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(address: &str, error: String) -> Self {
        Self {
            address: address.to_string(),
            status: JobStatus::Failed,
            wind_speed: None,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }
}
