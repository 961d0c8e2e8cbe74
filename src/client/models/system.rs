//! Service health and metadata models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Server uptime in seconds
    #[serde(default)]
    pub uptime: Option<f64>,
    #[serde(default)]
    pub environment: Option<String>,
}

/// Response of `GET /info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    /// Endpoint group name to base path
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

/// Plain acknowledgement (`{"message": "..."}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}
