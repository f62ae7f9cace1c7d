//! Meeting takeover model: a 10-minute agenda slot for sharing learnings.

use serde::{Deserialize, Serialize};

use super::{Theme, Visibility};

/// A meeting takeover. Owned by its presenter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Takeover {
    pub id: String,
    pub presenter_id: String,
    /// ISO 8601 date of the meeting this takeover is scheduled for.
    pub meeting_date: String,
    pub top_learnings: Vec<String>,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    pub created_at: String,
}

/// Request body for creating a takeover.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTakeoverRequest {
    pub meeting_date: String,
    #[serde(default)]
    pub top_learnings: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub theme_ids: Vec<String>,
}

/// Request body for updating a takeover.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTakeoverRequest {
    #[serde(default)]
    pub meeting_date: Option<String>,
    #[serde(default)]
    pub top_learnings: Option<Vec<String>>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub theme_ids: Option<Vec<String>>,
}

/// A takeover as returned by list queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeoverListItem {
    #[serde(flatten)]
    pub takeover: Takeover,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presenter_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    pub themes: Vec<Theme>,
}
