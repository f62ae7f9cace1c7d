//! 3-2-1 reflection model: three learnings, two changes, one question.

use serde::{Deserialize, Serialize};

use super::{Theme, Visibility};

/// A 3-2-1 reflection entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeTwoOne {
    pub id: String,
    pub author_id: String,
    pub training_title: String,
    pub learnings: Vec<String>,
    pub changes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    pub created_at: String,
}

/// Request body for creating a 3-2-1 entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreeTwoOneRequest {
    pub training_title: String,
    #[serde(default)]
    pub learnings: Vec<String>,
    #[serde(default)]
    pub changes: Vec<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub theme_ids: Vec<String>,
}

/// Request body for updating a 3-2-1 entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateThreeTwoOneRequest {
    #[serde(default)]
    pub training_title: Option<String>,
    #[serde(default)]
    pub learnings: Option<Vec<String>>,
    #[serde(default)]
    pub changes: Option<Vec<String>>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub theme_ids: Option<Vec<String>>,
}

/// A 3-2-1 entry as returned by list queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeTwoOneListItem {
    #[serde(flatten)]
    pub entry: ThreeTwoOne,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    pub themes: Vec<Theme>,
}
