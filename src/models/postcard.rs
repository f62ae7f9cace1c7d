//! Learning postcard model: a 4-section training reflection.

use serde::{Deserialize, Serialize};

use super::{Theme, Visibility};

/// A learning postcard. The four free-text sections are opaque payload;
/// only `visibility`/`team_id` participate in scoping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Postcard {
    pub id: String,
    pub author_id: String,
    pub training_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevator_pitch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lightbulb_moment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub programme_impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golden_nugget: Option<String>,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    pub created_at: String,
}

/// Request body for creating a postcard.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostcardRequest {
    pub training_title: String,
    #[serde(default)]
    pub elevator_pitch: Option<String>,
    #[serde(default)]
    pub lightbulb_moment: Option<String>,
    #[serde(default)]
    pub programme_impact: Option<String>,
    #[serde(default)]
    pub golden_nugget: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub team_id: Option<String>,
    /// Themes to associate; created lazily through the themes endpoint.
    #[serde(default)]
    pub theme_ids: Vec<String>,
}

/// Request body for updating a postcard. Omitted payload fields keep their
/// stored value; a submitted `themeIds` set replaces the association set in
/// full.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostcardRequest {
    #[serde(default)]
    pub training_title: Option<String>,
    #[serde(default)]
    pub elevator_pitch: Option<String>,
    #[serde(default)]
    pub lightbulb_moment: Option<String>,
    #[serde(default)]
    pub programme_impact: Option<String>,
    #[serde(default)]
    pub golden_nugget: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub theme_ids: Option<Vec<String>>,
}

/// A postcard as returned by list queries: pre-joined with author name,
/// team name and the full (name-ordered) theme list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostcardListItem {
    #[serde(flatten)]
    pub postcard: Postcard,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    pub themes: Vec<Theme>,
}
