//! Content kind discriminant shared by the search index and API.

use serde::{Deserialize, Serialize};

/// The three content kinds the hub stores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Postcard,
    ThreeTwoOne,
    Takeover,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Postcard => "postcard",
            ContentKind::ThreeTwoOne => "three_two_one",
            ContentKind::Takeover => "takeover",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "postcard" => Some(ContentKind::Postcard),
            "three_two_one" => Some(ContentKind::ThreeTwoOne),
            "takeover" => Some(ContentKind::Takeover),
            _ => None,
        }
    }
}
