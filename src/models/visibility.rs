//! Content visibility scoping.

use serde::{Deserialize, Serialize};

/// Discoverability scope of a content item.
///
/// `Org` items are visible to everyone; `Team` items only to members of the
/// owning team. The set is closed: any other stored value is a data error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Org,
    Team,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Org => "org",
            Visibility::Team => "team",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "org" => Some(Visibility::Org),
            "team" => Some(Visibility::Team),
            _ => None,
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Org
    }
}
