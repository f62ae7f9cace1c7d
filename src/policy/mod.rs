//! Visibility policy: who may discover which content items.
//!
//! Pure functions of (viewer, item scope); there is no cached visibility
//! state to invalidate. Listing queries embed the same predicate in SQL so
//! filtering happens at the storage layer; keep the two in sync.

use crate::models::Visibility;

/// The viewer attributes the policy consumes.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub id: String,
    pub team_id: Option<String>,
}

/// The scoping attributes of a content item.
#[derive(Debug, Clone)]
pub struct ItemScope<'a> {
    pub owner_id: &'a str,
    pub visibility: Visibility,
    pub team_id: Option<&'a str>,
}

/// Whether `viewer` may see the item.
///
/// Org items are visible to everyone; team items only to members of that
/// team. Owners always see their own items regardless of visibility: the
/// rule gates discovery, and an owner's direct access is never gated.
pub fn visible(viewer: &Viewer, item: &ItemScope<'_>) -> bool {
    if viewer.id == item.owner_id {
        return true;
    }
    match item.visibility {
        Visibility::Org => true,
        Visibility::Team => match (&viewer.team_id, item.team_id) {
            (Some(viewer_team), Some(item_team)) => viewer_team == item_team,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(id: &str, team: Option<&str>) -> Viewer {
        Viewer {
            id: id.to_string(),
            team_id: team.map(|t| t.to_string()),
        }
    }

    #[test]
    fn test_org_visible_to_all() {
        let item = ItemScope {
            owner_id: "owner",
            visibility: Visibility::Org,
            team_id: None,
        };
        assert!(visible(&viewer("someone", None), &item));
        assert!(visible(&viewer("someone", Some("t1")), &item));
    }

    #[test]
    fn test_team_visible_to_same_team_only() {
        let item = ItemScope {
            owner_id: "owner",
            visibility: Visibility::Team,
            team_id: Some("t1"),
        };
        assert!(visible(&viewer("mate", Some("t1")), &item));
        assert!(!visible(&viewer("outsider", Some("t2")), &item));
        assert!(!visible(&viewer("teamless", None), &item));
    }

    #[test]
    fn test_owner_always_sees_own_item() {
        let item = ItemScope {
            owner_id: "owner",
            visibility: Visibility::Team,
            team_id: Some("t1"),
        };
        // Owner moved teams (or has none) but still sees their own item.
        assert!(visible(&viewer("owner", None), &item));
        assert!(visible(&viewer("owner", Some("t2")), &item));
    }
}
