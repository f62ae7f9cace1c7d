//! Integration tests for the Learning Hub backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::search::SearchIndex;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let index_path = temp_dir.path().join("index");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Initialize search index
        let search = Arc::new(SearchIndex::open(&index_path).expect("Failed to init search"));

        // Create config
        let config = Config {
            api_psk: Some("test-api-key".to_string()),
            db_path,
            index_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            allowed_email_domain: "example.org".to_string(),
        };

        let state = AppState {
            repo,
            search,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-api-key", "test-api-key".parse().unwrap());

        TestFixture {
            client: Client::builder().default_headers(headers).build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_as(&self, viewer: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("x-profile-id", viewer)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn put_as(&self, viewer: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .header("x-profile-id", viewer)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_as(&self, viewer: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("x-profile-id", viewer)
            .send()
            .await
            .unwrap()
    }

    async fn delete_as(&self, viewer: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .header("x-profile-id", viewer)
            .send()
            .await
            .unwrap()
    }

    /// Create a team and return its id.
    async fn create_team(&self, name: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/teams"))
            .header("x-profile-id", self.bootstrap_profile().await)
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Create a profile and return its id.
    async fn create_profile(&self, name: &str, team_id: Option<&str>) -> String {
        let mut body = json!({ "fullName": name });
        if let Some(team_id) = team_id {
            body["teamId"] = json!(team_id);
        }
        let resp = self
            .client
            .post(self.url("/api/profiles"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Create a theme and return (id, slug).
    async fn create_theme(&self, viewer: &str, name: &str) -> (String, String) {
        let resp = self
            .post_as(viewer, "/api/themes", json!({ "name": name }))
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        (
            body["data"]["id"].as_str().unwrap().to_string(),
            body["data"]["slug"].as_str().unwrap().to_string(),
        )
    }

    /// A throwaway profile for calls that just need a valid viewer.
    async fn bootstrap_profile(&self) -> String {
        self.create_profile("Bootstrap", None).await
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::new().await;

    // Fresh client without the default x-api-key header
    let client = Client::new();
    let resp = client
        .get(fixture.url("/api/themes"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::new().await;

    let client = Client::new();
    let resp = client
        .get(fixture.url("/api/themes"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_viewer_required_for_scoped_reads() {
    let fixture = TestFixture::new().await;

    // Valid PSK, but no x-profile-id header
    let resp = fixture
        .client
        .get(fixture.url("/api/postcards"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);

    // Unknown profile id is rejected the same way
    let resp = fixture
        .client
        .get(fixture.url("/api/postcards"))
        .header("x-profile-id", "no-such-profile")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_postcard_crud() {
    let fixture = TestFixture::new().await;
    let author = fixture.create_profile("Postcard Author", None).await;

    // Create
    let create_resp = fixture
        .post_as(
            &author,
            "/api/postcards",
            json!({
                "trainingTitle": "Trauma Informed Practice",
                "elevatorPitch": "Working relationally with care-experienced young people",
                "goldenNugget": "Connection before correction"
            }),
        )
        .await;
    assert_eq!(create_resp.status(), 200);
    let create_body: Value = create_resp.json().await.unwrap();
    assert_eq!(create_body["success"], true);
    let postcard_id = create_body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(create_body["data"]["trainingTitle"], "Trauma Informed Practice");
    assert_eq!(create_body["data"]["visibility"], "org");
    assert_eq!(create_body["data"]["authorId"], author);

    // Get (annotated)
    let get_resp = fixture
        .get_as(&author, &format!("/api/postcards/{}", postcard_id))
        .await;
    assert_eq!(get_resp.status(), 200);
    let get_body: Value = get_resp.json().await.unwrap();
    assert_eq!(get_body["data"]["trainingTitle"], "Trauma Informed Practice");
    assert_eq!(get_body["data"]["authorName"], "Postcard Author");
    assert!(get_body["data"]["themes"].as_array().unwrap().is_empty());

    // Update
    let update_resp = fixture
        .put_as(
            &author,
            &format!("/api/postcards/{}", postcard_id),
            json!({ "trainingTitle": "Trauma Informed Practice (Day 2)" }),
        )
        .await;
    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(
        update_body["data"]["trainingTitle"],
        "Trauma Informed Practice (Day 2)"
    );
    // Untouched section survives the partial update
    assert_eq!(update_body["data"]["goldenNugget"], "Connection before correction");

    // List
    let list_resp = fixture.get_as(&author, "/api/postcards").await;
    assert_eq!(list_resp.status(), 200);
    let list_body: Value = list_resp.json().await.unwrap();
    assert_eq!(list_body["data"].as_array().unwrap().len(), 1);

    // Delete
    let delete_resp = fixture
        .delete_as(&author, &format!("/api/postcards/{}", postcard_id))
        .await;
    assert_eq!(delete_resp.status(), 200);

    // Verify deleted
    let get_deleted = fixture
        .get_as(&author, &format!("/api/postcards/{}", postcard_id))
        .await;
    assert_eq!(get_deleted.status(), 404);
}

#[tokio::test]
async fn test_visibility_invariant() {
    let fixture = TestFixture::new().await;
    let team_id = fixture.create_team("Attainment").await;
    let author = fixture
        .create_profile("Invariant Author", Some(&team_id))
        .await;

    // Org visibility forces a null team even when one is submitted
    let org_resp = fixture
        .post_as(
            &author,
            "/api/postcards",
            json!({
                "trainingTitle": "Org Scoped",
                "visibility": "org",
                "teamId": team_id
            }),
        )
        .await;
    assert_eq!(org_resp.status(), 200);
    let org_body: Value = org_resp.json().await.unwrap();
    assert_eq!(org_body["data"]["visibility"], "org");
    assert!(org_body["data"]["teamId"].is_null());
    let postcard_id = org_body["data"]["id"].as_str().unwrap().to_string();

    // Team visibility stores the team
    let team_resp = fixture
        .put_as(
            &author,
            &format!("/api/postcards/{}", postcard_id),
            json!({ "visibility": "team", "teamId": team_id }),
        )
        .await;
    assert_eq!(team_resp.status(), 200);
    let team_body: Value = team_resp.json().await.unwrap();
    assert_eq!(team_body["data"]["visibility"], "team");
    assert_eq!(team_body["data"]["teamId"], team_id.as_str());

    // Switching back to org clears the team again
    let back_resp = fixture
        .put_as(
            &author,
            &format!("/api/postcards/{}", postcard_id),
            json!({ "visibility": "org" }),
        )
        .await;
    assert_eq!(back_resp.status(), 200);
    let back_body: Value = back_resp.json().await.unwrap();
    assert!(back_body["data"]["teamId"].is_null());

    // Team visibility without a team is rejected
    let invalid_resp = fixture
        .post_as(
            &author,
            "/api/postcards",
            json!({ "trainingTitle": "No Team", "visibility": "team" }),
        )
        .await;
    assert_eq!(invalid_resp.status(), 400);
    let invalid_body: Value = invalid_resp.json().await.unwrap();
    assert_eq!(invalid_body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_owner_only_mutation() {
    let fixture = TestFixture::new().await;
    let owner = fixture.create_profile("Owner", None).await;
    let intruder = fixture.create_profile("Intruder", None).await;

    let create_resp = fixture
        .post_as(
            &owner,
            "/api/postcards",
            json!({ "trainingTitle": "Original Title" }),
        )
        .await;
    let create_body: Value = create_resp.json().await.unwrap();
    let postcard_id = create_body["data"]["id"].as_str().unwrap().to_string();

    // Non-owner update is forbidden
    let update_resp = fixture
        .put_as(
            &intruder,
            &format!("/api/postcards/{}", postcard_id),
            json!({ "trainingTitle": "Hijacked" }),
        )
        .await;
    assert_eq!(update_resp.status(), 403);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["error"]["code"], "FORBIDDEN");

    // Non-owner delete is forbidden
    let delete_resp = fixture
        .delete_as(&intruder, &format!("/api/postcards/{}", postcard_id))
        .await;
    assert_eq!(delete_resp.status(), 403);

    // The stored item is unchanged
    let get_resp = fixture
        .get_as(&owner, &format!("/api/postcards/{}", postcard_id))
        .await;
    let get_body: Value = get_resp.json().await.unwrap();
    assert_eq!(get_body["data"]["trainingTitle"], "Original Title");
}

#[tokio::test]
async fn test_theme_idempotence_and_slug() {
    let fixture = TestFixture::new().await;
    let viewer = fixture.create_profile("Theme Creator", None).await;

    let (first_id, _) = fixture.create_theme(&viewer, "Trauma").await;
    // Same name, different casing: returns the existing theme
    let (second_id, _) = fixture.create_theme(&viewer, "trauma").await;
    assert_eq!(first_id, second_id);

    // Slug derivation strips punctuation and joins words with hyphens
    let (_, slug) = fixture.create_theme(&viewer, "Care & Support").await;
    assert_eq!(slug, "care-support");

    // Exactly one Trauma row exists
    let list_resp = fixture.get_as(&viewer, "/api/themes").await;
    let list_body: Value = list_resp.json().await.unwrap();
    let trauma_count = list_body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|theme| theme["name"].as_str().unwrap().eq_ignore_ascii_case("trauma"))
        .count();
    assert_eq!(trauma_count, 1);
}

#[tokio::test]
async fn test_or_filter_semantics() {
    let fixture = TestFixture::new().await;
    let author = fixture.create_profile("Filter Author", None).await;
    let (theme_a, slug_a) = fixture.create_theme(&author, "Wellbeing").await;
    let (theme_b, slug_b) = fixture.create_theme(&author, "Attainment").await;

    for (title, theme_ids) in [
        ("Tagged A", vec![theme_a.clone()]),
        ("Tagged B", vec![theme_b.clone()]),
        ("Tagged A and B", vec![theme_a.clone(), theme_b.clone()]),
        ("Untagged", vec![]),
    ] {
        let resp = fixture
            .post_as(
                &author,
                "/api/postcards",
                json!({ "trainingTitle": title, "themeIds": theme_ids }),
            )
            .await;
        assert_eq!(resp.status(), 200);
    }

    let titles = |body: &Value| -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["trainingTitle"].as_str().unwrap().to_string())
            .collect()
    };

    // Filter by A: items tagged {A} and {A,B}
    let resp = fixture
        .get_as(&author, &format!("/api/postcards?themes={}", slug_a))
        .await;
    let body: Value = resp.json().await.unwrap();
    let found = titles(&body);
    assert_eq!(found.len(), 2);
    assert!(found.contains(&"Tagged A".to_string()));
    assert!(found.contains(&"Tagged A and B".to_string()));

    // Filter by A,B: OR semantics, not AND; three items match
    let resp = fixture
        .get_as(
            &author,
            &format!("/api/postcards?themes={},{}", slug_a, slug_b),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    let found = titles(&body);
    assert_eq!(found.len(), 3);
    assert!(!found.contains(&"Untagged".to_string()));

    // No filter: everything visible
    let resp = fixture.get_as(&author, "/api/postcards").await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(titles(&body).len(), 4);

    // Empty filter value behaves like no filter
    let resp = fixture.get_as(&author, "/api/postcards?themes=").await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(titles(&body).len(), 4);
}

#[tokio::test]
async fn test_association_replace_not_merge() {
    let fixture = TestFixture::new().await;
    let author = fixture.create_profile("Tagger", None).await;
    let (theme_a, _) = fixture.create_theme(&author, "Nurture").await;
    let (theme_b, _) = fixture.create_theme(&author, "Mentoring").await;
    let (theme_c, _) = fixture.create_theme(&author, "Transitions").await;

    let create_resp = fixture
        .post_as(
            &author,
            "/api/postcards",
            json!({ "trainingTitle": "Retagged", "themeIds": [theme_a, theme_b] }),
        )
        .await;
    let create_body: Value = create_resp.json().await.unwrap();
    let postcard_id = create_body["data"]["id"].as_str().unwrap().to_string();

    // Update with {B, C}: the set is replaced, never merged
    let update_resp = fixture
        .put_as(
            &author,
            &format!("/api/postcards/{}", postcard_id),
            json!({ "themeIds": [theme_b, theme_c] }),
        )
        .await;
    assert_eq!(update_resp.status(), 200);

    let get_resp = fixture
        .get_as(&author, &format!("/api/postcards/{}", postcard_id))
        .await;
    let get_body: Value = get_resp.json().await.unwrap();
    let theme_names: Vec<&str> = get_body["data"]["themes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|theme| theme["name"].as_str().unwrap())
        .collect();
    assert_eq!(theme_names, vec!["Mentoring", "Transitions"]);
}

#[tokio::test]
async fn test_team_scoping_end_to_end() {
    let fixture = TestFixture::new().await;
    let team_1 = fixture.create_team("Glasgow").await;
    let team_2 = fixture.create_team("Edinburgh").await;

    let owner = fixture.create_profile("Team Owner", Some(&team_1)).await;
    let teammate = fixture.create_profile("Teammate", Some(&team_1)).await;
    let outsider = fixture.create_profile("Outsider", Some(&team_2)).await;
    let teamless = fixture.create_profile("Teamless", None).await;

    let (theme_id, theme_slug) = fixture.create_theme(&owner, "wellbeing").await;

    let create_resp = fixture
        .post_as(
            &owner,
            "/api/postcards",
            json!({
                "trainingTitle": "Team Only Learning",
                "visibility": "team",
                "teamId": team_1,
                "themeIds": [theme_id]
            }),
        )
        .await;
    assert_eq!(create_resp.status(), 200);
    let create_body: Value = create_resp.json().await.unwrap();
    let postcard_id = create_body["data"]["id"].as_str().unwrap().to_string();

    let count_filtered = |body: Value| -> usize { body["data"].as_array().unwrap().len() };

    // Same-team viewer sees it in the filtered list
    let resp = fixture
        .get_as(&teammate, &format!("/api/postcards?themes={}", theme_slug))
        .await;
    assert_eq!(count_filtered(resp.json().await.unwrap()), 1);

    // Other-team viewer does not
    let resp = fixture
        .get_as(&outsider, &format!("/api/postcards?themes={}", theme_slug))
        .await;
    assert_eq!(count_filtered(resp.json().await.unwrap()), 0);

    // Teamless viewer does not
    let resp = fixture
        .get_as(&teamless, &format!("/api/postcards?themes={}", theme_slug))
        .await;
    assert_eq!(count_filtered(resp.json().await.unwrap()), 0);

    // The owner always sees their own item
    let resp = fixture
        .get_as(&owner, &format!("/api/postcards?themes={}", theme_slug))
        .await;
    assert_eq!(count_filtered(resp.json().await.unwrap()), 1);

    // Direct fetch enforces the same policy: missing and invisible are
    // indistinguishable
    let resp = fixture
        .get_as(&outsider, &format!("/api/postcards/{}", postcard_id))
        .await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let resp = fixture
        .get_as(&teammate, &format!("/api/postcards/{}", postcard_id))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["teamName"], "Glasgow");
}

#[tokio::test]
async fn test_deletion_cascade_scope() {
    let fixture = TestFixture::new().await;
    let author = fixture.create_profile("Deleter", None).await;
    let (theme_id, theme_slug) = fixture.create_theme(&author, "Leadership").await;

    let create_resp = fixture
        .post_as(
            &author,
            "/api/postcards",
            json!({ "trainingTitle": "Short Lived", "themeIds": [theme_id] }),
        )
        .await;
    let create_body: Value = create_resp.json().await.unwrap();
    let postcard_id = create_body["data"]["id"].as_str().unwrap().to_string();

    let delete_resp = fixture
        .delete_as(&author, &format!("/api/postcards/{}", postcard_id))
        .await;
    assert_eq!(delete_resp.status(), 200);

    // The association is gone with the item, but the theme survives
    let themes_resp = fixture.get_as(&author, "/api/themes").await;
    let themes_body: Value = themes_resp.json().await.unwrap();
    let surviving = themes_body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|theme| theme["slug"] == theme_slug.as_str());
    assert!(surviving);

    // And no postcard matches the filter anymore
    let list_resp = fixture
        .get_as(&author, &format!("/api/postcards?themes={}", theme_slug))
        .await;
    let list_body: Value = list_resp.json().await.unwrap();
    assert!(list_body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_three_two_one_crud() {
    let fixture = TestFixture::new().await;
    let author = fixture.create_profile("Reflector", None).await;

    // Learnings are required
    let invalid_resp = fixture
        .post_as(
            &author,
            "/api/three-two-one",
            json!({ "trainingTitle": "Missing Learnings", "learnings": [] }),
        )
        .await;
    assert_eq!(invalid_resp.status(), 400);

    let create_resp = fixture
        .post_as(
            &author,
            "/api/three-two-one",
            json!({
                "trainingTitle": "Attachment Training",
                "learnings": ["Secure base", "Rupture and repair", "Window of tolerance"],
                "changes": ["Morning check-ins", "Quiet corner"],
                "question": "How do we measure belonging?"
            }),
        )
        .await;
    assert_eq!(create_resp.status(), 200);
    let create_body: Value = create_resp.json().await.unwrap();
    let entry_id = create_body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(create_body["data"]["learnings"].as_array().unwrap().len(), 3);
    assert_eq!(create_body["data"]["changes"].as_array().unwrap().len(), 2);

    // Update replaces the submitted lists wholesale
    let update_resp = fixture
        .put_as(
            &author,
            &format!("/api/three-two-one/{}", entry_id),
            json!({ "changes": ["Morning check-ins only"] }),
        )
        .await;
    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["data"]["changes"].as_array().unwrap().len(), 1);
    assert_eq!(update_body["data"]["learnings"].as_array().unwrap().len(), 3);

    // Get and delete
    let get_resp = fixture
        .get_as(&author, &format!("/api/three-two-one/{}", entry_id))
        .await;
    assert_eq!(get_resp.status(), 200);

    let delete_resp = fixture
        .delete_as(&author, &format!("/api/three-two-one/{}", entry_id))
        .await;
    assert_eq!(delete_resp.status(), 200);

    let get_deleted = fixture
        .get_as(&author, &format!("/api/three-two-one/{}", entry_id))
        .await;
    assert_eq!(get_deleted.status(), 404);
}

#[tokio::test]
async fn test_takeover_crud() {
    let fixture = TestFixture::new().await;
    let presenter = fixture.create_profile("Presenter", None).await;

    let create_resp = fixture
        .post_as(
            &presenter,
            "/api/takeovers",
            json!({
                "meetingDate": "2025-11-03",
                "topLearnings": ["Keep it to ten minutes", "One story beats five slides"]
            }),
        )
        .await;
    assert_eq!(create_resp.status(), 200);
    let create_body: Value = create_resp.json().await.unwrap();
    let takeover_id = create_body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(create_body["data"]["presenterId"], presenter);
    assert_eq!(create_body["data"]["meetingDate"], "2025-11-03");

    // Missing meeting date is rejected
    let invalid_resp = fixture
        .post_as(&presenter, "/api/takeovers", json!({ "meetingDate": "  " }))
        .await;
    assert_eq!(invalid_resp.status(), 400);

    let update_resp = fixture
        .put_as(
            &presenter,
            &format!("/api/takeovers/{}", takeover_id),
            json!({ "meetingDate": "2025-11-10" }),
        )
        .await;
    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["data"]["meetingDate"], "2025-11-10");

    let delete_resp = fixture
        .delete_as(&presenter, &format!("/api/takeovers/{}", takeover_id))
        .await;
    assert_eq!(delete_resp.status(), 200);
}

#[tokio::test]
async fn test_search_endpoint() {
    let fixture = TestFixture::new().await;
    let author = fixture.create_profile("Search Author", None).await;
    let (theme_id, _) = fixture.create_theme(&author, "Safeguarding").await;

    fixture
        .post_as(
            &author,
            "/api/postcards",
            json!({
                "trainingTitle": "Safeguarding Refresher",
                "elevatorPitch": "Annual safeguarding essentials",
                "themeIds": [theme_id]
            }),
        )
        .await;

    fixture
        .post_as(
            &author,
            "/api/three-two-one",
            json!({
                "trainingTitle": "Coaching Conversations",
                "learnings": ["Ask, don't tell"]
            }),
        )
        .await;

    // Wait for search index commits to become visible
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let resp = fixture
        .get_as(&author, "/api/search?q=safeguarding&limit=10")
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    let results = body["data"]["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["type"], "postcard");
    assert!(results[0]["title"].as_str().unwrap().contains("Safeguarding"));
    assert!(results[0]["score"].as_f64().unwrap() > 0.0);

    let resp = fixture
        .get_as(&author, "/api/search?q=coaching&limit=10")
        .await;
    let body: Value = resp.json().await.unwrap();
    let results = body["data"]["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["type"], "three_two_one");

    // Theme-only search returns the tagged item
    let resp = fixture
        .get_as(
            &author,
            &format!("/api/search?themes={}", theme_id),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["title"], "Safeguarding Refresher");
}

#[tokio::test]
async fn test_search_respects_visibility() {
    let fixture = TestFixture::new().await;
    let team_id = fixture.create_team("Research").await;
    let owner = fixture.create_profile("Insider", Some(&team_id)).await;
    let outsider = fixture.create_profile("Searcher", None).await;

    fixture
        .post_as(
            &owner,
            "/api/postcards",
            json!({
                "trainingTitle": "Confidential Pilot Findings",
                "visibility": "team",
                "teamId": team_id
            }),
        )
        .await;

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    // The owner finds their team-scoped item
    let resp = fixture.get_as(&owner, "/api/search?q=confidential").await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);

    // A viewer outside the team does not
    let resp = fixture.get_as(&outsider, "/api/search?q=confidential").await;
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;
    let author = fixture.create_profile("Validator", None).await;

    // Empty training title
    let resp = fixture
        .post_as(&author, "/api/postcards", json!({ "trainingTitle": "  " }))
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Empty theme name
    let resp = fixture
        .post_as(&author, "/api/themes", json!({ "name": "" }))
        .await;
    assert_eq!(resp.status(), 400);

    // Unknown theme id on create
    let resp = fixture
        .post_as(
            &author,
            "/api/postcards",
            json!({ "trainingTitle": "Bad Tag", "themeIds": ["no-such-theme"] }),
        )
        .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_validate_email_endpoint() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/validate-email"))
        .json(&json!({ "email": "staff@example.org" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["allowed"], true);
    assert_eq!(body["data"]["domain"], "example.org");

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/validate-email"))
        .json(&json!({ "email": "visitor@elsewhere.com" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["allowed"], false);
}

#[tokio::test]
async fn test_profile_update_permissions() {
    let fixture = TestFixture::new().await;
    let user = fixture.create_profile("Plain User", None).await;
    let other = fixture.create_profile("Someone Else", None).await;

    // Self-update works
    let resp = fixture
        .put_as(
            &user,
            &format!("/api/profiles/{}", user),
            json!({ "fullName": "Renamed User" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["fullName"], "Renamed User");

    // Updating someone else's profile is forbidden for non-admins
    let resp = fixture
        .put_as(
            &user,
            &format!("/api/profiles/{}", other),
            json!({ "fullName": "Hijacked" }),
        )
        .await;
    assert_eq!(resp.status(), 403);

    // Admins may update anyone
    let admin_resp = fixture
        .client
        .post(fixture.url("/api/profiles"))
        .json(&json!({ "fullName": "The Admin", "role": "admin" }))
        .send()
        .await
        .unwrap();
    let admin_body: Value = admin_resp.json().await.unwrap();
    let admin = admin_body["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .put_as(
            &admin,
            &format!("/api/profiles/{}", other),
            json!({ "fullName": "Renamed By Admin" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
}
