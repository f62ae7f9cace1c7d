//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. All
//! scoping rules (visibility/team invariant, owner-only mutation) are
//! enforced here rather than at call sites.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;

use crate::errors::AppError;
use crate::models::{
    slugify, ContentKind, CreatePostcardRequest, CreateProfileRequest, CreateTakeoverRequest,
    CreateTeamRequest, CreateThreeTwoOneRequest, Postcard, PostcardListItem, Profile, Role,
    Takeover, TakeoverListItem, Team, Theme, ThreeTwoOne, ThreeTwoOneListItem,
    UpdatePostcardRequest, UpdateProfileRequest, UpdateTakeoverRequest, UpdateThreeTwoOneRequest,
    Visibility,
};
use crate::policy::{self, ItemScope, Viewer};

/// Hydrated data for a single search hit, before visibility and theme
/// filtering.
#[derive(Debug, Clone)]
pub struct SearchHitData {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub preview: Option<String>,
    pub owner_id: String,
    pub visibility: Visibility,
    pub team_id: Option<String>,
    pub created_at: String,
    pub themes: Vec<Theme>,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== TEAM OPERATIONS ====================

    /// List all teams.
    pub async fn list_teams(&self) -> Result<Vec<Team>, AppError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM teams ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(team_from_row).collect())
    }

    /// Get a team by ID.
    pub async fn get_team(&self, id: &str) -> Result<Option<Team>, AppError> {
        let row = sqlx::query("SELECT id, name, created_at FROM teams WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(team_from_row))
    }

    /// Create a new team.
    pub async fn create_team(&self, request: &CreateTeamRequest) -> Result<Team, AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Team name is required".to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO teams (id, name, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(&now)
            .execute(&self.pool)
            .await?;

        Ok(Team {
            id,
            name: name.to_string(),
            created_at: now,
        })
    }

    // ==================== PROFILE OPERATIONS ====================

    /// List all profiles.
    pub async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let rows = sqlx::query(
            "SELECT id, full_name, role, team_id, created_at FROM profiles ORDER BY full_name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(profile_from_row).collect())
    }

    /// Get a profile by ID.
    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError> {
        let row =
            sqlx::query("SELECT id, full_name, role, team_id, created_at FROM profiles WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    /// Create a new profile. The id comes from the identity provider when
    /// present so it matches the authenticated subject.
    pub async fn create_profile(
        &self,
        request: &CreateProfileRequest,
    ) -> Result<Profile, AppError> {
        if let Some(team_id) = &request.team_id {
            if self.get_team(team_id).await?.is_none() {
                return Err(AppError::Validation(format!("Unknown team {}", team_id)));
            }
        }

        let id = request
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let role = request.role.unwrap_or_default();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO profiles (id, full_name, role, team_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.full_name)
        .bind(role.as_str())
        .bind(&request.team_id)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Profile {
                id,
                full_name: request.full_name.clone(),
                role,
                team_id: request.team_id.clone(),
                created_at: now,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Validation(format!("Profile {} already exists", id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Update a profile.
    pub async fn update_profile(
        &self,
        id: &str,
        request: &UpdateProfileRequest,
    ) -> Result<Profile, AppError> {
        let existing = self
            .get_profile(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", id)))?;

        if let Some(team_id) = &request.team_id {
            if self.get_team(team_id).await?.is_none() {
                return Err(AppError::Validation(format!("Unknown team {}", team_id)));
            }
        }

        let full_name = request.full_name.clone().or(existing.full_name);
        let role = request.role.unwrap_or(existing.role);
        let team_id = request.team_id.clone().or(existing.team_id);

        sqlx::query("UPDATE profiles SET full_name = ?, role = ?, team_id = ? WHERE id = ?")
            .bind(&full_name)
            .bind(role.as_str())
            .bind(&team_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Profile {
            id: id.to_string(),
            full_name,
            role,
            team_id,
            created_at: existing.created_at,
        })
    }

    // ==================== THEME OPERATIONS ====================

    /// List all themes, ordered by name.
    pub async fn list_themes(&self) -> Result<Vec<Theme>, AppError> {
        let rows = sqlx::query("SELECT id, name, slug, created_at FROM themes ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(theme_from_row).collect())
    }

    /// Look up a theme by case-insensitive name.
    pub async fn get_theme_by_name(&self, name: &str) -> Result<Option<Theme>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, slug, created_at FROM themes WHERE lower(name) = lower(?)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(theme_from_row))
    }

    /// Find a theme by name or create it with a derived slug.
    ///
    /// Idempotent by case-insensitive name. A concurrent create of the same
    /// name loses the race against the unique index on `lower(name)` and
    /// resolves to the existing row.
    pub async fn find_or_create_theme(&self, name: &str) -> Result<Theme, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Theme name is required".to_string()));
        }

        if let Some(existing) = self.get_theme_by_name(name).await? {
            return Ok(existing);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let slug = slugify(name);
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query("INSERT INTO themes (id, name, slug, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(&slug)
            .bind(&now)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(Theme {
                id,
                name: name.to_string(),
                slug,
                created_at: now,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => self
                .get_theme_by_name(name)
                .await?
                .ok_or_else(|| AppError::Internal("Theme vanished after conflict".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Themes attached to a postcard, ordered by name.
    pub async fn themes_for_postcard(&self, postcard_id: &str) -> Result<Vec<Theme>, AppError> {
        self.themes_for("postcard_themes", "postcard_id", postcard_id)
            .await
    }

    /// Themes attached to a 3-2-1 entry, ordered by name.
    pub async fn themes_for_three_two_one(&self, entry_id: &str) -> Result<Vec<Theme>, AppError> {
        self.themes_for("three_two_one_themes", "entry_id", entry_id)
            .await
    }

    /// Themes attached to a takeover, ordered by name.
    pub async fn themes_for_takeover(&self, takeover_id: &str) -> Result<Vec<Theme>, AppError> {
        self.themes_for("takeover_themes", "takeover_id", takeover_id)
            .await
    }

    async fn themes_for(
        &self,
        join_table: &str,
        id_column: &str,
        content_id: &str,
    ) -> Result<Vec<Theme>, AppError> {
        let sql = format!(
            "SELECT t.id, t.name, t.slug, t.created_at FROM {} j \
             JOIN themes t ON t.id = j.theme_id WHERE j.{} = ? ORDER BY t.name",
            join_table, id_column
        );
        let rows = sqlx::query(&sql).bind(content_id).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(theme_from_row).collect())
    }

    /// Replace the full association set for one content item. Runs inside
    /// the caller's transaction so readers never observe a half-replaced
    /// set.
    async fn replace_themes(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        join_table: &str,
        id_column: &str,
        content_id: &str,
        theme_ids: &[String],
    ) -> Result<(), AppError> {
        let delete_sql = format!("DELETE FROM {} WHERE {} = ?", join_table, id_column);
        sqlx::query(&delete_sql)
            .bind(content_id)
            .execute(&mut **tx)
            .await?;

        let insert_sql = format!(
            "INSERT INTO {} ({}, theme_id) VALUES (?, ?)",
            join_table, id_column
        );
        let mut seen = BTreeSet::new();
        for theme_id in theme_ids {
            if !seen.insert(theme_id.as_str()) {
                continue;
            }
            let result = sqlx::query(&insert_sql)
                .bind(content_id)
                .bind(theme_id)
                .execute(&mut **tx)
                .await;
            match result {
                Ok(_) => {}
                Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                    return Err(AppError::Validation(format!("Unknown theme {}", theme_id)));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Resolve the visibility/team invariant: org forces a null team,
    /// team requires an existing one.
    async fn validate_scope(
        &self,
        visibility: Visibility,
        team_id: Option<String>,
    ) -> Result<Option<String>, AppError> {
        match visibility {
            Visibility::Org => Ok(None),
            Visibility::Team => {
                let team_id = team_id.ok_or_else(|| {
                    AppError::Validation("A team is required for team visibility".to_string())
                })?;
                if self.get_team(&team_id).await?.is_none() {
                    return Err(AppError::Validation(format!("Unknown team {}", team_id)));
                }
                Ok(Some(team_id))
            }
        }
    }

    // ==================== POSTCARD OPERATIONS ====================

    /// Create a new postcard with its theme associations.
    pub async fn create_postcard(
        &self,
        author_id: &str,
        request: &CreatePostcardRequest,
    ) -> Result<Postcard, AppError> {
        let title = request.training_title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Training title is required".to_string()));
        }
        let team_id = self
            .validate_scope(request.visibility, request.team_id.clone())
            .await?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO postcards (
                id, author_id, training_title, elevator_pitch, lightbulb_moment,
                programme_impact, golden_nugget, visibility, team_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(author_id)
        .bind(title)
        .bind(&request.elevator_pitch)
        .bind(&request.lightbulb_moment)
        .bind(&request.programme_impact)
        .bind(&request.golden_nugget)
        .bind(request.visibility.as_str())
        .bind(&team_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        Self::replace_themes(&mut tx, "postcard_themes", "postcard_id", &id, &request.theme_ids)
            .await?;
        tx.commit().await?;

        Ok(Postcard {
            id,
            author_id: author_id.to_string(),
            training_title: title.to_string(),
            elevator_pitch: request.elevator_pitch.clone(),
            lightbulb_moment: request.lightbulb_moment.clone(),
            programme_impact: request.programme_impact.clone(),
            golden_nugget: request.golden_nugget.clone(),
            visibility: request.visibility,
            team_id,
            created_at: now,
        })
    }

    /// Get a postcard by ID, annotated, if it is visible to the viewer.
    ///
    /// Missing and invisible are indistinguishable by design.
    pub async fn get_postcard(
        &self,
        id: &str,
        viewer: &Viewer,
    ) -> Result<Option<PostcardListItem>, AppError> {
        let sql = format!("{} WHERE p.id = ?", POSTCARD_LIST_SELECT);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let item = postcard_list_item_from_row(&row);
        let scope = ItemScope {
            owner_id: &item.postcard.author_id,
            visibility: item.postcard.visibility,
            team_id: item.postcard.team_id.as_deref(),
        };
        if !policy::visible(viewer, &scope) {
            return Ok(None);
        }
        Ok(Some(item))
    }

    /// Update a postcard. Only the author may do this; a submitted theme
    /// set replaces the stored one in full.
    pub async fn update_postcard(
        &self,
        id: &str,
        viewer_id: &str,
        request: &UpdatePostcardRequest,
    ) -> Result<Postcard, AppError> {
        let existing = self
            .get_postcard_row(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Postcard {} not found", id)))?;
        if existing.author_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the author can modify this postcard".to_string(),
            ));
        }

        let training_title = match &request.training_title {
            Some(title) if title.trim().is_empty() => {
                return Err(AppError::Validation("Training title is required".to_string()))
            }
            Some(title) => title.trim().to_string(),
            None => existing.training_title.clone(),
        };
        let visibility = request.visibility.unwrap_or(existing.visibility);
        let team_id = self
            .validate_scope(visibility, request.team_id.clone().or(existing.team_id.clone()))
            .await?;

        let elevator_pitch = request.elevator_pitch.clone().or(existing.elevator_pitch);
        let lightbulb_moment = request.lightbulb_moment.clone().or(existing.lightbulb_moment);
        let programme_impact = request.programme_impact.clone().or(existing.programme_impact);
        let golden_nugget = request.golden_nugget.clone().or(existing.golden_nugget);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"UPDATE postcards SET
                training_title = ?, elevator_pitch = ?, lightbulb_moment = ?,
                programme_impact = ?, golden_nugget = ?, visibility = ?, team_id = ?
            WHERE id = ?"#,
        )
        .bind(&training_title)
        .bind(&elevator_pitch)
        .bind(&lightbulb_moment)
        .bind(&programme_impact)
        .bind(&golden_nugget)
        .bind(visibility.as_str())
        .bind(&team_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(theme_ids) = &request.theme_ids {
            Self::replace_themes(&mut tx, "postcard_themes", "postcard_id", id, theme_ids).await?;
        }
        tx.commit().await?;

        Ok(Postcard {
            id: id.to_string(),
            author_id: existing.author_id,
            training_title,
            elevator_pitch,
            lightbulb_moment,
            programme_impact,
            golden_nugget,
            visibility,
            team_id,
            created_at: existing.created_at,
        })
    }

    /// Delete a postcard. Only the author may do this. Association rows
    /// cascade; themes stay.
    pub async fn delete_postcard(&self, id: &str, viewer_id: &str) -> Result<(), AppError> {
        let existing = self
            .get_postcard_row(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Postcard {} not found", id)))?;
        if existing.author_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the author can delete this postcard".to_string(),
            ));
        }

        sqlx::query("DELETE FROM postcards WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// List postcards visible to the viewer, newest first, annotated with
    /// author name, team name and the full theme list.
    ///
    /// A non-empty slug set keeps items tagged with at least one of the
    /// given slugs (OR semantics). The filter runs in the same query that
    /// orders, so any future limit applies after it.
    pub async fn list_postcards_by_themes(
        &self,
        viewer: &Viewer,
        theme_slugs: Option<&[String]>,
    ) -> Result<Vec<PostcardListItem>, AppError> {
        let rows = self
            .list_content_rows(
                POSTCARD_LIST_SELECT,
                "postcard_themes",
                "postcard_id",
                viewer,
                theme_slugs,
            )
            .await?;

        Ok(rows.iter().map(postcard_list_item_from_row).collect())
    }

    async fn get_postcard_row(&self, id: &str) -> Result<Option<Postcard>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, author_id, training_title, elevator_pitch, lightbulb_moment,
                      programme_impact, golden_nugget, visibility, team_id, created_at
               FROM postcards WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(postcard_from_row))
    }

    // ==================== 3-2-1 OPERATIONS ====================

    /// Create a new 3-2-1 entry with its theme associations.
    pub async fn create_three_two_one(
        &self,
        author_id: &str,
        request: &CreateThreeTwoOneRequest,
    ) -> Result<ThreeTwoOne, AppError> {
        let title = request.training_title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Training title is required".to_string()));
        }
        let learnings = non_empty_items(&request.learnings);
        if learnings.is_empty() {
            return Err(AppError::Validation(
                "At least one learning is required".to_string(),
            ));
        }
        let changes = non_empty_items(&request.changes);
        let team_id = self
            .validate_scope(request.visibility, request.team_id.clone())
            .await?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let learnings_json = serde_json::to_string(&learnings)?;
        let changes_json = serde_json::to_string(&changes)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO three_two_one (
                id, author_id, training_title, learnings, changes, question,
                visibility, team_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(author_id)
        .bind(title)
        .bind(&learnings_json)
        .bind(&changes_json)
        .bind(&request.question)
        .bind(request.visibility.as_str())
        .bind(&team_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        Self::replace_themes(
            &mut tx,
            "three_two_one_themes",
            "entry_id",
            &id,
            &request.theme_ids,
        )
        .await?;
        tx.commit().await?;

        Ok(ThreeTwoOne {
            id,
            author_id: author_id.to_string(),
            training_title: title.to_string(),
            learnings,
            changes,
            question: request.question.clone(),
            visibility: request.visibility,
            team_id,
            created_at: now,
        })
    }

    /// Get a 3-2-1 entry by ID, annotated, if it is visible to the viewer.
    pub async fn get_three_two_one(
        &self,
        id: &str,
        viewer: &Viewer,
    ) -> Result<Option<ThreeTwoOneListItem>, AppError> {
        let sql = format!("{} WHERE e.id = ?", THREE_TWO_ONE_LIST_SELECT);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let item = three_two_one_list_item_from_row(&row);
        let scope = ItemScope {
            owner_id: &item.entry.author_id,
            visibility: item.entry.visibility,
            team_id: item.entry.team_id.as_deref(),
        };
        if !policy::visible(viewer, &scope) {
            return Ok(None);
        }
        Ok(Some(item))
    }

    /// Update a 3-2-1 entry. Only the author may do this.
    pub async fn update_three_two_one(
        &self,
        id: &str,
        viewer_id: &str,
        request: &UpdateThreeTwoOneRequest,
    ) -> Result<ThreeTwoOne, AppError> {
        let existing = self
            .get_three_two_one_row(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("3-2-1 entry {} not found", id)))?;
        if existing.author_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the author can modify this entry".to_string(),
            ));
        }

        let training_title = match &request.training_title {
            Some(title) if title.trim().is_empty() => {
                return Err(AppError::Validation("Training title is required".to_string()))
            }
            Some(title) => title.trim().to_string(),
            None => existing.training_title.clone(),
        };
        let learnings = match &request.learnings {
            Some(learnings) => {
                let learnings = non_empty_items(learnings);
                if learnings.is_empty() {
                    return Err(AppError::Validation(
                        "At least one learning is required".to_string(),
                    ));
                }
                learnings
            }
            None => existing.learnings.clone(),
        };
        let changes = match &request.changes {
            Some(changes) => non_empty_items(changes),
            None => existing.changes.clone(),
        };
        let question = request.question.clone().or(existing.question);
        let visibility = request.visibility.unwrap_or(existing.visibility);
        let team_id = self
            .validate_scope(visibility, request.team_id.clone().or(existing.team_id.clone()))
            .await?;

        let learnings_json = serde_json::to_string(&learnings)?;
        let changes_json = serde_json::to_string(&changes)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"UPDATE three_two_one SET
                training_title = ?, learnings = ?, changes = ?, question = ?,
                visibility = ?, team_id = ?
            WHERE id = ?"#,
        )
        .bind(&training_title)
        .bind(&learnings_json)
        .bind(&changes_json)
        .bind(&question)
        .bind(visibility.as_str())
        .bind(&team_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(theme_ids) = &request.theme_ids {
            Self::replace_themes(&mut tx, "three_two_one_themes", "entry_id", id, theme_ids)
                .await?;
        }
        tx.commit().await?;

        Ok(ThreeTwoOne {
            id: id.to_string(),
            author_id: existing.author_id,
            training_title,
            learnings,
            changes,
            question,
            visibility,
            team_id,
            created_at: existing.created_at,
        })
    }

    /// Delete a 3-2-1 entry. Only the author may do this.
    pub async fn delete_three_two_one(&self, id: &str, viewer_id: &str) -> Result<(), AppError> {
        let existing = self
            .get_three_two_one_row(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("3-2-1 entry {} not found", id)))?;
        if existing.author_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the author can delete this entry".to_string(),
            ));
        }

        sqlx::query("DELETE FROM three_two_one WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// List 3-2-1 entries visible to the viewer, newest first, annotated.
    pub async fn list_three_two_ones_by_themes(
        &self,
        viewer: &Viewer,
        theme_slugs: Option<&[String]>,
    ) -> Result<Vec<ThreeTwoOneListItem>, AppError> {
        let rows = self
            .list_content_rows(
                THREE_TWO_ONE_LIST_SELECT,
                "three_two_one_themes",
                "entry_id",
                viewer,
                theme_slugs,
            )
            .await?;

        Ok(rows.iter().map(three_two_one_list_item_from_row).collect())
    }

    async fn get_three_two_one_row(&self, id: &str) -> Result<Option<ThreeTwoOne>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, author_id, training_title, learnings, changes, question,
                      visibility, team_id, created_at
               FROM three_two_one WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(three_two_one_from_row))
    }

    // ==================== TAKEOVER OPERATIONS ====================

    /// Create a new takeover with its theme associations.
    pub async fn create_takeover(
        &self,
        presenter_id: &str,
        request: &CreateTakeoverRequest,
    ) -> Result<Takeover, AppError> {
        let meeting_date = request.meeting_date.trim();
        if meeting_date.is_empty() {
            return Err(AppError::Validation("Meeting date is required".to_string()));
        }
        let top_learnings = non_empty_items(&request.top_learnings);
        let team_id = self
            .validate_scope(request.visibility, request.team_id.clone())
            .await?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let learnings_json = serde_json::to_string(&top_learnings)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO takeovers (
                id, presenter_id, meeting_date, top_learnings, visibility, team_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(presenter_id)
        .bind(meeting_date)
        .bind(&learnings_json)
        .bind(request.visibility.as_str())
        .bind(&team_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        Self::replace_themes(
            &mut tx,
            "takeover_themes",
            "takeover_id",
            &id,
            &request.theme_ids,
        )
        .await?;
        tx.commit().await?;

        Ok(Takeover {
            id,
            presenter_id: presenter_id.to_string(),
            meeting_date: meeting_date.to_string(),
            top_learnings,
            visibility: request.visibility,
            team_id,
            created_at: now,
        })
    }

    /// Get a takeover by ID, annotated, if it is visible to the viewer.
    pub async fn get_takeover(
        &self,
        id: &str,
        viewer: &Viewer,
    ) -> Result<Option<TakeoverListItem>, AppError> {
        let sql = format!("{} WHERE k.id = ?", TAKEOVER_LIST_SELECT);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let item = takeover_list_item_from_row(&row);
        let scope = ItemScope {
            owner_id: &item.takeover.presenter_id,
            visibility: item.takeover.visibility,
            team_id: item.takeover.team_id.as_deref(),
        };
        if !policy::visible(viewer, &scope) {
            return Ok(None);
        }
        Ok(Some(item))
    }

    /// Update a takeover. Only the presenter may do this.
    pub async fn update_takeover(
        &self,
        id: &str,
        viewer_id: &str,
        request: &UpdateTakeoverRequest,
    ) -> Result<Takeover, AppError> {
        let existing = self
            .get_takeover_row(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Takeover {} not found", id)))?;
        if existing.presenter_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the presenter can modify this takeover".to_string(),
            ));
        }

        let meeting_date = match &request.meeting_date {
            Some(date) if date.trim().is_empty() => {
                return Err(AppError::Validation("Meeting date is required".to_string()))
            }
            Some(date) => date.trim().to_string(),
            None => existing.meeting_date.clone(),
        };
        let top_learnings = match &request.top_learnings {
            Some(learnings) => non_empty_items(learnings),
            None => existing.top_learnings.clone(),
        };
        let visibility = request.visibility.unwrap_or(existing.visibility);
        let team_id = self
            .validate_scope(visibility, request.team_id.clone().or(existing.team_id.clone()))
            .await?;

        let learnings_json = serde_json::to_string(&top_learnings)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"UPDATE takeovers SET
                meeting_date = ?, top_learnings = ?, visibility = ?, team_id = ?
            WHERE id = ?"#,
        )
        .bind(&meeting_date)
        .bind(&learnings_json)
        .bind(visibility.as_str())
        .bind(&team_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(theme_ids) = &request.theme_ids {
            Self::replace_themes(&mut tx, "takeover_themes", "takeover_id", id, theme_ids).await?;
        }
        tx.commit().await?;

        Ok(Takeover {
            id: id.to_string(),
            presenter_id: existing.presenter_id,
            meeting_date,
            top_learnings,
            visibility,
            team_id,
            created_at: existing.created_at,
        })
    }

    /// Delete a takeover. Only the presenter may do this.
    pub async fn delete_takeover(&self, id: &str, viewer_id: &str) -> Result<(), AppError> {
        let existing = self
            .get_takeover_row(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Takeover {} not found", id)))?;
        if existing.presenter_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the presenter can delete this takeover".to_string(),
            ));
        }

        sqlx::query("DELETE FROM takeovers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// List takeovers visible to the viewer, newest first, annotated.
    pub async fn list_takeovers_by_themes(
        &self,
        viewer: &Viewer,
        theme_slugs: Option<&[String]>,
    ) -> Result<Vec<TakeoverListItem>, AppError> {
        let rows = self
            .list_content_rows(
                TAKEOVER_LIST_SELECT,
                "takeover_themes",
                "takeover_id",
                viewer,
                theme_slugs,
            )
            .await?;

        Ok(rows.iter().map(takeover_list_item_from_row).collect())
    }

    async fn get_takeover_row(&self, id: &str) -> Result<Option<Takeover>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, presenter_id, meeting_date, top_learnings, visibility, team_id, created_at
               FROM takeovers WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(takeover_from_row))
    }

    // ==================== SCOPED LIST QUERY ====================

    /// Shared tail of the per-kind list queries: visibility predicate,
    /// optional OR-semantics slug filter, newest-first order. Filtering
    /// happens here, in the same query that orders, never after a limit.
    async fn list_content_rows(
        &self,
        base_select: &str,
        join_table: &str,
        id_column: &str,
        viewer: &Viewer,
        theme_slugs: Option<&[String]>,
    ) -> Result<Vec<sqlx::sqlite::SqliteRow>, AppError> {
        let alias = content_alias(base_select);
        let mut sql = format!(
            "{base} WHERE ({a}.visibility = 'org' OR {a}.{owner} = ? \
             OR ({a}.visibility = 'team' AND {a}.team_id = ?))",
            base = base_select,
            a = alias,
            owner = owner_column(id_column),
        );

        let slugs = theme_slugs.unwrap_or(&[]);
        if !slugs.is_empty() {
            let placeholders = vec!["?"; slugs.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM {jt} jf JOIN themes tf ON tf.id = jf.theme_id \
                 WHERE jf.{col} = {a}.id AND tf.slug IN ({ph}))",
                jt = join_table,
                col = id_column,
                a = alias,
                ph = placeholders,
            ));
        }
        sql.push_str(&format!(
            " ORDER BY {a}.created_at DESC, {a}.id DESC",
            a = alias
        ));

        let mut query = sqlx::query(&sql).bind(&viewer.id).bind(&viewer.team_id);
        for slug in slugs {
            query = query.bind(slug);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    // ==================== SEARCH SUPPORT ====================

    /// All content rows as search hit data, used to rebuild the index at
    /// startup.
    pub async fn all_search_hits(&self) -> Result<Vec<SearchHitData>, AppError> {
        let mut hits = Vec::new();

        let postcard_ids: Vec<String> = sqlx::query("SELECT id FROM postcards")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.get("id"))
            .collect();
        for id in postcard_ids {
            if let Some(hit) = self.hydrate_search_hit(ContentKind::Postcard, &id).await? {
                hits.push(hit);
            }
        }

        let entry_ids: Vec<String> = sqlx::query("SELECT id FROM three_two_one")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.get("id"))
            .collect();
        for id in entry_ids {
            if let Some(hit) = self.hydrate_search_hit(ContentKind::ThreeTwoOne, &id).await? {
                hits.push(hit);
            }
        }

        let takeover_ids: Vec<String> = sqlx::query("SELECT id FROM takeovers")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.get("id"))
            .collect();
        for id in takeover_ids {
            if let Some(hit) = self.hydrate_search_hit(ContentKind::Takeover, &id).await? {
                hits.push(hit);
            }
        }

        Ok(hits)
    }

    /// Fetch one content item in the shape search results need: title,
    /// preview, scoping attributes and themes.
    pub async fn hydrate_search_hit(
        &self,
        kind: ContentKind,
        id: &str,
    ) -> Result<Option<SearchHitData>, AppError> {
        match kind {
            ContentKind::Postcard => {
                let Some(postcard) = self.get_postcard_row(id).await? else {
                    return Ok(None);
                };
                let themes = self.themes_for_postcard(id).await?;
                Ok(Some(SearchHitData {
                    id: postcard.id,
                    kind,
                    title: postcard.training_title,
                    preview: postcard.elevator_pitch,
                    owner_id: postcard.author_id,
                    visibility: postcard.visibility,
                    team_id: postcard.team_id,
                    created_at: postcard.created_at,
                    themes,
                }))
            }
            ContentKind::ThreeTwoOne => {
                let Some(entry) = self.get_three_two_one_row(id).await? else {
                    return Ok(None);
                };
                let themes = self.themes_for_three_two_one(id).await?;
                Ok(Some(SearchHitData {
                    id: entry.id,
                    kind,
                    title: entry.training_title,
                    preview: entry.learnings.first().cloned(),
                    owner_id: entry.author_id,
                    visibility: entry.visibility,
                    team_id: entry.team_id,
                    created_at: entry.created_at,
                    themes,
                }))
            }
            ContentKind::Takeover => {
                let Some(takeover) = self.get_takeover_row(id).await? else {
                    return Ok(None);
                };
                let themes = self.themes_for_takeover(id).await?;
                Ok(Some(SearchHitData {
                    id: takeover.id,
                    kind,
                    title: takeover.meeting_date,
                    preview: takeover.top_learnings.first().cloned(),
                    owner_id: takeover.presenter_id,
                    visibility: takeover.visibility,
                    team_id: takeover.team_id,
                    created_at: takeover.created_at,
                    themes,
                }))
            }
        }
    }
}

// Shared SELECT heads for the annotated list queries. Each joins the owner
// profile and team and aggregates the (name-ordered) theme list as JSON in
// the same round trip.

const POSTCARD_LIST_SELECT: &str = r#"
SELECT p.id, p.author_id, p.training_title, p.elevator_pitch, p.lightbulb_moment,
       p.programme_impact, p.golden_nugget, p.visibility, p.team_id, p.created_at,
       pr.full_name AS author_name,
       tm.name AS team_name,
       (SELECT json_group_array(json_object(
                   'id', o.id, 'name', o.name, 'slug', o.slug, 'createdAt', o.created_at))
          FROM (SELECT th.id, th.name, th.slug, th.created_at
                  FROM postcard_themes pt
                  JOIN themes th ON th.id = pt.theme_id
                 WHERE pt.postcard_id = p.id
                 ORDER BY th.name) o) AS theme_data
  FROM postcards p
  LEFT JOIN profiles pr ON pr.id = p.author_id
  LEFT JOIN teams tm ON tm.id = p.team_id"#;

const THREE_TWO_ONE_LIST_SELECT: &str = r#"
SELECT e.id, e.author_id, e.training_title, e.learnings, e.changes, e.question,
       e.visibility, e.team_id, e.created_at,
       pr.full_name AS author_name,
       tm.name AS team_name,
       (SELECT json_group_array(json_object(
                   'id', o.id, 'name', o.name, 'slug', o.slug, 'createdAt', o.created_at))
          FROM (SELECT th.id, th.name, th.slug, th.created_at
                  FROM three_two_one_themes et
                  JOIN themes th ON th.id = et.theme_id
                 WHERE et.entry_id = e.id
                 ORDER BY th.name) o) AS theme_data
  FROM three_two_one e
  LEFT JOIN profiles pr ON pr.id = e.author_id
  LEFT JOIN teams tm ON tm.id = e.team_id"#;

const TAKEOVER_LIST_SELECT: &str = r#"
SELECT k.id, k.presenter_id, k.meeting_date, k.top_learnings,
       k.visibility, k.team_id, k.created_at,
       pr.full_name AS presenter_name,
       tm.name AS team_name,
       (SELECT json_group_array(json_object(
                   'id', o.id, 'name', o.name, 'slug', o.slug, 'createdAt', o.created_at))
          FROM (SELECT th.id, th.name, th.slug, th.created_at
                  FROM takeover_themes kt
                  JOIN themes th ON th.id = kt.theme_id
                 WHERE kt.takeover_id = k.id
                 ORDER BY th.name) o) AS theme_data
  FROM takeovers k
  LEFT JOIN profiles pr ON pr.id = k.presenter_id
  LEFT JOIN teams tm ON tm.id = k.team_id"#;

/// The content table alias used by a list SELECT head.
fn content_alias(base_select: &str) -> &'static str {
    if base_select.contains("FROM postcards p") {
        "p"
    } else if base_select.contains("FROM three_two_one e") {
        "e"
    } else {
        "k"
    }
}

/// The owner column for a join-table id column.
fn owner_column(id_column: &str) -> &'static str {
    if id_column == "takeover_id" {
        "presenter_id"
    } else {
        "author_id"
    }
}

// Helper functions for row conversion

fn team_from_row(row: &sqlx::sqlite::SqliteRow) -> Team {
    Team {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> Profile {
    let role: String = row.get("role");
    Profile {
        id: row.get("id"),
        full_name: row.get("full_name"),
        role: Role::from_str(&role).unwrap_or_default(),
        team_id: row.get("team_id"),
        created_at: row.get("created_at"),
    }
}

fn theme_from_row(row: &sqlx::sqlite::SqliteRow) -> Theme {
    Theme {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        created_at: row.get("created_at"),
    }
}

fn postcard_from_row(row: &sqlx::sqlite::SqliteRow) -> Postcard {
    let visibility: String = row.get("visibility");
    Postcard {
        id: row.get("id"),
        author_id: row.get("author_id"),
        training_title: row.get("training_title"),
        elevator_pitch: row.get("elevator_pitch"),
        lightbulb_moment: row.get("lightbulb_moment"),
        programme_impact: row.get("programme_impact"),
        golden_nugget: row.get("golden_nugget"),
        visibility: Visibility::from_str(&visibility).unwrap_or_default(),
        team_id: row.get("team_id"),
        created_at: row.get("created_at"),
    }
}

fn three_two_one_from_row(row: &sqlx::sqlite::SqliteRow) -> ThreeTwoOne {
    let visibility: String = row.get("visibility");
    let learnings: String = row.get("learnings");
    let changes: String = row.get("changes");
    ThreeTwoOne {
        id: row.get("id"),
        author_id: row.get("author_id"),
        training_title: row.get("training_title"),
        learnings: parse_json_array(&learnings),
        changes: parse_json_array(&changes),
        question: row.get("question"),
        visibility: Visibility::from_str(&visibility).unwrap_or_default(),
        team_id: row.get("team_id"),
        created_at: row.get("created_at"),
    }
}

fn takeover_from_row(row: &sqlx::sqlite::SqliteRow) -> Takeover {
    let visibility: String = row.get("visibility");
    let top_learnings: String = row.get("top_learnings");
    Takeover {
        id: row.get("id"),
        presenter_id: row.get("presenter_id"),
        meeting_date: row.get("meeting_date"),
        top_learnings: parse_json_array(&top_learnings),
        visibility: Visibility::from_str(&visibility).unwrap_or_default(),
        team_id: row.get("team_id"),
        created_at: row.get("created_at"),
    }
}

fn postcard_list_item_from_row(row: &sqlx::sqlite::SqliteRow) -> PostcardListItem {
    let theme_data: Option<String> = row.get("theme_data");
    PostcardListItem {
        postcard: postcard_from_row(row),
        author_name: row.get("author_name"),
        team_name: row.get("team_name"),
        themes: parse_theme_data(theme_data.as_deref()),
    }
}

fn three_two_one_list_item_from_row(row: &sqlx::sqlite::SqliteRow) -> ThreeTwoOneListItem {
    let theme_data: Option<String> = row.get("theme_data");
    ThreeTwoOneListItem {
        entry: three_two_one_from_row(row),
        author_name: row.get("author_name"),
        team_name: row.get("team_name"),
        themes: parse_theme_data(theme_data.as_deref()),
    }
}

fn takeover_list_item_from_row(row: &sqlx::sqlite::SqliteRow) -> TakeoverListItem {
    let theme_data: Option<String> = row.get("theme_data");
    TakeoverListItem {
        takeover: takeover_from_row(row),
        presenter_name: row.get("presenter_name"),
        team_name: row.get("team_name"),
        themes: parse_theme_data(theme_data.as_deref()),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn parse_theme_data(s: Option<&str>) -> Vec<Theme> {
    s.and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default()
}

/// Trim list entries and drop the empty ones.
fn non_empty_items(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
