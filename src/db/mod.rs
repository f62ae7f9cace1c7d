//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            full_name TEXT,
            role TEXT NOT NULL DEFAULT 'staff' CHECK (role IN ('staff', 'manager', 'admin')),
            team_id TEXT REFERENCES teams(id),
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS themes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Content tables. The CHECK encodes the scoping invariant:
    // team_id is non-null exactly when visibility is 'team'.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS postcards (
            id TEXT PRIMARY KEY,
            author_id TEXT NOT NULL REFERENCES profiles(id),
            training_title TEXT NOT NULL,
            elevator_pitch TEXT,
            lightbulb_moment TEXT,
            programme_impact TEXT,
            golden_nugget TEXT,
            visibility TEXT NOT NULL DEFAULT 'org' CHECK (visibility IN ('org', 'team')),
            team_id TEXT REFERENCES teams(id),
            created_at TEXT NOT NULL,
            CHECK ((visibility = 'team') = (team_id IS NOT NULL))
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS three_two_one (
            id TEXT PRIMARY KEY,
            author_id TEXT NOT NULL REFERENCES profiles(id),
            training_title TEXT NOT NULL,
            learnings TEXT NOT NULL DEFAULT '[]',
            changes TEXT NOT NULL DEFAULT '[]',
            question TEXT,
            visibility TEXT NOT NULL DEFAULT 'org' CHECK (visibility IN ('org', 'team')),
            team_id TEXT REFERENCES teams(id),
            created_at TEXT NOT NULL,
            CHECK ((visibility = 'team') = (team_id IS NOT NULL))
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS takeovers (
            id TEXT PRIMARY KEY,
            presenter_id TEXT NOT NULL REFERENCES profiles(id),
            meeting_date TEXT NOT NULL,
            top_learnings TEXT NOT NULL DEFAULT '[]',
            visibility TEXT NOT NULL DEFAULT 'org' CHECK (visibility IN ('org', 'team')),
            team_id TEXT REFERENCES teams(id),
            created_at TEXT NOT NULL,
            CHECK ((visibility = 'team') = (team_id IS NOT NULL))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Association tables, one per content kind. Deleting a content item
    // cascades to its association rows; themes themselves are never
    // deleted through the kernel.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS postcard_themes (
            postcard_id TEXT NOT NULL REFERENCES postcards(id) ON DELETE CASCADE,
            theme_id TEXT NOT NULL REFERENCES themes(id) ON DELETE CASCADE,
            PRIMARY KEY (postcard_id, theme_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS three_two_one_themes (
            entry_id TEXT NOT NULL REFERENCES three_two_one(id) ON DELETE CASCADE,
            theme_id TEXT NOT NULL REFERENCES themes(id) ON DELETE CASCADE,
            PRIMARY KEY (entry_id, theme_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS takeover_themes (
            takeover_id TEXT NOT NULL REFERENCES takeovers(id) ON DELETE CASCADE,
            theme_id TEXT NOT NULL REFERENCES themes(id) ON DELETE CASCADE,
            PRIMARY KEY (takeover_id, theme_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Theme names are unique case-insensitively; concurrent duplicate
    // creates resolve against this index rather than racing.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_themes_name_lower ON themes(lower(name));
        CREATE INDEX IF NOT EXISTS idx_themes_slug ON themes(slug);
        CREATE INDEX IF NOT EXISTS idx_postcards_created_at ON postcards(created_at);
        CREATE INDEX IF NOT EXISTS idx_postcards_team ON postcards(team_id);
        CREATE INDEX IF NOT EXISTS idx_three_two_one_created_at ON three_two_one(created_at);
        CREATE INDEX IF NOT EXISTS idx_three_two_one_team ON three_two_one(team_id);
        CREATE INDEX IF NOT EXISTS idx_takeovers_created_at ON takeovers(created_at);
        CREATE INDEX IF NOT EXISTS idx_takeovers_team ON takeovers(team_id);
        CREATE INDEX IF NOT EXISTS idx_postcard_themes_theme ON postcard_themes(theme_id);
        CREATE INDEX IF NOT EXISTS idx_three_two_one_themes_theme ON three_two_one_themes(theme_id);
        CREATE INDEX IF NOT EXISTS idx_takeover_themes_theme ON takeover_themes(theme_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
