// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Only drop tables if RESET_DB environment variable is set to "true"
    // This prevents data loss on server restarts
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("Dropped old tables");
    }

    create_user_tables(pool).await?;
    create_post_tables(pool).await?;
    create_analytics_tables(pool).await?;
    create_indexes(pool).await?;

    info!("Database migration completed successfully");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Drop tables in reverse dependency order
    let tables = vec!["analytics_metrics", "content_posts", "users"];

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Users keyed by internal id; the LinkedIn subject id (`linkedin_id`) is
/// the upsert key for the OAuth callback. Token columns hold AES-256-GCM
/// ciphertext, never plaintext.
async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            first_name TEXT,
            last_name TEXT,
            linkedin_id TEXT NOT NULL UNIQUE,
            linkedin_access_token TEXT,
            linkedin_refresh_token TEXT,
            token_expires_at TEXT,
            profile_data TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_post_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_posts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT,
            content TEXT NOT NULL,
            hashtags TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            scheduled_for TEXT,
            published_at TEXT,
            linkedin_post_id TEXT,
            analytics_data TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One metrics row per post per sync hour; repeated syncs within the same
/// hour overwrite rather than accumulate.
async fn create_analytics_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analytics_metrics (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            post_id TEXT NOT NULL,
            impressions INTEGER NOT NULL DEFAULT 0,
            likes INTEGER NOT NULL DEFAULT 0,
            comments INTEGER NOT NULL DEFAULT 0,
            shares INTEGER NOT NULL DEFAULT 0,
            clicks INTEGER NOT NULL DEFAULT 0,
            engagement_rate REAL NOT NULL DEFAULT 0.0,
            recorded_at TEXT DEFAULT (datetime('now')),
            sync_hour TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id),
            FOREIGN KEY (post_id) REFERENCES content_posts(id),
            UNIQUE (post_id, sync_hour)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = vec![
        "CREATE INDEX IF NOT EXISTS idx_users_linkedin_id ON users(linkedin_id)",
        "CREATE INDEX IF NOT EXISTS idx_posts_user_id ON content_posts(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_posts_status ON content_posts(status)",
        "CREATE INDEX IF NOT EXISTS idx_posts_scheduled_for ON content_posts(scheduled_for)",
        "CREATE INDEX IF NOT EXISTS idx_metrics_user_id ON analytics_metrics(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_metrics_post_id ON analytics_metrics(post_id)",
    ];

    for index in indexes {
        sqlx::query(index).execute(pool).await?;
    }

    Ok(())
}
