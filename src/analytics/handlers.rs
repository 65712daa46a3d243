//! Analytics handlers
//!
//! Pulls engagement statistics from LinkedIn for every published post and
//! records one snapshot row per post per sync hour.

use axum::{
    extract::{Extension, Query},
    response::Json,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthedUser, User};
use crate::common::{generate_metric_id, ApiError, AppState};
use crate::posts::ContentPost;
use crate::services::PostStatistics;

use super::models::*;

/// POST /api/analytics/sync - Refresh statistics for all published posts
///
/// Each post is synced independently; a provider failure on one post is
/// collected into the response instead of aborting the batch.
pub async fn sync_analytics(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<SyncResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    let encrypted_token = user.linkedin_access_token.ok_or_else(|| {
        warn!(user_id = %authed.id, "Analytics sync attempted without a connected LinkedIn account");
        ApiError::BadRequest("LinkedIn account is not connected".to_string())
    })?;
    let access_token = state
        .encryption_service
        .decrypt(&encrypted_token)
        .map_err(|e| {
            error!(error = %e, user_id = %authed.id, "Stored access token failed to decrypt");
            ApiError::InternalServer("stored credentials are unreadable".to_string())
        })?;

    let posts = sqlx::query_as::<_, ContentPost>(
        r#"SELECT * FROM content_posts
        WHERE user_id = ? AND status = 'published' AND linkedin_post_id IS NOT NULL
        ORDER BY published_at DESC"#,
    )
    .bind(&authed.id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    // One snapshot row per post per hour; re-syncing within the hour updates
    // the existing row instead of inserting a duplicate
    let sync_hour = Utc::now().format("%Y-%m-%dT%H:00:00Z").to_string();

    let mut synced = 0usize;
    let mut errors: Vec<SyncFailure> = Vec::new();

    for post in posts {
        let linkedin_post_id = match post.linkedin_post_id.as_deref() {
            Some(id) => id,
            None => continue,
        };

        let stats = match state
            .linkedin_service
            .get_post_statistics(&access_token, linkedin_post_id)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                warn!(
                    error = %e,
                    post_id = %post.id,
                    "Statistics fetch failed for one post, continuing batch"
                );
                errors.push(SyncFailure {
                    post_id: post.id.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        if let Err(e) = record_snapshot(&state, &authed.id, &post.id, &stats, &sync_hour).await {
            error!(error = %e, post_id = %post.id, "Failed to record analytics snapshot");
            errors.push(SyncFailure {
                post_id: post.id.clone(),
                error: e.to_string(),
            });
            continue;
        }

        synced += 1;
    }

    info!(
        user_id = %authed.id,
        synced = synced,
        failed = errors.len(),
        sync_hour = %sync_hour,
        "Analytics sync completed"
    );

    Ok(Json(SyncResponse {
        synced,
        failed: errors.len(),
        errors,
    }))
}

/// GET /api/analytics/metrics - List recorded snapshots for the caller
pub async fn list_metrics(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(params): Query<MetricQueryParams>,
) -> Result<Json<MetricListResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let limit = params.limit.unwrap_or(100).clamp(1, 500);

    let metrics = match params.post_id.as_deref() {
        Some(post_id) => sqlx::query_as::<_, AnalyticsMetric>(
            r#"SELECT * FROM analytics_metrics
            WHERE user_id = ? AND post_id = ?
            ORDER BY recorded_at DESC
            LIMIT ?"#,
        )
        .bind(&authed.id)
        .bind(post_id)
        .bind(limit as i64)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?,
        None => sqlx::query_as::<_, AnalyticsMetric>(
            r#"SELECT * FROM analytics_metrics
            WHERE user_id = ?
            ORDER BY recorded_at DESC
            LIMIT ?"#,
        )
        .bind(&authed.id)
        .bind(limit as i64)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?,
    };

    debug!(
        user_id = %authed.id,
        metric_count = metrics.len(),
        "Loaded analytics metrics"
    );

    let total = metrics.len();
    Ok(Json(MetricListResponse { metrics, total }))
}

/// Upsert the snapshot row and refresh the post's cached analytics JSON.
async fn record_snapshot(
    state: &AppState,
    user_id: &str,
    post_id: &str,
    stats: &PostStatistics,
    sync_hour: &str,
) -> Result<(), ApiError> {
    let engagement_rate = compute_engagement_rate(stats);
    let metric_id = generate_metric_id();

    sqlx::query(
        r#"
        INSERT INTO analytics_metrics (
            id, user_id, post_id, impressions, likes, comments, shares,
            clicks, engagement_rate, recorded_at, sync_hour
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'), ?)
        ON CONFLICT(post_id, sync_hour) DO UPDATE SET
            impressions = excluded.impressions,
            likes = excluded.likes,
            comments = excluded.comments,
            shares = excluded.shares,
            clicks = excluded.clicks,
            engagement_rate = excluded.engagement_rate,
            recorded_at = datetime('now')
        "#,
    )
    .bind(&metric_id)
    .bind(user_id)
    .bind(post_id)
    .bind(stats.impressions)
    .bind(stats.likes)
    .bind(stats.comments)
    .bind(stats.shares)
    .bind(stats.clicks)
    .bind(engagement_rate)
    .bind(sync_hour)
    .execute(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    // Latest numbers are also cached on the post row for cheap list views
    let analytics_json = serde_json::json!({
        "impressions": stats.impressions,
        "likes": stats.likes,
        "comments": stats.comments,
        "shares": stats.shares,
        "clicks": stats.clicks,
        "engagement_rate": engagement_rate,
        "synced_at": Utc::now().to_rfc3339(),
    })
    .to_string();

    sqlx::query(
        r#"
        UPDATE content_posts SET
            analytics_data = ?,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(&analytics_json)
    .bind(post_id)
    .execute(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    Ok(())
}

/// Engagement rate as a percentage of impressions, rounded to 2 decimals.
/// Zero impressions reads as zero engagement rather than a division error.
pub fn compute_engagement_rate(stats: &PostStatistics) -> f64 {
    if stats.impressions <= 0 {
        return 0.0;
    }
    let interactions = (stats.likes + stats.comments + stats.shares) as f64;
    let rate = interactions / stats.impressions as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}
