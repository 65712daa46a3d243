//! Content post handlers
//!
//! Owner-scoped CRUD over drafts, scheduling, and publishing a post to the
//! connected LinkedIn account.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthedUser, User};
use crate::common::{generate_post_id, parse_hashtags, serialize_hashtags, ApiError, AppState};
use crate::posts::models::*;
use crate::services::LinkedInError;

/// GET /api/posts - List the caller's posts (optional status filter, paginated)
pub async fn list_posts(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(params): Query<PostQueryParams>,
) -> Result<Json<PostListResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * limit;

    let total: i64 = match params.status.as_deref() {
        Some(status) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM content_posts WHERE user_id = ? AND status = ?")
                .bind(&authed.id)
                .bind(status)
                .fetch_one(&state.db)
                .await
                .map_err(ApiError::DatabaseError)?
        }
        None => sqlx::query_scalar("SELECT COUNT(*) FROM content_posts WHERE user_id = ?")
            .bind(&authed.id)
            .fetch_one(&state.db)
            .await
            .map_err(ApiError::DatabaseError)?,
    };

    let posts = match params.status.as_deref() {
        Some(status) => sqlx::query_as::<_, ContentPost>(
            r#"SELECT * FROM content_posts
            WHERE user_id = ? AND status = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?"#,
        )
        .bind(&authed.id)
        .bind(status)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?,
        None => sqlx::query_as::<_, ContentPost>(
            r#"SELECT * FROM content_posts
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?"#,
        )
        .bind(&authed.id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?,
    };

    let post_responses: Vec<PostResponse> = posts.into_iter().map(|p| p.into()).collect();

    debug!(
        user_id = %authed.id,
        post_count = post_responses.len(),
        total = total,
        page = page,
        "Successfully loaded paginated posts list"
    );

    Ok(Json(PostListResponse {
        posts: post_responses,
        total: total as usize,
        page,
        page_size: limit,
    }))
}

/// GET /api/posts/:id - Get one of the caller's posts
pub async fn get_post(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let post = fetch_owned_post(&state, &post_id, &authed.id).await?;
    Ok(Json(post.into()))
}

/// POST /api/posts - Create a draft post
pub async fn create_post(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<CreatePost>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let state = state_lock.read().await.clone();

    if request.content.trim().is_empty() {
        return Err(ApiError::ValidationError(
            "post content must not be empty".to_string(),
        ));
    }

    let post_id = generate_post_id();
    let hashtags_json = serialize_hashtags(request.hashtags.as_deref());

    sqlx::query(
        r#"
        INSERT INTO content_posts (id, user_id, title, content, hashtags, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'draft', datetime('now'), datetime('now'))
        "#,
    )
    .bind(&post_id)
    .bind(&authed.id)
    .bind(request.title.as_deref())
    .bind(&request.content)
    .bind(hashtags_json.as_deref())
    .execute(&state.db)
    .await
    .map_err(|e| {
        error!(error = %e, user_id = %authed.id, "Database error creating post");
        ApiError::DatabaseError(e)
    })?;

    info!(post_id = %post_id, user_id = %authed.id, "Draft post created");

    let post = fetch_owned_post(&state, &post_id, &authed.id).await?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

/// PUT /api/posts/:id - Update a draft or scheduled post
pub async fn update_post(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(post_id): Path<String>,
    Json(request): Json<UpdatePost>,
) -> Result<Json<PostResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let existing = fetch_owned_post(&state, &post_id, &authed.id).await?;
    if existing.status.as_deref() == Some("published") {
        return Err(ApiError::ValidationError(
            "published posts cannot be edited".to_string(),
        ));
    }

    let content = request.content.unwrap_or(existing.content);
    if content.trim().is_empty() {
        return Err(ApiError::ValidationError(
            "post content must not be empty".to_string(),
        ));
    }
    let title = request.title.or(existing.title);
    let hashtags_json = match request.hashtags {
        Some(tags) => serialize_hashtags(Some(&tags)),
        None => existing.hashtags,
    };

    sqlx::query(
        r#"
        UPDATE content_posts SET
            title = ?,
            content = ?,
            hashtags = ?,
            updated_at = datetime('now')
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(title.as_deref())
    .bind(&content)
    .bind(hashtags_json.as_deref())
    .bind(&post_id)
    .bind(&authed.id)
    .execute(&state.db)
    .await
    .map_err(|e| {
        error!(error = %e, post_id = %post_id, "Database error updating post");
        ApiError::DatabaseError(e)
    })?;

    debug!(post_id = %post_id, user_id = %authed.id, "Post updated");

    let post = fetch_owned_post(&state, &post_id, &authed.id).await?;
    Ok(Json(post.into()))
}

/// DELETE /api/posts/:id - Delete one of the caller's posts
pub async fn delete_post(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(post_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let state = state_lock.read().await.clone();

    let result = sqlx::query("DELETE FROM content_posts WHERE id = ? AND user_id = ?")
        .bind(&post_id)
        .bind(&authed.id)
        .execute(&state.db)
        .await
        .map_err(|e| {
            error!(error = %e, post_id = %post_id, "Database error deleting post");
            ApiError::DatabaseError(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Post not found: {}", post_id)));
    }

    info!(post_id = %post_id, user_id = %authed.id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/posts/:id/schedule - Queue a post for a future publish time
pub async fn schedule_post(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(post_id): Path<String>,
    Json(request): Json<SchedulePost>,
) -> Result<Json<PostResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let existing = fetch_owned_post(&state, &post_id, &authed.id).await?;
    if existing.status.as_deref() == Some("published") {
        return Err(ApiError::ValidationError(
            "published posts cannot be scheduled".to_string(),
        ));
    }

    let scheduled_for = DateTime::parse_from_rfc3339(&request.scheduled_for).map_err(|_| {
        ApiError::ValidationError("scheduled_for must be an RFC 3339 timestamp".to_string())
    })?;
    if scheduled_for <= Utc::now() {
        return Err(ApiError::ValidationError(
            "scheduled_for must be in the future".to_string(),
        ));
    }

    sqlx::query(
        r#"
        UPDATE content_posts SET
            status = 'scheduled',
            scheduled_for = ?,
            updated_at = datetime('now')
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(scheduled_for.to_rfc3339())
    .bind(&post_id)
    .bind(&authed.id)
    .execute(&state.db)
    .await
    .map_err(|e| {
        error!(error = %e, post_id = %post_id, "Database error scheduling post");
        ApiError::DatabaseError(e)
    })?;

    info!(
        post_id = %post_id,
        user_id = %authed.id,
        scheduled_for = %request.scheduled_for,
        "Post scheduled"
    );

    let post = fetch_owned_post(&state, &post_id, &authed.id).await?;
    Ok(Json(post.into()))
}

/// POST /api/posts/:id/publish - Publish a post to LinkedIn immediately
///
/// Decrypts the stored access token, ships the post body (content plus
/// hashtags) to the UGC endpoint, and records the returned post id. A failed
/// provider call moves the post to 'failed' so it can be retried from the
/// dashboard.
pub async fn publish_post(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let post = fetch_owned_post(&state, &post_id, &authed.id).await?;
    if post.status.as_deref() == Some("published") {
        return Err(ApiError::ValidationError(
            "post is already published".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    let encrypted_token = user.linkedin_access_token.ok_or_else(|| {
        warn!(user_id = %authed.id, "Publish attempted without a connected LinkedIn account");
        ApiError::BadRequest("LinkedIn account is not connected".to_string())
    })?;
    let access_token = state
        .encryption_service
        .decrypt(&encrypted_token)
        .map_err(|e| {
            error!(error = %e, user_id = %authed.id, "Stored access token failed to decrypt");
            ApiError::InternalServer("stored credentials are unreadable".to_string())
        })?;

    let body = compose_post_body(&post);

    let publish_result = state
        .linkedin_service
        .publish_post(&access_token, &user.linkedin_id, &body)
        .await;

    match publish_result {
        Ok(linkedin_post_id) => {
            sqlx::query(
                r#"
                UPDATE content_posts SET
                    status = 'published',
                    linkedin_post_id = ?,
                    published_at = datetime('now'),
                    updated_at = datetime('now')
                WHERE id = ? AND user_id = ?
                "#,
            )
            .bind(&linkedin_post_id)
            .bind(&post_id)
            .bind(&authed.id)
            .execute(&state.db)
            .await
            .map_err(ApiError::DatabaseError)?;

            info!(
                post_id = %post_id,
                user_id = %authed.id,
                linkedin_post_id = %linkedin_post_id,
                "Post published to LinkedIn"
            );

            let post = fetch_owned_post(&state, &post_id, &authed.id).await?;
            Ok(Json(post.into()))
        }
        Err(e) => {
            // Record the failure before reporting it
            sqlx::query(
                r#"
                UPDATE content_posts SET
                    status = 'failed',
                    updated_at = datetime('now')
                WHERE id = ? AND user_id = ?
                "#,
            )
            .bind(&post_id)
            .bind(&authed.id)
            .execute(&state.db)
            .await
            .map_err(ApiError::DatabaseError)?;

            error!(
                error = %e,
                post_id = %post_id,
                user_id = %authed.id,
                "LinkedIn publish failed"
            );

            Err(match e {
                LinkedInError::Timeout(msg) => {
                    ApiError::Timeout(format!("publish timed out: {}", msg))
                }
                other => ApiError::PublishError(other.to_string()),
            })
        }
    }
}

/// Append hashtags to the post content the way the dashboard renders them.
pub fn compose_post_body(post: &ContentPost) -> String {
    let tags = parse_hashtags(post.hashtags.as_deref());

    if tags.is_empty() {
        return post.content.clone();
    }

    let rendered: Vec<String> = tags
        .iter()
        .map(|t| {
            if t.starts_with('#') {
                t.clone()
            } else {
                format!("#{}", t)
            }
        })
        .collect();

    format!("{}\n\n{}", post.content, rendered.join(" "))
}

/// Fetch a post and enforce ownership in the same query.
async fn fetch_owned_post(
    state: &AppState,
    post_id: &str,
    user_id: &str,
) -> Result<ContentPost, ApiError> {
    sqlx::query_as::<_, ContentPost>("SELECT * FROM content_posts WHERE id = ? AND user_id = ?")
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound(format!("Post not found: {}", post_id)))
}
