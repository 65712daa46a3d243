// src/posts/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Content Post Models
// ============================================================================

#[derive(FromRow, Serialize, Deserialize, Debug)]
pub struct ContentPost {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<String>, // JSON string in DB, will be parsed
    pub status: Option<String>,
    pub scheduled_for: Option<String>,
    pub published_at: Option<String>,
    pub linkedin_post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_data: Option<String>, // JSON string in DB, will be parsed
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

// Enhanced post response with parsed hashtags and analytics
#[derive(Serialize, Debug)]
pub struct PostResponse {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub content: String,
    pub hashtags: Option<Vec<String>>,
    pub status: Option<String>,
    pub scheduled_for: Option<String>,
    pub published_at: Option<String>,
    pub linkedin_post_id: Option<String>,
    pub analytics_data: Option<serde_json::Value>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

// Paginated post list response
#[derive(Serialize, Debug)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl From<ContentPost> for PostResponse {
    fn from(post: ContentPost) -> Self {
        // Parse hashtags JSON string to Vec<String>
        let hashtags = post
            .hashtags
            .and_then(|h| serde_json::from_str::<Vec<String>>(&h).ok());

        let analytics_data = post
            .analytics_data
            .and_then(|a| serde_json::from_str::<serde_json::Value>(&a).ok());

        PostResponse {
            id: post.id,
            user_id: post.user_id,
            title: post.title,
            content: post.content,
            hashtags,
            status: post.status,
            scheduled_for: post.scheduled_for,
            published_at: post.published_at,
            linkedin_post_id: post.linkedin_post_id,
            analytics_data,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct CreatePost {
    pub title: Option<String>,
    pub content: String,
    pub hashtags: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub hashtags: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct SchedulePost {
    /// RFC 3339 timestamp the post should go out at
    pub scheduled_for: String,
}

#[derive(Deserialize)]
pub struct PostQueryParams {
    pub status: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}
