// src/analytics/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Analytics Models
// ============================================================================

#[derive(FromRow, Serialize, Deserialize, Debug)]
pub struct AnalyticsMetric {
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    pub impressions: Option<i64>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
    pub clicks: Option<i64>,
    pub engagement_rate: Option<f64>,
    pub recorded_at: Option<String>,
    pub sync_hour: String,
}

#[derive(Serialize, Debug)]
pub struct MetricListResponse {
    pub metrics: Vec<AnalyticsMetric>,
    pub total: usize,
}

/// One post that could not be synced; the rest of the batch still runs.
#[derive(Serialize, Debug)]
pub struct SyncFailure {
    pub post_id: String,
    pub error: String,
}

#[derive(Serialize, Debug)]
pub struct SyncResponse {
    pub synced: usize,
    pub failed: usize,
    pub errors: Vec<SyncFailure>,
}

#[derive(Deserialize)]
pub struct MetricQueryParams {
    pub post_id: Option<String>,
    pub limit: Option<usize>,
}
