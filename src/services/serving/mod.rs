use crate::config::Config;
use crate::error::{CineGraphError, Result};
use crate::models::*;
use crate::services::recommendation::RecommendationService;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Runs recommendation work off the async executor and keeps serving counters.
pub struct ServingService {
    recommendation_service: Arc<RecommendationService>,
    config: Arc<Config>,
    serving_stats: Arc<DashMap<String, u64>>,
    started_at: Instant,
}

impl ServingService {
    pub fn new(recommendation_service: Arc<RecommendationService>, config: Arc<Config>) -> Self {
        Self {
            recommendation_service,
            config,
            serving_stats: Arc::new(DashMap::new()),
            started_at: Instant::now(),
        }
    }

    pub async fn serve_recommendations(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationResponse> {
        let service = self.recommendation_service.clone();
        self.track("recommendations", move || service.get_recommendations(&request))
            .await
    }

    pub async fn serve_user_recommendations(
        &self,
        user_id: UserId,
        params: RecommendationParams,
    ) -> Result<RecommendationResponse> {
        let service = self.recommendation_service.clone();
        self.track("user_recommendations", move || {
            service.get_recommendations_for_user(user_id, &params)
        })
        .await
    }

    pub async fn serve_visualization(
        &self,
        request: RecommendationRequest,
    ) -> Result<VisualizationResponse> {
        let service = self.recommendation_service.clone();
        self.track("visualizations", move || service.visualize(&request))
            .await
    }

    /// Runs a scoring job on the blocking pool and records its outcome and latency.
    async fn track<T, F>(&self, kind: &str, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        self.increment_stat("total_requests");
        self.increment_stat(kind);
        let start_time = Instant::now();

        let outcome = tokio::task::spawn_blocking(job)
            .await
            .map_err(CineGraphError::from)
            .and_then(|result| result);

        let latency = start_time.elapsed().as_millis() as u64;
        self.update_latency_stat(latency);

        match &outcome {
            Ok(_) => {
                self.increment_stat("successful_requests");
                info!("Served {} in {}ms", kind, latency);
            }
            Err(e) if e.is_rejection() => {
                self.increment_stat("rejected_requests");
                warn!("Rejected {} request: {}", kind, e);
            }
            Err(_) => self.increment_stat("failed_requests"),
        }
        outcome
    }

    pub fn health_check(&self) -> HashMap<String, serde_json::Value> {
        let stats = self.recommendation_service.graph_stats();
        let mut health = HashMap::new();

        health.insert("status".to_string(), serde_json::json!("healthy"));
        health.insert("graph_loaded".to_string(), serde_json::json!(stats.movies > 0));
        health.insert("users".to_string(), serde_json::json!(stats.users));
        health.insert("movies".to_string(), serde_json::json!(stats.movies));
        health.insert("edges".to_string(), serde_json::json!(stats.edges));
        health.insert(
            "like_threshold".to_string(),
            serde_json::json!(stats.like_threshold),
        );
        health.insert(
            "max_top_n".to_string(),
            serde_json::json!(self.config.recommendation.max_top_n),
        );
        health.insert(
            "uptime_seconds".to_string(),
            serde_json::json!(self.started_at.elapsed().as_secs()),
        );

        health
    }

    /// Snapshot of the counters, with the average latency derived from the
    /// completed count and the accumulated latency.
    pub fn get_serving_stats(&self) -> HashMap<String, u64> {
        let mut stats: HashMap<String, u64> = self
            .serving_stats
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        let completed = stats.get("completed_requests").copied().unwrap_or(0);
        let total_latency = stats.remove("total_latency_ms").unwrap_or(0);
        if completed > 0 {
            stats.insert("avg_latency_ms".to_string(), total_latency / completed);
        }
        stats
    }

    fn increment_stat(&self, key: &str) {
        self.add_to_stat(key, 1);
    }

    // Every read-modify-write holds the entry guard for its key.
    fn add_to_stat(&self, key: &str, amount: u64) {
        let mut counter = self.serving_stats.entry(key.to_string()).or_insert(0);
        *counter += amount;
    }

    fn update_latency_stat(&self, latency_ms: u64) {
        self.add_to_stat("completed_requests", 1);
        self.add_to_stat("total_latency_ms", latency_ms);

        let mut max = self
            .serving_stats
            .entry("max_latency_ms".to_string())
            .or_insert(0);
        if latency_ms > *max {
            *max = latency_ms;
        }
    }
}
