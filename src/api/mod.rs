use crate::error::CineGraphError;
use crate::graph::GraphStats;
use crate::models::*;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Debug, Deserialize)]
pub struct MovieQuery {
    pub genre: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<T>>)>;

fn into_api<T>(outcome: crate::Result<T>) -> ApiResult<T> {
    match outcome {
        Ok(data) => Ok(Json(ApiResponse::success(data))),
        Err(e @ CineGraphError::InvalidSelection(_)) => {
            Err((StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string()))))
        }
        Err(e) => {
            tracing::error!("Request failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            ))
        }
    }
}

async fn health_check(
    State(state): State<AppState>,
) -> Json<ApiResponse<HashMap<String, serde_json::Value>>> {
    Json(ApiResponse::success(state.serving_service.health_check()))
}

async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<MovieQuery>,
) -> Json<ApiResponse<Vec<MovieRecord>>> {
    let movies = state
        .recommendation_service
        .movies(params.genre.as_deref(), params.limit);
    Json(ApiResponse::success(movies))
}

async fn list_genres(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::success(state.recommendation_service.genres()))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> ApiResult<RecommendationResponse> {
    into_api(state.serving_service.serve_recommendations(request).await)
}

async fn get_user_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(params): Json<RecommendationParams>,
) -> ApiResult<RecommendationResponse> {
    into_api(
        state
            .serving_service
            .serve_user_recommendations(user_id, params)
            .await,
    )
}

async fn get_graph(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> ApiResult<VisualizationResponse> {
    into_api(state.serving_service.serve_visualization(request).await)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsReport {
    pub graph: GraphStats,
    pub serving: HashMap<String, u64>,
}

async fn get_stats(State(state): State<AppState>) -> Json<ApiResponse<StatsReport>> {
    Json(ApiResponse::success(StatsReport {
        graph: state.recommendation_service.graph_stats(),
        serving: state.serving_service.get_serving_stats(),
    }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/movies", get(list_movies))
        .route("/genres", get(list_genres))
        .route("/recommendations", post(get_recommendations))
        .route("/users/:user_id/recommendations", post(get_user_recommendations))
        .route("/graph", post(get_graph))
        .route("/stats", get(get_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
