use crate::algorithms::{self, SubgraphOptions};
use crate::config::Config;
use crate::error::Result;
use crate::graph::{BipartiteGraph, GraphStats};
use crate::models::*;
use crate::utils::validation;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Request-level entry point over the shared, read-only graph.
pub struct RecommendationService {
    graph: Arc<BipartiteGraph>,
    config: Arc<Config>,
}

impl RecommendationService {
    pub fn new(graph: Arc<BipartiteGraph>, config: Arc<Config>) -> Self {
        Self { graph, config }
    }

    pub fn graph_stats(&self) -> GraphStats {
        self.graph.stats()
    }

    /// Validates the request and turns its selection into a virtual user.
    fn prepare(&self, request: &RecommendationRequest) -> Result<(VirtualUser, RecommendOptions)> {
        let options =
            validation::validate_recommendation_request(request, &self.config.recommendation)?;
        let liked: BTreeSet<MovieId> = request.liked_movies.iter().copied().collect();
        Ok((VirtualUser::new(liked), options))
    }

    fn run(&self, user: &VirtualUser, options: &RecommendOptions) -> Result<Recommendation> {
        let recommendation = algorithms::recommend(&self.graph, &user.liked_movies, options)?;
        info!(
            "Virtual user {} ({} liked, {}): {} similar users, {} recommendations",
            user.id,
            user.liked_movies.len(),
            options.algorithm,
            recommendation.similar_users.len(),
            recommendation.result.len()
        );
        Ok(recommendation)
    }

    fn respond(
        &self,
        virtual_user: uuid::Uuid,
        algorithm: Algorithm,
        recommendation: Recommendation,
    ) -> RecommendationResponse {
        let mut similar_users = recommendation.similar_users;
        similar_users.truncate(self.config.recommendation.similar_users_k);

        RecommendationResponse {
            virtual_user,
            algorithm,
            recommendations: recommendation.result.items,
            similar_users,
            generated_at: Utc::now(),
        }
    }

    pub fn get_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse> {
        let (user, options) = self.prepare(request)?;
        let recommendation = self.run(&user, &options)?;
        Ok(self.respond(user.id, options.algorithm, recommendation))
    }

    /// Recommendations for a user already present in the graph.
    pub fn get_recommendations_for_user(
        &self,
        user_id: UserId,
        params: &RecommendationParams,
    ) -> Result<RecommendationResponse> {
        let options = validation::resolve_params(params, &self.config.recommendation)?;
        let recommendation = algorithms::recommend_for_user(&self.graph, user_id, &options)?;
        info!(
            "User {} ({}): {} similar users, {} recommendations",
            user_id,
            options.algorithm,
            recommendation.similar_users.len(),
            recommendation.result.len()
        );
        Ok(self.respond(uuid::Uuid::new_v4(), options.algorithm, recommendation))
    }

    /// Scores the request, then reduces the graph around the result.
    pub fn visualize(&self, request: &RecommendationRequest) -> Result<VisualizationResponse> {
        let (user, options) = self.prepare(request)?;
        let recommendation = self.run(&user, &options)?;

        let subgraph = algorithms::extract_subgraph(
            &self.graph,
            &user.liked_movies,
            &recommendation.similar_users,
            &recommendation.result,
            &SubgraphOptions::from(&self.config.recommendation),
        );

        Ok(VisualizationResponse {
            virtual_user: user.id,
            recommendations: recommendation.result.items,
            graph: subgraph,
            generated_at: Utc::now(),
        })
    }

    /// Catalog listing for selection forms, optionally narrowed to a genre.
    pub fn movies(&self, genre: Option<&str>, limit: Option<usize>) -> Vec<MovieRecord> {
        let genre = genre.filter(|g| *g != algorithms::scorer::ALL_GENRES);
        self.graph
            .movies()
            .filter(|m| genre.map_or(true, |g| m.has_genre(g)))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub fn genres(&self) -> Vec<String> {
        self.graph.genres()
    }
}
