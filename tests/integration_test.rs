use axum::body::Body;
use axum::http::{Request, StatusCode};
use cinegraph::algorithms::{self, extract_subgraph, SubgraphOptions};
use cinegraph::api::create_router;
use cinegraph::services::dataset::Dataset;
use cinegraph::*;
use std::collections::BTreeSet;
use std::fs;
use tower::ServiceExt;

const MOVIES_CSV: &str = "movieId,title,genres\n\
1,Toy Story (1995),Adventure|Animation|Children|Comedy|Fantasy\n\
2,Jumanji (1995),Adventure|Children|Fantasy\n\
3,Grumpier Old Men (1995),Comedy|Romance\n\
4,Waiting to Exhale (1995),Comedy|Drama|Romance\n\
5,Father of the Bride Part II (1995),Comedy\n\
6,Heat (1995),Action|Crime|Thriller\n";

const RATINGS_CSV: &str = "userId,movieId,rating,timestamp\n\
1,1,4.0,964982703\n\
1,2,4.5,964981247\n\
1,6,5.0,964982224\n\
2,1,5.0,964983815\n\
2,2,4.0,964982931\n\
2,3,2.0,964982400\n\
3,1,3.5,964981208\n\
3,4,4.5,964980868\n\
3,5,3.0,964982176\n\
4,6,4.0,964984041\n\
4,3,4.0,964984100\n";

fn write_dataset() -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let ratings = dir.path().join("ratings.csv");
    let movies = dir.path().join("movies.csv");
    fs::write(&ratings, RATINGS_CSV).unwrap();
    fs::write(&movies, MOVIES_CSV).unwrap();

    let mut config = Config::default();
    config.dataset.ratings_path = ratings.to_string_lossy().into_owned();
    config.dataset.movies_path = movies.to_string_lossy().into_owned();
    config.graph.min_likes = 0;
    (dir, config)
}

fn liked(ids: &[MovieId]) -> BTreeSet<MovieId> {
    ids.iter().copied().collect()
}

#[test]
fn test_load_and_build_from_csv() {
    let (_dir, config) = write_dataset();
    let graph = load_graph(&config).unwrap();

    assert_eq!(graph.movie_count(), 6);
    assert_eq!(graph.user_count(), 4);
    // 2 -> 3 (2.0) and 3 -> 5 (3.0) fall below 3.5
    assert_eq!(graph.edge_count(), 9);
    assert_eq!(graph.rating(2, 3), None);
    assert_eq!(graph.rating(3, 1), Some(3.5));
}

#[test]
fn test_no_edge_below_threshold() {
    let (_dir, config) = write_dataset();
    let data = Dataset::load(&config.dataset).unwrap();
    let graph = build_graph(&data.movies, &data.ratings, 3.5).unwrap();

    for rating in data.ratings.iter().filter(|r| r.rating < 3.5) {
        assert_eq!(graph.rating(rating.user_id, rating.movie_id), None);
    }
    for edge in graph.edges() {
        assert!(edge.weight >= 3.5);
    }
}

#[test]
fn test_min_likes_downsampling_applies_before_build() {
    let (_dir, mut config) = write_dataset();
    config.graph.min_likes = 3;
    let graph = load_graph(&config).unwrap();

    // only user 1 has three liked ratings
    assert_eq!(graph.users().collect::<Vec<_>>(), vec![1]);
    assert_eq!(graph.movie_count(), 6);
}

#[test]
fn test_corroborated_movie_scores_common_neighbors_two() {
    let movies = [
        MovieRecord::new(1, "M1", 4.0),
        MovieRecord::new(2, "M2", 4.0),
        MovieRecord::new(3, "M3", 4.0),
    ]
    .into_iter()
    .map(|m| (m.movie_id, m))
    .collect();
    let ratings = vec![
        RatingRecord::new(1, 1, 4.0),
        RatingRecord::new(1, 2, 4.0),
        RatingRecord::new(2, 1, 3.5),
        RatingRecord::new(2, 2, 5.0),
        RatingRecord::new(2, 3, 4.0),
    ];
    let graph = build_graph(&movies, &ratings, 3.5).unwrap();

    let cn = RecommendOptions {
        algorithm: Algorithm::CommonNeighbors,
        ..Default::default()
    };
    let rec = algorithms::recommend(&graph, &liked(&[1]), &cn).unwrap();
    let m2 = rec.result.items.iter().find(|i| i.movie_id == 2).unwrap();
    assert_eq!(m2.score, 2.0);

    // Jaccard: user 1 has 2 movies (1/2), user 2 has 3 movies (1/3)
    let rec = algorithms::recommend(&graph, &liked(&[1]), &RecommendOptions::default()).unwrap();
    let m2 = rec.result.items.iter().find(|i| i.movie_id == 2).unwrap();
    assert!((m2.score - (0.5 + 1.0 / 3.0)).abs() < 1e-12);
}

#[test]
fn test_unrated_selection_is_empty_success() {
    let (_dir, config) = write_dataset();
    let graph = load_graph(&config).unwrap();

    // movie 5 only has a 3.0 rating, so nobody liked it
    let rec = algorithms::recommend(&graph, &liked(&[5]), &RecommendOptions::default()).unwrap();
    assert!(rec.result.is_empty());
}

#[test]
fn test_comedy_filter_drops_higher_scoring_drama() {
    let movies = [
        MovieRecord::new(1, "Seed", 4.0).with_genres(["Comedy"]),
        MovieRecord::new(2, "Big Drama", 4.0).with_genres(["Drama"]),
        MovieRecord::new(3, "Small Comedy", 4.0).with_genres(["Comedy"]),
    ]
    .into_iter()
    .map(|m| (m.movie_id, m))
    .collect();
    let ratings = vec![
        RatingRecord::new(1, 1, 5.0),
        RatingRecord::new(1, 2, 5.0),
        RatingRecord::new(2, 1, 5.0),
        RatingRecord::new(2, 2, 5.0),
        RatingRecord::new(2, 3, 5.0),
    ];
    let graph = build_graph(&movies, &ratings, 3.5).unwrap();

    let unfiltered = algorithms::recommend(&graph, &liked(&[1]), &RecommendOptions::default()).unwrap();
    assert_eq!(unfiltered.result.items[0].movie_id, 2);

    let comedy = RecommendOptions {
        genre_filter: Some("Comedy".to_string()),
        ..Default::default()
    };
    let filtered = algorithms::recommend(&graph, &liked(&[1]), &comedy).unwrap();
    assert_eq!(filtered.result.movie_ids(), vec![3]);
}

#[test]
fn test_prioritize_rating_ranks_better_rated_first() {
    let movies = [
        MovieRecord::new(1, "Seed", 4.0),
        MovieRecord::new(2, "A Poor Film", 2.0),
        MovieRecord::new(3, "Z Great Film", 4.5),
    ]
    .into_iter()
    .map(|m| (m.movie_id, m))
    .collect();
    let ratings = vec![
        RatingRecord::new(1, 1, 5.0),
        RatingRecord::new(1, 2, 4.0),
        RatingRecord::new(1, 3, 4.0),
    ];
    let graph = build_graph(&movies, &ratings, 3.5).unwrap();

    let opts = RecommendOptions {
        prioritize_rating: true,
        ..Default::default()
    };
    let rec = algorithms::recommend(&graph, &liked(&[1]), &opts).unwrap();
    assert_eq!(rec.result.items[0].score, rec.result.items[1].score);
    assert_eq!(rec.result.movie_ids(), vec![3, 2]);
}

#[test]
fn test_min_rating_is_monotonic() {
    let (_dir, config) = write_dataset();
    let data = Dataset::load(&config.dataset).unwrap();
    let graph = build_graph(&data.movies, &data.ratings, 3.5).unwrap();

    let run = |min_rating: f64| -> BTreeSet<MovieId> {
        let opts = RecommendOptions {
            top_n: 100,
            min_rating,
            ..Default::default()
        };
        algorithms::recommend(&graph, &liked(&[1]), &opts)
            .unwrap()
            .result
            .movie_ids()
            .into_iter()
            .collect()
    };

    let loose = run(2.0);
    let strict = run(4.3);
    assert!(strict.is_subset(&loose));
    for movie_id in &loose {
        if graph.movie(*movie_id).unwrap().average_rating >= 4.3 {
            assert!(strict.contains(movie_id));
        }
    }
}

#[test]
fn test_recommend_is_idempotent() {
    let (_dir, config) = write_dataset();
    let graph = load_graph(&config).unwrap();

    for algorithm in [Algorithm::Jaccard, Algorithm::CommonNeighbors] {
        let opts = RecommendOptions {
            algorithm,
            ..Default::default()
        };
        let first = algorithms::recommend(&graph, &liked(&[1, 6]), &opts).unwrap();
        let second = algorithms::recommend(&graph, &liked(&[1, 6]), &opts).unwrap();
        assert_eq!(first, second);
        assert!(first
            .result
            .items
            .iter()
            .all(|i| i.movie_id != 1 && i.movie_id != 6));
    }
}

#[test]
fn test_subgraph_contains_only_related_nodes() {
    let (_dir, config) = write_dataset();
    let graph = load_graph(&config).unwrap();
    let selection = liked(&[2]);

    let rec = algorithms::recommend(&graph, &selection, &RecommendOptions::default()).unwrap();
    let viz = extract_subgraph(
        &graph,
        &selection,
        &rec.similar_users,
        &rec.result,
        &SubgraphOptions::default(),
    );

    // users 1 and 2 liked movie 2; user 3 and 4 never did
    assert!(viz.node("u_1").is_some());
    assert!(viz.node("u_2").is_some());
    assert!(viz.node("u_3").is_none());
    assert!(viz.node("u_4").is_none());
    assert!(viz.has_edge("you", "m_2"));
    assert_eq!(viz.nodes.len(), 1 + 2 + 1 + rec.result.len());
    for edge in viz.edges.iter().filter(|e| e.source != "you") {
        assert!(edge.weight.unwrap() >= 3.5);
    }
}

async fn call(app: axum::Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn app() -> (tempfile::TempDir, axum::Router) {
    let (dir, config) = write_dataset();
    let state = AppState::new(config).unwrap();
    (dir, create_router(state))
}

#[tokio::test]
async fn test_http_recommendations() {
    let (_dir, app) = app();
    let (status, body) = call(
        app,
        "POST",
        "/recommendations",
        Some(r#"{"liked_movies":[1],"top_n":3,"algorithm":"cn"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let recs = body["data"]["recommendations"].as_array().unwrap();
    assert!(!recs.is_empty() && recs.len() <= 3);
    assert_eq!(recs[0]["movie_id"], 2);
    assert_eq!(body["data"]["algorithm"], "common_neighbors");
}

#[tokio::test]
async fn test_http_rejects_empty_selection() {
    let (_dir, app) = app();
    let (status, body) = call(
        app.clone(),
        "POST",
        "/recommendations",
        Some(r#"{"liked_movies":[]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = call(app, "POST", "/recommendations", Some(r#"{"liked_movies":[999]}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_http_graph_and_catalog() {
    let (_dir, app) = app();

    let (status, body) = call(app.clone(), "POST", "/graph", Some(r#"{"liked_movies":[1]}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["graph"]["liked_count"], 1);
    assert_eq!(body["data"]["graph"]["nodes"][0]["key"], "you");

    let (status, body) = call(app.clone(), "GET", "/movies?genre=Comedy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    let (_, body) = call(app.clone(), "GET", "/genres", None).await;
    assert_eq!(body["data"][0], "Action");

    let (status, body) = call(app.clone(), "POST", "/users/4/recommendations", Some("{}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["recommendations"].is_array());

    let (_, body) = call(app, "GET", "/health", None).await;
    assert_eq!(body["data"]["movies"], 6);
}
