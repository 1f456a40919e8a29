use cinegraph::algorithms::{self, extract_subgraph, SubgraphOptions};
use cinegraph::services::dataset::downsample_users;
use cinegraph::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

const GENRES: [&str; 6] = ["Action", "Comedy", "Drama", "Horror", "Romance", "Thriller"];

fn synthetic_dataset(users: i64, movies: i64, ratings_per_user: usize) -> (BTreeMap<MovieId, MovieRecord>, Vec<RatingRecord>) {
    let mut rng = StdRng::seed_from_u64(7);

    let catalog = (1..=movies)
        .map(|id| {
            let genre = GENRES[(id as usize) % GENRES.len()];
            let movie = MovieRecord::new(id, format!("Movie {}", id), rng.gen_range(1.0..5.0))
                .with_genres([genre]);
            (id, movie)
        })
        .collect();

    let mut ratings = Vec::with_capacity(users as usize * ratings_per_user);
    for user_id in 1..=users {
        for _ in 0..ratings_per_user {
            let movie_id = rng.gen_range(1..=movies);
            let rating = (rng.gen_range(1..=10) as f64) / 2.0;
            ratings.push(RatingRecord::new(user_id, movie_id, rating));
        }
    }

    (catalog, ratings)
}

fn benchmark_graph_build(c: &mut Criterion) {
    let (movies, ratings) = synthetic_dataset(2_000, 1_000, 50);

    c.bench_function("build_graph", |b| {
        b.iter(|| black_box(build_graph(&movies, &ratings, 3.5).unwrap()));
    });

    c.bench_function("downsample_users", |b| {
        b.iter(|| black_box(downsample_users(&ratings, 3.5, 10, Some((500, 42)))));
    });
}

fn benchmark_recommend(c: &mut Criterion) {
    let (movies, ratings) = synthetic_dataset(2_000, 1_000, 50);
    let graph = build_graph(&movies, &ratings, 3.5).unwrap();
    let liked: BTreeSet<MovieId> = [3, 17, 42, 99, 250].into_iter().collect();

    for algorithm in [Algorithm::Jaccard, Algorithm::CommonNeighbors] {
        let options = RecommendOptions {
            algorithm,
            ..Default::default()
        };
        c.bench_function(&format!("recommend_{}", algorithm), |b| {
            b.iter(|| black_box(algorithms::recommend(&graph, &liked, &options).unwrap()));
        });
    }

    let filtered = RecommendOptions {
        genre_filter: Some("Comedy".to_string()),
        min_rating: 3.0,
        prioritize_rating: true,
        ..Default::default()
    };
    c.bench_function("recommend_filtered", |b| {
        b.iter(|| black_box(algorithms::recommend(&graph, &liked, &filtered).unwrap()));
    });

    let recommendation = algorithms::recommend(&graph, &liked, &RecommendOptions::default()).unwrap();
    c.bench_function("extract_subgraph", |b| {
        b.iter(|| {
            black_box(extract_subgraph(
                &graph,
                &liked,
                &recommendation.similar_users,
                &recommendation.result,
                &SubgraphOptions::default(),
            ))
        });
    });
}

fn benchmark_serving(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (movies, ratings) = synthetic_dataset(500, 300, 30);
    let graph = build_graph(&movies, &ratings, 3.5).unwrap();
    let state = AppState::from_graph(Config::default(), graph);

    c.bench_function("serve_recommendations", |b| {
        b.iter(|| {
            let request = RecommendationRequest::new(vec![1, 2, 3]);
            black_box(rt.block_on(state.serving_service.serve_recommendations(request)).unwrap())
        });
    });
}

fn benchmark_utils(c: &mut Criterion) {
    use cinegraph::utils::*;

    let left: BTreeSet<MovieId> = (0..500).collect();
    let right: BTreeSet<MovieId> = (250..750).collect();

    c.bench_function("jaccard_similarity", |b| {
        b.iter(|| black_box(jaccard_similarity(&left, &right)));
    });
}

criterion_group!(
    benches,
    benchmark_graph_build,
    benchmark_recommend,
    benchmark_serving,
    benchmark_utils
);
criterion_main!(benches);
