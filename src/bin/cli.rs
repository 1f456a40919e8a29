use anyhow::{bail, Result};
use cinegraph::algorithms::{self, SubgraphOptions};
use cinegraph::{init_tracing, load_graph, Algorithm, Config, MovieId, RecommendOptions, UserId};
use clap::Parser;
use std::collections::BTreeSet;
use tracing::info;

/// Prints recommendations straight from the dataset, without the HTTP layer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Comma-separated liked movie ids
    #[arg(long, value_delimiter = ',', conflicts_with = "user")]
    liked: Vec<MovieId>,

    /// Recommend for an existing user instead of a liked list
    #[arg(long)]
    user: Option<UserId>,

    #[arg(short = 'n', long, default_value_t = 10)]
    top_n: usize,

    #[arg(short, long, default_value = "jaccard")]
    algorithm: Algorithm,

    #[arg(short, long)]
    genre: Option<String>,

    #[arg(long, default_value_t = 0.0)]
    min_rating: f64,

    #[arg(long)]
    prioritize_rating: bool,

    /// Number of similar users to list
    #[arg(long, default_value_t = 5)]
    similar: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", &args.log_level);
    }
    init_tracing();

    let config = Config::load_or_default(&args.config)?;
    let graph = load_graph(&config)?;
    info!("Graph stats: {:?}", graph.stats());

    let options = RecommendOptions {
        top_n: args.top_n,
        algorithm: args.algorithm,
        genre_filter: args.genre.clone(),
        min_rating: args.min_rating,
        prioritize_rating: args.prioritize_rating,
    };

    let (liked, recommendation) = match args.user {
        Some(user_id) => {
            let liked: BTreeSet<MovieId> = graph
                .liked_movies_of(user_id)
                .map(|movies| movies.keys().copied().collect())
                .unwrap_or_default();
            (liked, algorithms::recommend_for_user(&graph, user_id, &options)?)
        }
        None if args.liked.is_empty() => bail!("pass --liked <ids> or --user <id>"),
        None => {
            let liked: BTreeSet<MovieId> = args.liked.iter().copied().collect();
            let rec = algorithms::recommend(&graph, &liked, &options)?;
            (liked, rec)
        }
    };

    println!("Liked movies:");
    for movie_id in &liked {
        if let Some(movie) = graph.movie(*movie_id) {
            println!("  - {} (id={})", movie.title, movie_id);
        }
    }

    println!("\nTop {} recommendations ({}):", args.top_n, args.algorithm);
    if recommendation.result.is_empty() {
        println!("  no recommendations for this selection");
    }
    for item in &recommendation.result.items {
        let weighted = item
            .weighted_score
            .map(|w| format!(", weighted={:.4}", w))
            .unwrap_or_default();
        println!(
            "{:>3}. {} (id={}): score={:.4}{}, supporters={}, avg_rating={:.2}",
            item.rank, item.title, item.movie_id, item.score, weighted, item.supporters, item.average_rating
        );
    }

    let viz = algorithms::extract_subgraph(
        &graph,
        &liked,
        &recommendation.similar_users,
        &recommendation.result,
        &SubgraphOptions {
            similar_users: args.similar,
            ..SubgraphOptions::from(&config.recommendation)
        },
    );

    println!("\nMost similar users:");
    for user in &viz.similar_users {
        println!(
            "  User {}: similarity={:.4}, shared={} [{}]",
            user.user_id,
            user.similarity,
            user.shared_count,
            user.shared_movies.join(", ")
        );
    }
    println!(
        "\nSubgraph: {} nodes, {} edges",
        viz.nodes.len(),
        viz.edges.len()
    );

    Ok(())
}
