use anyhow::Result;
use clap::Parser;
use fuzzyrec::services::store::{CatalogView, InMemoryCatalog};
use fuzzyrec::{
    init_tracing, AppState, Config, Decision, Item, RecommendationFilters, RecommendationRequest,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs a scripted evaluation session and prints the resulting recommendations.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// JSON catalog; a small built-in catalog is used when absent.
    #[arg(long)]
    catalog: Option<String>,

    #[arg(short, long, default_value_t = 20)]
    evaluations: u32,

    #[arg(short, long, default_value_t = 10)]
    k: usize,

    #[arg(long)]
    breakdown: bool,
}

fn demo_catalog() -> InMemoryCatalog {
    let entries: [(u64, &str, &[&str], f64, f64, u32); 12] = [
        (1, "Steel Horizon", &["Action", "Sci-Fi"], 92.0, 7.9, 128),
        (2, "Quiet Letters", &["Romance", "Drama"], 71.0, 7.2, 112),
        (3, "Orbital Nine", &["Sci-Fi"], 88.0, 8.4, 141),
        (4, "Backstreet Run", &["Action", "Crime"], 65.0, 6.8, 97),
        (5, "Laugh Track", &["Comedy"], 54.0, 6.1, 94),
        (6, "Northern Vows", &["Romance"], 48.0, 6.6, 105),
        (7, "Deep Signal", &["Sci-Fi", "Thriller"], 77.0, 7.7, 133),
        (8, "Last Convoy", &["Action", "War"], 69.0, 7.4, 156),
        (9, "Paper Kingdom", &["Drama"], 58.0, 8.1, 119),
        (10, "Night Shift", &["Thriller", "Crime"], 62.0, 7.0, 101),
        (11, "Small Town Ghosts", &["Horror", "Comedy"], 40.0, 5.9, 89),
        (12, "Red Meridian", &["Action"], 83.0, 7.5, 124),
    ];

    InMemoryCatalog::with_items(entries.iter().map(|(id, title, genres, pop, rating, minutes)| {
        let item = Item::new(*id, *title)
            .with_categories(*genres)
            .with_popularity(*pop)
            .with_rating(*rating)
            .with_duration(*minutes);
        if *id <= 8 {
            item.curated()
        } else {
            item
        }
    }))
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let config = Config::load_or_default(&args.config)?;
    let catalog = match args.catalog.as_deref() {
        Some(path) => InMemoryCatalog::from_json_file(path)?,
        None => {
            info!("No catalog given, using the built-in demo catalog");
            demo_catalog()
        }
    };
    let catalog: Arc<dyn CatalogView> = Arc::new(catalog);

    let pool = catalog.list_top_pool(config.session.top_pool_size);
    let evaluations = args.evaluations.min(pool.len() as u32);
    if evaluations == 0 {
        anyhow::bail!("Catalog is empty, nothing to evaluate");
    }
    if evaluations < args.evaluations {
        warn!(
            "Pool only holds {} items, evaluating {} instead of {}",
            pool.len(),
            evaluations,
            args.evaluations
        );
    }

    let state = AppState::with_catalog(config, catalog);
    let user_id = 1;
    let session = state.session_service.start_session(user_id, Some(evaluations));

    // two likes for every dislike keeps the profile simple but reproducible
    for (idx, item) in pool.iter().take(evaluations as usize).enumerate() {
        let decision = if idx % 3 != 0 {
            Decision::Like
        } else {
            Decision::Dislike
        };
        state
            .session_service
            .register_decision(session.id, item.id, decision, None);
    }

    let request = RecommendationRequest {
        user_id,
        session_id: session.id,
        num_recommendations: args.k,
        include_breakdown: args.breakdown,
        filters: RecommendationFilters::default(),
    };
    let Some(response) = state.recommendation_service.recommend(&request) else {
        anyhow::bail!(
            "Recommendations locked: session needs at least {} valid evaluations",
            state.config.recommendation.min_evaluations_for_recommendations
        );
    };

    println!("\n=== Recommendations ===");
    for (idx, rec) in response.recommendations.iter().enumerate() {
        println!(
            "{:02}. {} ({}) score={:.3} affinity={:.3}",
            idx + 1,
            rec.item.title,
            rec.item.year,
            rec.score,
            rec.affinity
        );
        if let Some(breakdown) = &rec.breakdown {
            println!("    {}", serde_json::to_string(breakdown)?);
        }
    }

    Ok(())
}
