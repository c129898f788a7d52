use fuzzyrec::algorithms::{FuzzyEngine, ProfileBuilder, Ranker, RelevanceModel};
use fuzzyrec::services::store::{CatalogView, InMemoryCatalog, InteractionLog};
use fuzzyrec::*;
use std::collections::HashSet;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    init_tracing();

    println!("🚀 fuzzyrec basic usage");

    // 1. Catalog
    let catalog = InMemoryCatalog::with_items(vec![
        Item::new(1, "Action One").with_categories(&["Action"]).with_rating(8.0).with_popularity(0.9).curated(),
        Item::new(2, "Romantic Drama").with_categories(&["Romance", "Drama"]).with_rating(7.5).with_popularity(0.7).curated(),
        Item::new(3, "Sci-Fi Epic").with_categories(&["Sci-Fi"]).with_rating(8.5).with_popularity(0.8).curated(),
        Item::new(4, "Action Two").with_categories(&["Action", "Sci-Fi"]).with_rating(7.0).with_popularity(0.6),
        Item::new(5, "Comedy Fun").with_categories(&["Comedy"]).with_rating(6.0).with_popularity(55.0),
        Item::new(6, "Long Haul").with_categories(&["Action", "War"]).with_rating(7.8).with_popularity(0.4).with_duration(160),
    ]);
    println!("📦 Catalog holds {} items", catalog.len());

    // 2. Raw fuzzy engine
    let engine = FuzzyEngine::new();
    for (a, p, r) in [(1.0, 1.0, 1.0), (0.5, 0.6, 0.5), (0.0, 0.0, 0.0)] {
        println!("🧮 relevance({a}, {p}, {r}) = {:.3}", engine.relevance(a, p, r));
    }
    let (_, breakdown) = engine.relevance_with_breakdown(0.8, 0.7, 0.9);
    println!("🔍 breakdown: {}", serde_json::to_string_pretty(&breakdown)?);

    // 3. Full session through the services
    let state = AppState::with_catalog(Config::default(), Arc::new(catalog));
    let session = state.session_service.start_session(1, Some(5));

    let script = [
        (1, Decision::Like, None),
        (2, Decision::Dislike, None),
        (3, Decision::Like, Some(5)),
        (5, Decision::NotEvaluated, None),
        (6, Decision::Like, Some(4)),
        (4, Decision::Dislike, Some(2)),
    ];
    for (item_id, decision, score) in script {
        match state
            .session_service
            .register_decision(session.id, item_id, decision, score)
        {
            Some(interaction) => println!("  ✅ {:?} on item {} (score {:?})", interaction.decision, item_id, score),
            None => println!("  ⛔ decision on item {} rejected", item_id),
        }
    }

    if let Some(progress) = state.session_service.progress(session.id) {
        println!("📈 Progress: {}/{} ({:?})", progress.current, progress.target, progress.status);
    }

    let profile = state.preference_service.build_profile(1, Some(session.id));
    println!("🎯 Profile: {:?}", profile.category_affinities);
    println!("⭐ Preferred rating: {:?}", profile.preferred_rating);

    let request = RecommendationRequest {
        user_id: 1,
        session_id: session.id,
        num_recommendations: 3,
        include_breakdown: false,
        filters: RecommendationFilters::default(),
    };
    match state.recommendation_service.recommend(&request) {
        Some(response) => {
            println!("🏆 Recommendations:");
            for (i, rec) in response.recommendations.iter().enumerate() {
                println!("  {}. {} | score {:.3} | affinity {:.3}", i + 1, rec.item.title, rec.score, rec.affinity);
            }
        }
        None => println!("🔒 Recommendations are still locked"),
    }

    // 4. Ranking without the services
    let items: Vec<Item> = state.catalog.list_catalog(100);
    let interactions = state.interactions.list_by_session(session.id);
    let profile = ProfileBuilder::new().build(1, &interactions, &state.catalog.items_by_id());
    let ranked = Ranker::default().rank(
        &items,
        &profile,
        &HashSet::new(),
        &RecommendationFilters {
            categories: vec!["action".to_string()],
            duration: Some(DurationBucket::Long),
        },
        5,
        true,
    );
    println!("🎬 Long action titles: {:?}", ranked.iter().map(|r| &r.item.title).collect::<Vec<_>>());

    println!("\n🎉 Done");
    Ok(())
}
