pub mod fuzzy;
pub mod profile;
pub mod ranker;

pub use fuzzy::{FuzzyBreakdown, FuzzyEngine};
pub use profile::ProfileBuilder;
pub use ranker::Ranker;

/// Maps (affinity, popularity, rating similarity) to a relevance in `[0, 1]`.
///
/// Implementations are pure and shared across request handlers.
pub trait RelevanceModel: Send + Sync {
    fn relevance_with_breakdown(
        &self,
        affinity: f64,
        popularity: f64,
        rating_similarity: f64,
    ) -> (f64, FuzzyBreakdown);

    fn relevance(&self, affinity: f64, popularity: f64, rating_similarity: f64) -> f64 {
        self.relevance_with_breakdown(affinity, popularity, rating_similarity)
            .0
    }
}
