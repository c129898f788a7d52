use crate::models::*;
use thiserror::Error;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Score must be between 1 and 5, got {0}")]
    ScoreOutOfRange(u8),

    #[error("Number of recommendations must be greater than 0")]
    ZeroRecommendations,

    #[error("Number of recommendations too large: {0} (max {1})")]
    TooManyRecommendations(usize, usize),

    #[error("Session target must be greater than 0")]
    ZeroTarget,

    #[error("Unknown duration bucket: {0}")]
    UnknownDuration(String),

    #[error("Category name too long (max 100 characters)")]
    CategoryTooLong,
}

pub fn validate_score(score: Option<u8>) -> Result<(), ValidationError> {
    match score {
        Some(s) if !(MIN_SCORE..=MAX_SCORE).contains(&s) => Err(ValidationError::ScoreOutOfRange(s)),
        _ => Ok(()),
    }
}

pub fn validate_target(target: u32) -> Result<(), ValidationError> {
    if target == 0 {
        return Err(ValidationError::ZeroTarget);
    }
    Ok(())
}

pub fn validate_filters(filters: &RecommendationFilters) -> Result<(), ValidationError> {
    if filters.categories.iter().any(|c| c.len() > 100) {
        return Err(ValidationError::CategoryTooLong);
    }
    Ok(())
}

pub fn validate_recommendation_request(
    request: &RecommendationRequest,
    max_k: usize,
) -> Result<(), ValidationError> {
    if request.num_recommendations == 0 {
        return Err(ValidationError::ZeroRecommendations);
    }

    if request.num_recommendations > max_k {
        return Err(ValidationError::TooManyRecommendations(
            request.num_recommendations,
            max_k,
        ));
    }

    validate_filters(&request.filters)
}

/// Splits a comma separated query value into trimmed, non-empty parts.
pub fn parse_category_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
