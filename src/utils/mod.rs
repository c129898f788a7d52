use std::sync::atomic::{AtomicU64, Ordering};

pub mod validation;

/// Clamps to `[0, 1]`; NaN collapses to 0.
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

pub fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Brings a raw popularity onto `[0, 1]`.
///
/// Catalog popularity arrives either as a fraction or on a 0-100 scale, so
/// anything above 1 is read as a percentage.
pub fn normalize_popularity(popularity: f64) -> f64 {
    if popularity > 1.0 {
        clamp01(popularity / 100.0)
    } else {
        clamp01(popularity)
    }
}

/// Monotonic id source handed to whichever store creates records.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp01() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(1.5), 1.0);
        assert_eq!(clamp01(0.25), 0.25);
        assert_eq!(clamp01(f64::NAN), 0.0);
        assert_eq!(clamp01(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_normalize_popularity() {
        assert!((normalize_popularity(0.7) - 0.7).abs() < 1e-12);
        assert!((normalize_popularity(85.0) - 0.85).abs() < 1e-12);
        assert_eq!(normalize_popularity(250.0), 1.0);
        assert_eq!(normalize_popularity(-3.0), 0.0);
        assert_eq!(normalize_popularity(1.0), 1.0);
    }

    #[test]
    fn test_id_allocator_is_monotonic() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        let ids = IdAllocator::starting_at(100);
        assert_eq!(ids.next_id(), 100);
    }

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category("  Sci-Fi "), "sci-fi");
    }
}
