//! Distance combination and relevance conversion.
//!
//! Matching produces distances (0.0 is perfect); everything user-facing is a
//! relevance score where 1.0 is perfect. The conversion lives here so both
//! directions agree.

/// Stands in for a zero distance so a perfect field still contributes to the product.
const PERFECT_FIELD: f64 = f64::EPSILON;

/// A matched field's contribution to the record distance.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldScore {
    pub distance: f64,
    pub weight: f64,
    pub norm: f64,
}

/// Combines matched fields into one record distance in `[0, 1]`.
///
/// Weighted product `Π d^(weight * norm)`: each matching field pulls the record
/// closer to 0, heavier and shorter fields pull harder. Returns `None` when
/// nothing matched.
pub(crate) fn combine_distances(fields: &[FieldScore]) -> Option<f64> {
    if fields.is_empty() {
        return None;
    }

    let total = fields.iter().fold(1.0_f64, |acc, field| {
        let distance = if field.distance <= 0.0 {
            PERFECT_FIELD
        } else {
            field.distance
        };
        acc * distance.powf(field.weight * field.norm)
    });

    Some(total.clamp(0.0, 1.0))
}

/// Converts a matcher distance into a relevance score (1.0 = best).
pub fn relevance_from_distance(distance: f64) -> f64 {
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Scales weights so they sum to 1. Non-positive weights are dropped.
pub(crate) fn normalize_weights<K: Copy>(weights: &[(K, f64)]) -> Vec<(K, f64)> {
    let positive: Vec<_> = weights.iter().copied().filter(|(_, w)| *w > 0.0).collect();
    let total: f64 = positive.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    positive.into_iter().map(|(k, w)| (k, w / total)).collect()
}

/// Case-insensitive name relevance for suggestion ranking.
///
/// - 100: exact match
/// - 50: name starts with the prefix
/// - 10: name contains the prefix
/// - None: no literal match (fuzzy-only)
pub(crate) fn prefix_relevance(name: &str, prefix: &str) -> Option<u32> {
    let name = name.to_lowercase();
    let prefix = prefix.to_lowercase();
    if name == prefix {
        Some(100)
    } else if name.starts_with(&prefix) {
        Some(50)
    } else if name.contains(&prefix) {
        Some(10)
    } else {
        None
    }
}
