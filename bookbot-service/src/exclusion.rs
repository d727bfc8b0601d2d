use std::collections::HashSet;
use tracing::debug;

use crate::models::{Recommendation, ResultSet, normalize_title};

/// Drop every recommendation whose normalised title appears in `exclusion`.
/// Order of the survivors is preserved; neither input is modified.
pub fn exclude_delivered(recommendations: &[Recommendation], exclusion: &[String]) -> ResultSet {
    if exclusion.is_empty() {
        return recommendations.to_vec();
    }

    let excluded: HashSet<String> = exclusion.iter().map(|t| normalize_title(t)).collect();
    recommendations
        .iter()
        .filter(|recommendation| {
            let keep = !excluded.contains(&recommendation.normalized_title());
            if !keep {
                debug!(title = %recommendation.title, "Removing already-delivered title");
            }
            keep
        })
        .cloned()
        .collect()
}
