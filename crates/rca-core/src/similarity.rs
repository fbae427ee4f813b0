use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// DistanceMetric
// ---------------------------------------------------------------------------

/// Dissimilarity between two embedding vectors. Lower is more similar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Cosine,
}

impl DistanceMetric {
    /// `None` when the vectors differ in length or a cosine operand is zero.
    pub fn distance(self, a: &[f32], b: &[f32]) -> Option<f64> {
        if a.len() != b.len() || a.is_empty() {
            return None;
        }
        match self {
            DistanceMetric::Euclidean => {
                let sum: f64 = a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| {
                        let d = f64::from(*x) - f64::from(*y);
                        d * d
                    })
                    .sum();
                Some(sum.sqrt())
            }
            DistanceMetric::Cosine => {
                let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
                for (x, y) in a.iter().zip(b) {
                    let (x, y) = (f64::from(*x), f64::from(*y));
                    dot += x * y;
                    na += x * x;
                    nb += y * y;
                }
                if na == 0.0 || nb == 0.0 {
                    return None;
                }
                Some(1.0 - dot / (na.sqrt() * nb.sqrt()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MatchLabel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchLabel {
    LikelyMatch,
    SomewhatSimilar,
}

impl MatchLabel {
    /// Strictly below the likely-match threshold is a likely match.
    pub fn classify(distance: f64, likely_match_distance: f64) -> Self {
        if distance < likely_match_distance {
            MatchLabel::LikelyMatch
        } else {
            MatchLabel::SomewhatSimilar
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchLabel::LikelyMatch => "likely match",
            MatchLabel::SomewhatSimilar => "somewhat similar",
        }
    }
}

impl fmt::Display for MatchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Nearest-neighbour ranking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorQuery<'a> {
    pub embedding: &'a [f32],
    pub top_k: usize,
    pub cutoff: f64,
    pub metric: DistanceMetric,
}

/// Top-k nearest candidates by ascending distance, then filtered to
/// `distance <= cutoff`. Candidates with no embedding or a mismatched
/// dimension are skipped. Ties keep input order.
pub fn rank_neighbors<T>(query: &VectorQuery<'_>, candidates: Vec<(T, Vec<f32>)>) -> Vec<(T, f64)> {
    let mut scored: Vec<(T, f64)> = candidates
        .into_iter()
        .filter_map(|(item, emb)| {
            if emb.is_empty() {
                return None;
            }
            match query.metric.distance(query.embedding, &emb) {
                Some(d) => Some((item, d)),
                None => {
                    tracing::warn!(
                        expected = query.embedding.len(),
                        got = emb.len(),
                        "skipping candidate with incomparable embedding"
                    );
                    None
                }
            }
        })
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.truncate(query.top_k);
    scored.retain(|(_, d)| *d <= query.cutoff);
    scored
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn query(emb: &[f32], top_k: usize, cutoff: f64) -> VectorQuery<'_> {
        VectorQuery {
            embedding: emb,
            top_k,
            cutoff,
            metric: DistanceMetric::Euclidean,
        }
    }

    #[test]
    fn euclidean_distance() {
        let d = DistanceMetric::Euclidean
            .distance(&[0.0, 0.0], &[3.0, 4.0])
            .unwrap();
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_distance_of_parallel_vectors_is_zero() {
        let d = DistanceMetric::Cosine
            .distance(&[1.0, 2.0], &[2.0, 4.0])
            .unwrap();
        assert!(d.abs() < 1e-9);
        assert!(DistanceMetric::Cosine.distance(&[0.0, 0.0], &[1.0, 1.0]).is_none());
    }

    #[test]
    fn mismatched_dimensions_are_incomparable() {
        assert!(DistanceMetric::Euclidean.distance(&[1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn labels_follow_likely_match_threshold() {
        assert_eq!(MatchLabel::classify(0.3, 0.9), MatchLabel::LikelyMatch);
        assert_eq!(MatchLabel::classify(0.7, 0.9), MatchLabel::LikelyMatch);
        assert_eq!(MatchLabel::classify(0.9, 0.9), MatchLabel::SomewhatSimilar);
        assert_eq!(MatchLabel::classify(0.3, 0.5).as_str(), "likely match");
        assert_eq!(MatchLabel::classify(0.7, 0.5).as_str(), "somewhat similar");
    }

    #[test]
    fn rank_excludes_hits_beyond_cutoff() {
        let q = [0.0f32];
        let candidates = vec![("far", vec![0.6f32]), ("near", vec![0.3f32])];
        let ranked = rank_neighbors(&query(&q, 5, 0.5), candidates);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0, "near");
        assert!((ranked[0].1 - 0.3).abs() < 1e-6);
    }

    #[test]
    fn rank_orders_by_ascending_distance() {
        let q = [0.0f32];
        let candidates = vec![
            ("c", vec![0.4f32]),
            ("a", vec![0.1f32]),
            ("b", vec![0.2f32]),
        ];
        let ranked = rank_neighbors(&query(&q, 5, 1.0), candidates);
        let ids: Vec<&str> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn rank_applies_top_k_before_cutoff() {
        let q = [0.0f32];
        let candidates = vec![
            ("a", vec![0.1f32]),
            ("b", vec![0.2f32]),
            ("c", vec![0.3f32]),
        ];
        let ranked = rank_neighbors(&query(&q, 2, 1.0), candidates);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn rank_skips_missing_and_mismatched_embeddings() {
        let q = [0.0f32, 0.0];
        let candidates = vec![
            ("empty", vec![]),
            ("short", vec![0.1f32]),
            ("ok", vec![0.1f32, 0.1]),
        ];
        let ranked = rank_neighbors(&query(&q, 5, 1.0), candidates);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0, "ok");
    }
}
