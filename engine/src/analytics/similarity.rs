// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Cosine similarity and the exact pairwise sweep over a domain's embeddings.
//!
//! The sweep is exact: every same-domain pair is compared, O(n²·d), so edge
//! sets are deterministic with no index drift. Callers shard by domain to
//! bound cost; the inner loop is parallelized over source rows with rayon.

use rayon::prelude::*;

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    (dot_product / (magnitude_a * magnitude_b)) as f64
}

/// Undirected similarity pair over arena indices, `source < target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityPair {
    pub source: usize,
    pub target: usize,
    pub similarity: f64,
}

/// Compare every pair of embeddings and keep pairs with similarity >= threshold.
///
/// Monotonic in the threshold: raising it never adds pairs.
pub fn pairwise_similarities(embeddings: &[Vec<f32>], threshold: f64) -> Vec<SimilarityPair> {
    let n = embeddings.len();
    if n < 2 {
        return Vec::new();
    }

    (0..n - 1)
        .into_par_iter()
        .flat_map_iter(|i| {
            let row = &embeddings[i];
            (i + 1..n).filter_map(move |j| {
                let similarity = cosine_similarity(row, &embeddings[j]);
                if similarity >= threshold {
                    Some(SimilarityPair {
                        source: i,
                        target: j,
                        similarity,
                    })
                } else {
                    None
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.6, 0.8, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_magnitude() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_mismatched_lengths() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_pairwise_threshold_filter() {
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.0, 1.0],
        ];

        let pairs = pairwise_similarities(&embeddings, 0.5);
        // Only (0,1) survives at 0.5; the near-orthogonal pairs are dropped.
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].source, pairs[0].target), (0, 1));
        assert!(pairs[0].similarity >= 0.5);
    }

    #[test]
    fn test_pairwise_monotonic_in_threshold() {
        let embeddings: Vec<Vec<f32>> = (0..8)
            .map(|i| {
                let angle = i as f32 * 0.3;
                vec![angle.cos(), angle.sin()]
            })
            .collect();

        let loose = pairwise_similarities(&embeddings, 0.1).len();
        let tight = pairwise_similarities(&embeddings, 0.7).len();
        assert!(tight <= loose);
    }

    #[test]
    fn test_pairwise_empty_and_singleton() {
        assert!(pairwise_similarities(&[], 0.0).is_empty());
        assert!(pairwise_similarities(&[vec![1.0, 0.0]], 0.0).is_empty());
    }
}
