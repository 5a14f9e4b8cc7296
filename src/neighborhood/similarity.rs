use std::cmp::Ordering;
use std::str::FromStr;

use hashbrown::HashMap;

use crate::dataset::RatingStore;
use crate::error::Error;
use crate::io::ItemIdx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityKind {
    /// Cosine over co-raters after subtracting each co-rater's mean rating.
    AdjustedCosine,
    /// Plain cosine over the raw co-rated values.
    Cosine,
}

impl FromStr for SimilarityKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "adjusted_cosine" | "adjusted" => Ok(SimilarityKind::AdjustedCosine),
            "cosine" => Ok(SimilarityKind::Cosine),
            other => Err(Error::InvalidConfig(format!(
                "unknown similarity `{}`, expected adjusted_cosine or cosine",
                other
            ))),
        }
    }
}

/// Item-item similarities computed so far, keyed by the unordered item pair.
/// `None` marks a pair whose similarity is unusable (at most one co-rater or a
/// zero norm); such pairs are remembered so they are never recomputed.
#[derive(Debug, Default)]
pub struct SimilarityCache {
    entries: HashMap<(ItemIdx, ItemIdx), Option<f64>>,
}

impl SimilarityCache {
    fn key(a: ItemIdx, b: ItemIdx) -> (ItemIdx, ItemIdx) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn get_or_compute<F>(&mut self, a: ItemIdx, b: ItemIdx, compute: F) -> Option<f64>
    where
        F: FnOnce(ItemIdx, ItemIdx) -> Option<f64>,
    {
        let (low, high) = SimilarityCache::key(a, b);
        *self
            .entries
            .entry((low, high))
            .or_insert_with(|| compute(low, high))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Similarity of two items over the users who rated both. Both columns are
/// sorted by user, so the co-raters are found with a single merge pass.
pub(crate) fn item_similarity(
    store: &RatingStore,
    kind: SimilarityKind,
    a: ItemIdx,
    b: ItemIdx,
) -> Option<f64> {
    let raters_a = store.users_who_rated(a);
    let raters_b = store.users_who_rated(b);

    let mut co_raters = 0_usize;
    let mut dot = 0_f64;
    let mut norm_a = 0_f64;
    let mut norm_b = 0_f64;
    let (mut x, mut y) = (0, 0);
    while x < raters_a.len() && y < raters_b.len() {
        let (user_a, rating_a) = raters_a[x];
        let (user_b, rating_b) = raters_b[y];
        match user_a.cmp(&user_b) {
            Ordering::Less => x += 1,
            Ordering::Greater => y += 1,
            Ordering::Equal => {
                let offset = match kind {
                    SimilarityKind::AdjustedCosine => store.user_mean(user_a).unwrap_or(0.0),
                    SimilarityKind::Cosine => 0.0,
                };
                let deviation_a = rating_a - offset;
                let deviation_b = rating_b - offset;
                dot += deviation_a * deviation_b;
                norm_a += deviation_a * deviation_a;
                norm_b += deviation_b * deviation_b;
                co_raters += 1;
                x += 1;
                y += 1;
            }
        }
    }

    // A single co-rater always yields +-1, which says nothing about the items.
    if co_raters <= 1 || norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[cfg(test)]
mod similarity_test {
    use super::*;

    #[test]
    fn should_canonicalize_pairs() {
        let mut cache = SimilarityCache::default();
        let mut calls = 0;
        let first = cache.get_or_compute(7, 3, |low, high| {
            calls += 1;
            assert_eq!((3, 7), (low, high));
            Some(0.25)
        });
        let second = cache.get_or_compute(3, 7, |_, _| Some(-1.0));

        assert_eq!(1, calls);
        assert_eq!(Some(0.25), first);
        assert_eq!(Some(0.25), second);
        assert_eq!(1, cache.len());
    }

    #[test]
    fn should_parse_similarity_names() {
        assert_eq!(SimilarityKind::Cosine, "cosine".parse().unwrap());
        assert_eq!(
            SimilarityKind::AdjustedCosine,
            " Adjusted_Cosine ".parse().unwrap()
        );
        assert!("pearson".parse::<SimilarityKind>().is_err());
    }

    #[test]
    fn should_remember_unusable_pairs() {
        let mut cache = SimilarityCache::default();
        assert_eq!(None, cache.get_or_compute(1, 2, |_, _| None));
        assert_eq!(None, cache.get_or_compute(2, 1, |_, _| Some(1.0)));

        cache.clear();
        assert!(cache.is_empty());
    }
}
