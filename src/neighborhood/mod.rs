use dary_heap::OctonaryHeap;
use hashbrown::HashSet;
use tracing::debug;

use crate::candidates::candidates;
use crate::dataset::RatingStore;
use crate::engine::{rank_candidates, ItemScore, PredictionEngine};
use crate::error::{Error, Result};
use crate::io::{ItemIdx, Rating, UserIdx};

pub mod similarity;

use similarity::{item_similarity, SimilarityCache, SimilarityKind};

pub const DEFAULT_NEIGHBORHOOD_SIZE: usize = 50;

/// Returned for a user without any training ratings, whose mean is undefined.
pub const COLD_USER_RATING: Rating = 0.0;

const NAME: &str = "neighborhood";

/// Item-item collaborative filtering. A rating is predicted from the user's own
/// ratings of the most similar items, weighted by similarity.
pub struct NeighborhoodModel {
    neighborhood_size: usize,
    similarity_kind: SimilarityKind,
    store: Option<RatingStore>,
    similarities: SimilarityCache,
}

impl NeighborhoodModel {
    pub fn new(neighborhood_size: usize, similarity_kind: SimilarityKind) -> Self {
        NeighborhoodModel {
            neighborhood_size,
            similarity_kind,
            store: None,
            similarities: SimilarityCache::default(),
        }
    }

    /// Similarity between two items of the training set, `None` when unusable.
    pub fn similarity(&mut self, a: ItemIdx, b: ItemIdx) -> Result<Option<f64>> {
        let store = self.store.as_ref().ok_or(Error::NotTrained(NAME))?;
        store.check_item(a)?;
        store.check_item(b)?;
        let kind = self.similarity_kind;
        Ok(self
            .similarities
            .get_or_compute(a, b, |low, high| item_similarity(store, kind, low, high)))
    }

    pub fn cached_similarities(&self) -> usize {
        self.similarities.len()
    }

    fn trained_store(&self) -> Result<&RatingStore> {
        self.store.as_ref().ok_or(Error::NotTrained(NAME))
    }
}

impl Default for NeighborhoodModel {
    fn default() -> Self {
        NeighborhoodModel::new(DEFAULT_NEIGHBORHOOD_SIZE, SimilarityKind::AdjustedCosine)
    }
}

impl PredictionEngine for NeighborhoodModel {
    fn name(&self) -> &'static str {
        NAME
    }

    fn train(&mut self, ratings: RatingStore) -> Result<()> {
        debug!(
            discarded = self.similarities.len(),
            ratings = ratings.nnz(),
            "resetting similarity cache"
        );
        self.similarities.clear();
        self.store = Some(ratings);
        Ok(())
    }

    fn predict_rating(&mut self, user: UserIdx, item: ItemIdx) -> Result<Rating> {
        let store = self.store.as_ref().ok_or(Error::NotTrained(NAME))?;
        store.check_user(user)?;
        store.check_item(item)?;

        let rated = store.items_rated_by(user);
        let user_mean = match store.user_mean(user) {
            Some(mean) => mean,
            None => return Ok(COLD_USER_RATING),
        };

        // Items co-rated with `item` by someone, restricted to what `user` rated.
        let reachable: HashSet<ItemIdx> = store
            .users_who_rated(item)
            .iter()
            .flat_map(|&(other, _)| store.items_rated_by(other).iter().map(|&(c, _)| c))
            .collect();

        let kind = self.similarity_kind;
        let mut neighbors = OctonaryHeap::<ItemScore>::with_capacity(self.neighborhood_size);
        for &(candidate, _) in rated.iter().filter(|(c, _)| reachable.contains(c)) {
            let similarity = self
                .similarities
                .get_or_compute(candidate, item, |low, high| {
                    item_similarity(store, kind, low, high)
                });
            let similarity = match similarity {
                Some(value) if value > 0.0 => value,
                _ => continue,
            };

            let scored = ItemScore::new(candidate, similarity);
            if neighbors.len() < self.neighborhood_size {
                neighbors.push(scored);
            } else if let Some(mut weakest) = neighbors.peek_mut() {
                if similarity > weakest.score {
                    *weakest = scored;
                }
            }
        }

        let mut weighted_sum = 0_f64;
        let mut total_weight = 0_f64;
        for neighbor in neighbors.iter() {
            if let Some(rating) = store.rating(user, neighbor.id) {
                weighted_sum += neighbor.score * rating;
                total_weight += neighbor.score.abs();
            }
        }

        if total_weight > 0.0 {
            Ok(weighted_sum / total_weight)
        } else {
            Ok(user_mean)
        }
    }

    fn predict_top_k(&mut self, user: UserIdx, how_many: usize) -> Result<Vec<ItemScore>> {
        let store = self.trained_store()?;
        store.check_user(user)?;
        let pool = candidates(store, user);
        rank_candidates(pool, how_many, |item| self.predict_rating(user, item))
    }
}
