use std::cmp::Ordering;

use crate::dataset::RatingStore;
use crate::error::Result;
use crate::io::{ItemIdx, Rating, UserIdx};

/// Capability shared by all rating predictors the evaluator can drive.
///
/// `train` replaces all previously learned state, so an engine can be reused
/// across folds without leaking anything from an earlier training set.
pub trait PredictionEngine {
    fn name(&self) -> &'static str;

    fn train(&mut self, ratings: RatingStore) -> Result<()>;

    fn predict_rating(&mut self, user: UserIdx, item: ItemIdx) -> Result<Rating>;

    /// At most `how_many` unrated items for `user`, best first.
    fn predict_top_k(&mut self, user: UserIdx, how_many: usize) -> Result<Vec<ItemScore>>;
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ItemScore {
    pub id: ItemIdx,
    pub score: f64,
}

impl ItemScore {
    pub fn new(id: ItemIdx, score: f64) -> Self {
        ItemScore { id, score }
    }
}

impl Eq for ItemScore {}

impl Ord for ItemScore {
    fn cmp(&self, other: &Self) -> Ordering {
        // reverse order by score
        match self.score.partial_cmp(&other.score) {
            Some(Ordering::Less) => Ordering::Greater,
            Some(Ordering::Greater) => Ordering::Less,
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for ItemScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scores every candidate, keeps positive scores and returns the best `how_many`.
/// The sort is stable, so equal scores stay in candidate order.
pub(crate) fn rank_candidates<F>(
    candidates: Vec<ItemIdx>,
    how_many: usize,
    mut score: F,
) -> Result<Vec<ItemScore>>
where
    F: FnMut(ItemIdx) -> Result<Rating>,
{
    let mut scored = Vec::with_capacity(candidates.len());
    for item in candidates {
        let predicted = score(item)?;
        if predicted > 0.0 {
            scored.push(ItemScore::new(item, predicted));
        }
    }
    scored.sort();
    scored.truncate(how_many);
    Ok(scored)
}
