use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::debug;

use crate::candidates::candidates;
use crate::dataset::RatingStore;
use crate::engine::{rank_candidates, ItemScore, PredictionEngine};
use crate::error::{Error, Result};
use crate::io::{ItemIdx, Rating, UserIdx};

const NAME: &str = "factor";

const BASE_LEARNING_RATE: f64 = 0.01;
const FAST_LEARNING_RATE: f64 = 0.02;
const FAST_LEARNING_THRESHOLD: f64 = 0.5;
const LARGE_RANK: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct FactorConfig {
    pub rank: usize,
    pub regularization: f64,
    pub max_epochs: usize,
    pub target_error: f64,
    pub rating_min: Rating,
    pub rating_max: Rating,
    pub seed: Option<u64>,
}

impl Default for FactorConfig {
    fn default() -> Self {
        FactorConfig {
            rank: 50,
            regularization: 0.01,
            max_epochs: 50,
            target_error: 0.05,
            rating_min: 0.0,
            rating_max: 5.0,
            seed: None,
        }
    }
}

pub type EpochCallback = Box<dyn FnMut(usize, f64)>;

/// Low-rank matrix factorization trained with stochastic gradient descent.
/// Factor rows exist for every user and item in the identity maps, including
/// those without training ratings.
pub struct FactorModel {
    config: FactorConfig,
    effective_rank: usize,
    user_factors: Vec<f64>,
    item_factors: Vec<f64>,
    store: Option<RatingStore>,
    training_error: Option<f64>,
    on_epoch: Option<EpochCallback>,
}

impl FactorModel {
    pub fn new(config: FactorConfig) -> Self {
        FactorModel {
            config,
            effective_rank: 0,
            user_factors: Vec::new(),
            item_factors: Vec::new(),
            store: None,
            training_error: None,
            on_epoch: None,
        }
    }

    /// Registers a callback invoked with `(epoch, mean_abs_err)` after every epoch.
    pub fn with_epoch_callback(mut self, on_epoch: EpochCallback) -> Self {
        self.on_epoch = Some(on_epoch);
        self
    }

    /// Mean absolute error of the last training epoch, `None` before training
    /// or when the training set was empty.
    pub fn training_error(&self) -> Option<f64> {
        self.training_error
    }

    pub fn effective_rank(&self) -> usize {
        self.effective_rank
    }

    /// Starting rate follows the configured rank, the faster rate the
    /// effective one.
    fn learning_rates(&self) -> (f64, f64) {
        let base = if self.config.rank > LARGE_RANK {
            1.0 / self.config.rank as f64
        } else {
            BASE_LEARNING_RATE
        };
        let fast = if self.effective_rank > LARGE_RANK {
            2.0 / self.effective_rank as f64
        } else {
            FAST_LEARNING_RATE
        };
        (base, fast)
    }

    fn dot(&self, user: UserIdx, item: ItemIdx) -> f64 {
        let r = self.effective_rank;
        let user_row = &self.user_factors[user * r..(user + 1) * r];
        let item_row = &self.item_factors[item * r..(item + 1) * r];
        user_row.iter().zip(item_row).map(|(u, v)| u * v).sum()
    }

    fn fit(&mut self, store: &RatingStore) {
        let r = self.effective_rank;
        let lambda = self.config.regularization;
        let (base_rate, fast_rate) = self.learning_rates();
        let mut alpha = base_rate;
        let entries: Vec<(UserIdx, ItemIdx, Rating)> = store.entries().collect();

        let mut epoch = 0;
        loop {
            let mut abs_err = 0_f64;
            for &(user, item, rating) in &entries {
                let err = rating - self.dot(user, item);
                abs_err += err.abs();

                // The item row steps along the already updated user row.
                let user_row = &mut self.user_factors[user * r..(user + 1) * r];
                let item_row = &mut self.item_factors[item * r..(item + 1) * r];
                for (u, v) in user_row.iter_mut().zip(item_row.iter_mut()) {
                    *u += alpha * (err * *v - lambda * *u);
                    *v += alpha * (err * *u - lambda * *v);
                }
            }

            epoch += 1;
            let mean_abs_err = abs_err / entries.len() as f64;
            self.training_error = Some(mean_abs_err);
            debug!(epoch, mean_abs_err, "factor model epoch");
            if let Some(on_epoch) = self.on_epoch.as_mut() {
                on_epoch(epoch, mean_abs_err);
            }

            if epoch > self.config.max_epochs || mean_abs_err < self.config.target_error {
                break;
            }
            if mean_abs_err < FAST_LEARNING_THRESHOLD {
                alpha = fast_rate;
            }
        }
    }

    fn trained_store(&self) -> Result<&RatingStore> {
        self.store.as_ref().ok_or(Error::NotTrained(NAME))
    }
}

impl Default for FactorModel {
    fn default() -> Self {
        FactorModel::new(FactorConfig::default())
    }
}

impl PredictionEngine for FactorModel {
    fn name(&self) -> &'static str {
        NAME
    }

    fn train(&mut self, ratings: RatingStore) -> Result<()> {
        let num_users = ratings.num_users();
        let num_items = ratings.num_items();
        if self.config.rank == 0 {
            return Err(Error::InvalidConfig("factor rank must be positive".to_string()));
        }
        self.effective_rank = self.config.rank.min(num_users).min(num_items);

        let mut rng = match self.config.seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };
        let r = self.effective_rank;
        self.user_factors = (0..num_users * r).map(|_| rng.gen::<f64>()).collect();
        self.item_factors = (0..num_items * r).map(|_| rng.gen::<f64>()).collect();
        self.training_error = None;

        if ratings.nnz() > 0 {
            self.fit(&ratings);
        }
        debug!(
            users = num_users,
            items = num_items,
            rank = r,
            error = ?self.training_error,
            "factor model trained"
        );
        self.store = Some(ratings);
        Ok(())
    }

    fn predict_rating(&mut self, user: UserIdx, item: ItemIdx) -> Result<Rating> {
        let store = self.trained_store()?;
        store.check_user(user)?;
        store.check_item(item)?;
        let raw = self.dot(user, item);
        Ok(raw.max(self.config.rating_min).min(self.config.rating_max))
    }

    fn predict_top_k(&mut self, user: UserIdx, how_many: usize) -> Result<Vec<ItemScore>> {
        let store = self.trained_store()?;
        store.check_user(user)?;
        let pool = candidates(store, user);
        rank_candidates(pool, how_many, |item| self.predict_rating(user, item))
    }
}

#[cfg(test)]
mod factorization_test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use float_cmp::approx_eq;

    use super::*;
    use crate::dataset::rating_store::rating_store_test::example_store;

    fn dense_store() -> RatingStore {
        let ratings = [
            [4.0, 2.0, 4.0, 3.0],
            [2.0, 1.0, 2.0, 1.5],
            [5.0, 3.0, 4.0, 4.0],
        ];
        let triples = ratings.iter().enumerate().flat_map(|(user, row)| {
            row.iter()
                .enumerate()
                .map(move |(item, rating)| (user, item, *rating))
        });
        RatingStore::from_triples(3, 4, triples).unwrap()
    }

    fn config(rank: usize, max_epochs: usize) -> FactorConfig {
        FactorConfig {
            rank,
            max_epochs,
            seed: Some(17),
            ..FactorConfig::default()
        }
    }

    #[test]
    fn should_converge_on_fully_observed_matrix() {
        let mut model = FactorModel::new(config(3, 20_000));
        model.train(dense_store()).unwrap();

        assert_eq!(3, model.effective_rank());
        assert!(model.training_error().unwrap() < 0.05);
        let predicted = model.predict_rating(2, 0).unwrap();
        assert!((predicted - 5.0).abs() < 0.5);
    }

    #[test]
    fn should_report_every_epoch() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::clone(&seen);
        let mut model = FactorModel::new(config(2, 4)).with_epoch_callback(Box::new(
            move |epoch, err| recorder.borrow_mut().push((epoch, err)),
        ));
        model.train(dense_store()).unwrap();

        let seen = seen.borrow();
        let epochs: Vec<usize> = seen.iter().map(|(epoch, _)| *epoch).collect();
        assert_eq!(epochs, (1..=epochs.len()).collect::<Vec<_>>());
        assert!(epochs.len() <= 5);
        assert_eq!(Some(seen[seen.len() - 1].1), model.training_error());
    }

    #[test]
    fn should_improve_on_a_single_epoch() {
        let mut short = FactorModel::new(config(3, 0));
        short.train(dense_store()).unwrap();
        let mut long = FactorModel::new(config(3, 20_000));
        long.train(dense_store()).unwrap();

        assert!(long.training_error().unwrap() < short.training_error().unwrap());
    }

    #[test]
    fn should_be_reproducible_with_a_seed() {
        let mut first = FactorModel::new(config(2, 30));
        let mut second = FactorModel::new(config(2, 30));
        first.train(dense_store()).unwrap();
        second.train(dense_store()).unwrap();

        for user in 0..3 {
            for item in 0..4 {
                assert_eq!(
                    first.predict_rating(user, item).unwrap(),
                    second.predict_rating(user, item).unwrap()
                );
            }
        }
    }

    #[test]
    fn should_clamp_predictions_and_cover_users_without_ratings() {
        let (_, store) = example_store();
        let wide = RatingStore::from_triples(
            store.num_users() + 1,
            store.num_items(),
            store.entries().collect::<Vec<_>>(),
        )
        .unwrap();
        let mut model = FactorModel::new(config(50, 50));
        model.train(wide).unwrap();

        assert_eq!(6, model.effective_rank());
        let unseen = 5;
        for item in 0..6 {
            let predicted = model.predict_rating(unseen, item).unwrap();
            assert!((0.0..=5.0).contains(&predicted));
        }
        assert!(model.predict_top_k(unseen, 3).unwrap().is_empty());
    }

    #[test]
    fn should_skip_training_on_empty_store() {
        let mut model = FactorModel::new(config(4, 50));
        model
            .train(RatingStore::from_triples(2, 2, Vec::new()).unwrap())
            .unwrap();
        assert_eq!(None, model.training_error());
        assert!(model.predict_rating(1, 1).is_ok());
    }

    #[test]
    fn should_step_item_factors_from_updated_user_factors() {
        let mut untrained = FactorModel::new(FactorConfig {
            rank: 1,
            seed: Some(3),
            ..FactorConfig::default()
        });
        untrained
            .train(RatingStore::from_triples(1, 1, Vec::new()).unwrap())
            .unwrap();
        let (u, v) = (untrained.user_factors[0], untrained.item_factors[0]);

        let mut model = FactorModel::new(FactorConfig {
            rank: 1,
            max_epochs: 0,
            seed: Some(3),
            ..FactorConfig::default()
        });
        model
            .train(RatingStore::from_triples(1, 1, vec![(0, 0, 5.0)]).unwrap())
            .unwrap();

        let err = 5.0 - u * v;
        let expected_u = u + 0.01 * (err * v - 0.01 * u);
        let expected_v = v + 0.01 * (err * expected_u - 0.01 * v);
        assert!(approx_eq!(f64, expected_u, model.user_factors[0], epsilon = 1e-12));
        assert!(approx_eq!(f64, expected_v, model.item_factors[0], epsilon = 1e-12));
    }

    #[test]
    fn should_pick_starting_rate_from_configured_rank() {
        let mut model = FactorModel::new(config(200, 0));
        model.train(dense_store()).unwrap();

        assert_eq!(3, model.effective_rank());
        assert_eq!((0.005, FAST_LEARNING_RATE), model.learning_rates());
    }

    #[test]
    fn should_reject_predictions_before_training() {
        let mut model = FactorModel::default();
        assert!(matches!(model.predict_rating(0, 0), Err(Error::NotTrained(_))));
        assert!(matches!(model.predict_top_k(0, 5), Err(Error::NotTrained(_))));
    }
}
