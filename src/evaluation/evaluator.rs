use std::time::Instant;

use hashbrown::HashSet;
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tracing::{debug, info};

use crate::dataset::{Identities, LoadMode, RatingStore};
use crate::engine::PredictionEngine;
use crate::error::{Error, Result};
use crate::evaluation::kfold::assign_folds;
use crate::evaluation::observer::EvaluationObserver;
use crate::io::{ItemIdx, RatingRecord, UserIdx};
use crate::metrics::ranking::score_ranking;
use crate::metrics::EvaMatrix;
use crate::stopwatch::Stopwatch;

fn seeded_rng(seed: Option<u64>) -> Pcg64 {
    match seed {
        Some(seed) => Pcg64::seed_from_u64(seed),
        None => Pcg64::from_entropy(),
    }
}

/// K-fold evaluation harness over a fixed rating corpus.
///
/// Identities and the full rating store are built once from all records, so
/// every fold's train and test store shares the same dimensions.
pub struct Evaluator {
    identities: Identities,
    records: Vec<RatingRecord>,
    indices: Vec<(UserIdx, ItemIdx)>,
    store: RatingStore,
    fold_of: Vec<usize>,
    num_folds: usize,
}

impl Evaluator {
    /// Splits a single corpus into `num_folds` folds, balanced per user.
    pub fn load_total(
        num_folds: usize,
        records: Vec<RatingRecord>,
        seed: Option<u64>,
    ) -> Result<Evaluator> {
        if num_folds < 2 {
            return Err(Error::InvalidConfig(format!(
                "at least 2 folds are needed, got {}",
                num_folds
            )));
        }
        let (identities, store, indices) = Evaluator::index(&records)?;
        let users: Vec<UserIdx> = indices.iter().map(|(user, _)| *user).collect();
        let fold_of = assign_folds(
            &users,
            identities.users.len(),
            num_folds,
            &mut seeded_rng(seed),
        );

        info!(
            records = records.len(),
            users = identities.users.len(),
            items = identities.items.len(),
            num_folds,
            "split ratings into folds"
        );
        Ok(Evaluator {
            identities,
            records,
            indices,
            store,
            fold_of,
            num_folds,
        })
    }

    /// Uses pre-partitioned folds; a record's fold is the index of its list.
    pub fn load_split(folds: Vec<Vec<RatingRecord>>) -> Result<Evaluator> {
        let num_folds = folds.len();
        if num_folds < 2 {
            return Err(Error::InvalidConfig(format!(
                "at least 2 fold files are needed, got {}",
                num_folds
            )));
        }

        let mut records = Vec::new();
        let mut fold_of = Vec::new();
        for (fold, fold_records) in folds.into_iter().enumerate() {
            fold_of.extend(std::iter::repeat(fold).take(fold_records.len()));
            records.extend(fold_records);
        }
        let (identities, store, indices) = Evaluator::index(&records)?;

        info!(
            records = records.len(),
            users = identities.users.len(),
            items = identities.items.len(),
            num_folds,
            "loaded pre-split folds"
        );
        Ok(Evaluator {
            identities,
            records,
            indices,
            store,
            fold_of,
            num_folds,
        })
    }

    /// Uses the fold label carried by every record. Labels must cover at
    /// least two folds; `num_folds` is the largest label plus one.
    pub fn load_labeled(records: Vec<RatingRecord>) -> Result<Evaluator> {
        let fold_of = records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                record.fold.ok_or_else(|| {
                    Error::InvalidConfig(format!("record {} has no fold label", position + 1))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        let num_folds = fold_of.iter().copied().max().map_or(0, |last| last + 1);
        if num_folds < 2 {
            return Err(Error::InvalidConfig(format!(
                "fold labels must span at least 2 folds, got {}",
                num_folds
            )));
        }
        let (identities, store, indices) = Evaluator::index(&records)?;

        info!(
            records = records.len(),
            users = identities.users.len(),
            items = identities.items.len(),
            num_folds,
            "loaded labeled folds"
        );
        Ok(Evaluator {
            identities,
            records,
            indices,
            store,
            fold_of,
            num_folds,
        })
    }

    /// True when every record carries a fold label.
    pub fn is_labeled(records: &[RatingRecord]) -> bool {
        !records.is_empty() && records.iter().all(|record| record.fold.is_some())
    }

    fn index(
        records: &[RatingRecord],
    ) -> Result<(Identities, RatingStore, Vec<(UserIdx, ItemIdx)>)> {
        let mut identities = Identities::new();
        let store = RatingStore::load(records, &mut identities, LoadMode::Fresh)?;
        let indices = records
            .iter()
            .map(|record| {
                Ok((
                    identities.users.index_of(&record.user_id)?,
                    identities.items.index_of(&record.item_id)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((identities, store, indices))
    }

    pub fn num_folds(&self) -> usize {
        self.num_folds
    }

    pub fn identities(&self) -> &Identities {
        &self.identities
    }

    /// The store over all records of all folds.
    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    /// Records of one fold, in input order.
    pub fn fold_records(&self, fold: usize) -> Vec<&RatingRecord> {
        self.records
            .iter()
            .zip(&self.fold_of)
            .filter(|(_, assigned)| **assigned == fold)
            .map(|(record, _)| record)
            .collect()
    }

    pub fn folds(&self) -> Vec<Vec<&RatingRecord>> {
        (0..self.num_folds)
            .map(|fold| self.fold_records(fold))
            .collect()
    }

    /// Draws `how_many` distinct users uniformly at random, in draw order.
    pub fn sample_users(&self, how_many: usize, seed: Option<u64>) -> Result<Vec<UserIdx>> {
        let num_users = self.identities.users.len();
        if how_many > num_users {
            return Err(Error::InvalidConfig(format!(
                "cannot sample {} users out of {}",
                how_many, num_users
            )));
        }
        Ok(sample(&mut seeded_rng(seed), num_users, how_many).into_vec())
    }

    fn fold_store(&self, fold: usize, in_fold: bool) -> Result<RatingStore> {
        let triples = self
            .indices
            .iter()
            .zip(&self.records)
            .zip(&self.fold_of)
            .filter(|(_, assigned)| (**assigned == fold) == in_fold)
            .map(|((&(user, item), record), _)| (user, item, record.rating));
        RatingStore::from_triples(self.store.num_users(), self.store.num_items(), triples)
    }

    /// Trains `engine` once per fold on the remaining folds and scores it on
    /// the held-out fold. Only `users` are scored when given. The result is
    /// the mean over folds; `time` is the total wall time in seconds.
    pub fn evaluate(
        &self,
        engine: &mut dyn PredictionEngine,
        positions: &[usize],
        users: Option<&[UserIdx]>,
        observer: &mut dyn EvaluationObserver,
    ) -> Result<EvaMatrix> {
        if positions.is_empty() || positions.contains(&0) {
            return Err(Error::InvalidConfig(format!(
                "cutoff positions must be non-empty and positive, got {:?}",
                positions
            )));
        }
        let selected: Vec<UserIdx> = match users {
            Some(users) => {
                for &user in users {
                    self.store.check_user(user)?;
                }
                users.to_vec()
            }
            None => (0..self.identities.users.len()).collect(),
        };

        let mut total = EvaMatrix::new(positions);
        for fold in 0..self.num_folds {
            observer.fold_started(fold, self.num_folds);
            let result = self.evaluate_fold(engine, fold, positions, &selected, observer)?;
            info!(
                fold,
                rmse = result.rmse,
                mae = result.mae,
                seconds = result.time,
                "fold evaluated"
            );
            observer.fold_finished(fold, &result);
            total.accumulate(&result)?;
        }
        total.avg(self.num_folds, self.num_folds);
        observer.finished(&total);
        Ok(total)
    }

    fn evaluate_fold(
        &self,
        engine: &mut dyn PredictionEngine,
        fold: usize,
        positions: &[usize],
        selected: &[UserIdx],
        observer: &mut dyn EvaluationObserver,
    ) -> Result<EvaMatrix> {
        let started = Instant::now();
        let train = self.fold_store(fold, false)?;
        let test = self.fold_store(fold, true)?;
        info!(
            fold,
            train = train.nnz(),
            test = test.nnz(),
            engine = engine.name(),
            "training on fold"
        );
        engine.train(train)?;

        let max_position = positions.iter().copied().max().unwrap_or(0);
        let testers: Vec<UserIdx> = selected
            .iter()
            .copied()
            .filter(|user| !test.items_rated_by(*user).is_empty())
            .collect();

        let mut result = EvaMatrix::new(positions);
        let mut stopwatch = Stopwatch::new();
        let mut qty_ratings = 0_usize;
        for (done, &user) in testers.iter().enumerate() {
            // positives are judged against the mean over the whole corpus
            let score_avg = self.store.user_mean(user).unwrap_or(0.0);

            let mut positives: HashSet<ItemIdx> = HashSet::new();
            for &(item, rating) in test.items_rated_by(user) {
                let predicted = engine.predict_rating(user, item)?;
                let error = predicted - rating;
                result.rmse += error * error;
                result.mae += error.abs();
                qty_ratings += 1;
                if rating >= score_avg {
                    positives.insert(item);
                }
            }

            if !positives.is_empty() {
                stopwatch.start();
                let recommendations = engine.predict_top_k(user, max_position)?;
                stopwatch.stop();
                let recommended: Vec<ItemIdx> =
                    recommendations.iter().map(|scored| scored.id).collect();
                result.add_ranking(&score_ranking(&recommended, &positives, positions));
            }
            observer.user_evaluated(done + 1, testers.len());
        }

        result.avg(qty_ratings, testers.len());
        result.rmse = result.rmse.sqrt();
        result.time = started.elapsed().as_secs_f64();
        debug!(
            fold,
            recommendations = stopwatch.get_n(),
            p50_micros = stopwatch.get_percentile_in_micros(0.5),
            p90_micros = stopwatch.get_percentile_in_micros(0.9),
            p99_micros = stopwatch.get_percentile_in_micros(0.99),
            "top-k latency"
        );
        Ok(result)
    }
}
