#[macro_use]
extern crate bencher;
extern crate cfeval;
extern crate rand;
extern crate rand_pcg;

use bencher::{black_box, Bencher};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use cfeval::candidates::candidates;
use cfeval::dataset::RatingStore;
use cfeval::engine::PredictionEngine;
use cfeval::factorization::{FactorConfig, FactorModel};
use cfeval::neighborhood::similarity::SimilarityKind;
use cfeval::neighborhood::NeighborhoodModel;

benchmark_group!(
    benches,
    neighborhood_top_k,
    factor_top_k,
    candidate_expansion
);
benchmark_main!(benches);

const QTY_USERS: usize = 500;
const QTY_ITEMS: usize = 300;
const RATINGS_PER_USER: usize = 20;
const HOW_MANY: usize = 10;

fn synthetic_store() -> RatingStore {
    let mut rng = Pcg64::seed_from_u64(1234);
    let mut triples = Vec::with_capacity(QTY_USERS * RATINGS_PER_USER);
    for user in 0..QTY_USERS {
        for _ in 0..RATINGS_PER_USER {
            let item = rng.gen_range(0..QTY_ITEMS);
            let rating = rng.gen_range(1..=5) as f64;
            triples.push((user, item, rating));
        }
    }
    RatingStore::from_triples(QTY_USERS, QTY_ITEMS, triples).unwrap()
}

fn neighborhood_top_k(bench: &mut Bencher) {
    let mut model = NeighborhoodModel::new(50, SimilarityKind::AdjustedCosine);
    model.train(synthetic_store()).unwrap();
    let mut user = 0;
    bench.iter(|| {
        user = (user + 1) % QTY_USERS;
        black_box(model.predict_top_k(user, HOW_MANY).unwrap())
    });
}

fn factor_top_k(bench: &mut Bencher) {
    let mut model = FactorModel::new(FactorConfig {
        rank: 20,
        max_epochs: 10,
        seed: Some(7),
        ..FactorConfig::default()
    });
    model.train(synthetic_store()).unwrap();
    let mut user = 0;
    bench.iter(|| {
        user = (user + 1) % QTY_USERS;
        black_box(model.predict_top_k(user, HOW_MANY).unwrap())
    });
}

fn candidate_expansion(bench: &mut Bencher) {
    let store = synthetic_store();
    let mut user = 0;
    bench.iter(|| {
        user = (user + 1) % QTY_USERS;
        black_box(candidates(&store, user))
    });
}
