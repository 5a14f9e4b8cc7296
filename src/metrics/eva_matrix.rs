use crate::error::{Error, Result};
use crate::metrics::ranking::RankingScores;

/// Accumulated evaluation results. The four `*_at_k` vectors are parallel to
/// `positions`; `time` is wall-clock seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaMatrix {
    pub positions: Vec<usize>,
    pub rmse: f64,
    pub mae: f64,
    pub p_at_k: Vec<f64>,
    pub r_at_k: Vec<f64>,
    pub mrr_at_k: Vec<f64>,
    pub ndcg_at_k: Vec<f64>,
    pub time: f64,
}

impl EvaMatrix {
    pub fn new(positions: &[usize]) -> Self {
        let zeros = vec![0_f64; positions.len()];
        EvaMatrix {
            positions: positions.to_vec(),
            rmse: 0.0,
            mae: 0.0,
            p_at_k: zeros.clone(),
            r_at_k: zeros.clone(),
            mrr_at_k: zeros.clone(),
            ndcg_at_k: zeros,
            time: 0.0,
        }
    }

    /// Pointwise addition of every field. Both matrices must share `positions`.
    pub fn accumulate(&mut self, other: &EvaMatrix) -> Result<()> {
        if self.positions != other.positions {
            return Err(Error::DimensionMismatch {
                expected: self.positions.clone(),
                actual: other.positions.clone(),
            });
        }
        self.rmse += other.rmse;
        self.mae += other.mae;
        add_into(&mut self.p_at_k, &other.p_at_k);
        add_into(&mut self.r_at_k, &other.r_at_k);
        add_into(&mut self.mrr_at_k, &other.mrr_at_k);
        add_into(&mut self.ndcg_at_k, &other.ndcg_at_k);
        self.time += other.time;
        Ok(())
    }

    /// Adds one user's ranking scores. The scores must have been computed for
    /// the same cutoffs.
    pub fn add_ranking(&mut self, scores: &RankingScores) {
        add_into(&mut self.p_at_k, &scores.precision);
        add_into(&mut self.r_at_k, &scores.recall);
        add_into(&mut self.mrr_at_k, &scores.mrr);
        add_into(&mut self.ndcg_at_k, &scores.ndcg);
    }

    /// Divides the error fields by `rating_count` and the ranking vectors by
    /// `user_count`. `time` is left untouched; a zero divisor leaves its fields
    /// as they are.
    pub fn avg(&mut self, rating_count: usize, user_count: usize) {
        if rating_count > 0 {
            self.rmse /= rating_count as f64;
            self.mae /= rating_count as f64;
        }
        if user_count > 0 {
            let users = user_count as f64;
            for value in self
                .p_at_k
                .iter_mut()
                .chain(self.r_at_k.iter_mut())
                .chain(self.mrr_at_k.iter_mut())
                .chain(self.ndcg_at_k.iter_mut())
            {
                *value /= users;
            }
        }
    }
}

fn add_into(target: &mut [f64], source: &[f64]) {
    for (value, addend) in target.iter_mut().zip(source) {
        *value += addend;
    }
}

#[cfg(test)]
mod eva_matrix_test {
    use super::*;

    fn filled(positions: &[usize], seed: f64) -> EvaMatrix {
        let mut matrix = EvaMatrix::new(positions);
        matrix.rmse = seed;
        matrix.mae = seed / 2.0;
        matrix.p_at_k = positions.iter().map(|k| seed * *k as f64).collect();
        matrix.r_at_k = vec![seed; positions.len()];
        matrix.mrr_at_k = vec![seed + 1.0; positions.len()];
        matrix.ndcg_at_k = vec![seed * 3.0; positions.len()];
        matrix.time = seed * 10.0;
        matrix
    }

    #[test]
    fn should_accumulate_commutatively() {
        let positions = [1, 5, 10];
        let mut left = filled(&positions, 0.25);
        left.accumulate(&filled(&positions, 1.5)).unwrap();
        let mut right = filled(&positions, 1.5);
        right.accumulate(&filled(&positions, 0.25)).unwrap();

        assert_eq!(left, right);
        assert_eq!(1.75, left.rmse);
        assert_eq!(vec![1.75, 8.75, 17.5], left.p_at_k);
        assert_eq!(17.5, left.time);
    }

    #[test]
    fn should_reject_mismatched_positions() {
        let mut matrix = EvaMatrix::new(&[1, 5]);
        let result = matrix.accumulate(&EvaMatrix::new(&[1, 5, 10]));
        match result {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!(vec![1, 5], expected);
                assert_eq!(vec![1, 5, 10], actual);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(EvaMatrix::new(&[1, 5]), matrix);
    }

    #[test]
    fn should_average_errors_and_rankings_separately() {
        let mut matrix = filled(&[2], 4.0);
        matrix.avg(4, 2);

        assert_eq!(1.0, matrix.rmse);
        assert_eq!(0.5, matrix.mae);
        assert_eq!(vec![4.0], matrix.p_at_k);
        assert_eq!(vec![2.0], matrix.r_at_k);
        assert_eq!(vec![2.5], matrix.mrr_at_k);
        assert_eq!(vec![6.0], matrix.ndcg_at_k);
        assert_eq!(40.0, matrix.time);
    }

    #[test]
    fn should_leave_fields_alone_for_zero_divisors() {
        let mut matrix = filled(&[1], 3.0);
        matrix.avg(0, 0);
        assert_eq!(filled(&[1], 3.0), matrix);
    }
}
