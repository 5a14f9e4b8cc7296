use hashbrown::HashSet;

use crate::io::ItemIdx;

/// One user's ranking quality at each cutoff, parallel to the cutoff list.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingScores {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub mrr: Vec<f64>,
    pub ndcg: Vec<f64>,
}

fn discount(position: usize) -> f64 {
    1.0 / ((position + 2) as f64).ln()
}

/// Scores a recommendation list against the items the user rated at or above
/// their mean.
///
/// The ideal DCG at cutoff K sums the discount of every returned item within
/// K, so a list shorter than K is only measured against what it returned.
/// If any cutoff has a zero ideal DCG the whole NDCG vector is zero.
pub fn score_ranking(
    recommended: &[ItemIdx],
    positives: &HashSet<ItemIdx>,
    positions: &[usize],
) -> RankingScores {
    let cutoffs = positions.len();
    let mut hits = vec![0_usize; cutoffs];
    let mut dcg = vec![0_f64; cutoffs];
    let mut idcg = vec![0_f64; cutoffs];
    let mut mrr = vec![0_f64; cutoffs];

    for (index, &cutoff) in positions.iter().enumerate() {
        for (position, item) in recommended.iter().take(cutoff).enumerate() {
            idcg[index] += discount(position);
            if positives.contains(item) {
                dcg[index] += discount(position);
                hits[index] += 1;
                if mrr[index] == 0.0 {
                    mrr[index] = 1.0 / (position + 1) as f64;
                }
            }
        }
    }

    let precision = positions
        .iter()
        .zip(&hits)
        .map(|(&cutoff, &hit_count)| hit_count as f64 / cutoff as f64)
        .collect();
    let recall = hits
        .iter()
        .map(|&hit_count| {
            if positives.is_empty() {
                0.0
            } else {
                hit_count as f64 / positives.len() as f64
            }
        })
        .collect();
    let ndcg = if idcg.iter().all(|ideal| *ideal != 0.0) {
        dcg.iter().zip(&idcg).map(|(gain, ideal)| gain / ideal).collect()
    } else {
        vec![0_f64; cutoffs]
    };

    RankingScores {
        precision,
        recall,
        mrr,
        ndcg,
    }
}
