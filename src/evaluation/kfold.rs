use rand::seq::SliceRandom;
use rand::Rng;

use crate::io::UserIdx;

/// Assigns every record position to one of `num_folds` folds, per user.
///
/// Users are visited in index order and their records receive consecutive
/// labels from a cycle `0, 1, .., num_folds - 1` that continues from one user
/// to the next. Each user's labels are then shuffled among that user's own
/// records, so a user with `c` ratings ends up with `c / num_folds` or one more
/// of them in every fold. The result does not depend on how the users'
/// records are interleaved in the input.
pub fn assign_folds<R: Rng>(
    user_of_record: &[UserIdx],
    num_users: usize,
    num_folds: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut positions_by_user: Vec<Vec<usize>> = vec![Vec::new(); num_users];
    for (position, &user) in user_of_record.iter().enumerate() {
        positions_by_user[user].push(position);
    }

    let mut fold_of = vec![0_usize; user_of_record.len()];
    let mut next_label = 0_usize;
    for positions in positions_by_user {
        let mut labels: Vec<usize> = (0..positions.len())
            .map(|offset| (next_label + offset) % num_folds)
            .collect();
        next_label += positions.len();
        labels.shuffle(rng);
        for (position, label) in positions.into_iter().zip(labels) {
            fold_of[position] = label;
        }
    }
    fold_of
}
