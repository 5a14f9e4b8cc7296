use itertools::Itertools;

use crate::dataset::RatingStore;
use crate::io::{ItemIdx, UserIdx};

/// Unrated items reachable from `user` over two co-rating hops: users who share
/// a rated item with `user`, then every item those users rated. Items already
/// rated by `user` are excluded. The result is ascending and free of duplicates.
pub fn candidates(store: &RatingStore, user: UserIdx) -> Vec<ItemIdx> {
    let rated = store.items_rated_by(user);
    if rated.is_empty() {
        return Vec::new();
    }

    let co_users = rated
        .iter()
        .map(|&(item, _)| store.users_who_rated(item).iter().map(|&(other, _)| other))
        .kmerge()
        .dedup();

    let reachable = co_users
        .map(|other| store.items_rated_by(other).iter().map(|&(item, _)| item))
        .kmerge()
        .dedup();

    let mut rated_items = rated.iter().map(|&(item, _)| item).peekable();
    reachable
        .filter(|item| {
            while let Some(&next_rated) = rated_items.peek() {
                if next_rated < *item {
                    rated_items.next();
                } else {
                    break;
                }
            }
            rated_items.peek() != Some(item)
        })
        .collect()
}

#[cfg(test)]
mod candidates_test {
    use super::*;
    use crate::dataset::rating_store::rating_store_test::example_store;

    fn item_ids(identities: &crate::dataset::Identities, items: &[ItemIdx]) -> Vec<String> {
        items
            .iter()
            .map(|item| identities.items.id_of(*item).unwrap().to_string())
            .collect()
    }

    #[test]
    fn should_expand_two_hops_and_drop_rated_items() {
        let (identities, store) = example_store();
        let u1 = identities.users.index_of("U1").unwrap();
        let u3 = identities.users.index_of("U3").unwrap();

        assert_eq!(vec!["I4", "I5", "I6"], item_ids(&identities, &candidates(&store, u1)));
        assert_eq!(
            vec!["I1", "I2", "I4", "I5", "I6"],
            item_ids(&identities, &candidates(&store, u3))
        );
    }

    #[test]
    fn should_return_nothing_for_user_without_ratings() {
        let (_, store) = example_store();
        assert!(candidates(&store, 42).is_empty());
    }
}
