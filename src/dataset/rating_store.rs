use std::collections::BTreeMap;

use crate::dataset::identity_map::Identities;
use crate::error::{EntityKind, Error, Result};
use crate::io::{ItemIdx, Rating, RatingRecord, UserIdx};

/// How identifiers are resolved while loading ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Unseen identifiers get the next free index.
    Fresh,
    /// Identifiers must already be present in the given mappings.
    Existing,
}

/// Sparse user x item rating matrix. Only observed, non-zero ratings are stored;
/// a missing entry means "unobserved", not a rating of zero.
#[derive(Debug, Clone)]
pub struct RatingStore {
    num_users: usize,
    num_items: usize,
    rows: Vec<Vec<(ItemIdx, Rating)>>,
    columns: Vec<Vec<(UserIdx, Rating)>>,
    user_means: Vec<Option<Rating>>,
    nnz: usize,
}

impl RatingStore {
    /// Builds the matrix from a record stream. The matrix is sized by the full
    /// mappings in `identities`, not only by the ids occurring in `records`.
    /// A repeated (user, item) pair overwrites the earlier rating.
    pub fn load<'a, I>(records: I, identities: &mut Identities, mode: LoadMode) -> Result<Self>
    where
        I: IntoIterator<Item = &'a RatingRecord>,
    {
        if mode == LoadMode::Existing {
            return RatingStore::load_existing(records, identities);
        }
        let triples: Vec<(UserIdx, ItemIdx, Rating)> = records
            .into_iter()
            .map(|record| {
                (
                    identities.users.get_or_insert(&record.user_id),
                    identities.items.get_or_insert(&record.item_id),
                    record.rating,
                )
            })
            .collect();

        RatingStore::from_triples(identities.users.len(), identities.items.len(), triples)
    }

    /// Loads records against mappings that are only read; an identifier
    /// missing from `identities` fails with `UnknownIdentifier`.
    pub fn load_existing<'a, I>(records: I, identities: &Identities) -> Result<Self>
    where
        I: IntoIterator<Item = &'a RatingRecord>,
    {
        let triples = records
            .into_iter()
            .map(|record| {
                Ok((
                    identities.users.index_of(&record.user_id)?,
                    identities.items.index_of(&record.item_id)?,
                    record.rating,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        RatingStore::from_triples(identities.users.len(), identities.items.len(), triples)
    }

    pub fn from_triples<I>(num_users: usize, num_items: usize, triples: I) -> Result<Self>
    where
        I: IntoIterator<Item = (UserIdx, ItemIdx, Rating)>,
    {
        let mut cells: Vec<BTreeMap<ItemIdx, Rating>> = vec![BTreeMap::new(); num_users];
        for (user, item, rating) in triples {
            if user >= num_users {
                return Err(Error::IndexOutOfRange {
                    kind: EntityKind::User,
                    index: user,
                    len: num_users,
                });
            }
            if item >= num_items {
                return Err(Error::IndexOutOfRange {
                    kind: EntityKind::Item,
                    index: item,
                    len: num_items,
                });
            }
            if rating == 0.0 {
                cells[user].remove(&item);
            } else {
                cells[user].insert(item, rating);
            }
        }

        let mut columns: Vec<Vec<(UserIdx, Rating)>> = vec![Vec::new(); num_items];
        let mut user_means = Vec::with_capacity(num_users);
        let mut nnz = 0;
        let rows: Vec<Vec<(ItemIdx, Rating)>> = cells
            .into_iter()
            .enumerate()
            .map(|(user, row)| {
                let row: Vec<(ItemIdx, Rating)> = row.into_iter().collect();
                for &(item, rating) in row.iter() {
                    columns[item].push((user, rating));
                }
                nnz += row.len();
                user_means.push(if row.is_empty() {
                    None
                } else {
                    Some(row.iter().map(|(_, rating)| rating).sum::<Rating>() / row.len() as Rating)
                });
                row
            })
            .collect();

        Ok(RatingStore {
            num_users,
            num_items,
            rows,
            columns,
            user_means,
            nnz,
        })
    }

    pub fn num_users(&self) -> usize {
        self.num_users
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Number of stored ratings.
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Items rated by `user`, ascending by item index.
    pub fn items_rated_by(&self, user: UserIdx) -> &[(ItemIdx, Rating)] {
        self.rows.get(user).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Users who rated `item`, ascending by user index.
    pub fn users_who_rated(&self, item: ItemIdx) -> &[(UserIdx, Rating)] {
        self.columns.get(item).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rating(&self, user: UserIdx, item: ItemIdx) -> Option<Rating> {
        let row = self.items_rated_by(user);
        row.binary_search_by_key(&item, |&(rated_item, _)| rated_item)
            .ok()
            .map(|position| row[position].1)
    }

    /// Mean of the user's stored ratings; `None` for a user without ratings.
    pub fn user_mean(&self, user: UserIdx) -> Option<Rating> {
        self.user_means.get(user).copied().flatten()
    }

    /// All stored ratings in row-major order.
    pub fn entries(&self) -> impl Iterator<Item = (UserIdx, ItemIdx, Rating)> + '_ {
        self.rows.iter().enumerate().flat_map(|(user, row)| {
            row.iter().map(move |&(item, rating)| (user, item, rating))
        })
    }

    pub fn check_user(&self, user: UserIdx) -> Result<()> {
        if user < self.num_users {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                kind: EntityKind::User,
                index: user,
                len: self.num_users,
            })
        }
    }

    pub fn check_item(&self, item: ItemIdx) -> Result<()> {
        if item < self.num_items {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                kind: EntityKind::Item,
                index: item,
                len: self.num_items,
            })
        }
    }
}
