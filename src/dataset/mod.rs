pub mod identity_map;
pub mod rating_store;

pub use identity_map::{Identities, IdentityMap};
pub use rating_store::{LoadMode, RatingStore};
