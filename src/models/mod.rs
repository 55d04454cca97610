pub mod listing;

pub use listing::{IdentityKey, Listing, ListingStatus};
