pub mod error;
pub mod identity;
pub mod store;

pub use error::{ObjectStoreError, Result};
pub use identity::Identity;
pub use store::{MergeOutcome, ObjectStore};
