pub mod error;
pub mod store;

pub use error::{Result, SideBandError};
pub use store::{Document, Namespace, PurgeReport, SideBand};
