pub mod codec;
pub mod error;

pub use codec::TrailerCodec;
pub use error::{Result, TrailersError};
