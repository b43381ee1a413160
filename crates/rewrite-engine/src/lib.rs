pub mod chain;
pub mod error;
pub mod finalize;
pub mod rebase;

pub use chain::{ChainRewrite, rewrite_chain};
pub use error::{Result, RewriteEngineError};
pub use finalize::{FinalizeOutcome, finalize};
pub use rebase::rebase_onto;
