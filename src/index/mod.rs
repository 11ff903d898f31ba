pub mod build;
pub mod stats;
pub mod token_index;
pub mod types;

pub use token_index::{DocPostings, TokenIndex};
pub use types::*;
