//! Query construction and result post-processing for course catalog search.

pub mod error;
pub mod search;

pub use error::{Result, SearchError};
