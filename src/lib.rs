//! s3-tagger - classification tagging for published data objects
//!
//! Loads a CSV manifest of `(db, table, pii)` rows, lists every object under a
//! bucket prefix, infers each object's database and table from its key and
//! writes `db`, `table` and `pii` tags to it.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod resolver;
pub mod runner;
pub mod storage;
pub mod tagging;

pub use error::{Result, StorageError, TaggerError};
