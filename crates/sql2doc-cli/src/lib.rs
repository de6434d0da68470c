//! sql2doc command-line front end
//!
//! Loads configuration and collections, replays a YAML query file onto a
//! `QueryBuilder`, and prints either the result or the MongoDB command the
//! query translates to.

pub mod config;
pub mod logging;
pub mod query;

pub use config::Config;
pub use query::{QueryFile, QueryFileError, RunError};
