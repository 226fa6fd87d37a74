//! Typed async client for the LinkHut bookmarking API.
//!
//! Resolve a [`Config`] from the environment (or build one explicitly),
//! construct a [`LinkHutClient`] and call one method per bookmark or tag
//! operation. All failures surface as the crate's [`Error`] taxonomy.

pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use crate::client::LinkHutClient;
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::models::*;
