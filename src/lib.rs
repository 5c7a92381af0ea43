#![doc = "ir-query: retrieve, normalize and export repository collection records."]

//! This crate queries a digital repository's paginated JSON search API,
//! flattens the paginated responses into one record collection, projects each
//! record down to a configured field list, and exports the result as
//! tab-delimited CSV or JSON. A usage-report CSV can be merged in to produce
//! periodic usage summaries.
//!
//! # Usage
//! Construct a [`query::RepositoryQuery`] over an [`api::RepositoryApi`]
//! implementation (the reqwest-backed [`api::HttpRepositoryApi`] in
//! production, a mock in tests), retrieve a collection, then project, search
//! or export. The `ir-query` binary wires this up from a YAML settings file.

pub mod aggregate;
pub mod api;
pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod export;
pub mod load_config;
pub mod pagination;
pub mod project;
pub mod query;
pub mod usage;
