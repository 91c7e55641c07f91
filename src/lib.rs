//! # SDG Context
//!
//! Semantic matching of free text against the UN Sustainable Development
//! Goals taxonomy.
//!
//! The taxonomy (goals, their targets, their indicators) is flattened into
//! an ordered list of reference statements. Each statement is embedded
//! once into a unit vector; a query is embedded the same way and every
//! statement is ranked by cosine similarity, cut by `top_n` and a minimum
//! similarity threshold.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────┐   ┌──────────┐
//! │ Taxonomy │──▶│ Flatten  │──▶│ CorpusIndex │──▶│   Rank   │
//! │ JSON/TOML│   │statements│   │  + vectors  │   │top-n/cut │
//! └──────────┘   └──────────┘   └──────┬──────┘   └────┬─────┘
//!                                      │               │
//!                              ┌───────┴──────┐   ┌────┴─────┐
//!                              │  Embedding   │   │ CLI/HTTP │
//!                              │  providers   │   │  export  │
//!                              └──────────────┘   └──────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sdg_context::embedding::HashProvider;
//! use sdg_context::matcher::Matcher;
//! use sdg_context::taxonomy::Taxonomy;
//!
//! let taxonomy = Taxonomy::builtin().unwrap();
//! let matcher = Matcher::new(&taxonomy, Arc::new(HashProvider::new(256).unwrap())).unwrap();
//! let results = matcher.find("maternal mortality", 3, 0.0).unwrap();
//! assert!(results.len() <= 3);
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`taxonomy`] | Taxonomy model and loaders |
//! | [`flatten`] | Taxonomy → reference statements |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Statements paired with their embeddings |
//! | [`rank`] | Similarity ranking with top-n and threshold cuts |
//! | [`matcher`] | Query orchestration and index refresh |
//! | [`export`] | Text, JSON, and CSV rendering |
//! | [`commands`] | CLI command implementations |
//! | [`server`] | HTTP server |
//! | [`error`] | Matching error type |

pub mod commands;
pub mod config;
pub mod embedding;
pub mod error;
pub mod export;
pub mod flatten;
pub mod index;
pub mod matcher;
pub mod rank;
pub mod server;
pub mod taxonomy;
