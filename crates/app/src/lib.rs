//! Shelfwise app library.
//!
//! This crate provides the embedded Shopify app as a library, allowing it to
//! be tested and reused by the CLI.
//!
//! # Modules
//!
//! - [`billing`] - Usage ledger, anti-churn guard, tier resolution
//! - [`batch`] - Bounded-concurrency generate → commit → tag runner
//! - [`services`] - Copywriting pipelines and shop authentication
//! - [`shopify`] - Admin GraphQL API client
//! - [`gemini`] - Generative Language API client
//! - [`routes`] - HTTP handlers and router
//!
//! # Security
//!
//! This crate holds every installed shop's offline Admin API token. Tokens
//! stay in `SecretString` and are never logged.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod batch;
pub mod billing;
pub mod config;
pub mod db;
pub mod error;
pub mod gemini;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
