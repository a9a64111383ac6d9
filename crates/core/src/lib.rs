//! Shelfwise Core - Shared types library.
//!
//! This crate provides the types shared by all Shelfwise components:
//! - `app` - The embedded Shopify app server
//! - `cli` - Command-line tools for migrations and support tasks
//!
//! # Architecture
//!
//! The core crate contains only types and pure lookups - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Shop domains, usage categories and periods, tiers, batch statuses
//! - [`catalog`] - The static subscription tier catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod types;

pub use types::*;
