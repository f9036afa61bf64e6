//! Catalog Proxy Core - Shared catalog types.
//!
//! This crate provides the domain types used across the catalog proxy:
//! - `server` - Catalog cache, query engine and HTTP surface
//! - `cli` - Operator tooling (snapshot dry runs, remote cache control)
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients, no caches. This keeps it lightweight and lets the query engine
//! be tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, products, prices, taxonomy, snapshots and queries

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
